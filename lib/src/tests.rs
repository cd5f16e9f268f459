mod lib {
    pub use super::super::*;
}

use super::pending::Pending;
use crossbeam_channel::{self, Receiver, Sender};
use rand::{thread_rng, Rng};
use slog::Logger;
use std::io;
use std::thread;

fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Rendezvous intake: `send` returns only once the relay took the item
fn spawn_rendezvous() -> (Sender<lib::Item>, Receiver<String>, thread::JoinHandle<()>) {
    let (intake_tx, intake_rx) = crossbeam_channel::bounded(0);
    let (emit_tx, emit_rx) = crossbeam_channel::bounded(0);
    let handle =
        lib::spawn(intake_rx, emit_tx, &lib::settings::Relay::new(), discard())
            .unwrap();
    (intake_tx, emit_rx, handle)
}

fn rand_items(count: usize, max_priority: i64) -> Vec<lib::Item> {
    let mut rng = thread_rng();
    (0..count)
        .map(|i| {
            lib::Item::new(
                rng.gen_range(-max_priority..=max_priority),
                format!("{:x}", i),
            )
        })
        .collect()
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

#[test]
fn pending_pops_highest_first() {
    let mut pending = Pending::new();
    assert!(pending.is_empty());
    assert!(pending.pop().is_none());

    for &(p, s) in &[(3, "a"), (-7, "b"), (12, "c"), (0, "d"), (5, "e")] {
        pending.insert(lib::Item::new(p, s));
    }
    assert_eq!(pending.len(), 5);

    let order: Vec<_> = (0..5)
        .map(|_| pending.pop().unwrap().into_payload())
        .collect();
    assert_eq!(order, ["c", "e", "a", "d", "b"]);
    assert!(pending.is_empty());
}

#[test]
fn pending_keeps_equal_priorities() {
    let mut pending = Pending::new();
    for s in &["x", "y", "z"] {
        pending.insert(lib::Item::new(1, *s));
    }
    pending.insert(lib::Item::new(2, "top"));

    assert_eq!(pending.pop().unwrap().payload(), "top");
    let rest: Vec<_> = (0..3)
        .map(|_| pending.pop().unwrap().into_payload())
        .collect();
    assert_eq!(sorted(rest), ["x", "y", "z"]);
}

#[test]
fn mode_goes_from_intaking_to_draining() {
    let mut relay = lib::Relay::new(discard());
    assert_eq!(relay.mode(), lib::Mode::Intaking);
    assert_eq!(relay.pending(), 0);

    relay.finish_intake();
    assert_eq!(relay.mode(), lib::Mode::Draining);
}

#[test]
#[should_panic(expected = "finished more than once")]
fn mode_transition_happens_once() {
    let mut relay = lib::Relay::new(discard());
    relay.finish_intake();
    relay.finish_intake();
}

#[test]
fn empty_input() {
    let (intake_tx, intake_rx) = crossbeam_channel::unbounded::<lib::Item>();
    let (emit_tx, emit_rx) = crossbeam_channel::bounded(0);
    drop(intake_tx);

    let handle =
        lib::spawn(intake_rx, emit_tx, &lib::settings::Relay::new(), discard())
            .unwrap();

    assert_eq!(emit_rx.iter().count(), 0);
    handle.join().unwrap();
}

#[test]
fn single_item() {
    let (intake_tx, emit_rx, handle) = spawn_rendezvous();

    intake_tx.send(lib::Item::new(5, "x")).unwrap();
    drop(intake_tx);

    let out: Vec<String> = emit_rx.iter().collect();
    assert_eq!(out, ["x"]);
    handle.join().unwrap();
}

#[test]
fn buffered_before_reads_come_out_by_priority() {
    let (intake_tx, emit_rx, handle) = spawn_rendezvous();

    intake_tx.send(lib::Item::new(3, "a")).unwrap();
    intake_tx.send(lib::Item::new(9, "b")).unwrap();
    intake_tx.send(lib::Item::new(1, "c")).unwrap();

    assert_eq!(emit_rx.recv().unwrap(), "b");
    assert_eq!(emit_rx.recv().unwrap(), "a");
    assert_eq!(emit_rx.recv().unwrap(), "c");

    drop(intake_tx);
    assert!(emit_rx.recv().is_err());
    handle.join().unwrap();
}

#[test]
fn interleaved_live_delivery() {
    let (intake_tx, emit_rx, handle) = spawn_rendezvous();

    intake_tx.send(lib::Item::new(1, "a")).unwrap();
    assert_eq!(emit_rx.recv().unwrap(), "a");

    intake_tx.send(lib::Item::new(5, "b")).unwrap();
    intake_tx.send(lib::Item::new(2, "c")).unwrap();
    assert_eq!(emit_rx.recv().unwrap(), "b");
    assert_eq!(emit_rx.recv().unwrap(), "c");

    drop(intake_tx);
    assert!(emit_rx.recv().is_err());
    handle.join().unwrap();
}

#[test]
fn late_high_priority_overtakes_buffered() {
    let (intake_tx, emit_rx, handle) = spawn_rendezvous();

    intake_tx.send(lib::Item::new(4, "early")).unwrap();
    intake_tx.send(lib::Item::new(2, "early-low")).unwrap();
    assert_eq!(emit_rx.recv().unwrap(), "early");

    intake_tx.send(lib::Item::new(100, "late")).unwrap();
    assert_eq!(emit_rx.recv().unwrap(), "late");
    assert_eq!(emit_rx.recv().unwrap(), "early-low");

    drop(intake_tx);
    assert_eq!(emit_rx.iter().count(), 0);
    handle.join().unwrap();
}

#[test]
fn load_then_drain_is_sorted() {
    for _ in 0..10 {
        let items = rand_items(thread_rng().gen_range(0..200), 50);
        let mut expected: Vec<_> = items.iter().map(|i| i.priority()).collect();
        expected.sort_by(|a, b| b.cmp(a));

        let (intake_tx, emit_rx, handle) = spawn_rendezvous();
        let by_payload: std::collections::HashMap<String, i64> = items
            .iter()
            .map(|i| (i.payload().to_owned(), i.priority()))
            .collect();

        for item in items {
            intake_tx.send(item).unwrap();
        }
        drop(intake_tx);

        let priorities: Vec<i64> =
            emit_rx.iter().map(|payload| by_payload[&payload]).collect();
        assert_eq!(priorities, expected);
        handle.join().unwrap();
    }
}

#[test]
fn started_with_rendezvous_intake_load_then_drain_is_sorted() {
    let mut settings = lib::settings::Relay::new();
    settings.set_intake_capacity(Some(0)).unwrap();

    for _ in 0..20 {
        let items = rand_items(thread_rng().gen_range(1..300), 1000);
        let by_payload: std::collections::HashMap<String, i64> = items
            .iter()
            .map(|i| (i.payload().to_owned(), i.priority()))
            .collect();
        let mut expected: Vec<_> = items.iter().map(|i| i.priority()).collect();
        expected.sort_by(|a, b| b.cmp(a));

        let lib::Endpoints {
            intake,
            emit,
            handle,
        } = lib::start(&settings, discard()).unwrap();

        for item in items {
            intake.send(item).unwrap();
        }
        drop(intake);

        let priorities: Vec<i64> =
            emit.iter().map(|payload| by_payload[&payload]).collect();
        assert_eq!(priorities, expected);
        handle.join().unwrap();
    }
}

#[test]
fn concurrent_no_loss_no_duplication() {
    for &emit_capacity in &[0, 1, 16] {
        let items = rand_items(2000, 3);
        let expected = sorted(
            items.iter().map(|i| i.payload().to_owned()).collect(),
        );

        let mut settings = lib::settings::Relay::new();
        settings.set_emit_capacity(emit_capacity).unwrap();
        let lib::Endpoints {
            intake,
            emit,
            handle,
        } = lib::start(&settings, discard()).unwrap();

        let out = crossbeam::scope(|scope| {
            scope.spawn(move |_| {
                let mut rng = thread_rng();
                for item in items {
                    intake.send(item).unwrap();
                    if rng.gen_ratio(1, 64) {
                        thread::yield_now();
                    }
                }
            });

            let consumer = scope.spawn(move |_| {
                let mut rng = thread_rng();
                let mut out = vec![];
                for payload in emit.iter() {
                    out.push(payload);
                    if rng.gen_ratio(1, 64) {
                        thread::yield_now();
                    }
                }
                out
            });

            consumer.join().unwrap()
        })
        .unwrap();

        assert_eq!(sorted(out), expected);
        handle.join().unwrap();
    }
}

#[test]
fn run_on_current_thread() {
    let (intake_tx, intake_rx) = crossbeam_channel::unbounded();
    let (emit_tx, emit_rx) = crossbeam_channel::unbounded();

    for &(p, s) in &[(1, "a"), (1, "b"), (2, "c")] {
        intake_tx.send(lib::Item::new(p, s)).unwrap();
    }
    drop(intake_tx);

    lib::run(intake_rx, emit_tx);

    let out: Vec<String> = emit_rx.iter().collect();
    assert_eq!(sorted(out), ["a", "b", "c"]);
}

#[test]
#[should_panic(expected = "emit sink disconnected")]
fn disconnected_sink_is_fatal() {
    let (intake_tx, intake_rx) = crossbeam_channel::unbounded();
    let (emit_tx, emit_rx) = crossbeam_channel::bounded::<String>(0);

    intake_tx.send(lib::Item::new(1, "lost")).unwrap();
    drop(intake_tx);
    drop(emit_rx);

    lib::Relay::new(discard()).run(intake_rx, emit_tx);
}

#[test]
fn settings_validation() {
    let mut settings = lib::settings::Relay::new();
    assert_eq!(settings.emit_capacity(), 0);
    assert_eq!(settings.thread_name(), lib::settings::DEFAULT_THREAD_NAME);

    settings.set_emit_capacity(8).unwrap();
    assert_eq!(settings.emit_capacity(), 8);
    let e = settings
        .set_emit_capacity(lib::settings::MAX_CHANNEL_CAPACITY + 1)
        .unwrap_err();
    assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
    assert_eq!(settings.emit_capacity(), 8);

    assert_eq!(settings.intake_capacity(), None);
    settings.set_intake_capacity(Some(0)).unwrap();
    assert_eq!(settings.intake_capacity(), Some(0));
    let e = settings
        .set_intake_capacity(Some(lib::settings::MAX_CHANNEL_CAPACITY + 1))
        .unwrap_err();
    assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
    assert_eq!(settings.intake_capacity(), Some(0));
    settings.set_intake_capacity(None).unwrap();
    assert_eq!(settings.intake_capacity(), None);

    settings.set_thread_name("relay-1").unwrap();
    assert_eq!(settings.thread_name(), "relay-1");
    for bad in &["", "re\0lay"] {
        let e = settings.set_thread_name(*bad).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidInput);
    }
    assert_eq!(settings.thread_name(), "relay-1");
}

#[test]
fn parse_item_lines() {
    let cases: &[(&str, i64, &str)] = &[
        ("5 x", 5, "x"),
        ("  -3 hello world", -3, "hello world"),
        ("7", 7, ""),
        ("0\tTAB separated", 0, "TAB separated"),
    ];
    for &(line, priority, payload) in cases {
        let item: lib::Item = line.parse().unwrap();
        assert_eq!(item, lib::Item::new(priority, payload), "line: {:?}", line);
    }

    for bad in &["", "x y", "1.5 z", "99999999999999999999 overflow"] {
        let e = bad.parse::<lib::Item>().unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData, "line: {:?}", bad);
    }
}

#[test]
fn item_json() {
    let item: lib::Item =
        serde_json::from_str(r#"{"priority": -2, "payload": "x y"}"#).unwrap();
    assert_eq!(item, lib::Item::new(-2, "x y"));
    assert!(serde_json::from_str::<lib::Item>(r#"{"payload": "x"}"#).is_err());
}
