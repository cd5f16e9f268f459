extern crate hex;
extern crate rand;

use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use std::collections::HashMap;
use std::io::Write;
use std::process::{Command, Stdio};

/// Generate prioritized items with unique payloads
struct ExampleItemGen {
    rng: SmallRng,
    next_id: u64,
}

impl ExampleItemGen {
    fn new() -> Self {
        ExampleItemGen {
            rng: SmallRng::from_entropy(),
            next_id: 0,
        }
    }

    /// Returns `(priority, payload)` pairs
    ///
    /// A narrow priority range gives plenty of ties.
    fn gen(&mut self, count: usize) -> Vec<(i64, String)> {
        let spread = match self.rng.gen_range(0..3) {
            0 => 2,
            1 => 100,
            2 => i64::MAX / 2,
            _ => panic!("WTF?"),
        };

        (0..count)
            .map(|_| {
                let mut noise = [0u8; 6];
                self.rng.fill(&mut noise);
                // the space checks that payloads are taken whole
                let payload =
                    format!("{}-{} x", self.next_id, hex::encode(noise));
                self.next_id += 1;
                (self.rng.gen_range(-spread..=spread), payload)
            })
            .collect()
    }
}

#[derive(Copy, Clone, Debug)]
enum Format {
    Plain,
    Json,
}

impl Format {
    fn arg(&self) -> &'static str {
        match *self {
            Format::Plain => "plain",
            Format::Json => "json",
        }
    }

    fn encode(&self, items: &[(i64, String)]) -> Vec<u8> {
        let mut res = vec![];
        for &(priority, ref payload) in items {
            match *self {
                Format::Plain => {
                    writeln!(res, "{} {}", priority, payload).unwrap()
                }
                // payloads are plain ascii without quotes or backslashes
                Format::Json => writeln!(
                    res,
                    r#"{{"priority": {}, "payload": "{}"}}"#,
                    priority, payload
                )
                .unwrap(),
            }
        }
        res
    }
}

fn run_relay_with(args: &[&str], input: Vec<u8>) -> std::process::Output {
    let mut child = Command::new("target/release/prio-relay")
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::piped())
        .spawn()
        .expect("failed to execute child");

    {
        // limited borrow of stdin
        let stdin = child.stdin.as_mut().expect("failed to get stdin");
        stdin.write_all(&input).expect("failed to write to stdin");
    }

    let out = child.wait_with_output().expect("failed to wait on child");

    if !out.status.success() {
        eprintln!("stdout:");
        std::io::stderr().write_all(&out.stdout).unwrap();
        eprintln!("stderr:");
        std::io::stderr().write_all(&out.stderr).unwrap();
    }

    assert!(out.status.success());

    out
}

struct TestState {
    item_gen: ExampleItemGen,
    runs: u64,
}

impl TestState {
    fn new() -> Self {
        TestState {
            item_gen: ExampleItemGen::new(),
            runs: 0,
        }
    }

    fn random_format(&self) -> Format {
        if thread_rng().gen() {
            Format::Plain
        } else {
            Format::Json
        }
    }

    fn relay(
        &mut self,
        items: &[(i64, String)],
        extra_args: &[&str],
    ) -> Vec<String> {
        let format = self.random_format();
        let mut args = vec!["--format", format.arg()];
        args.extend_from_slice(extra_args);

        self.runs += 1;
        let out = run_relay_with(&args, format.encode(items));
        String::from_utf8(out.stdout)
            .expect("non-utf8 output")
            .lines()
            .map(|s| s.to_owned())
            .collect()
    }

    /// Everything goes in before anything comes out, so the output is
    /// sorted by priority
    fn batch_one(&mut self) {
        let count = thread_rng().gen_range(0..5000);
        let items = self.item_gen.gen(count);
        eprintln!("Batch of {} items", count);

        let priorities: HashMap<_, _> =
            items.iter().map(|&(p, ref s)| (s.clone(), p)).collect();
        let mut expected: Vec<i64> = items.iter().map(|&(p, _)| p).collect();
        expected.sort_by(|a, b| b.cmp(a));

        let out = self.relay(&items, &["--batch"]);
        let got: Vec<i64> = out.iter().map(|s| priorities[s]).collect();
        assert_eq!(got, expected);
    }

    /// Live relaying: only completeness can be checked
    fn live_one(&mut self) {
        let count = thread_rng().gen_range(0..5000);
        let items = self.item_gen.gen(count);
        let capacity = thread_rng().gen_range(0..4).to_string();
        eprintln!("Live run of {} items, emit capacity {}", count, capacity);

        let mut expected: Vec<String> =
            items.iter().map(|&(_, ref s)| s.clone()).collect();
        expected.sort();

        let mut out =
            self.relay(&items, &["--emit-capacity", capacity.as_str()]);
        out.sort();
        assert_eq!(out, expected);
    }
}

fn main() {
    let mut test = TestState::new();
    eprintln!("Ctrl+C to stop");
    loop {
        match thread_rng().gen_range(0..2) {
            0 => test.batch_one(),
            1 => test.live_one(),
            _ => panic!(),
        }
        if test.runs % 100 == 0 {
            eprintln!("{} runs passed", test.runs);
        }
    }
}
