//! Streaming priority reordering relay
//!
//! Sits between a producer of [`Item`]s and a consumer of their payloads,
//! both running at their own pace, and hands the consumer the highest
//! priority payload it holds whenever the consumer is ready. When the
//! producer is done, whatever is left is drained in priority order.
//!
//! With a rendezvous intake each `send` returns once the relay holds the
//! item, so both items below are buffered before the first read:
//!
//! ```
//! use prio_relay_lib::{settings, Item};
//! use slog::{o, Discard, Logger};
//!
//! let mut settings = settings::Relay::new();
//! settings.set_intake_capacity(Some(0)).unwrap();
//!
//! let log = Logger::root(Discard, o!());
//! let relay = prio_relay_lib::start(&settings, log).unwrap();
//! relay.intake.send(Item::new(1, "low")).unwrap();
//! relay.intake.send(Item::new(9, "high")).unwrap();
//! drop(relay.intake);
//!
//! let payloads: Vec<String> = relay.emit.iter().collect();
//! assert_eq!(payloads, ["high", "low"]);
//! relay.handle.join().unwrap();
//! ```
//!
//! With the default unbounded intake the relay may hand out `low` before
//! it gets to see `high`.

// {{{ extern crate ...
extern crate crossbeam_channel;
extern crate serde;
#[macro_use]
extern crate slog;
extern crate slog_perf;
// }}}

// {{{ use and mod
use crossbeam_channel::{Receiver, Sender};
use slog::Logger;
use std::io;
use std::thread;

mod item;
pub use item::Item;

mod pending;

mod relay;
pub use relay::{Mode, Relay};

pub mod settings;
// }}}

/// Handles to a relay started with [`start`]
///
/// Dropping `intake` is the "no more input" signal. `emit` disconnects
/// once everything was delivered.
pub struct Endpoints {
    pub intake: Sender<Item>,
    pub emit: Receiver<String>,
    pub handle: thread::JoinHandle<()>,
}

/// Run a relay on the current thread with logging disabled
pub fn run(intake: Receiver<Item>, emit: Sender<String>) {
    Relay::new(Logger::root(slog::Discard, o!())).run(intake, emit)
}

/// Run a relay on its own thread
pub fn spawn<L>(
    intake: Receiver<Item>,
    emit: Sender<String>,
    settings: &settings::Relay,
    log: L,
) -> io::Result<thread::JoinHandle<()>>
where
    L: Into<Option<Logger>>,
{
    let log = log
        .into()
        .unwrap_or_else(|| Logger::root(slog::Discard, o!()));
    let name = settings.thread_name.clone();
    let relay = Relay::new(log.new(o!("thread" => name.clone())));

    thread::Builder::new()
        .name(name)
        .spawn(move || relay.run(intake, emit))
}

/// Create the intake and emit channels and spawn a relay between them
///
/// Both capacities come from `settings`.
pub fn start<L>(settings: &settings::Relay, log: L) -> io::Result<Endpoints>
where
    L: Into<Option<Logger>>,
{
    let (intake_tx, intake_rx) = match settings.intake_capacity {
        Some(capacity) => crossbeam_channel::bounded(capacity),
        None => crossbeam_channel::unbounded(),
    };
    let (emit_tx, emit_rx) =
        crossbeam_channel::bounded(settings.emit_capacity);

    let handle = spawn(intake_rx, emit_tx, settings, log)?;

    Ok(Endpoints {
        intake: intake_tx,
        emit: emit_rx,
        handle: handle,
    })
}

#[cfg(test)]
mod tests;

// vim: foldmethod=marker foldmarker={{{,}}}
