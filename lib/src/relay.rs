use crate::pending::Pending;
use crate::Item;
use crossbeam_channel::{Receiver, Select, SendError, Sender};
use slog::{Level, Logger};
use slog_perf::TimeReporter;

/// Whether the relay still listens to its intake
///
/// The only transition is `Intaking` -> `Draining`, taken once, when
/// the intake channel disconnects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Intaking,
    Draining,
}

/// Priority reordering buffer between an item producer and a payload
/// consumer
///
/// While intaking, the relay waits on both "item arrived" and "consumer
/// ready" and hands the consumer the best item it holds at that moment.
/// Once the intake disconnects it drains everything left in strict
/// priority order and then closes the emit channel by dropping it.
///
/// When a new item and the consumer are ready at the same time, which
/// one is served first is random. An item racing a delivery may or may
/// not be taken into account for it.
pub struct Relay {
    pending: Pending,
    mode: Mode,
    received: u64,
    emitted: u64,
    high_water: usize,
    log: Logger,
}

impl Relay {
    pub fn new<L>(log: L) -> Self
    where
        L: Into<Option<Logger>>,
    {
        let log = log
            .into()
            .unwrap_or_else(|| Logger::root(slog::Discard, o!()));

        Relay {
            pending: Pending::new(),
            mode: Mode::Intaking,
            received: 0,
            emitted: 0,
            high_water: 0,
            log: log,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of items received and not emitted yet
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Relay `intake` into `emit` until `intake` disconnects and
    /// everything received was emitted
    ///
    /// # Panics
    ///
    /// If the receiving side of `emit` goes away while there is still
    /// something to deliver.
    pub fn run(mut self, intake: Receiver<Item>, emit: Sender<String>) {
        let mut timer = TimeReporter::new_with_level(
            "reorder-relay",
            self.log.clone(),
            Level::Debug,
        );

        self.intake_loop(&intake, &emit, &mut timer);

        timer.start("drain");
        self.drain(&emit);
        drop(timer);

        info!(self.log, "relay finished";
              "received" => self.received,
              "emitted" => self.emitted,
              "high-water" => self.high_water);

        // closing `emit` is the completion signal
        drop(emit);
    }

    fn intake_loop(
        &mut self,
        intake: &Receiver<Item>,
        emit: &Sender<String>,
        timer: &mut TimeReporter,
    ) {
        while self.mode == Mode::Intaking {
            // nothing to offer the consumer: wait for intake alone
            if self.pending.is_empty() {
                timer.start("prime");
                match intake.recv() {
                    Ok(item) => self.accept(item),
                    Err(_) => {
                        self.finish_intake();
                        continue;
                    }
                }
            }

            timer.start("select");
            let mut sel = Select::new();
            let intake_op = sel.recv(intake);
            let emit_op = sel.send(emit);
            let oper = sel.select();

            match oper.index() {
                i if i == intake_op => match oper.recv(intake) {
                    Ok(item) => self.accept(item),
                    Err(_) => self.finish_intake(),
                },
                i if i == emit_op => {
                    // popped only after the send was selected, so a lost
                    // race never costs an item
                    let item = self
                        .pending
                        .pop()
                        .expect("relay selected a send with nothing pending");
                    trace!(self.log, "emitting"; "priority" => item.priority());
                    let res = oper.send(emit, item.into_payload());
                    self.delivered(res);
                }
                _ => unreachable!(),
            }
        }
    }

    fn drain(&mut self, emit: &Sender<String>) {
        assert_eq!(self.mode, Mode::Draining);

        while let Some(item) = self.pending.pop() {
            trace!(self.log, "draining"; "priority" => item.priority());
            let res = emit.send(item.into_payload());
            self.delivered(res);
        }
    }

    fn accept(&mut self, item: Item) {
        trace!(self.log, "received";
               "priority" => item.priority(),
               "pending" => self.pending.len());
        self.pending.insert(item);
        self.received += 1;
        if self.pending.len() > self.high_water {
            self.high_water = self.pending.len();
        }
    }

    fn delivered(&mut self, res: Result<(), SendError<String>>) {
        if res.is_err() {
            let undelivered = self.pending.len() + 1;
            crit!(self.log, "emit sink disconnected";
                  "undelivered" => undelivered,
                  "emitted" => self.emitted);
            panic!(
                "reorder relay: emit sink disconnected with {} item(s) \
                 undelivered",
                undelivered
            );
        }
        self.emitted += 1;
    }

    /// Switch to `Mode::Draining`
    ///
    /// Must happen exactly once.
    pub(crate) fn finish_intake(&mut self) {
        assert_eq!(
            self.mode,
            Mode::Intaking,
            "relay intake finished more than once"
        );
        debug!(self.log, "intake finished, draining";
               "pending" => self.pending.len(),
               "received" => self.received);
        self.mode = Mode::Draining;
    }
}
