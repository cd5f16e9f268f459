//! Settings: options that user can pick

use std::io;

/// Largest channel capacity accepted
pub const MAX_CHANNEL_CAPACITY: usize = 64 * 1024;

pub const DEFAULT_THREAD_NAME: &str = "reorder-relay";

#[derive(Clone, Debug)]
pub struct Relay {
    pub(crate) intake_capacity: Option<usize>,
    pub(crate) emit_capacity: usize,
    pub(crate) thread_name: String,
}

impl Default for Relay {
    fn default() -> Self {
        Relay {
            intake_capacity: None,
            emit_capacity: 0,
            thread_name: DEFAULT_THREAD_NAME.into(),
        }
    }
}

impl Relay {
    pub fn new() -> Self {
        Default::default()
    }

    /// Capacity of the channel items are sent into
    ///
    /// `None` (the default) is unbounded. `Some(0)` makes sending an
    /// item return only once the relay took it into its buffer, so after
    /// the producer is done every item is known to the relay.
    pub fn set_intake_capacity(
        &mut self,
        capacity: Option<usize>,
    ) -> io::Result<()> {
        if let Some(capacity) = capacity {
            check_capacity(capacity)?;
        }
        self.intake_capacity = capacity;
        Ok(())
    }

    /// Capacity of the channel payloads are emitted into
    ///
    /// `0` (the default) makes it a rendezvous channel: a payload
    /// leaves the relay only when the consumer is receiving. Anything
    /// bigger lets up to `capacity` payloads be committed early, before
    /// a higher priority item had a chance to arrive.
    pub fn set_emit_capacity(&mut self, capacity: usize) -> io::Result<()> {
        check_capacity(capacity)?;
        self.emit_capacity = capacity;
        Ok(())
    }

    pub fn set_thread_name<S: Into<String>>(
        &mut self,
        name: S,
    ) -> io::Result<()> {
        let name = name.into();
        if name.is_empty() || name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "thread name must be non-empty and free of NUL bytes",
            ));
        }
        self.thread_name = name;
        Ok(())
    }

    pub fn intake_capacity(&self) -> Option<usize> {
        self.intake_capacity
    }

    pub fn emit_capacity(&self) -> usize {
        self.emit_capacity
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

fn check_capacity(capacity: usize) -> io::Result<()> {
    if capacity > MAX_CHANNEL_CAPACITY {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "channel capacity can't be greater than {}",
                MAX_CHANNEL_CAPACITY
            ),
        ));
    }
    Ok(())
}
