//! Items flowing through the relay

use serde::{Deserialize, Serialize};
use std::io;
use std::str::FromStr;

/// A priority-tagged payload
///
/// Greater `priority` is emitted first. Once built an `Item` is not
/// modified; the relay only moves it around and finally hands out
/// the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    priority: i64,
    payload: String,
}

impl Item {
    pub fn new<S: Into<String>>(priority: i64, payload: S) -> Self {
        Item {
            priority: priority,
            payload: payload.into(),
        }
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn into_payload(self) -> String {
        self.payload
    }
}

/// Parse `<priority> <payload>`
///
/// Everything after the whitespace following the priority is the
/// payload, so it may contain spaces or be empty.
impl FromStr for Item {
    type Err = io::Error;

    fn from_str(line: &str) -> io::Result<Self> {
        let line = line.trim_start();
        let (priority, payload) =
            line.split_once(char::is_whitespace).unwrap_or((line, ""));

        let priority = i64::from_str(priority).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid priority `{}`: {}", priority, e),
            )
        })?;

        Ok(Item::new(priority, payload))
    }
}
