//! Signal numbers, names and exit-code conventions.
//!
//! The kernel understands the three classic termination signals. On the
//! wire a signal travels as its number, but callers (the `kill` command,
//! the shell) also address signals by name, so deserialization accepts
//! both forms.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A deliverable signal.
///
/// Default actions when no handler is registered:
/// - `Int` (2): mark the process cancelled, grant one grace slice, then
///   force-kill
/// - `Kill` (9): kill immediately
/// - `Term` (15): kill immediately
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// SIGINT: interactive interrupt (Ctrl+C).
    Int,
    /// SIGKILL: unconditional termination.
    Kill,
    /// SIGTERM: polite termination request.
    Term,
}

impl Signal {
    /// The conventional signal number.
    pub fn number(self) -> u8 {
        match self {
            Signal::Int => 2,
            Signal::Kill => 9,
            Signal::Term => 15,
        }
    }

    /// The exit code of a process terminated by this signal.
    pub fn exit_code(self) -> i32 {
        128 + i32::from(self.number())
    }

    /// The uppercase name including the SIG prefix.
    pub fn name(self) -> &'static str {
        match self {
            Signal::Int => "SIGINT",
            Signal::Kill => "SIGKILL",
            Signal::Term => "SIGTERM",
        }
    }

    /// Looks a signal up by number.
    pub fn from_number(n: u8) -> Option<Signal> {
        match n {
            2 => Some(Signal::Int),
            9 => Some(Signal::Kill),
            15 => Some(Signal::Term),
            _ => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Accepts `"SIGTERM"`, `"TERM"`, `"term"` or `"15"`.
impl FromStr for Signal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(n) = s.parse::<u8>() {
            return Signal::from_number(n).ok_or_else(|| format!("unknown signal number: {n}"));
        }
        let upper = s.to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" => Ok(Signal::Int),
            "KILL" => Ok(Signal::Kill),
            "TERM" => Ok(Signal::Term),
            _ => Err(format!("unknown signal: {s}")),
        }
    }
}

impl Serialize for Signal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Signal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u8),
            Name(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Signal::from_number(n)
                .ok_or_else(|| de::Error::custom(format!("unknown signal number: {n}"))),
            Repr::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}
