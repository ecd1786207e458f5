//! The implementation of the `TRACEIR_*` tuning environment variables.
//!
//!   * `TRACEIR_OPT=<0|1>`: `0` disables common subexpression elimination. Literals are always
//!     interned.
//!   * `TRACEIR_IRBUF_SIZE=<n>`: the initial number of nodes an IR buffer has room for.
//!   * `TRACEIR_ABS_STACK_SLOTS=<n>`: the number of slots in the abstract stack.
//!   * `TRACEIR_COLOUR=<0|1>`: `1` makes printed IR use ANSI colours.
//!
//! The logging variables are handled separately by [crate::log].

use crate::{abs_stack::DEFAULT_SLOTS, errors::RecordingError};
use std::env;

/// The default initial capacity of an IR buffer.
pub const DEFAULT_IRBUF_SIZE: usize = 1024;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Perform common subexpression elimination on pure instructions?
    pub cse: bool,
    pub irbuf_size: usize,
    pub abs_stack_slots: usize,
    /// Should printed IR be coloured?
    pub colour: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cse: true,
            irbuf_size: DEFAULT_IRBUF_SIZE,
            abs_stack_slots: DEFAULT_SLOTS,
            colour: false,
        }
    }
}

impl Config {
    /// Create a [Config] from the process's environment.
    pub fn from_env() -> Result<Self, RecordingError> {
        Self::from_vars(|k| env::var(k).ok())
    }

    /// Create a [Config] from the variables `lookup` returns. Variables that `lookup` returns `None`
    /// for take their default value.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RecordingError> {
        let mut c = Self::default();
        if let Some(x) = lookup("TRACEIR_OPT") {
            c.cse = parse_bool("TRACEIR_OPT", &x)?;
        }
        if let Some(x) = lookup("TRACEIR_IRBUF_SIZE") {
            c.irbuf_size = parse_usize("TRACEIR_IRBUF_SIZE", &x)?;
        }
        if let Some(x) = lookup("TRACEIR_ABS_STACK_SLOTS") {
            c.abs_stack_slots = parse_usize("TRACEIR_ABS_STACK_SLOTS", &x)?;
        }
        if let Some(x) = lookup("TRACEIR_COLOUR") {
            c.colour = parse_bool("TRACEIR_COLOUR", &x)?;
        }
        Ok(c)
    }
}

fn parse_bool(var: &str, s: &str) -> Result<bool, RecordingError> {
    match s {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(RecordingError::InvalidConfig(format!(
            "{var} must be 0 or 1, not '{s}'"
        ))),
    }
}

fn parse_usize(var: &str, s: &str) -> Result<usize, RecordingError> {
    s.parse::<usize>()
        .map_err(|e| RecordingError::InvalidConfig(format!("Invalid {var} value '{s}': {e}")))
}
