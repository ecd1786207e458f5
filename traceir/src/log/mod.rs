//! The implementation of the `TRACEIR_LOG*` environment variables.
//!
//!   * `TRACEIR_LOG=[<path|->:]<level>` sets the [Verbosity] of event logging.
//!   * `TRACEIR_LOG_IR=[<path>:]<phase_1>[,...,<phase_n>]` prints the IR of traces in the given
//!     [IRPhase]s.
//!   * `TRACEIR_LOG_STATS=<path|->` writes per-session [stats::Stats] as JSON.

use std::{
    collections::HashSet, env, error::Error, fs::File, io::Write, path::PathBuf, sync::LazyLock,
};
use strum::{EnumCount, FromRepr};

pub mod stats;

/// How verbose should logging be?
#[repr(u8)]
#[derive(Copy, Clone, Debug, EnumCount, FromRepr, PartialEq, PartialOrd)]
pub enum Verbosity {
    /// Disable logging entirely.
    Disabled,
    /// Log errors.
    Error,
    /// Log warnings.
    Warning,
    /// Log trace recording events (e.g. a trace being finished or aborted).
    TraceEvent,
}

#[derive(Debug)]
pub struct Log {
    /// The requested [Verbosity] level for logging.
    level: Verbosity,
    /// The path to write to. `None` means stderr.
    path: Option<PathBuf>,
}

impl Log {
    /// Create a [Log] as specified by `TRACEIR_LOG`.
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::from_var(env::var("TRACEIR_LOG").ok().as_deref())
    }

    /// Create a [Log] from a `TRACEIR_LOG`-formatted string. `None` gives the default of logging
    /// errors to stderr.
    pub fn from_var(s: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(s) = s else {
            return Ok(Self {
                path: None,
                level: Verbosity::Error,
            });
        };
        let (path, level) = match s.split(':').collect::<Vec<_>>()[..] {
            [path, level] => {
                if path == "-" {
                    (None, level)
                } else {
                    let path = PathBuf::from(path);
                    // Truncate any existing log so that later appends don't add to a previous
                    // run's output.
                    File::create(&path).ok();
                    (Some(path), level)
                }
            }
            [level] => (None, level),
            [..] => return Err("TRACEIR_LOG must be of the format `[<path|->:]<level>`".into()),
        };
        let level = level
            .parse::<u8>()
            .map_err(|e| format!("Invalid TRACEIR_LOG level '{s}': {e}"))?;
        // This unwrap can only fail if `Verbosity` has more than 256 variants.
        let max_level = u8::try_from(Verbosity::COUNT).unwrap() - 1;
        let level = Verbosity::from_repr(level)
            .ok_or_else(|| format!("TRACEIR_LOG level {level} exceeds maximum {max_level}"))?;
        Ok(Self { path, level })
    }

    pub fn level(&self) -> Verbosity {
        self.level
    }

    /// Return the line `msg` would be logged as at `level`, or `None` if `level` is filtered out.
    ///
    /// # Panics
    ///
    /// If `level == Verbosity::Disabled`.
    fn format(&self, level: Verbosity, msg: &str) -> Option<String> {
        if level > self.level {
            return None;
        }
        let prefix = match level {
            Verbosity::Disabled => panic!(),
            Verbosity::Error => "traceir-error",
            Verbosity::Warning => "traceir-warning",
            Verbosity::TraceEvent => "traceir-trace-event",
        };
        Some(format!("{prefix}: {msg}"))
    }

    /// Log `msg` with the [Verbosity] level `level`.
    ///
    /// # Panics
    ///
    /// If `level == Verbosity::Disabled`.
    pub fn log(&self, level: Verbosity, msg: &str) {
        let Some(line) = self.format(level, msg) else {
            return;
        };
        match &self.path {
            Some(p) => {
                File::options()
                    .append(true)
                    .open(p)
                    .map(|mut x| x.write(format!("{line}\n").as_bytes()))
                    .ok();
            }
            None => eprintln!("{line}"),
        }
    }
}

/// The points in a recording session at which IR can be logged.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum IRPhase {
    /// A trace whose recording finished successfully.
    Recorded,
    /// A trace whose recording was abandoned.
    Aborted,
}

impl IRPhase {
    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s {
            "recorded" => Ok(Self::Recorded),
            "aborted" => Ok(Self::Aborted),
            _ => Err(format!("Invalid TRACEIR_LOG_IR value: {s}").into()),
        }
    }
}

/// Parse a `TRACEIR_LOG_IR`-formatted string into an output path (`-` for stderr) and the set of
/// phases to log.
fn parse_log_ir(s: &str) -> Result<(String, HashSet<IRPhase>), Box<dyn Error>> {
    let (path, phases) = match s.split(':').collect::<Vec<_>>()[..] {
        [path, phases] => (path, phases),
        [phases] => ("-", phases),
        _ => {
            return Err(
                "TRACEIR_LOG_IR must be of the format '[<path>:]<phase_1>[,...,<phase_n>]'".into(),
            );
        }
    };
    let phases = phases
        .split(',')
        .map(IRPhase::from_str)
        .collect::<Result<HashSet<_>, _>>()?;
    Ok((path.to_owned(), phases))
}

static LOG_IR: LazyLock<Option<(String, HashSet<IRPhase>)>> = LazyLock::new(|| {
    let x = env::var("TRACEIR_LOG_IR").ok()?;
    let (path, phases) = parse_log_ir(&x).unwrap_or_else(|e| panic!("{e}"));
    if path != "-" {
        // Truncate any existing log so that later appends don't add to a previous run's output.
        File::create(&path).ok();
    }
    Some((path, phases))
});

/// Should IR in `phase` be logged?
pub fn should_log_ir(phase: IRPhase) -> bool {
    LOG_IR
        .as_ref()
        .is_some_and(|(_, phases)| phases.contains(&phase))
}

/// Append the printed IR `s` to the `TRACEIR_LOG_IR` output.
pub fn log_ir(s: &str) {
    match LOG_IR.as_ref().map(|(p, _)| p.as_str()) {
        Some("-") => eprint!("{s}"),
        Some(x) => {
            File::options()
                .append(true)
                .open(x)
                .map(|mut x| x.write(s.as_bytes()))
                .ok();
        }
        None => (),
    }
}
