use std::error::Error;
use thiserror::Error;

/// A failure to record a trace into IR.
///
/// None of these errors are fatal to the VM: the trace recorder abandons the current recording
/// session and the interpreter carries on.
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Limit exceeded: {0}")]
    /// A limit was exceeded (e.g. more constants than a biased reference can address). Most, if
    /// not all, of these indicate a pathologically long trace.
    LimitExceeded(String),
    #[error("Resource exhausted: {0}")]
    /// Growing the IR buffer failed because memory could not be allocated. Nothing from the
    /// current session can be salvaged.
    ResourceExhausted(Box<dyn Error>),
    #[error("Frame [{base}, {top}) does not fit in the abstract stack")]
    /// A call or return moved the frame outside of the abstract stack's capacity.
    FrameOutOfRange { base: usize, top: usize },
    #[error("Invalid configuration: {0}")]
    /// A `TRACEIR_*` environment variable could not be parsed.
    InvalidConfig(String),
}
