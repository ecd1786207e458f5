//! The IR construction core of a tracing JIT compiler.
//!
//! While the interpreter records a trace, each recorded effect is turned into an IR [ir::Node]
//! and handed to an [ir::IRBuffer], which stores it, interns constants and eliminates common
//! subexpressions as it goes. An [abs_stack::AbstractStack] tracks which IR value occupies each
//! interpreter stack slot. [recorder::TraceRecorder] ties the two together for one recording
//! session.

pub mod abs_stack;
pub mod config;
pub mod errors;
pub mod ir;
pub mod log;
pub mod recorder;

pub use errors::RecordingError;
