//! The trace IR.
//!
//! A trace is recorded into an [IRBuffer] as a sequence of [Node]s. Nodes are referred to by
//! [IRRef]s, which are stable for the lifetime of the buffer: growing the buffer never changes a
//! reference. Constants and instructions share one reference space, split at [REF_BIAS], and are
//! kept in separate regions of one backing store.
//!
//! The buffer optimises as it goes: [IRBuffer::intern] deduplicates constants and
//! [IRBuffer::admit] performs common subexpression elimination on pure instructions. There is no
//! separate optimisation pass.
//!
//! IR can be rendered with [IRBuffer::display], e.g.:
//!
//! ```text
//! ---- TRACE 0003 IR -----------
//! K001    i32 KINT     +1
//! 0000    ptr BASE     #0   #0
//! 0001    i32 SLOAD    #0   #0
//! 0002    i32 ADD      0001 K001
//! ```

mod buffer;
mod display;
mod fold;
mod node;
mod opcode;
mod refs;
mod ty;
mod well_formed;

pub use buffer::IRBuffer;
pub use display::{DisplayableIRBuffer, DisplayableNode};
pub use node::{KWordIdx, Node, Operand};
pub use opcode::{Mode, OpKind, Opcode};
pub use refs::{IRRef, REF_BIAS, TRef};
pub(crate) use refs::Anchor;
pub use ty::{Ty, TyColour};
