//! Human-readable rendering of an [IRBuffer].
//!
//! Each node is printed on one line as its reference, its type, its opcode and its operands:
//!
//! ```text
//! ---- TRACE 0001 IR -----------
//! K001    i32 KINT     +5
//! 0000    ptr BASE     #0   #0
//! 0001    i32 ADD      K001 K001
//! ```
//!
//! Operands are printed as a reference, a `#`-prefixed immediate, a signed inline integer or a
//! hexadecimal pool constant. This format is relied upon by tests, so change it with care.

use super::{
    IRBuffer, IRRef, Operand,
    ty::{COL_BLUE, COL_PURPLE, COL_RESET},
};
use std::fmt::{self, Write};

/// The width the opcode name is padded to.
const OPCODE_WIDTH: usize = 8;

impl IRBuffer {
    /// Return an object that renders every node of this buffer under a header naming trace
    /// `trace_no`.
    pub fn display(&self, trace_no: usize) -> DisplayableIRBuffer<'_> {
        DisplayableIRBuffer {
            buf: self,
            trace_no,
            colour: false,
        }
    }

    /// Return an object that renders the node `iref` (without a trailing newline).
    pub fn display_node(&self, iref: IRRef) -> DisplayableNode<'_> {
        DisplayableNode {
            buf: self,
            iref,
            colour: false,
        }
    }
}

pub struct DisplayableIRBuffer<'a> {
    buf: &'a IRBuffer,
    trace_no: usize,
    colour: bool,
}

impl DisplayableIRBuffer<'_> {
    /// Should types and constants be wrapped in ANSI colour escapes?
    pub fn colour(mut self, colour: bool) -> Self {
        self.colour = colour;
        self
    }
}

impl fmt::Display for DisplayableIRBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---- TRACE {:04} IR -----------", self.trace_no)?;
        for (iref, _) in self.buf.iter() {
            let node = DisplayableNode {
                buf: self.buf,
                iref,
                colour: self.colour,
            };
            writeln!(f, "{node}")?;
        }
        Ok(())
    }
}

pub struct DisplayableNode<'a> {
    buf: &'a IRBuffer,
    iref: IRRef,
    colour: bool,
}

impl DisplayableNode<'_> {
    pub fn colour(mut self, colour: bool) -> Self {
        self.colour = colour;
        self
    }

    /// Return `code` if colour is enabled, or the empty string otherwise.
    fn col(&self, code: &'static str) -> &'static str {
        if self.colour { code } else { "" }
    }

    fn fmt_operand(&self, f: &mut impl fmt::Write, op: Operand) -> fmt::Result {
        match op {
            Operand::None => Ok(()),
            Operand::Ref(x) => write!(f, " {x}"),
            Operand::Lit(x) => write!(f, " #{x:<3}"),
            Operand::KInt(k) => {
                let sign = if k < 0 { '-' } else { '+' };
                write!(
                    f,
                    " {}{sign}{}{}",
                    self.col(COL_PURPLE),
                    k.unsigned_abs(),
                    self.col(COL_RESET)
                )
            }
            Operand::KWord(idx) => write!(
                f,
                " {}0x{:x}{}",
                self.col(COL_BLUE),
                self.buf.kword(idx),
                self.col(COL_RESET)
            ),
        }
    }
}

impl fmt::Display for DisplayableNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.buf.node(self.iref);
        let mut s = String::new();
        write!(
            s,
            "{}    {}{}{} {:<OPCODE_WIDTH$}",
            self.iref,
            self.col(node.ty().colour().ansi()),
            node.ty().name(),
            self.col(COL_RESET),
            node.opcode().name()
        )?;
        self.fmt_operand(&mut s, node.op1())?;
        self.fmt_operand(&mut s, node.op2())?;
        // Padding is only useful between columns.
        f.write_str(s.trim_end())
    }
}
