//! The admission policy: literal interning and common subexpression elimination.
//!
//! Both are performed as nodes are recorded rather than as a later pass. Interning and CSE share
//! the same trick: every node is linked into a chain of nodes with the same opcode, so we only
//! ever compare a new node against nodes that could plausibly be equal to it.
//!
//! CSE also uses a node's operands to work out when it has gone implausibly far back. If we're
//! checking `ADD 0102 0105`, no `ADD` created before `0105` can match, so the search stops there.
//! This relies on the buffer being append-only.

use super::{IRBuffer, Node, OpKind, Opcode, Operand, TRef, Ty, buffer::inline_literal};
use crate::{errors::RecordingError, log::stats::Stat};

impl IRBuffer {
    /// Return a reference to the constant `lit` of type `ty`, creating it if it has not been seen
    /// before in this buffer. Constants are equal only if both their type and value are equal.
    ///
    /// Values that fit in an `i32` are stored inline in a `KINT`; anything else is put in the
    /// literal pool and referenced from a `KWORD`.
    pub fn intern(&mut self, ty: Ty, lit: u64) -> Result<TRef, RecordingError> {
        let found = match inline_literal(lit) {
            Some(k) => self
                .chain(Opcode::KInt)
                .iter()
                .rev()
                .copied()
                .find(|x| {
                    let n = self.node(*x);
                    n.ty() == ty && n.op1() == Operand::KInt(k)
                }),
            None => self
                .chain(Opcode::KWord)
                .iter()
                .rev()
                .copied()
                .find(|x| {
                    let n = self.node(*x);
                    n.ty() == ty
                        && matches!(n.op1(), Operand::KWord(idx) if self.kword(idx) == lit)
                }),
        };
        if let Some(iref) = found {
            self.stats.incr(Stat::InternHit);
            return Ok(TRef::new(iref, ty));
        }
        let iref = self.append_literal(ty, lit)?;
        Ok(TRef::new(iref, ty))
    }

    /// Intern the 32-bit integer `k`.
    pub fn kint(&mut self, k: i32) -> Result<TRef, RecordingError> {
        self.intern(Ty::I32, i64::from(k) as u64)
    }

    /// Add `node` to the trace, returning either a reference to a new instruction or to an
    /// existing one that is known to be equivalent.
    ///
    /// Stack loads are never merged: without alias analysis, two loads of the same slot may
    /// observe different values. Other loads, stores and allocations are always appended. Pure
    /// operations are subject to CSE.
    ///
    /// # Panics
    ///
    /// If `node` is a constant (use [Self::intern]) or refers to a node that does not exist.
    pub fn admit(&mut self, node: Node) -> Result<TRef, RecordingError> {
        assert!(
            !node.opcode().is_constant(),
            "constants must be added with `intern`"
        );
        if node.opcode() == Opcode::SLoad {
            self.emit(node)
        } else if node.opcode().kind().is_pure() && self.cse {
            self.cse(node)
        } else {
            self.emit(node)
        }
    }

    /// Append `node` without trying to optimise it.
    fn emit(&mut self, node: Node) -> Result<TRef, RecordingError> {
        let iref = self.append_instruction(node)?;
        Ok(TRef::new(iref, node.ty()))
    }

    fn cse(&mut self, mut node: Node) -> Result<TRef, RecordingError> {
        // Favour constants on the right-hand side of commutative operations so that `ADD K x` and
        // `ADD x K` are found to be equivalent.
        if node.opcode().kind() == OpKind::Commutative
            && let (Operand::Ref(lhs), Operand::Ref(rhs)) = (node.op1(), node.op2())
            && lhs.is_const()
            && !rhs.is_const()
        {
            node.swap_operands();
        }

        let key = node.op_key();
        let lim = node.iter_refs().max();
        let hit = self
            .chain(node.opcode())
            .iter()
            .rev()
            .copied()
            .take_while(|x| lim.is_none_or(|lim| *x > lim))
            .find(|x| self.node(*x).op_key() == key);
        if let Some(iref) = hit {
            self.stats.incr(Stat::CseHit);
            return Ok(TRef::new(iref, self.node(iref).ty()));
        }
        self.emit(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IRRef;

    fn buf() -> IRBuffer {
        IRBuffer::new(64).unwrap()
    }

    fn sload(buf: &mut IRBuffer, slot: i32) -> TRef {
        buf.admit(Node::new(
            Opcode::SLoad,
            Ty::I32,
            Operand::Lit(slot),
            Operand::Lit(0),
        ))
        .unwrap()
    }

    #[test]
    fn intern_idempotent() {
        let mut buf = buf();
        for lit in [0, 5, u64::MAX, 1 << 40, 0x8000_0000, i64::from(i32::MIN) as u64] {
            for ty in [Ty::I32, Ty::I64, Ty::Ptr] {
                let a = buf.intern(ty, lit).unwrap();
                let b = buf.intern(ty, lit).unwrap();
                assert_eq!(a, b);
                assert!(a.is_const());
                assert_eq!(a.ty(), ty);
            }
        }
        assert_eq!(buf.stats().get(Stat::InternHit), 18);
        assert_eq!(buf.consts_len(), 18);
    }

    #[test]
    fn intern_type_discrimination() {
        let mut buf = buf();
        let a = buf.intern(Ty::I32, 5).unwrap();
        let b = buf.intern(Ty::I64, 5).unwrap();
        assert_ne!(a.iref(), b.iref());
        let c = buf.intern(Ty::I64, 1 << 40).unwrap();
        let d = buf.intern(Ty::Ptr, 1 << 40).unwrap();
        assert_ne!(c.iref(), d.iref());
        assert_eq!(buf.intern(Ty::I32, 5).unwrap(), a);
        assert_eq!(buf.intern(Ty::Ptr, 1 << 40).unwrap(), d);
    }

    #[test]
    fn intern_encoding() {
        let mut buf = buf();
        let a = buf.kint(-3).unwrap();
        assert_eq!(buf.node(a.iref()).opcode(), Opcode::KInt);
        assert_eq!(buf.node(a.iref()).op1(), Operand::KInt(-3));
        // Not representable as an `i32`.
        let b = buf.intern(Ty::I64, 0x1_0000_0000).unwrap();
        let n = *buf.node(b.iref());
        assert_eq!(n.opcode(), Opcode::KWord);
        let Operand::KWord(idx) = n.op1() else {
            panic!()
        };
        assert_eq!(buf.kword(idx), 0x1_0000_0000);
        // Pool indices are stable across further wide constants.
        let c = buf.intern(Ty::I64, 0x2_0000_0000).unwrap();
        assert_ne!(b, c);
        assert_eq!(buf.kword(idx), 0x1_0000_0000);
    }

    #[test]
    fn cse() {
        let mut buf = buf();
        let x = sload(&mut buf, 0);
        let y = sload(&mut buf, 1);
        let a = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), y.iref()))
            .unwrap();
        let b = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), y.iref()))
            .unwrap();
        assert_eq!(a, b);
        // Different opcodes never match.
        let c = buf
            .admit(Node::binop(Opcode::Sub, Ty::I32, x.iref(), y.iref()))
            .unwrap();
        assert_ne!(a, c);
        // Nor do different operand orders for non-commutative opcodes.
        let d = buf
            .admit(Node::binop(Opcode::Sub, Ty::I32, y.iref(), x.iref()))
            .unwrap();
        assert_ne!(c, d);
        assert_eq!(buf.stats().get(Stat::CseHit), 1);
    }

    #[test]
    fn cse_across_intermediate_instructions() {
        let mut buf = buf();
        let x = sload(&mut buf, 0);
        let a = buf
            .admit(Node::new(
                Opcode::Neg,
                Ty::I32,
                Operand::Ref(x.iref()),
                Operand::None,
            ))
            .unwrap();
        let k = buf.kint(2).unwrap();
        buf.admit(Node::binop(Opcode::Mul, Ty::I32, a.iref(), k.iref()))
            .unwrap();
        sload(&mut buf, 1);
        let b = buf
            .admit(Node::new(
                Opcode::Neg,
                Ty::I32,
                Operand::Ref(x.iref()),
                Operand::None,
            ))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cse_commutative_constant() {
        let mut buf = buf();
        let x = sload(&mut buf, 0);
        let k = buf.kint(1).unwrap();
        let a = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, k.iref(), x.iref()))
            .unwrap();
        assert_eq!(buf.node(a.iref()).op1(), Operand::Ref(x.iref()));
        let b = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), k.iref()))
            .unwrap();
        assert_eq!(a, b);
        // `SUB` is not commutative, so its operands are left alone.
        let c = buf
            .admit(Node::binop(Opcode::Sub, Ty::I32, k.iref(), x.iref()))
            .unwrap();
        assert_eq!(buf.node(c.iref()).op1(), Operand::Ref(k.iref()));
    }

    #[test]
    fn cse_constant_operands() {
        let mut buf = buf();
        let k = buf.kint(5).unwrap();
        let a = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, k.iref(), k.iref()))
            .unwrap();
        let b = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, k.iref(), k.iref()))
            .unwrap();
        assert_eq!(a, b);
        assert!(!a.is_const());
    }

    #[test]
    fn cse_disabled() {
        let mut buf = buf();
        buf.set_cse(false);
        let x = sload(&mut buf, 0);
        let a = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), x.iref()))
            .unwrap();
        let b = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), x.iref()))
            .unwrap();
        assert_ne!(a, b);
        // Interning is not affected.
        assert_eq!(buf.kint(1).unwrap(), buf.kint(1).unwrap());
    }

    #[test]
    fn loads_not_merged() {
        let mut buf = buf();
        let a = sload(&mut buf, 0);
        let b = sload(&mut buf, 0);
        assert_ne!(a, b);
        let p = buf.intern(Ty::Ptr, 0x1000).unwrap();
        let f1 = buf
            .admit(Node::new(
                Opcode::FLoad,
                Ty::I32,
                Operand::Ref(p.iref()),
                Operand::Lit(1),
            ))
            .unwrap();
        let f2 = buf
            .admit(Node::new(
                Opcode::FLoad,
                Ty::I32,
                Operand::Ref(p.iref()),
                Operand::Lit(1),
            ))
            .unwrap();
        assert_ne!(f1, f2);
    }

    #[test]
    fn effects_not_merged() {
        let mut buf = buf();
        let x = sload(&mut buf, 0);
        let info = buf.intern(Ty::Info, 0x4000).unwrap();
        let n1 = buf
            .admit(Node::new(
                Opcode::New,
                Ty::Clos,
                Operand::Ref(info.iref()),
                Operand::Lit(2),
            ))
            .unwrap();
        let n2 = buf
            .admit(Node::new(
                Opcode::New,
                Ty::Clos,
                Operand::Ref(info.iref()),
                Operand::Lit(2),
            ))
            .unwrap();
        assert_ne!(n1, n2);
        let u1 = buf
            .admit(Node::binop(Opcode::Update, Ty::Void, n1.iref(), x.iref()))
            .unwrap();
        let u2 = buf
            .admit(Node::binop(Opcode::Update, Ty::Void, n1.iref(), x.iref()))
            .unwrap();
        assert_ne!(u1, u2);
    }

    #[test]
    fn growth_transparency() {
        let mut buf = IRBuffer::new(8).unwrap();
        let x = sload(&mut buf, 0);
        let k = buf.kint(9).unwrap();
        let a = buf
            .admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), k.iref()))
            .unwrap();
        let before = *buf.node(a.iref());
        let cap = buf.capacity();
        let mut prev = a;
        for i in 0..200 {
            let k = buf.kint(i).unwrap();
            prev = buf
                .admit(Node::binop(Opcode::Add, Ty::I32, prev.iref(), k.iref()))
                .unwrap();
        }
        assert!(buf.capacity() > cap);
        assert_eq!(*buf.node(a.iref()), before);
        assert_eq!(buf.node(k.iref()).op1(), Operand::KInt(9));
        // Interning and CSE still see pre-growth nodes.
        assert_eq!(buf.kint(9).unwrap(), k);
        assert_eq!(
            buf.admit(Node::binop(Opcode::Add, Ty::I32, x.iref(), k.iref()))
                .unwrap(),
            a
        );
    }

    #[test]
    #[should_panic]
    fn admit_constant() {
        let mut buf = buf();
        buf.admit(Node::new(
            Opcode::KInt,
            Ty::I32,
            Operand::KInt(1),
            Operand::None,
        ))
        .ok();
    }

    #[test]
    fn base_is_first() {
        let mut buf = buf();
        let x = sload(&mut buf, 0);
        assert_eq!(x.iref().distance(), 1);
        assert_eq!(buf.node(IRRef::BASE).opcode(), Opcode::Base);
    }
}
