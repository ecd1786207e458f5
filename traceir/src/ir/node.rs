//! IR nodes.

use super::{IRRef, Mode, Opcode, Ty};

index_vec::define_index_type! {
    /// An index into an [super::IRBuffer]'s literal pool.
    pub struct KWordIdx = u32;
}

/// One operand slot of a [Node]. Which variants are valid for a slot is fixed by the node's
/// [Opcode::modes].
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Operand {
    None,
    /// A reference to an earlier node.
    Ref(IRRef),
    /// A small immediate (e.g. a stack slot number or a field offset).
    Lit(i32),
    /// An integer constant stored inline.
    KInt(i32),
    /// A wide constant stored in the literal pool.
    KWord(KWordIdx),
}

impl Operand {
    /// Can this operand occupy a slot of mode `mode` in a node of `opcode`? A `KINT` holds its
    /// value inline and a `KWORD` a literal pool index: neither accepts the other's encoding.
    pub fn fits(&self, opcode: Opcode, mode: Mode) -> bool {
        match (self, mode) {
            (Self::None, Mode::None)
            | (Self::Ref(_), Mode::Ref)
            | (Self::Lit(_), Mode::Lit) => true,
            (Self::KInt(_), Mode::Cst) => opcode == Opcode::KInt,
            (Self::KWord(_), Mode::Cst) => opcode == Opcode::KWord,
            _ => false,
        }
    }

    /// Return the reference this operand holds, if any.
    pub fn as_iref(&self) -> Option<IRRef> {
        match self {
            Self::Ref(x) => Some(*x),
            _ => None,
        }
    }

    /// The operand's payload as raw bits. Only meaningful when comparing operands of nodes with
    /// the same opcode, whose slots necessarily have the same modes.
    fn bits(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::Ref(x) => x.raw(),
            Self::Lit(x) | Self::KInt(x) => *x as u32,
            Self::KWord(x) => x.raw(),
        }
    }
}

/// A single recorded effect or value.
///
/// Nodes are immutable once they are in an [super::IRBuffer].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Node {
    opcode: Opcode,
    ty: Ty,
    op1: Operand,
    op2: Operand,
}

impl Node {
    /// The filler for unused slots of a backing store.
    pub(crate) const NOP: Node = Node {
        opcode: Opcode::Nop,
        ty: Ty::Void,
        op1: Operand::None,
        op2: Operand::None,
    };

    /// Create a new node.
    ///
    /// # Panics
    ///
    /// If either operand does not fit the corresponding mode of `opcode`.
    pub fn new(opcode: Opcode, ty: Ty, op1: Operand, op2: Operand) -> Self {
        let (m1, m2) = opcode.modes();
        assert!(
            op1.fits(opcode, m1) && op2.fits(opcode, m2),
            "{} takes ({m1:?}, {m2:?}) operands, not ({op1:?}, {op2:?})",
            opcode.name()
        );
        Self {
            opcode,
            ty,
            op1,
            op2,
        }
    }

    /// Create a node for a binary operation on two references.
    pub fn binop(opcode: Opcode, ty: Ty, lhs: IRRef, rhs: IRRef) -> Self {
        Self::new(opcode, ty, Operand::Ref(lhs), Operand::Ref(rhs))
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn op1(&self) -> Operand {
        self.op1
    }

    pub fn op2(&self) -> Operand {
        self.op2
    }

    /// Iterate over the references this node's operands hold.
    pub fn iter_refs(&self) -> impl Iterator<Item = IRRef> {
        [self.op1.as_iref(), self.op2.as_iref()].into_iter().flatten()
    }

    /// Pack both operands into a single key: two nodes with the same opcode have equal keys iff
    /// they have equal operands.
    pub(crate) fn op_key(&self) -> u64 {
        u64::from(self.op1.bits()) | (u64::from(self.op2.bits()) << 32)
    }

    pub(crate) fn swap_operands(&mut self) {
        debug_assert_eq!(self.opcode.modes().0, self.opcode.modes().1);
        std::mem::swap(&mut self.op1, &mut self.op2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::REF_BIAS;

    fn iref(x: u32) -> IRRef {
        IRRef::from_raw(REF_BIAS + x)
    }

    #[test]
    fn operand_modes() {
        assert!(Operand::None.fits(Opcode::Loop, Mode::None));
        assert!(Operand::Ref(iref(1)).fits(Opcode::Add, Mode::Ref));
        assert!(Operand::KWord(KWordIdx::from_usize(0)).fits(Opcode::KWord, Mode::Cst));
        assert!(Operand::KInt(-1).fits(Opcode::KInt, Mode::Cst));
        assert!(!Operand::KWord(KWordIdx::from_usize(0)).fits(Opcode::KInt, Mode::Cst));
        assert!(!Operand::KInt(3).fits(Opcode::KWord, Mode::Cst));
        assert!(!Operand::Lit(0).fits(Opcode::Add, Mode::Ref));
        assert!(!Operand::KInt(0).fits(Opcode::SLoad, Mode::Lit));
    }

    #[test]
    #[should_panic]
    fn kword_with_inline_value() {
        Node::new(Opcode::KWord, Ty::I64, Operand::KInt(3), Operand::None);
    }

    #[test]
    #[should_panic]
    fn kint_with_pool_index() {
        Node::new(
            Opcode::KInt,
            Ty::I32,
            Operand::KWord(KWordIdx::from_usize(0)),
            Operand::None,
        );
    }

    #[test]
    #[should_panic]
    fn wrong_operand() {
        Node::new(Opcode::Add, Ty::I32, Operand::Lit(1), Operand::Ref(iref(1)));
    }

    #[test]
    fn refs() {
        let n = Node::binop(Opcode::Add, Ty::I32, iref(1), iref(2));
        assert_eq!(n.iter_refs().collect::<Vec<_>>(), vec![iref(1), iref(2)]);
        let n = Node::new(Opcode::SLoad, Ty::I32, Operand::Lit(3), Operand::Lit(0));
        assert_eq!(n.iter_refs().count(), 0);
        let n = Node::new(Opcode::FLoad, Ty::I32, Operand::Ref(iref(4)), Operand::Lit(8));
        assert_eq!(n.iter_refs().collect::<Vec<_>>(), vec![iref(4)]);
    }

    #[test]
    fn op_key() {
        let a = Node::binop(Opcode::Add, Ty::I32, iref(1), iref(2));
        let b = Node::binop(Opcode::Add, Ty::I32, iref(2), iref(1));
        assert_ne!(a.op_key(), b.op_key());
        let mut c = b;
        c.swap_operands();
        assert_eq!(a.op_key(), c.op_key());
    }
}
