//! The static opcode table.
//!
//! Every opcode has a display name, an [OpKind] and two operand [Mode]s. The table is generated
//! by [ir_opcodes] so that all three stay in sync with the [Opcode] enum.

use strum::{EnumCount, EnumIter};

/// How an operand slot of a node is interpreted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    /// A reference to an earlier node.
    Ref,
    /// A small immediate stored directly in the node.
    Lit,
    /// The node's constant value: an inline integer or an index into the literal pool.
    Cst,
    /// The slot is unused.
    None,
}

/// The category of an opcode, consulted by the optimiser.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OpKind {
    /// A pure value computation.
    Normal,
    /// A pure value computation whose operands can be swapped.
    Commutative,
    /// Reads mutable state.
    Load,
    /// Writes mutable state or otherwise has an effect.
    Store,
    /// Allocates.
    Alloc,
}

impl OpKind {
    /// Can a node of this kind be replaced with an earlier node with equal operands?
    pub fn is_pure(self) -> bool {
        matches!(self, Self::Normal | Self::Commutative)
    }
}

// Generate [Opcode] and its metadata accessors from a single table. Each row is
// `Variant, "NAME", kind, mode1, mode2;`.
macro_rules! ir_opcodes {
    ($($variant:ident, $name:literal, $kind:ident, $m1:ident, $m2:ident;)*) => {
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, EnumCount, EnumIter, Eq, Hash, PartialEq)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// The name used for this opcode in printed IR.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            pub fn kind(self) -> OpKind {
                match self {
                    $(Self::$variant => OpKind::$kind,)*
                }
            }

            /// The modes of the first and second operand slots.
            pub fn modes(self) -> (Mode, Mode) {
                match self {
                    $(Self::$variant => (Mode::$m1, Mode::$m2),)*
                }
            }
        }
    };
}

ir_opcodes! {
    // Guards.
    Lt, "LT", Normal, Ref, Ref;
    Ge, "GE", Normal, Ref, Ref;
    Le, "LE", Normal, Ref, Ref;
    Gt, "GT", Normal, Ref, Ref;
    Eq, "EQ", Commutative, Ref, Ref;
    Ne, "NE", Commutative, Ref, Ref;
    // Trace structure.
    Nop, "NOP", Normal, None, None;
    Base, "BASE", Normal, Lit, Lit;
    Frame, "FRAME", Store, Lit, Lit;
    Ret, "RET", Store, Ref, Ref;
    Loop, "LOOP", Store, None, None;
    Phi, "PHI", Store, Ref, Ref;
    // Constants.
    KInt, "KINT", Normal, Cst, None;
    KWord, "KWORD", Normal, Cst, None;
    // Arithmetic.
    Add, "ADD", Commutative, Ref, Ref;
    Sub, "SUB", Normal, Ref, Ref;
    Mul, "MUL", Commutative, Ref, Ref;
    Div, "DIV", Normal, Ref, Ref;
    Rem, "REM", Normal, Ref, Ref;
    Neg, "NEG", Normal, Ref, None;
    // Memory.
    SLoad, "SLOAD", Load, Lit, Lit;
    ILoad, "ILOAD", Load, Ref, None;
    FLoad, "FLOAD", Load, Ref, Lit;
    New, "NEW", Alloc, Ref, Lit;
    Update, "UPDATE", Store, Ref, Ref;
    Save, "SAVE", Store, Lit, None;
}

// Chains are indexed by `Opcode as usize` and opcodes are stored as a byte.
static_assertions::const_assert!(Opcode::COUNT <= 256);

impl Opcode {
    /// Does this opcode produce a constant (and thus live in the constants region)?
    pub fn is_constant(self) -> bool {
        matches!(self, Self::KInt | Self::KWord)
    }
}
