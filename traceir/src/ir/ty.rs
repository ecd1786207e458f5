//! IR value types.

use strum::{EnumCount, EnumIter};

/// The type of the value an IR node produces.
#[repr(u8)]
#[derive(Copy, Clone, Debug, EnumCount, EnumIter, Eq, Hash, PartialEq)]
pub enum Ty {
    /// A value whose type the recorder could not (yet) determine.
    Unknown,
    /// No value: stores, frames and the like.
    Void,
    I32,
    I64,
    F64,
    /// A character.
    Chr,
    /// A raw pointer that the garbage collector does not trace (e.g. the trace's base pointer).
    Ptr,
    /// A pointer to an info table.
    Info,
    /// A pointer to a heap closure.
    Clos,
    /// A pointer to a partial application.
    Pap,
}

/// The display class of a [Ty].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TyColour {
    None,
    Prim,
    Heap,
    Grey,
}

pub(crate) const COL_RESET: &str = "\x1b[0m";
pub(crate) const COL_PURPLE: &str = "\x1b[35m";
pub(crate) const COL_RED: &str = "\x1b[31m";
pub(crate) const COL_GREY: &str = "\x1b[90m";
pub(crate) const COL_BLUE: &str = "\x1b[34m";

impl TyColour {
    /// The ANSI escape sequence used to render values of this class.
    pub(crate) fn ansi(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Prim => COL_PURPLE,
            Self::Heap => COL_RED,
            Self::Grey => COL_GREY,
        }
    }
}

impl Ty {
    /// The name used for this type in printed IR.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unk",
            Self::Void => "void",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::Chr => "chr",
            Self::Ptr => "ptr",
            Self::Info => "inf",
            Self::Clos => "cls",
            Self::Pap => "pap",
        }
    }

    pub fn colour(self) -> TyColour {
        match self {
            Self::Unknown => TyColour::Grey,
            Self::Void | Self::Ptr => TyColour::None,
            Self::I32 | Self::I64 | Self::F64 | Self::Chr => TyColour::Prim,
            Self::Info | Self::Clos | Self::Pap => TyColour::Heap,
        }
    }

    /// Is a value of this type a pointer into the managed heap?
    pub fn is_heap(self) -> bool {
        self.colour() == TyColour::Heap
    }

    /// Is a value of this type an unboxed primitive?
    pub fn is_primitive(self) -> bool {
        self.colour() == TyColour::Prim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn names_unique() {
        let names = Ty::iter().map(Ty::name).collect::<HashSet<_>>();
        assert_eq!(names.len(), Ty::COUNT);
    }

    #[test]
    fn classes() {
        assert!(Ty::Clos.is_heap());
        assert!(!Ty::Clos.is_primitive());
        assert!(Ty::I64.is_primitive());
        assert!(!Ty::Ptr.is_heap());
        assert!(!Ty::Ptr.is_primitive());
        assert_eq!(Ty::Unknown.colour(), TyColour::Grey);
        assert_eq!(TyColour::None.ansi(), "");
    }
}
