//! Biased references into an [super::IRBuffer].
//!
//! A single number space is split in two at [REF_BIAS]: references strictly below the bias denote
//! constants, references at or above it denote instructions. Constants are allocated downwards
//! from the bias and instructions upwards, so both regions can grow without renumbering the
//! other.
//!
//! [Anchor] is the only place where a reference is turned into a position in a backing store:
//! nothing else in the crate does this arithmetic.

use super::Ty;
use crate::errors::RecordingError;
use std::{fmt, ops::Range};

/// The reference of the first instruction. Every reference below this is a constant.
pub const REF_BIAS: u32 = 0x8000_0000;

/// A biased reference to a node in an [super::IRBuffer].
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IRRef(u32);

impl IRRef {
    /// The reference of the implicit `BASE` instruction every buffer starts with.
    pub const BASE: IRRef = IRRef(REF_BIAS);

    pub(crate) fn from_raw(x: u32) -> Self {
        Self(x)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    /// Does this reference denote a constant?
    pub fn is_const(self) -> bool {
        self.0 < REF_BIAS
    }

    /// How far is this reference from the bias? Constants are numbered from 1 (the first constant
    /// interned is at distance 1), instructions from 0 (the `BASE` instruction).
    ///
    /// Within a region, distance grows strictly with creation order.
    pub fn distance(self) -> u32 {
        if self.is_const() {
            REF_BIAS - self.0
        } else {
            self.0 - REF_BIAS
        }
    }

    /// The reference one further from the bias on the constants side.
    pub(crate) fn next_const(self) -> Result<Self, RecordingError> {
        self.0
            .checked_sub(1)
            .map(Self)
            .ok_or_else(|| RecordingError::LimitExceeded("too many constants".to_owned()))
    }

    /// The reference one further from the bias on the instructions side.
    pub(crate) fn next_inst(self) -> Result<Self, RecordingError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| RecordingError::LimitExceeded("too many instructions".to_owned()))
    }
}

impl fmt::Display for IRRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const() {
            write!(f, "K{:03}", self.distance())
        } else {
            write!(f, "{:04}", self.distance())
        }
    }
}

/// A reference paired with the type of the value it produces. This is what the optimiser hands
/// back to the recorder.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct TRef {
    iref: IRRef,
    ty: Ty,
}

impl TRef {
    pub fn new(iref: IRRef, ty: Ty) -> Self {
        Self { iref, ty }
    }

    pub fn iref(&self) -> IRRef {
        self.iref
    }

    pub fn ty(&self) -> Ty {
        self.ty
    }

    pub fn is_const(&self) -> bool {
        self.iref.is_const()
    }
}

impl fmt::Display for TRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.iref, self.ty.name())
    }
}

/// Translates between biased references and positions in a backing store. The anchor is the
/// store position holding [REF_BIAS]: constants live to its left, instructions at and to its
/// right.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Anchor(usize);

impl Anchor {
    pub(crate) fn new(pos: usize) -> Self {
        Self(pos)
    }

    /// The store position of [REF_BIAS]. Equivalently: the number of constant slots to its left.
    pub(crate) fn pos(self) -> usize {
        self.0
    }

    /// The store position `iref` maps to, or `None` if that would lie left of the store. The
    /// result is not checked against the store's length.
    fn offset(self, iref: IRRef) -> Option<usize> {
        let d = usize::try_from(iref.distance()).ok()?;
        if iref.is_const() {
            self.0.checked_sub(d)
        } else {
            self.0.checked_add(d)
        }
    }

    /// The position of `iref` in a store of `len` nodes, or `None` if it falls outside.
    pub(crate) fn to_pos(self, iref: IRRef, len: usize) -> Option<usize> {
        self.offset(iref).filter(|x| *x < len)
    }

    /// The store positions spanned by the references `lo..hi`.
    ///
    /// # Panics
    ///
    /// If `lo` lies left of the store or `lo > hi`.
    pub(crate) fn span(self, lo: IRRef, hi: IRRef) -> Range<usize> {
        assert!(lo <= hi);
        let start = self.offset(lo).unwrap();
        start..start + usize::try_from(hi.raw() - lo.raw()).unwrap()
    }
}
