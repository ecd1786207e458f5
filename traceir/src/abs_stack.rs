//! The abstract stack.
//!
//! While a trace is being recorded, the abstract stack tracks which IR value currently occupies
//! each of the interpreter's stack slots. It is a fixed-capacity array viewed through a window
//! `[base, top)` that moves as the recorded code calls and returns: interpreter frame pointers are
//! translated into array positions relative to where the interpreter's stack pointer was when
//! recording started. The array is never reallocated.
//!
//! Slots are addressed relative to the current window's base. Slots below the base (e.g. a
//! frame's header) can also be addressed, down to the bottom of the array.

use crate::{errors::RecordingError, ir::TRef};
use index_vec::IndexVec;

/// The default number of slots.
pub const DEFAULT_SLOTS: usize = 1024;
/// The smallest abstract stack we will create.
const MIN_SLOTS: usize = 8;

index_vec::define_index_type! {
    /// An absolute position in the abstract stack's array.
    pub struct SlotIdx = u32;
}

#[derive(Debug)]
pub struct AbstractStack {
    slots: IndexVec<SlotIdx, Option<TRef>>,
    /// The interpreter's base pointer (in words) when recording started.
    orig_base: usize,
    /// The array position that `orig_base` maps to.
    initial_base: usize,
    base: usize,
    top: usize,
    /// The lowest position touched so far.
    low: usize,
    /// One past the highest position touched so far.
    high: usize,
}

impl AbstractStack {
    /// Create an abstract stack with [DEFAULT_SLOTS] slots for a trace that starts in the frame
    /// `[base, top)` (in interpreter words).
    pub fn new(base: usize, top: usize) -> Result<Self, RecordingError> {
        Self::with_capacity(DEFAULT_SLOTS, base, top)
    }

    /// Create an abstract stack with `capacity` slots for a trace that starts in the frame
    /// `[base, top)`. The initial frame starts a quarter of the way into the array so that the
    /// trace can return into its callers.
    pub fn with_capacity(capacity: usize, base: usize, top: usize) -> Result<Self, RecordingError> {
        let capacity = capacity.max(MIN_SLOTS);
        if capacity > SlotIdx::MAX_INDEX {
            return Err(RecordingError::LimitExceeded(format!(
                "abstract stack of {capacity} slots"
            )));
        }
        let initial_base = capacity / 4;
        let mut s = Self {
            slots: IndexVec::from_vec(vec![None; capacity]),
            orig_base: base,
            initial_base,
            base: initial_base,
            top: initial_base,
            low: initial_base,
            high: initial_base,
        };
        let (base, top) = s
            .window(base, top)
            .ok_or(RecordingError::FrameOutOfRange { base, top })?;
        s.base = base;
        s.top = top;
        s.high = top;
        Ok(s)
    }

    /// Move the window to the interpreter frame `[base, top)`. Returns `false`, leaving the
    /// abstract stack unchanged, if the frame does not fit in the array.
    pub fn set_frame(&mut self, base: usize, top: usize) -> bool {
        match self.window(base, top) {
            Some((base, top)) => {
                self.base = base;
                self.top = top;
                self.low = self.low.min(base);
                self.high = self.high.max(top);
                true
            }
            None => false,
        }
    }

    /// Translate the interpreter frame `[base, top)` into array positions.
    fn window(&self, base: usize, top: usize) -> Option<(usize, usize)> {
        let size = top.checked_sub(base)?;
        let nbase = if base >= self.orig_base {
            self.initial_base.checked_add(base - self.orig_base)?
        } else {
            self.initial_base.checked_sub(self.orig_base - base)?
        };
        // Position 0 is never part of a frame.
        if nbase == 0 {
            return None;
        }
        let ntop = nbase.checked_add(size)?;
        (ntop < self.slots.len()).then_some((nbase, ntop))
    }

    /// Translate the slot `n`, relative to the current base, into an array position.
    ///
    /// # Panics
    ///
    /// If the slot is outside `[0, top)`.
    fn pos(&self, n: i32) -> SlotIdx {
        let pos = isize::try_from(self.base)
            .ok()
            .and_then(|b| b.checked_add(isize::try_from(n).ok()?))
            .and_then(|x| usize::try_from(x).ok());
        match pos {
            Some(x) if x < self.top => SlotIdx::from_usize(x),
            _ => panic!(
                "Slot {n} is outside the frame [{}, {})",
                self.base, self.top
            ),
        }
    }

    /// The value in slot `n`, if it has been read or written during this trace.
    ///
    /// # Panics
    ///
    /// If the slot is outside the array or above the current frame.
    pub fn get(&self, n: i32) -> Option<TRef> {
        self.slots[self.pos(n)]
    }

    /// Record that slot `n` now holds `tref`.
    ///
    /// # Panics
    ///
    /// If the slot is outside the array or above the current frame.
    pub fn set(&mut self, n: i32, tref: TRef) {
        let pos = self.pos(n);
        self.slots[pos] = Some(tref);
        self.low = self.low.min(pos.index());
        self.high = self.high.max(pos.index() + 1);
    }

    /// Translate slot `n`, relative to the current base, into a slot relative to the base of the
    /// frame in which recording started. This is how stack loads and snapshots name slots.
    pub fn entry_relative(&self, n: i32) -> i32 {
        let pos = self.pos(n).index();
        // The `unwrap`s can't fail: positions are bounded by a `SlotIdx`.
        i32::try_from(pos).unwrap() - i32::try_from(self.initial_base).unwrap()
    }

    /// Iterate over every slot holding a value, relative to the current base, lowest first.
    pub fn iter_written(&self) -> impl Iterator<Item = (i32, TRef)> + '_ {
        (self.low..self.high).filter_map(|x| {
            self.slots[SlotIdx::from_usize(x)].map(|tref| {
                // The `unwrap`s can't fail: positions are bounded by a `SlotIdx`.
                let n = i32::try_from(x).unwrap() - i32::try_from(self.base).unwrap();
                (n, tref)
            })
        })
    }

    /// How many slots does this abstract stack have?
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The array position of the current frame's base.
    pub fn base(&self) -> usize {
        self.base
    }

    /// One past the array position of the current frame's last slot.
    pub fn top(&self) -> usize {
        self.top
    }

    /// The extent of positions touched by frames or writes so far.
    pub fn extent(&self) -> (usize, usize) {
        (self.low, self.high)
    }
}
