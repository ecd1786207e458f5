//! The IR buffer: storage, biasing and growth.

use super::{Anchor, IRRef, KWordIdx, Node, Opcode, Operand, REF_BIAS, Ty};
use crate::{
    errors::RecordingError,
    log::stats::{Stat, Stats},
};
use index_vec::IndexVec;
use strum::EnumCount;

/// The smallest backing store we will create.
const MIN_CAPACITY: usize = 8;

/// Which side of the anchor ran out of space.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Region {
    Constants,
    Instructions,
}

/// The IR of one trace being recorded.
///
/// All nodes live in a single backing store. Constants are placed to the left of the anchor,
/// instructions at and to the right of it: a node's [IRRef] is its (biased) distance from the
/// anchor. When either side runs out of space the store is reallocated, but references are
/// unaffected, so they can be held across any operation. `&Node`s cannot: the borrow checker
/// stops them living across a call that might grow the store.
///
/// Every node is also linked into the chain of its [Opcode]. Chains are kept separately from the
/// nodes, oldest first, and are what the optimiser searches for interning and CSE.
#[derive(Debug)]
pub struct IRBuffer {
    /// The backing store. Slots outside `kmin..imax` hold [Node::NOP].
    store: Vec<Node>,
    anchor: Anchor,
    /// The lowest constant reference in use, or [REF_BIAS] if there are no constants.
    kmin: IRRef,
    /// One past the highest instruction reference in use.
    imax: IRRef,
    /// The literal pool of wide constants.
    kwords: IndexVec<KWordIdx, u64>,
    /// One chain per [Opcode], indexed by `Opcode as usize`.
    chains: [Vec<IRRef>; Opcode::COUNT],
    /// Is common subexpression elimination enabled?
    pub(super) cse: bool,
    pub(super) stats: Stats,
}

impl IRBuffer {
    /// Create a buffer with room for roughly `capacity` nodes, a quarter of which are reserved for
    /// constants. The buffer starts with a single `BASE` instruction representing the trace's
    /// entry stack pointer.
    pub fn new(capacity: usize) -> Result<Self, RecordingError> {
        let capacity = capacity.max(MIN_CAPACITY);
        let nconsts = capacity / 4;
        let mut buf = Self {
            store: alloc_store(capacity)?,
            anchor: Anchor::new(nconsts),
            kmin: IRRef::BASE,
            imax: IRRef::BASE,
            kwords: IndexVec::new(),
            chains: std::array::from_fn(|_| Vec::new()),
            cse: true,
            stats: Stats::default(),
        };
        buf.append_instruction(Node::new(
            Opcode::Base,
            Ty::Ptr,
            Operand::Lit(0),
            Operand::Lit(0),
        ))?;
        Ok(buf)
    }

    /// Enable or disable common subexpression elimination for subsequent admissions.
    pub fn set_cse(&mut self, cse: bool) {
        self.cse = cse;
    }

    /// Return the node at `iref`.
    ///
    /// # Panics
    ///
    /// If `iref` does not refer to a node in this buffer.
    pub fn node(&self, iref: IRRef) -> &Node {
        assert!(self.contains(iref), "{iref} is not a node of this buffer");
        // The `unwrap` can't fail: `kmin..imax` is always inside the store.
        &self.store[self.anchor.to_pos(iref, self.store.len()).unwrap()]
    }

    /// Does `iref` refer to a node in this buffer?
    pub fn contains(&self, iref: IRRef) -> bool {
        self.kmin <= iref && iref < self.imax
    }

    /// The lowest reference in use: the most recently created constant, or the `BASE` instruction
    /// if there are no constants.
    pub fn kmin(&self) -> IRRef {
        self.kmin
    }

    /// One past the most recently created instruction.
    pub fn imax(&self) -> IRRef {
        self.imax
    }

    /// How many nodes can the current backing store hold?
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    pub fn consts_len(&self) -> usize {
        // The `unwrap`s here and in `insts_len` can't fail on platforms with at least 32-bit
        // `usize`s.
        usize::try_from(self.kmin.distance()).unwrap()
    }

    pub fn insts_len(&self) -> usize {
        usize::try_from(self.imax.distance()).unwrap()
    }

    /// Return the wide constant at `idx` in the literal pool.
    pub fn kword(&self, idx: KWordIdx) -> u64 {
        self.kwords[idx]
    }

    /// How many entries does the literal pool hold?
    pub(super) fn kwords_len(&self) -> usize {
        self.kwords.len()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Iterate over every node, lowest reference first: constants (most recent first), then
    /// instructions (oldest first).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (IRRef, &Node)> + '_ {
        (self.kmin.raw()..self.imax.raw()).map(|x| {
            let iref = IRRef::from_raw(x);
            (iref, self.node(iref))
        })
    }

    /// Iterate over the instructions, oldest first.
    pub fn iter_insts(&self) -> impl DoubleEndedIterator<Item = (IRRef, &Node)> + '_ {
        (REF_BIAS..self.imax.raw()).map(|x| {
            let iref = IRRef::from_raw(x);
            (iref, self.node(iref))
        })
    }

    /// The chain of `op`, oldest first.
    pub fn chain(&self, op: Opcode) -> &[IRRef] {
        &self.chains[op as usize]
    }

    /// The node created most recently before `iref` with the same opcode, if any.
    ///
    /// # Panics
    ///
    /// If `iref` does not refer to a node in this buffer.
    pub fn chain_pred(&self, iref: IRRef) -> Option<IRRef> {
        let chain = self.chain(self.node(iref).opcode());
        // Distance from the anchor grows with creation order on both sides.
        let i = chain.partition_point(|x| x.distance() < iref.distance());
        debug_assert_eq!(chain[i], iref);
        i.checked_sub(1).map(|i| chain[i])
    }

    /// Append `node` as a new instruction and link it into its opcode's chain. This performs no
    /// optimisation: see [Self::admit].
    ///
    /// # Panics
    ///
    /// If `node` is a constant or has an operand referencing a node that does not exist yet.
    pub fn append_instruction(&mut self, node: Node) -> Result<IRRef, RecordingError> {
        assert!(
            !node.opcode().is_constant(),
            "constants must be added with `append_literal`"
        );
        for x in node.iter_refs() {
            assert!(
                self.contains(x),
                "{} refers to {x}, which has not been created yet",
                node.opcode().name()
            );
        }
        let iref = self.imax;
        let next = iref.next_inst()?;
        let pos = self.slot_pos(iref, Region::Instructions)?;
        self.store[pos] = node;
        self.chains[node.opcode() as usize].push(iref);
        self.imax = next;
        self.stats.incr(Stat::InstEmitted);
        #[cfg(any(debug_assertions, test))]
        self.assert_node_well_formed(iref);
        Ok(iref)
    }

    /// Append the constant `lit` of type `ty` to the constants region and link it into its
    /// opcode's chain. Small values become a `KINT`, others a `KWORD` with a new literal pool
    /// entry. This performs no interning: see [Self::intern].
    pub fn append_literal(&mut self, ty: Ty, lit: u64) -> Result<IRRef, RecordingError> {
        let op1 = match inline_literal(lit) {
            Some(k) => Operand::KInt(k),
            None => {
                if self.kwords.len() >= KWordIdx::MAX_INDEX {
                    return Err(RecordingError::LimitExceeded(
                        "literal pool overflow".to_owned(),
                    ));
                }
                Operand::KWord(self.kwords.next_idx())
            }
        };
        let opcode = match op1 {
            Operand::KInt(_) => Opcode::KInt,
            _ => Opcode::KWord,
        };
        let node = Node::new(opcode, ty, op1, Operand::None);
        let iref = self.kmin.next_const()?;
        let pos = self.slot_pos(iref, Region::Constants)?;
        // Only fill the pool once the node has a slot, so that a failed append leaves the pool
        // untouched.
        if let Operand::KWord(idx) = op1 {
            let pushed = self.kwords.push(lit);
            debug_assert_eq!(pushed, idx);
        }
        self.store[pos] = node;
        self.chains[opcode as usize].push(iref);
        self.kmin = iref;
        self.stats.incr(Stat::ConstInterned);
        #[cfg(any(debug_assertions, test))]
        self.assert_node_well_formed(iref);
        Ok(iref)
    }

    /// Return the store position for the new node `iref`, growing the store until it fits.
    fn slot_pos(&mut self, iref: IRRef, region: Region) -> Result<usize, RecordingError> {
        loop {
            if let Some(x) = self.anchor.to_pos(iref, self.store.len()) {
                return Ok(x);
            }
            self.grow(region)?;
        }
    }

    /// Double the space on the exhausted side of the anchor and move every node to its new
    /// position. References are unchanged.
    fn grow(&mut self, region: Region) -> Result<(), RecordingError> {
        let overflow = || RecordingError::LimitExceeded("IR buffer size".to_owned());
        let nconsts = self.anchor.pos();
        let ninsts = self.store.len() - nconsts;
        let (nconsts, ninsts) = match region {
            Region::Constants => (nconsts.checked_mul(2).ok_or_else(overflow)?.max(1), ninsts),
            Region::Instructions => (nconsts, ninsts.checked_mul(2).ok_or_else(overflow)?),
        };
        let len = nconsts.checked_add(ninsts).ok_or_else(overflow)?;
        let mut store = alloc_store(len)?;
        let anchor = Anchor::new(nconsts);
        store[anchor.span(self.kmin, self.imax)]
            .copy_from_slice(&self.store[self.anchor.span(self.kmin, self.imax)]);
        self.store = store;
        self.anchor = anchor;
        self.stats.incr(Stat::Growth);
        Ok(())
    }
}

/// Return `lit` as an inline constant if it fits in an `i32` when read as a signed value.
pub(super) fn inline_literal(lit: u64) -> Option<i32> {
    i32::try_from(lit as i64).ok()
}

/// Allocate a backing store of `len` nodes, reporting allocation failure as an error rather than
/// aborting.
fn alloc_store(len: usize) -> Result<Vec<Node>, RecordingError> {
    let mut store = Vec::new();
    store
        .try_reserve_exact(len)
        .map_err(|e| RecordingError::ResourceExhausted(Box::new(e)))?;
    store.resize(len, Node::NOP);
    Ok(store)
}
