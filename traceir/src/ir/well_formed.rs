//! Basic well-formedness checks for an [IRBuffer]. These are intended to catch a recorder that
//! builds malformed nodes as close as possible to the point where it went wrong.
//!
//! After calling [IRBuffer::assert_well_formed] one can safely assume:
//!
//!   * A node lives in the constants region iff its opcode is a constant opcode.
//!   * Operands only refer to nodes created strictly earlier: constants never refer to anything
//!     and instructions only refer to constants or to instructions with smaller references.
//!   * A `KWORD`'s literal pool index is in the pool.
//!   * Every node is in exactly one chain, the chain of its own opcode, and chains are in creation
//!     order.
//!
//! Checking a whole buffer is linear in its size, so it is done when a trace is finished. Each
//! append instead checks only the node it created (in debug builds).

use super::{IRBuffer, IRRef, Opcode, Operand};
use strum::IntoEnumIterator;

impl IRBuffer {
    pub fn assert_well_formed(&self) {
        for (iref, _) in self.iter() {
            self.check_node(iref);
        }

        let mut chained = 0;
        for op in Opcode::iter() {
            let chain = self.chain(op);
            for iref in chain {
                if self.node(*iref).opcode() != op {
                    panic!(
                        "Node {iref} is in the {} chain\n  {}",
                        op.name(),
                        self.display_node(*iref)
                    );
                }
            }
            if chain.windows(2).any(|w| w[0].distance() >= w[1].distance()) {
                panic!("The {} chain is not in creation order", op.name());
            }
            chained += chain.len();
        }
        if chained != self.consts_len() + self.insts_len() {
            panic!(
                "{chained} nodes are chained but the buffer holds {}",
                self.consts_len() + self.insts_len()
            );
        }
    }

    /// Check the node `iref`, which must have just been appended: as well as the per-node
    /// properties, it must be the newest node in its chain. This takes constant time.
    pub(crate) fn assert_node_well_formed(&self, iref: IRRef) {
        self.check_node(iref);
        let op = self.node(iref).opcode();
        if self.chain(op).last() != Some(&iref) {
            panic!(
                "Node {iref} is not at the end of the {} chain\n  {}",
                op.name(),
                self.display_node(iref)
            );
        }
    }

    fn check_node(&self, iref: IRRef) {
        let node = self.node(iref);
        if node.opcode().is_constant() != iref.is_const() {
            panic!(
                "Node {iref} is in the wrong region\n  {}",
                self.display_node(iref)
            );
        }
        for x in node.iter_refs() {
            if !self.contains(x) {
                panic!(
                    "Node {iref} refers to non-existent node {x}\n  {}",
                    self.display_node(iref)
                );
            }
            if iref.is_const() || (!x.is_const() && x >= iref) {
                panic!(
                    "Node {iref} refers to later node {x}\n  {}",
                    self.display_node(iref)
                );
            }
        }
        if let Operand::KWord(idx) = node.op1()
            && idx.index() >= self.kwords_len()
        {
            // Can't use `display_node`, which would index the pool.
            panic!("Node {iref} refers to literal pool entry {idx:?}, which does not exist");
        }
    }
}
