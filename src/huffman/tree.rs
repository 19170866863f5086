use core::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::{
    error::{HuffmanError, Result},
    huffman::{FrequencyTable, Token},
};

if_tracing! {
    use tracing::debug;
}

/// Position of a node in the tree's arena.
pub type NodeIndex = usize;

/// Shape of a node.
///
/// An internal node always has both children, so there is no half-built state to represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
    /// Terminal node for one token. Always sits at the arena index equal to its token.
    Leaf { token: Token },
    /// Merge of two earlier nodes. `left` was the lighter (or older) one and takes the 0 edge.
    Internal { left: NodeIndex, right: NodeIndex },
}

/// One arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeNode {
    /// Frequency of the token, or the summed frequency of both subtrees.
    pub weight: u64,
    /// Leaf or internal.
    pub node: Node,
}

/// A Huffman tree stored in one flat arena.
///
/// The first `vocab_size` slots are the leaves, one per token whether it is used or not.
/// Internal nodes follow in the order they were created, so the arena never holds more than
/// `2 * vocab_size - 1` nodes. Unused tokens stay as unreachable leaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HuffmanTree {
    nodes: Vec<TreeNode>,
    vocab_size: usize,
    top: NodeIndex,
}

impl HuffmanTree {
    /// Builds a tree by repeatedly merging the two lightest nodes.
    ///
    /// Among nodes of equal weight the one with the lowest index is taken first, and the first
    /// node taken becomes the left child. The shape is therefore fully determined by the
    /// frequency table. Candidates live in a min-heap keyed by `(weight, index)`; since every
    /// candidate's index is below the next free slot, this picks exactly what a linear scan
    /// over the live nodes would.
    ///
    /// A table with a single used token yields a tree whose root is that token's leaf.
    ///
    /// # Errors
    ///
    /// - [`HuffmanError::EmptyAlphabet`] if every count is zero.
    /// - [`HuffmanError::WeightOverflow`] if merged weights no longer fit in a `u64`.
    pub fn build(frequencies: &FrequencyTable) -> Result<Self> {
        let vocab_size = frequencies.vocab_size();
        let mut nodes = Vec::with_capacity((2 * vocab_size).saturating_sub(1));
        let mut candidates = BinaryHeap::with_capacity(vocab_size);

        for (index, &count) in frequencies.counts().iter().enumerate() {
            nodes.push(TreeNode {
                weight: count,
                node: Node::Leaf { token: index as Token },
            });
            if count != 0 {
                candidates.push(Reverse((count, index)));
            }
        }

        let mut top = None;
        while let Some(Reverse((left_weight, left))) = candidates.pop() {
            let Some(Reverse((right_weight, right))) = candidates.pop() else {
                top = Some(left);
                break;
            };

            let weight = left_weight
                .checked_add(right_weight)
                .ok_or(HuffmanError::WeightOverflow { left, right })?;
            let index = nodes.len();
            nodes.push(TreeNode {
                weight,
                node: Node::Internal { left, right },
            });
            candidates.push(Reverse((weight, index)));
        }

        let top = top.ok_or(HuffmanError::EmptyAlphabet)?;

        if_tracing! {
            debug!(target = "tree", vocab_size, nodes = nodes.len(), top, "huffman tree built");
        }

        Ok(Self { nodes, vocab_size, top })
    }

    /// Index of the root.
    pub const fn top(&self) -> NodeIndex {
        self.top
    }

    pub const fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Number of nodes in the arena, leaves included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn weight(&self, index: NodeIndex) -> Option<u64> {
        self.node(index).map(|node| node.weight)
    }

    pub fn left(&self, index: NodeIndex) -> Option<NodeIndex> {
        match self.node(index)?.node {
            Node::Internal { left, .. } => Some(left),
            Node::Leaf { .. } => None,
        }
    }

    pub fn right(&self, index: NodeIndex) -> Option<NodeIndex> {
        match self.node(index)?.node {
            Node::Internal { right, .. } => Some(right),
            Node::Leaf { .. } => None,
        }
    }

    pub fn is_leaf(&self, index: NodeIndex) -> bool {
        matches!(self.node(index), Some(TreeNode { node: Node::Leaf { .. }, .. }))
    }

    /// Follows one edge: `false` goes left, `true` goes right. `None` at a leaf.
    pub fn step(&self, index: NodeIndex, bit: bool) -> Option<NodeIndex> {
        if bit { self.right(index) } else { self.left(index) }
    }

    /// Parent of every node reachable from the root; `None` for the root and unused leaves.
    pub fn parents(&self) -> Vec<Option<NodeIndex>> {
        let mut parents = vec![None; self.nodes.len()];
        for (index, _) in self.depth_first() {
            if let Node::Internal { left, right } = self.nodes[index].node {
                parents[left] = Some(index);
                parents[right] = Some(index);
            }
        }
        parents
    }

    /// Walks the reachable nodes depth-first from the root, left before right, yielding each
    /// node with its depth.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(self.top, 0)],
        }
    }

    /// Reachable leaves in traversal order, with their depth.
    pub fn leaves(&self) -> impl Iterator<Item = (Token, usize)> + '_ {
        self.depth_first().filter_map(|(index, depth)| match self.nodes[index].node {
            Node::Leaf { token } => Some((token, depth)),
            Node::Internal { .. } => None,
        })
    }

    /// Number of reachable leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Depth of the deepest reachable leaf.
    pub fn depth(&self) -> usize {
        self.leaves().map(|(_, depth)| depth).max().unwrap_or(0)
    }
}

/// Iterator returned by [`HuffmanTree::depth_first`].
pub struct DepthFirst<'a> {
    tree: &'a HuffmanTree,
    stack: Vec<(NodeIndex, usize)>,
}

impl Iterator for DepthFirst<'_> {
    type Item = (NodeIndex, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, depth) = self.stack.pop()?;
        if let Node::Internal { left, right } = self.tree.nodes[index].node {
            // right first so that left is visited first
            self.stack.push((right, depth + 1));
            self.stack.push((left, depth + 1));
        }
        Some((index, depth))
    }
}
