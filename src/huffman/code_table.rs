use core::ops::Range;

use bitvec::prelude::*;
use serde::Serialize;

use crate::{
    config::SingleSymbolPolicy,
    error::{HuffmanError, Result},
    huffman::{HuffmanTree, Node, NodeIndex, Token, TreeNode},
};

if_tracing! {
    use tracing::debug;
}

/// Location of one token's code inside the packed bit array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CodeRef {
    /// First bit of the code, in bits from the start of the packed array.
    pub offset: usize,
    /// Number of bits. Zero means the token has no code.
    pub length: usize,
}

impl CodeRef {
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// Totals gathered while measuring the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct DerivationSummary {
    /// Sum of every code's length, i.e. the size of the packed array.
    pub code_bits: usize,
    /// Sum of every code's length times its token's frequency, i.e. the size of the data the
    /// tree was built from once encoded.
    pub weighted_bits: u64,
}

/// Every token's code, concatenated into one packed bit array.
///
/// Built only from a [`HuffmanTree`], by [`CodeTable::derive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    packed: BitVec<u8, Msb0>,
    codes: Vec<CodeRef>,
    current_offset: usize,
    summary: DerivationSummary,
}

impl CodeTable {
    /// Flattens `tree` into a code table.
    ///
    /// The tree is walked twice in the same depth-first order. The first walk only records
    /// each reachable leaf's depth as its code length. The second hands out offsets from a
    /// monotonic cursor and writes each code: starting from the end of the leaf's range and
    /// climbing towards the root, every edge contributes one bit (0 for a left child, 1 for a
    /// right child) one slot earlier. Read front to back, the range then spells the path from
    /// the root down to the leaf.
    ///
    /// A tree that is a single leaf is handled according to `single_symbol`.
    ///
    /// # Errors
    ///
    /// [`HuffmanError::SingleSymbolAlphabet`] when the tree is a single leaf and the policy is
    /// [`SingleSymbolPolicy::Reject`].
    pub fn derive(tree: &HuffmanTree, single_symbol: SingleSymbolPolicy) -> Result<Self> {
        let mut codes = vec![CodeRef::default(); tree.vocab_size()];
        let top = tree.top();

        if let Some(&TreeNode {
            weight,
            node: Node::Leaf { token },
        }) = tree.node(top)
        {
            return match single_symbol {
                SingleSymbolPolicy::Reject => Err(HuffmanError::SingleSymbolAlphabet { token }),
                SingleSymbolPolicy::OneBit => {
                    codes[usize::from(token)] = CodeRef { offset: 0, length: 1 };
                    Ok(Self {
                        // the lone code is a single 0 bit
                        packed: bitvec![u8, Msb0; 0],
                        codes,
                        current_offset: 1,
                        summary: DerivationSummary {
                            code_bits: 1,
                            weighted_bits: weight,
                        },
                    })
                }
            };
        }

        let summary = Self::measure(tree, &mut codes);

        let mut table = Self {
            packed: BitVec::repeat(false, summary.code_bits),
            codes,
            current_offset: 0,
            summary,
        };
        let parents = tree.parents();
        for (index, _) in tree.depth_first() {
            if let Node::Leaf { token } = tree.nodes()[index].node {
                table.place(tree, &parents, index, token);
            }
        }
        debug_assert_eq!(table.current_offset, summary.code_bits);

        if_tracing! {
            debug!(
                target = "code_table",
                code_bits = summary.code_bits,
                weighted_bits = summary.weighted_bits,
                "code table derived"
            );
        }

        Ok(table)
    }

    /// First pass: code lengths only.
    fn measure(tree: &HuffmanTree, codes: &mut [CodeRef]) -> DerivationSummary {
        let mut summary = DerivationSummary::default();
        for (index, depth) in tree.depth_first() {
            let node = tree.nodes()[index];
            if let Node::Leaf { token } = node.node {
                codes[usize::from(token)].length = depth;
                summary.code_bits += depth;
                summary.weighted_bits = summary
                    .weighted_bits
                    .saturating_add((depth as u64).saturating_mul(node.weight));
            }
        }
        summary
    }

    /// Second pass, for one leaf: reserve its range and write the path backwards.
    fn place(&mut self, tree: &HuffmanTree, parents: &[Option<NodeIndex>], leaf: NodeIndex, token: Token) {
        let code = &mut self.codes[usize::from(token)];
        code.offset = self.current_offset;
        self.current_offset += code.length;

        let mut write_offset = self.current_offset;
        let mut child = leaf;
        while let Some(parent) = parents[child] {
            write_offset -= 1;
            self.packed.set(write_offset, tree.right(parent) == Some(child));
            child = parent;
        }
        debug_assert_eq!(write_offset, self.codes[usize::from(token)].offset);
    }

    /// The code of `token`, if it has one.
    pub fn code(&self, token: Token) -> Option<CodeRef> {
        self.codes.get(usize::from(token)).copied().filter(|code| code.length != 0)
    }

    /// Code length of `token`; 0 when it has no code.
    pub fn length(&self, token: Token) -> usize {
        self.code(token).map_or(0, |code| code.length)
    }

    /// Bit offset of `token`'s code in the packed array.
    pub fn offset(&self, token: Token) -> Option<usize> {
        self.code(token).map(|code| code.offset)
    }

    /// The slice of the packed array holding `token`'s code.
    pub fn code_bits(&self, token: Token) -> Option<&BitSlice<u8, Msb0>> {
        self.code(token).map(|code| &self.packed[code.range()])
    }

    /// The bits of `token`'s code, root side first.
    pub fn bits(&self, token: Token) -> Option<impl Iterator<Item = bool> + '_> {
        Some(self.code_bits(token)?.iter().by_vals())
    }

    /// The code of `token` written out as `0`/`1` characters.
    pub fn code_string(&self, token: Token) -> Option<String> {
        Some(self.bits(token)?.map(|bit| if bit { '1' } else { '0' }).collect())
    }

    /// All tokens that have a code, in token order.
    pub fn entries(&self) -> impl Iterator<Item = (Token, CodeRef)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, code)| code.length != 0)
            .map(|(token, &code)| (token as Token, code))
    }

    pub const fn summary(&self) -> DerivationSummary {
        self.summary
    }

    /// Next free bit of the packed array; equal to its total size once derived.
    pub const fn current_offset(&self) -> usize {
        self.current_offset
    }

    pub fn packed(&self) -> &BitSlice<u8, Msb0> {
        &self.packed
    }

    pub fn vocab_size(&self) -> usize {
        self.codes.len()
    }

    /// Length of the longest code.
    pub fn max_length(&self) -> usize {
        self.codes.iter().map(|code| code.length).max().unwrap_or(0)
    }

    /// Checks every pair of codes directly: no code may be a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        let codes = self
            .entries()
            .map(|(_, code)| &self.packed[code.range()])
            .collect::<Vec<_>>();
        codes.iter().enumerate().all(|(i, a)| {
            codes
                .iter()
                .enumerate()
                .all(|(j, b)| i == j || a.len() > b.len() || b[..a.len()] != **a)
        })
    }
}
