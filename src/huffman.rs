//! Adaptive Huffman coding (the FGK variant).
//!
//! Unlike a static Huffman pass, no frequency table is transmitted: encoder
//! and decoder start from the same one-node tree and apply the same update
//! after every symbol, so their trees stay in lockstep. Symbols that have
//! never been seen are announced through the NYT (not-yet-transmitted) leaf:
//! the encoder emits the path to the NYT leaf followed by the raw 8 symbol
//! bits, then grafts a fresh leaf into the tree.
//!
//! The tree lives in a fixed-capacity arena of at most `2 * 256 + 1` node
//! records addressed by slot index. Each node also carries an FGK order
//! number; the sibling property says that listing nodes by order must list
//! them in non-decreasing weight, and the update loop restores it after each
//! weight bump by swapping a node with the highest-ordered node of its
//! weight class before incrementing.

use std::collections::VecDeque;

use crate::bitio::{BitReader, BitWriter};
use crate::{GrzError, GrzResult};

/// Number of distinct symbols (one per byte value).
const ALPHABET: usize = 256;

/// A full tree holds one leaf per symbol, one internal node per merge, and
/// the NYT leaf.
const MAX_NODES: usize = 2 * ALPHABET + 1;

/// Order number of the initial NYT-only root.
const ROOT_ORDER: u16 = MAX_NODES as u16;

/// One arena slot.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    weight: u64,
    order: u16,
    /// Meaningful for symbol leaves only.
    symbol: u8,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

/// The adaptive Huffman tree shared by encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FgkTree {
    nodes: Vec<Node>,
    root: usize,
    nyt: usize,
    /// Symbol byte to leaf slot, populated on first insertion.
    leaf_of: [Option<usize>; ALPHABET],
}

impl FgkTree {
    pub(crate) fn new() -> Self {
        let mut nodes = Vec::with_capacity(MAX_NODES);
        nodes.push(Node {
            weight: 0,
            order: ROOT_ORDER,
            symbol: 0,
            parent: None,
            left: None,
            right: None,
        });
        Self {
            nodes,
            root: 0,
            nyt: 0,
            leaf_of: [None; ALPHABET],
        }
    }

    fn leaf(&self, symbol: u8) -> Option<usize> {
        self.leaf_of[symbol as usize]
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.nodes[node].left.is_none() && self.nodes[node].right.is_none()
    }

    /// Graft a first-seen symbol into the tree.
    ///
    /// The NYT leaf becomes an internal node holding a fresh NYT leaf on the
    /// left (order minus two) and the new symbol leaf on the right (order
    /// minus one, weight one). Returns the grafted internal node, which is
    /// where the weight update starts.
    fn insert(&mut self, symbol: u8) -> usize {
        let spawned = self.nyt;
        let order = self.nodes[spawned].order;

        let leaf = self.nodes.len();
        self.nodes.push(Node {
            weight: 1,
            order: order - 1,
            symbol,
            parent: Some(spawned),
            left: None,
            right: None,
        });
        let nyt = self.nodes.len();
        self.nodes.push(Node {
            weight: 0,
            order: order - 2,
            symbol: 0,
            parent: Some(spawned),
            left: None,
            right: None,
        });

        let node = &mut self.nodes[spawned];
        node.right = Some(leaf);
        node.left = Some(nyt);
        node.weight += 1;

        self.leaf_of[symbol as usize] = Some(leaf);
        self.nyt = nyt;
        spawned
    }

    /// Collect the path from `node` up to the root, `true` for each
    /// right-child link. The writer emits it reversed, root first.
    fn path_to_root(&self, node: usize) -> Vec<bool> {
        let mut path = Vec::new();
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            path.push(self.nodes[parent].right == Some(current));
            current = parent;
        }
        path
    }

    /// Find the node `node` must swap with: the first node, in a
    /// right-before-left breadth-first walk from the root, of equal weight
    /// and order at least `node`'s. The walk order is part of the stream
    /// format; encoder and decoder must agree on it exactly.
    fn find_block_leader(&self, node: usize) -> usize {
        let mut queue = VecDeque::new();
        queue.push_back(self.root);
        while let Some(candidate) = queue.pop_front() {
            let c = &self.nodes[candidate];
            if c.order >= self.nodes[node].order && c.weight == self.nodes[node].weight {
                return candidate;
            }
            if let Some(right) = c.right {
                queue.push_back(right);
            }
            if let Some(left) = c.left {
                queue.push_back(left);
            }
        }
        // The walk always encounters `node` itself at the latest.
        node
    }

    /// Exchange the subtree positions of two nodes and swap their order
    /// numbers, so the positional ordering of the rest of the tree is
    /// untouched.
    fn swap_nodes(&mut self, a: usize, b: usize) {
        // A swap is only ever requested between non-root nodes.
        let a_parent = self.nodes[a].parent.unwrap();
        let b_parent = self.nodes[b].parent.unwrap();
        let a_is_right = self.nodes[a_parent].right == Some(a);
        let b_is_right = self.nodes[b_parent].right == Some(b);

        if a_is_right {
            self.nodes[a_parent].right = Some(b);
        } else {
            self.nodes[a_parent].left = Some(b);
        }
        if b_is_right {
            self.nodes[b_parent].right = Some(a);
        } else {
            self.nodes[b_parent].left = Some(a);
        }
        self.nodes[a].parent = Some(b_parent);
        self.nodes[b].parent = Some(a_parent);

        let order = self.nodes[a].order;
        self.nodes[a].order = self.nodes[b].order;
        self.nodes[b].order = order;
    }

    /// Restore the sibling property from `start` up to the root: at each
    /// level, swap with the block leader unless it is the node itself or
    /// its parent, then increment the weight and move up.
    fn update(&mut self, start: usize) {
        let mut node = start;
        loop {
            let leader = self.find_block_leader(node);
            if leader != node && self.nodes[node].parent != Some(leader) {
                self.swap_nodes(node, leader);
            }
            self.nodes[node].weight += 1;
            if node == self.root {
                break;
            }
            node = self.nodes[node].parent.unwrap();
        }
    }
}

#[cfg(test)]
impl FgkTree {
    /// Feed one symbol through the tree the way both codec directions do.
    pub(crate) fn absorb(&mut self, symbol: u8) {
        let start = match self.leaf(symbol) {
            Some(leaf) => leaf,
            None => self.insert(symbol),
        };
        self.update(start);
    }

    /// `(order, weight)` pairs of every node, sorted by order.
    pub(crate) fn weights_by_order(&self) -> Vec<(u16, u64)> {
        let mut pairs: Vec<(u16, u64)> = self.nodes.iter().map(|n| (n.order, n.weight)).collect();
        pairs.sort_unstable();
        pairs
    }
}

/// Encode a byte stream. Returns the packed bits and the number of padding
/// bits in the final byte.
pub fn encode(input: &[u8]) -> (Vec<u8>, u8) {
    let mut tree = FgkTree::new();
    let mut writer = BitWriter::new();
    for &symbol in input {
        encode_symbol(&mut tree, &mut writer, symbol);
    }
    let padding = writer.padding_bits();
    (writer.into_bytes(), padding)
}

fn encode_symbol(tree: &mut FgkTree, writer: &mut BitWriter, symbol: u8) {
    match tree.leaf(symbol) {
        Some(leaf) => {
            writer.push_bits_reversed(&tree.path_to_root(leaf));
            tree.update(leaf);
        }
        None => {
            writer.push_bits_reversed(&tree.path_to_root(tree.nyt));
            writer.push_byte(symbol);
            let spawned = tree.insert(symbol);
            tree.update(spawned);
        }
    }
}

/// Decode a stream produced by [`encode`], given its padding bit count.
pub fn decode(input: &[u8], padding: u8) -> GrzResult<Vec<u8>> {
    decode_with_tree(input, padding).map(|(output, _)| output)
}

/// Decode and hand back the final tree, for synchronization checks.
pub(crate) fn decode_with_tree(input: &[u8], padding: u8) -> GrzResult<(Vec<u8>, FgkTree)> {
    let mut tree = FgkTree::new();
    let mut reader = BitReader::new(input);
    let mut output = Vec::new();

    while !reader.at_tail(padding) {
        let mut node = tree.root;
        while !tree.is_leaf(node) {
            let bit = reader.next_bit().ok_or(GrzError::TruncatedInput)?;
            let next = if bit {
                tree.nodes[node].right
            } else {
                tree.nodes[node].left
            };
            node = next.ok_or(GrzError::InvalidInput)?;
        }

        let start = if node == tree.nyt {
            let symbol = reader.next_byte().ok_or(GrzError::TruncatedInput)?;
            output.push(symbol);
            tree.insert(symbol)
        } else {
            output.push(tree.nodes[node].symbol);
            node
        };
        tree.update(start);
    }

    Ok((output, tree))
}
