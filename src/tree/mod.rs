//! Layered Merkle trees with absolute positions.
//!
//! Layers carry the absolute position of their first node, so bottom trees
//! can live at epoch offsets and the top tree at bottom-tree indices without
//! any translation at the call sites. Every layer that gets hashed is padded:
//! a front pad when the layer starts at an odd position, a partner pad when
//! the last real node would otherwise lack a sibling, and one trailing pad so
//! the covered range always ends at an odd position. Pad nodes come from the
//! caller's RNG and are never interpreted as signer-meaningful leaves.

pub mod bottom;
pub mod cache;
pub mod top;

pub use bottom::BottomTree;
pub use cache::BottomTreeCache;

use rand::Rng;

use crate::error::SignatureError;
use crate::field::{random_node, Node, F};
use crate::parallel::compute_parallel;
use crate::params::PARAMETER_LEN;
use crate::symmetric::tweak_hash::PoseidonTweakHash;

/// Pairs per layer below which hashing stays on one thread.
const PAIR_PARALLEL_THRESHOLD: usize = 64;

/// One layer of a layered tree, covering positions
/// `[start_index, start_index + nodes.len())`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTreeLayer {
    pub(crate) start_index: u64,
    pub(crate) nodes: Vec<Node>,
}

impl HashTreeLayer {
    /// Pads `nodes` so that the layer starts even, every real node has a
    /// sibling and the covered range ends odd. Front pads are drawn before
    /// back pads.
    pub fn padded<R: Rng>(
        rng: &mut R,
        start_index: u64,
        mut nodes: Vec<Node>,
        hash_len_fe: usize,
    ) -> Self {
        let mut start = start_index;
        if start % 2 == 1 {
            nodes.insert(0, random_node(rng, hash_len_fe));
            start -= 1;
        }
        if (start + nodes.len() as u64) % 2 == 1 {
            nodes.push(random_node(rng, hash_len_fe));
        }
        nodes.push(random_node(rng, hash_len_fe));
        HashTreeLayer {
            start_index: start,
            nodes,
        }
    }

    fn raw(start_index: u64, nodes: Vec<Node>) -> Self {
        HashTreeLayer { start_index, nodes }
    }

    pub fn start_index(&self) -> u64 {
        self.start_index
    }

    /// One past the last covered position.
    pub fn end_index(&self) -> u64 {
        self.start_index + self.nodes.len() as u64
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Complete sibling pairs in this layer; the trailing pad is not part of
    /// one.
    fn num_pairs(&self) -> usize {
        (self.nodes.len().saturating_sub(1)) / 2
    }
}

/// A tree kept with all of its layers, leaves first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTree {
    layers: Vec<HashTreeLayer>,
}

impl HashTree {
    /// Builds `depth` layers of tree hashing above `leaves`. Tweak levels
    /// start at `level_offset`, so the top tree can continue where the bottom
    /// trees stop.
    pub fn build<R: Rng>(
        rng: &mut R,
        hasher: &PoseidonTweakHash,
        parameter: &[F; PARAMETER_LEN],
        level_offset: u8,
        depth: u32,
        start_index: u64,
        leaves: Vec<Node>,
    ) -> Result<Self, SignatureError> {
        let hash_len_fe = hasher.params().hash_len_fe;
        let mut layers = Vec::with_capacity(depth as usize + 1);
        layers.push(HashTreeLayer::padded(rng, start_index, leaves, hash_len_fe));

        for step in 0..depth {
            let child = layers.last().expect("at least the leaf layer");
            let parent_start = child.start_index / 2;
            let level = level_offset + step as u8;
            let parents = hash_pairs(hasher, parameter, level, child, parent_start)?;

            let layer = if step + 1 == depth {
                HashTreeLayer::raw(parent_start, parents)
            } else {
                HashTreeLayer::padded(rng, parent_start, parents, hash_len_fe)
            };
            layers.push(layer);
        }

        Ok(HashTree { layers })
    }

    pub(crate) fn from_layers(layers: Vec<HashTreeLayer>) -> Self {
        HashTree { layers }
    }

    pub fn layers(&self) -> &[HashTreeLayer] {
        &self.layers
    }

    /// The single node of the root layer, if present.
    pub fn root(&self) -> Option<&Node> {
        self.layers.last()?.nodes.first()
    }

    /// Siblings along the path from `position` to the root, bottom up.
    ///
    /// `position` is absolute; the caller must stay within the covered range
    /// of the leaf layer.
    pub fn co_path(&self, mut position: u64) -> Vec<Node> {
        let mut path = Vec::with_capacity(self.layers.len().saturating_sub(1));
        for layer in &self.layers[..self.layers.len() - 1] {
            let sibling = position ^ 1;
            debug_assert!(sibling >= layer.start_index && sibling < layer.end_index());
            path.push(layer.nodes[(sibling - layer.start_index) as usize]);
            position >>= 1;
        }
        path
    }

    /// Rehashes every stored layer and compares against the next one. Used
    /// to validate cache entries: any flip in a node that feeds the tree is
    /// caught here.
    pub(crate) fn recompute_matches(
        &self,
        hasher: &PoseidonTweakHash,
        parameter: &[F; PARAMETER_LEN],
        level_offset: u8,
    ) -> bool {
        for step in 0..self.layers.len().saturating_sub(1) {
            let child = &self.layers[step];
            let parent_layer = &self.layers[step + 1];
            let parent_start = child.start_index / 2;
            let level = level_offset + step as u8;

            let Ok(parents) = hash_pairs(hasher, parameter, level, child, parent_start) else {
                return false;
            };
            if parent_layer.start_index > parent_start {
                return false;
            }
            let offset = (parent_start - parent_layer.start_index) as usize;
            if offset + parents.len() > parent_layer.nodes.len() {
                return false;
            }
            if parent_layer.nodes[offset..offset + parents.len()] != parents[..] {
                return false;
            }
        }
        true
    }
}

fn hash_pairs(
    hasher: &PoseidonTweakHash,
    parameter: &[F; PARAMETER_LEN],
    level: u8,
    child: &HashTreeLayer,
    parent_start: u64,
) -> Result<Vec<Node>, SignatureError> {
    let nodes = &child.nodes;
    compute_parallel(child.num_pairs(), PAIR_PARALLEL_THRESHOLD, |i| {
        Ok(hasher.tree_compress(
            parameter,
            level,
            parent_start + i as u64,
            &nodes[2 * i],
            &nodes[2 * i + 1],
        ))
    })
}
