//! The top tree over bottom-tree roots.
//!
//! Built once at key generation for the expanded activation window and kept
//! in the secret key. Its leaf layer starts at the first bottom-tree index of
//! the window, so callers extract co-paths with absolute bottom-tree indices.

use rand::Rng;

use crate::error::SignatureError;
use crate::field::{Node, F};
use crate::params::{Parameters, PARAMETER_LEN};
use crate::symmetric::tweak_hash::PoseidonTweakHash;
use crate::tree::HashTree;

pub(crate) fn build_top_tree<R: Rng>(
    rng: &mut R,
    hasher: &PoseidonTweakHash,
    parameter: &[F; PARAMETER_LEN],
    params: &Parameters,
    start_bottom_index: u64,
    roots: Vec<Node>,
) -> Result<HashTree, SignatureError> {
    let depth = params.tree_depth();
    let tree = HashTree::build(
        rng,
        hasher,
        parameter,
        depth as u8,
        depth,
        start_bottom_index,
        roots,
    )?;
    if tree.root().is_none() {
        return Err(SignatureError::InvalidTopTree);
    }
    Ok(tree)
}
