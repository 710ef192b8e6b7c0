//! Bottom trees: one subtree per run of `2^(log_lifetime / 2)` epochs.
//!
//! Each epoch leaf is the sponge hash of its 64 chain ends, where every chain
//! is walked from its PRF-derived start through all `base - 1` positions.
//! Building a bottom tree is the dominant cost of key generation, which is
//! why completed trees go through the on-disk cache.

use rand::Rng;

use crate::error::SignatureError;
use crate::field::{Node, F};
use crate::parallel::compute_parallel;
use crate::params::{Parameters, PARAMETER_LEN};
use crate::symmetric::prf::ShakePrf;
use crate::symmetric::tweak_hash::PoseidonTweakHash;
use crate::tree::cache::BottomTreeCache;
use crate::tree::HashTree;

/// Leaves per tree below which leaf computation stays on one thread.
const LEAF_PARALLEL_THRESHOLD: usize = 128;

/// The subtree over epochs `[index * C, (index + 1) * C)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BottomTree {
    index: u64,
    tree: HashTree,
}

impl BottomTree {
    pub(crate) fn from_parts(index: u64, tree: HashTree) -> Self {
        BottomTree { index, tree }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn tree(&self) -> &HashTree {
        &self.tree
    }

    pub fn root(&self) -> Result<&Node, SignatureError> {
        self.tree.root().ok_or(SignatureError::InvalidBottomTree)
    }

    /// Bottom co-path of `epoch`, which must lie in this tree's range.
    pub fn co_path(&self, epoch: u64) -> Vec<Node> {
        self.tree.co_path(epoch)
    }
}

/// The leaf of `epoch`: walk all chains to their ends and sponge them down.
pub(crate) fn compute_leaf(
    hasher: &PoseidonTweakHash,
    prf: &ShakePrf,
    parameter: &[F; PARAMETER_LEN],
    params: &Parameters,
    epoch: u32,
) -> Node {
    let mut chain_ends = Vec::with_capacity(params.dimension);
    for chain_index in 0..params.dimension as u8 {
        let start = prf.domain_element(epoch, chain_index, params.hash_len_fe);
        let end = hasher.chain_walk(parameter, epoch, chain_index, 0, params.base - 1, &start);
        chain_ends.push(end);
    }
    hasher.leaf_hash(parameter, epoch, &chain_ends)
}

/// Builds (or loads) the bottom tree `index`, caching the result.
pub(crate) fn build_bottom_tree<R: Rng>(
    rng: &mut R,
    hasher: &PoseidonTweakHash,
    prf: &ShakePrf,
    parameter: &[F; PARAMETER_LEN],
    params: &Parameters,
    index: u64,
    cache: &BottomTreeCache,
) -> Result<BottomTree, SignatureError> {
    if let Some(tree) = cache.load(hasher, prf, parameter, params, index) {
        return Ok(tree);
    }

    let leaves_per_tree = params.leaves_per_bottom_tree();
    let first_epoch = index * leaves_per_tree;
    let leaves = compute_parallel(
        leaves_per_tree as usize,
        LEAF_PARALLEL_THRESHOLD,
        |offset| {
            let epoch = (first_epoch + offset as u64) as u32;
            Ok(compute_leaf(hasher, prf, parameter, params, epoch))
        },
    )?;

    let tree = HashTree::build(
        rng,
        hasher,
        parameter,
        0,
        params.tree_depth(),
        first_epoch,
        leaves,
    )?;
    let bottom = BottomTree::from_parts(index, tree);
    bottom.root()?;

    cache.store(prf, parameter, params, &bottom);
    Ok(bottom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::random_fe;
    use crate::params::Lifetime;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn setup() -> (PoseidonTweakHash, ShakePrf, [F; PARAMETER_LEN], Parameters) {
        let params = Lifetime::Lifetime2To8.parameters();
        let mut rng = ChaCha12Rng::from_seed([31u8; 32]);
        let parameter = std::array::from_fn(|_| random_fe(&mut rng));
        (
            PoseidonTweakHash::new(params),
            ShakePrf::from_key([0x17; 32]),
            parameter,
            params,
        )
    }

    #[test]
    fn leaves_depend_on_the_epoch() {
        let (hasher, prf, parameter, params) = setup();
        let a = compute_leaf(&hasher, &prf, &parameter, &params, 0);
        let b = compute_leaf(&hasher, &prf, &parameter, &params, 1);
        assert_ne!(a, b);
    }

    #[test]
    fn a_leaf_matches_its_verifier_side_reconstruction() {
        // Completing a partially walked chain must land on the same end.
        let (hasher, prf, parameter, params) = setup();
        let epoch = 3;
        let mut chain_ends = Vec::new();
        for chain_index in 0..params.dimension as u8 {
            let start = prf.domain_element(epoch, chain_index, params.hash_len_fe);
            let digit = (chain_index % 8) as u8;
            let partial =
                hasher.chain_walk(&parameter, epoch, chain_index, 0, digit, &start);
            let end = hasher.chain_walk(
                &parameter,
                epoch,
                chain_index,
                digit,
                params.base - 1 - digit,
                &partial,
            );
            chain_ends.push(end);
        }
        let rebuilt = hasher.leaf_hash(&parameter, epoch, &chain_ends);
        assert_eq!(rebuilt, compute_leaf(&hasher, &prf, &parameter, &params, epoch));
    }

    #[test]
    fn build_covers_the_right_epoch_range() {
        let (hasher, prf, parameter, params) = setup();
        let mut rng = ChaCha12Rng::from_seed([32u8; 32]);
        let cache = BottomTreeCache::disabled();
        let tree =
            build_bottom_tree(&mut rng, &hasher, &prf, &parameter, &params, 2, &cache).unwrap();

        assert_eq!(tree.index(), 2);
        let leaf_layer = &tree.tree().layers()[0];
        assert_eq!(leaf_layer.start_index(), 32);
        assert!(leaf_layer.end_index() > 48);
        assert_eq!(tree.tree().layers().len(), 5);

        // Leaf slots hold the recomputed epoch leaves.
        let leaf = compute_leaf(&hasher, &prf, &parameter, &params, 35);
        assert_eq!(leaf_layer.nodes()[3], leaf);
    }
}
