//! Keys, signatures and the Generalized XMSS scheme itself.

pub mod generalized_xmss;

pub use generalized_xmss::GeneralizedXmss;

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::field::{Node, F};
use crate::params::{MAX_RAND_LEN_FE, PARAMETER_LEN};
use crate::symmetric::prf::ShakePrf;
use crate::tree::{BottomTree, HashTree};

/// Public key: the top-tree root and the hashing parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub root: Node,
    pub parameter: [F; PARAMETER_LEN],
}

/// One-epoch signature.
///
/// `rho` is the encoding randomness, padded with zeros above the parameter
/// set's `rand_len_fe`. `hashes` holds one intermediate chain node per chain,
/// `path` the bottom co-path followed by the top co-path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub rho: [F; MAX_RAND_LEN_FE],
    pub hashes: Vec<Node>,
    pub path: Vec<Node>,
}

/// Signing state for one activation window.
///
/// Holds the top tree and the two prepared bottom trees; everything else is
/// re-derived from the PRF key on demand. Mutates only through
/// [`GeneralizedXmss::advance_preparation`].
#[derive(Clone)]
pub struct SecretKey {
    pub(crate) prf: ShakePrf,
    pub(crate) parameter: [F; PARAMETER_LEN],
    pub(crate) activation_epoch: u64,
    pub(crate) num_active_epochs: u64,
    pub(crate) end_bottom_index: u64,
    pub(crate) top_tree: HashTree,
    pub(crate) left_bottom_index: u64,
    pub(crate) left_bottom: BottomTree,
    pub(crate) right_bottom: BottomTree,
    pub(crate) leaves_per_bottom_tree: u64,
}

impl SecretKey {
    pub fn prf_key(&self) -> &[u8; 32] {
        self.prf.key()
    }

    pub fn parameter(&self) -> &[F; PARAMETER_LEN] {
        &self.parameter
    }

    pub fn activation_epoch(&self) -> u64 {
        self.activation_epoch
    }

    pub fn num_active_epochs(&self) -> u64 {
        self.num_active_epochs
    }

    /// Index of the left prepared bottom tree.
    pub fn left_bottom_index(&self) -> u64 {
        self.left_bottom_index
    }

    /// Epochs currently signable without rebuilding a bottom tree.
    pub fn prepared_interval(&self) -> Range<u64> {
        let start = self.left_bottom_index * self.leaves_per_bottom_tree;
        start..start + 2 * self.leaves_per_bottom_tree
    }

    pub(crate) fn activation_end(&self) -> u64 {
        self.activation_epoch + self.num_active_epochs
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretKey")
            .field("activation_epoch", &self.activation_epoch)
            .field("num_active_epochs", &self.num_active_epochs)
            .field("left_bottom_index", &self.left_bottom_index)
            .finish_non_exhaustive()
    }
}
