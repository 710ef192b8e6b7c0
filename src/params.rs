//! Parameter sets, selected by key lifetime.
//!
//! All supported instantiations share the same chain geometry (64 chains of
//! base 8) and the same target-sum encoding; only the lifetime and the two
//! derived lengths `rand_len_fe` / `hash_len_fe` vary.

use serde::{Deserialize, Serialize};

/// Number of parallel hash chains per epoch.
pub const DIMENSION: usize = 64;
/// Chain alphabet size; every chain has `BASE - 1` hashing steps.
pub const BASE: u8 = 8;
/// Deepest hypercube layer the message encoding may map into.
pub const FINAL_LAYER: u32 = 77;
/// Required digit sum of an accepted encoding.
pub const TARGET_SUM: u32 = 375;
/// Field elements in the public parameter.
pub const PARAMETER_LEN: usize = 5;
/// Field elements per tweak.
pub const TWEAK_LEN_FE: usize = 2;
/// Field elements carrying the 32-byte message digest.
pub const MSG_LEN_FE: usize = 9;
/// Sponge capacity in field elements.
pub const CAPACITY: usize = 9;
/// In-memory width of a tree node; slots beyond `hash_len_fe` stay zero.
pub const NODE_WIDTH: usize = 8;
/// Signature randomness is carried at this width, zero-padded above
/// `rand_len_fe`.
pub const MAX_RAND_LEN_FE: usize = 7;
/// Bound on encoding attempts before signing gives up.
pub const MAX_TRIES: usize = 100_000;

/// Key lifetime selector. The value is the number of signing epochs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lifetime {
    Lifetime2To8,
    Lifetime2To18,
    Lifetime2To32,
}

impl Lifetime {
    pub const fn log_lifetime(self) -> u32 {
        match self {
            Lifetime::Lifetime2To8 => 8,
            Lifetime::Lifetime2To18 => 18,
            Lifetime::Lifetime2To32 => 32,
        }
    }

    /// The full parameter set for this lifetime.
    pub const fn parameters(self) -> Parameters {
        let (rand_len_fe, hash_len_fe) = match self {
            Lifetime::Lifetime2To18 => (6, 7),
            _ => (7, 8),
        };
        Parameters {
            log_lifetime: self.log_lifetime(),
            dimension: DIMENSION,
            base: BASE,
            final_layer: FINAL_LAYER,
            target_sum: TARGET_SUM,
            parameter_len: PARAMETER_LEN,
            tweak_len_fe: TWEAK_LEN_FE,
            msg_len_fe: MSG_LEN_FE,
            rand_len_fe,
            hash_len_fe,
            capacity: CAPACITY,
        }
    }

    /// Accepts the spellings used by the benchmark scripts, e.g. `2^18`,
    /// `262144` or `lifetime_2_18`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "2^8" | "256" | "lifetime_2_8" => Some(Lifetime::Lifetime2To8),
            "2^18" | "262144" | "lifetime_2_18" => Some(Lifetime::Lifetime2To18),
            "2^32" | "4294967296" | "lifetime_2_32" => Some(Lifetime::Lifetime2To32),
            _ => None,
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "2^{}", self.log_lifetime())
    }
}

/// One instantiation of the scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub log_lifetime: u32,
    pub dimension: usize,
    pub base: u8,
    pub final_layer: u32,
    pub target_sum: u32,
    pub parameter_len: usize,
    pub tweak_len_fe: usize,
    pub msg_len_fe: usize,
    pub rand_len_fe: usize,
    pub hash_len_fe: usize,
    pub capacity: usize,
}

impl Parameters {
    pub const fn num_epochs(&self) -> u64 {
        1u64 << self.log_lifetime
    }

    /// Depth of one bottom tree; the top tree has the same depth.
    pub const fn tree_depth(&self) -> u32 {
        self.log_lifetime / 2
    }

    pub const fn leaves_per_bottom_tree(&self) -> u64 {
        1u64 << self.tree_depth()
    }

    pub const fn num_bottom_trees(&self) -> u64 {
        1u64 << (self.log_lifetime - self.tree_depth())
    }
}
