//! Tweak domains for the Poseidon2 hash.
//!
//! A tweak is assembled as a 128-bit integer and decomposed into
//! `TWEAK_LEN_FE` little-endian base-p field elements. The low byte is a
//! separator fixing the domain, so chain, tree and message hashing can never
//! collide on the same input.

use p3_field::PrimeCharacteristicRing;

use crate::field::{decompose_base_p, F};
use crate::params::TWEAK_LEN_FE;

/// The separator for chain hash tweaks.
pub const TWEAK_SEPARATOR_FOR_CHAIN_HASH: u8 = 0x00;
/// The separator for tree hash tweaks.
pub const TWEAK_SEPARATOR_FOR_TREE_HASH: u8 = 0x01;
/// The separator for message hash tweaks.
pub const TWEAK_SEPARATOR_FOR_MESSAGE_HASH: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseidonTweak {
    /// One step of the hash chain `chain_index` in `epoch`.
    Chain {
        epoch: u32,
        chain_index: u8,
        pos_in_chain: u8,
    },
    /// One node of a Merkle layer. `level` 0 hashes leaves into layer 1.
    Tree { level: u8, pos_in_level: u64 },
    /// The message hash of `epoch`.
    Message { epoch: u32 },
}

impl PoseidonTweak {
    pub fn chain(epoch: u32, chain_index: u8, pos_in_chain: u8) -> Self {
        PoseidonTweak::Chain {
            epoch,
            chain_index,
            pos_in_chain,
        }
    }

    pub fn tree(level: u8, pos_in_level: u64) -> Self {
        PoseidonTweak::Tree {
            level,
            pos_in_level,
        }
    }

    pub fn message(epoch: u32) -> Self {
        PoseidonTweak::Message { epoch }
    }

    /// The tweak as base-p field elements, ready for hashing.
    pub fn to_field_elements(&self) -> [F; TWEAK_LEN_FE] {
        let acc: u128 = match *self {
            PoseidonTweak::Chain {
                epoch,
                chain_index,
                pos_in_chain,
            } => {
                ((epoch as u128) << 24)
                    | ((chain_index as u128) << 16)
                    | ((pos_in_chain as u128) << 8)
                    | TWEAK_SEPARATOR_FOR_CHAIN_HASH as u128
            }
            PoseidonTweak::Tree {
                level,
                pos_in_level,
            } => {
                (((level as u128) + 1) << 40)
                    | ((pos_in_level as u128) << 8)
                    | TWEAK_SEPARATOR_FOR_TREE_HASH as u128
            }
            PoseidonTweak::Message { epoch } => {
                ((epoch as u128) << 8) | TWEAK_SEPARATOR_FOR_MESSAGE_HASH as u128
            }
        };

        let mut out = [F::ZERO; TWEAK_LEN_FE];
        decompose_base_p(acc, &mut out);
        out
    }
}
