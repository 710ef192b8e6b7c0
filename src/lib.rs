//! Stateful hash-based signatures of the Generalized XMSS family, instantiated
//! over the KoalaBear prime field with the Poseidon2 permutation.
//!
//! A key is generated for a bounded activation window and can issue one
//! signature per epoch. Epoch leaves are grouped into bottom trees of
//! `2^(log_lifetime / 2)` leaves each; a top tree over the bottom-tree roots
//! yields the public root. Signing walks 64 Winternitz-style hash chains to
//! the positions selected by a target-sum message encoding and attaches the
//! Merkle co-path of the epoch leaf.
//!
//! The secret key keeps two adjacent bottom trees prepared in memory and
//! slides that window forward with [`GeneralizedXmss::advance_preparation`].
//! Completed bottom trees are persisted to an on-disk cache so that repeated
//! key generation and sequential signing stay affordable.

pub mod encoding;
pub mod error;
pub mod field;
pub mod hypercube;
pub mod params;
pub(crate) mod parallel;
pub mod signature;
pub mod symmetric;
pub mod tree;

pub use error::SignatureError;
pub use field::{Node, F};
pub use params::{Lifetime, Parameters};
pub use signature::{GeneralizedXmss, PublicKey, SecretKey, Signature};

/// Messages are fixed-size digests; callers hash longer inputs beforehand.
pub const MESSAGE_LENGTH: usize = 32;
