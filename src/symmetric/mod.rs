//! Symmetric building blocks: the keyed PRF, tweak domains and the
//! Poseidon2-backed tweakable hash.

pub mod prf;
pub mod tweak;
pub mod tweak_hash;

pub use prf::ShakePrf;
pub use tweak::PoseidonTweak;
pub use tweak_hash::PoseidonTweakHash;
