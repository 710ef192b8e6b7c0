//! KoalaBear field glue.
//!
//! Field elements live in Montgomery form inside [`KoalaBear`]; everything
//! that leaves the hashing core (tweak construction, cache files, public-root
//! comparison) uses the canonical `u32` representation. The helpers here keep
//! those conversions in one place, together with the base-p decompositions
//! used by tweaks and the message encoding.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use p3_field::{PrimeCharacteristicRing, PrimeField32, PrimeField64};
use p3_koala_bear::KoalaBear;
use rand::Rng;

use crate::params::{MSG_LEN_FE, NODE_WIDTH};
use crate::MESSAGE_LENGTH;

pub type F = KoalaBear;

/// One tree node. Only the first `hash_len_fe` slots carry data; the rest are
/// zero outside of active hashing.
pub type Node = [F; NODE_WIDTH];

/// KoalaBear modulus, `2^31 - 2^24 + 1`.
pub const KOALABEAR_PRIME: u32 = 0x7f00_0001;

pub const ZERO_NODE: Node = [F::ZERO; NODE_WIDTH];

/// Canonical `[0, p)` value into Montgomery form.
#[inline]
pub fn from_canonical(value: u32) -> F {
    F::new(value % KOALABEAR_PRIME)
}

/// Montgomery form back to the canonical `[0, p)` value.
#[inline]
pub fn to_canonical(value: F) -> u32 {
    value.as_canonical_u32()
}

/// Maps a 32-bit XOF sample to a field element: the low bit is dropped and
/// the remaining 31 bits are reduced into the field.
#[inline]
pub fn from_u32_sample(sample: u32) -> F {
    F::from_u64((sample >> 1) as u64)
}

/// Uniform field element from 32 bits of RNG output.
pub fn random_fe<R: Rng>(rng: &mut R) -> F {
    F::from_u64(rng.random::<u32>() as u64)
}

/// A fresh pad node: `hash_len_fe` random slots, the rest zero.
pub fn random_node<R: Rng>(rng: &mut R, hash_len_fe: usize) -> Node {
    let mut node = ZERO_NODE;
    for slot in node.iter_mut().take(hash_len_fe) {
        *slot = random_fe(rng);
    }
    node
}

/// Little-endian base-p digits of a 128-bit accumulator.
pub fn decompose_base_p(mut acc: u128, out: &mut [F]) {
    let p = KOALABEAR_PRIME as u128;
    for digit in out.iter_mut() {
        *digit = from_canonical((acc % p) as u32);
        acc /= p;
    }
}

/// The 32-byte message as a 256-bit little-endian integer, decomposed into
/// `msg_len_fe` base-p digits.
pub fn message_to_digits(message: &[u8; MESSAGE_LENGTH]) -> [F; MSG_LEN_FE] {
    let mut acc = BigUint::from_bytes_le(message);
    let mut out = [F::ZERO; MSG_LEN_FE];
    for digit in out.iter_mut() {
        let rem: BigUint = &acc % KOALABEAR_PRIME;
        *digit = from_canonical(rem.to_u32().expect("remainder below the modulus"));
        acc /= KOALABEAR_PRIME;
    }
    debug_assert!(acc.is_zero());
    out
}

/// Folds field elements into one big integer, first element most significant.
pub fn horner_fold(elements: &[F]) -> BigUint {
    let mut acc = BigUint::zero();
    for fe in elements {
        acc = acc * F::ORDER_U64 + fe.as_canonical_u32();
    }
    acc
}
