//! Poseidon2-backed tweakable hashing.
//!
//! Three modes, all bound to the public parameter and a [`PoseidonTweak`]:
//!
//! * chain hashing compresses a single node at width 16,
//! * tree hashing compresses two children at width 24,
//! * leaf and message hashing run a width-24 sponge (rate 15, capacity 9),
//!   the only mode whose input exceeds one permutation width.
//!
//! Compression is feed-forward: permute, then add the pre-permutation input
//! back elementwise. The sponge capacity is initialized from a compression of
//! the length parameters, so instantiations with different shapes cannot
//! collide.

use p3_field::PrimeCharacteristicRing;
use p3_koala_bear::{
    default_koalabear_poseidon2_16, default_koalabear_poseidon2_24, KoalaBearInternalLayerParameters,
    KoalaBearParameters, Poseidon2KoalaBear,
};
use p3_monty_31::InternalLayerBaseParameters;
use p3_symmetric::Permutation;

use crate::field::{decompose_base_p, Node, F, ZERO_NODE};
use crate::params::{Parameters, CAPACITY, PARAMETER_LEN, TWEAK_LEN_FE};
use crate::symmetric::tweak::PoseidonTweak;

pub const WIDTH_16: usize = 16;
pub const WIDTH_24: usize = 24;
/// Sponge rate at width 24.
pub const RATE: usize = WIDTH_24 - CAPACITY;

/// The tweakable hash for one parameter set.
pub struct PoseidonTweakHash {
    params: Parameters,
    perm16: Poseidon2KoalaBear<16>,
    perm24: Poseidon2KoalaBear<24>,
    capacity_seed: [F; CAPACITY],
}

impl PoseidonTweakHash {
    pub fn new(params: Parameters) -> Self {
        let perm16 = default_koalabear_poseidon2_16();
        let perm24 = default_koalabear_poseidon2_24();
        let capacity_seed = derive_capacity_seed(&perm24, &params);
        PoseidonTweakHash {
            params,
            perm16,
            perm24,
            capacity_seed,
        }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// One step of a hash chain.
    pub fn chain_step(
        &self,
        parameter: &[F; PARAMETER_LEN],
        epoch: u32,
        chain_index: u8,
        pos_in_chain: u8,
        node: &Node,
    ) -> Node {
        let hash_len = self.params.hash_len_fe;
        let tweak = PoseidonTweak::chain(epoch, chain_index, pos_in_chain).to_field_elements();

        let mut input = [F::ZERO; WIDTH_16];
        input[..PARAMETER_LEN].copy_from_slice(parameter);
        input[PARAMETER_LEN..PARAMETER_LEN + TWEAK_LEN_FE].copy_from_slice(&tweak);
        let body = PARAMETER_LEN + TWEAK_LEN_FE;
        input[body..body + hash_len].copy_from_slice(&node[..hash_len]);

        let state = compress(&self.perm16, input);
        let mut out = ZERO_NODE;
        out[..hash_len].copy_from_slice(&state[..hash_len]);
        out
    }

    /// Walks `steps` chain positions starting just above `start_pos`.
    pub fn chain_walk(
        &self,
        parameter: &[F; PARAMETER_LEN],
        epoch: u32,
        chain_index: u8,
        start_pos: u8,
        steps: u8,
        node: &Node,
    ) -> Node {
        let mut current = *node;
        for step in 1..=steps {
            current = self.chain_step(parameter, epoch, chain_index, start_pos + step, &current);
        }
        current
    }

    /// Hashes two sibling nodes into their parent.
    pub fn tree_compress(
        &self,
        parameter: &[F; PARAMETER_LEN],
        level: u8,
        pos_in_level: u64,
        left: &Node,
        right: &Node,
    ) -> Node {
        let hash_len = self.params.hash_len_fe;
        let tweak = PoseidonTweak::tree(level, pos_in_level).to_field_elements();

        let mut input = [F::ZERO; WIDTH_24];
        input[..PARAMETER_LEN].copy_from_slice(parameter);
        input[PARAMETER_LEN..PARAMETER_LEN + TWEAK_LEN_FE].copy_from_slice(&tweak);
        let mut at = PARAMETER_LEN + TWEAK_LEN_FE;
        input[at..at + hash_len].copy_from_slice(&left[..hash_len]);
        at += hash_len;
        input[at..at + hash_len].copy_from_slice(&right[..hash_len]);

        let state = compress(&self.perm24, input);
        let mut out = ZERO_NODE;
        out[..hash_len].copy_from_slice(&state[..hash_len]);
        out
    }

    /// Reduces the chain ends of one epoch to its tree leaf.
    pub fn leaf_hash(
        &self,
        parameter: &[F; PARAMETER_LEN],
        epoch: u32,
        chain_ends: &[Node],
    ) -> Node {
        let hash_len = self.params.hash_len_fe;
        let tweak = PoseidonTweak::tree(0, epoch as u64).to_field_elements();

        let mut stream =
            Vec::with_capacity(PARAMETER_LEN + TWEAK_LEN_FE + chain_ends.len() * hash_len);
        stream.extend_from_slice(parameter);
        stream.extend_from_slice(&tweak);
        for end in chain_ends {
            stream.extend_from_slice(&end[..hash_len]);
        }

        let mut out = ZERO_NODE;
        self.sponge(&stream, &mut out[..hash_len]);
        out
    }

    /// Absorbs `stream` and squeezes `out.len()` elements. The stream is
    /// implicitly zero-padded to a rate multiple.
    pub(crate) fn sponge(&self, stream: &[F], out: &mut [F]) {
        let mut state = [F::ZERO; WIDTH_24];
        state[RATE..].copy_from_slice(&self.capacity_seed);

        for chunk in stream.chunks(RATE) {
            for (slot, fe) in state.iter_mut().zip(chunk) {
                *slot += *fe;
            }
            self.perm24.permute_mut(&mut state);
        }

        let mut done = 0;
        loop {
            let take = RATE.min(out.len() - done);
            out[done..done + take].copy_from_slice(&state[..take]);
            done += take;
            if done == out.len() {
                break;
            }
            self.perm24.permute_mut(&mut state);
        }
    }
}

impl std::fmt::Debug for PoseidonTweakHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseidonTweakHash")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Feed-forward compression: permute and add the input back.
fn compress<const WIDTH: usize>(
    perm: &Poseidon2KoalaBear<WIDTH>,
    input: [F; WIDTH],
) -> [F; WIDTH]
where
    Poseidon2KoalaBear<WIDTH>: Permutation<[F; WIDTH]>,
    KoalaBearInternalLayerParameters: InternalLayerBaseParameters<KoalaBearParameters, WIDTH>,
{
    let mut state = input;
    perm.permute_mut(&mut state);
    for (slot, fe) in state.iter_mut().zip(input.iter()) {
        *slot += *fe;
    }
    state
}

/// Packs the length parameters base 2^32 and compresses them; the last
/// `CAPACITY` elements seed the sponge capacity.
fn derive_capacity_seed(
    perm24: &Poseidon2KoalaBear<24>,
    params: &Parameters,
) -> [F; CAPACITY] {
    let acc = (params.parameter_len as u128)
        | ((params.tweak_len_fe as u128) << 32)
        | ((params.dimension as u128) << 64)
        | ((params.hash_len_fe as u128) << 96);

    let mut input = [F::ZERO; WIDTH_24];
    decompose_base_p(acc, &mut input);
    let state = compress(perm24, input);

    let mut seed = [F::ZERO; CAPACITY];
    seed.copy_from_slice(&state[WIDTH_24 - CAPACITY..]);
    seed
}
