//! Target-sum message encoding.
//!
//! A message is hashed, together with the public parameter, the epoch tweak
//! and per-signature randomness, into an integer that is mapped onto the top
//! layers of the hypercube `[0, base)^dimension`. The resulting coordinates
//! are the committed chain positions. An encoding is accepted only when the
//! coordinates sum to exactly `target_sum`; the signer redraws randomness
//! until that happens, while the verifier recomputes the coordinates from the
//! randomness carried in the signature without any sum check. Pinning the sum
//! is what stops mix-and-match forgeries across chains.

use p3_field::PrimeCharacteristicRing;

use crate::field::{horner_fold, message_to_digits, F};
use crate::hypercube::HypercubeLayers;
use crate::params::{Parameters, MAX_RAND_LEN_FE, PARAMETER_LEN};
use crate::symmetric::tweak::PoseidonTweak;
use crate::symmetric::tweak_hash::PoseidonTweakHash;
use crate::MESSAGE_LENGTH;

/// Squeezed field elements per encoding attempt; enough bits to cover the
/// hypercube part size.
const SQUEEZE_LEN_FE: usize = 7;

/// Deterministic digit derivation plus the acceptance rule.
#[derive(Debug, Clone)]
pub struct TargetSumEncoder {
    params: Parameters,
    layers: HypercubeLayers,
}

impl TargetSumEncoder {
    pub fn new(params: Parameters) -> Self {
        let layers = HypercubeLayers::new(params.base, params.dimension, params.final_layer);
        TargetSumEncoder { params, layers }
    }

    /// The chain positions committed by `(parameter, epoch, rho, message)`.
    ///
    /// Deterministic in its inputs; only slots `0..rand_len_fe` of `rho`
    /// contribute.
    pub fn digits(
        &self,
        hasher: &PoseidonTweakHash,
        parameter: &[F; PARAMETER_LEN],
        epoch: u32,
        rho: &[F; MAX_RAND_LEN_FE],
        message: &[u8; MESSAGE_LENGTH],
    ) -> Vec<u8> {
        let epoch_tweak = PoseidonTweak::message(epoch).to_field_elements();
        let msg_digits = message_to_digits(message);

        let mut stream = Vec::with_capacity(
            PARAMETER_LEN + epoch_tweak.len() + self.params.rand_len_fe + msg_digits.len(),
        );
        stream.extend_from_slice(parameter);
        stream.extend_from_slice(&epoch_tweak);
        stream.extend_from_slice(&rho[..self.params.rand_len_fe]);
        stream.extend_from_slice(&msg_digits);

        let mut squeezed = [F::ZERO; SQUEEZE_LEN_FE];
        hasher.sponge(&stream, &mut squeezed);

        let index = horner_fold(&squeezed) % self.layers.part_size();
        let (layer, offset) = self.layers.find_layer(index);
        self.layers.vertex(layer, offset)
    }

    /// Whether the digits hit the required sum.
    pub fn is_accepted(&self, digits: &[u8]) -> bool {
        digits.iter().map(|&d| d as u32).sum::<u32>() == self.params.target_sum
    }
}
