//! Keyed extendable-output PRF.
//!
//! SHAKE128 over the 32-byte secret key with a one-byte domain tag. Chain
//! starts and per-signature randomness are both derived here; output length
//! is chosen by the caller, which is why an XOF is required.

use p3_field::PrimeCharacteristicRing;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake128;

use crate::field::{from_u32_sample, Node, F, ZERO_NODE};
use crate::params::MAX_RAND_LEN_FE;
use crate::MESSAGE_LENGTH;

const DOMAIN_CHAIN_START: u8 = 0x00;
const DOMAIN_RANDOMNESS: u8 = 0x01;

/// The secret PRF key.
#[derive(Clone, PartialEq, Eq)]
pub struct ShakePrf {
    key: [u8; 32],
}

impl ShakePrf {
    pub fn key_gen<R: rand::RngCore>(rng: &mut R) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        ShakePrf { key }
    }

    pub fn from_key(key: [u8; 32]) -> Self {
        ShakePrf { key }
    }

    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }

    /// Start state of chain `chain_index` in `epoch`: `hash_len_fe` field
    /// elements, consumed by Poseidon as-is.
    pub fn domain_element(&self, epoch: u32, chain_index: u8, hash_len_fe: usize) -> Node {
        let mut hasher = Shake128::default();
        hasher.update(&self.key);
        hasher.update(&[DOMAIN_CHAIN_START]);
        hasher.update(&epoch.to_le_bytes());
        hasher.update(&[chain_index]);

        let mut node = ZERO_NODE;
        squeeze_field_elements(hasher, &mut node[..hash_len_fe]);
        node
    }

    /// Encoding randomness for attempt `counter` of signing `message` in
    /// `epoch`. Slots above `rand_len_fe` stay zero.
    pub fn randomness(
        &self,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
        counter: u64,
        rand_len_fe: usize,
    ) -> [F; MAX_RAND_LEN_FE] {
        let mut hasher = Shake128::default();
        hasher.update(&self.key);
        hasher.update(&[DOMAIN_RANDOMNESS]);
        hasher.update(&epoch.to_le_bytes());
        hasher.update(message);
        hasher.update(&counter.to_le_bytes());

        let mut rho = [F::ZERO; MAX_RAND_LEN_FE];
        squeeze_field_elements(hasher, &mut rho[..rand_len_fe]);
        rho
    }
}

impl std::fmt::Debug for ShakePrf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ShakePrf(..)")
    }
}

fn squeeze_field_elements(hasher: Shake128, out: &mut [F]) {
    let mut reader = hasher.finalize_xof();
    let mut sample = [0u8; 4];
    for fe in out.iter_mut() {
        reader.read(&mut sample);
        *fe = from_u32_sample(u32::from_le_bytes(sample));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p3_field::PrimeCharacteristicRing;

    fn prf() -> ShakePrf {
        ShakePrf::from_key([0x42; 32])
    }

    #[test]
    fn outputs_are_deterministic() {
        let a = prf().domain_element(3, 7, 8);
        let b = prf().domain_element(3, 7, 8);
        assert_eq!(a, b);

        let msg = [0x11u8; MESSAGE_LENGTH];
        assert_eq!(
            prf().randomness(3, &msg, 9, 7),
            prf().randomness(3, &msg, 9, 7)
        );
    }

    #[test]
    fn queries_are_domain_separated() {
        assert_ne!(prf().domain_element(0, 0, 8), prf().domain_element(0, 1, 8));
        assert_ne!(prf().domain_element(0, 0, 8), prf().domain_element(1, 0, 8));

        let msg = [0u8; MESSAGE_LENGTH];
        assert_ne!(
            prf().randomness(0, &msg, 0, 7),
            prf().randomness(0, &msg, 1, 7)
        );
    }

    #[test]
    fn unused_slots_stay_zero() {
        let node = prf().domain_element(0, 0, 7);
        assert_eq!(node[7], F::ZERO);

        let rho = prf().randomness(0, &[0u8; MESSAGE_LENGTH], 0, 6);
        assert_eq!(rho[6], F::ZERO);
        assert_ne!(rho[5], F::ZERO);
    }

    #[test]
    fn keys_separate_streams() {
        let other = ShakePrf::from_key([0x43; 32]);
        assert_ne!(prf().domain_element(0, 0, 8), other.domain_element(0, 0, 8));
    }
}
