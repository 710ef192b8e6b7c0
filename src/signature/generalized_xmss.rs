//! The Generalized XMSS scheme: key generation over an activation window,
//! per-epoch signing against the prepared bottom trees, stateless
//! verification against the public root, and the sliding preparation window.

use p3_field::PrimeCharacteristicRing;
use rand::Rng;

use crate::encoding::TargetSumEncoder;
use crate::error::SignatureError;
use crate::field::{random_fe, F};
use crate::params::{Lifetime, Parameters, MAX_RAND_LEN_FE, MAX_TRIES, PARAMETER_LEN};
use crate::signature::{PublicKey, SecretKey, Signature};
use crate::symmetric::prf::ShakePrf;
use crate::symmetric::tweak_hash::PoseidonTweakHash;
use crate::tree::bottom::build_bottom_tree;
use crate::tree::top::build_top_tree;
use crate::tree::{BottomTree, BottomTreeCache};
use crate::MESSAGE_LENGTH;

/// Scheme handle for one lifetime; owns the Poseidon2 instances, the encoder
/// tables and the bottom-tree cache.
#[derive(Debug)]
pub struct GeneralizedXmss {
    lifetime: Lifetime,
    params: Parameters,
    hasher: PoseidonTweakHash,
    encoder: TargetSumEncoder,
    cache: BottomTreeCache,
}

impl GeneralizedXmss {
    /// Scheme with the cache configured from the environment.
    pub fn new(lifetime: Lifetime) -> Self {
        Self::with_cache(lifetime, BottomTreeCache::from_env())
    }

    pub fn with_cache(lifetime: Lifetime, cache: BottomTreeCache) -> Self {
        let params = lifetime.parameters();
        GeneralizedXmss {
            lifetime,
            params,
            hasher: PoseidonTweakHash::new(params),
            encoder: TargetSumEncoder::new(params),
            cache,
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Generates a key pair able to sign epochs
    /// `[activation_epoch, activation_epoch + num_active_epochs)`.
    ///
    /// The window is expanded to bottom-tree boundaries and to at least two
    /// bottom trees; the expansion affects which trees are built, never which
    /// epochs are signable. All randomness, including the pad nodes of every
    /// layer, is drawn from `rng` in a fixed order, so a seeded RNG yields a
    /// deterministic key pair.
    pub fn key_gen<R: Rng>(
        &self,
        rng: &mut R,
        activation_epoch: u64,
        num_active_epochs: u64,
    ) -> Result<(PublicKey, SecretKey), SignatureError> {
        let (start_index, end_index) =
            expand_activation_window(&self.params, activation_epoch, num_active_epochs)?;

        let mut parameter = [F::ZERO; PARAMETER_LEN];
        for slot in parameter.iter_mut() {
            *slot = random_fe(rng);
        }
        let prf = ShakePrf::key_gen(rng);

        let mut roots = Vec::with_capacity((end_index - start_index) as usize);
        let mut left_bottom: Option<BottomTree> = None;
        let mut right_bottom: Option<BottomTree> = None;
        for index in start_index..end_index {
            let tree = build_bottom_tree(
                rng,
                &self.hasher,
                &prf,
                &parameter,
                &self.params,
                index,
                &self.cache,
            )?;
            roots.push(*tree.root()?);
            if index == start_index {
                left_bottom = Some(tree);
            } else if index == start_index + 1 {
                right_bottom = Some(tree);
            }
        }

        let top_tree = build_top_tree(
            rng,
            &self.hasher,
            &parameter,
            &self.params,
            start_index,
            roots,
        )?;
        let root = *top_tree.root().ok_or(SignatureError::InvalidTopTree)?;

        let secret_key = SecretKey {
            prf,
            parameter,
            activation_epoch,
            num_active_epochs,
            end_bottom_index: end_index,
            top_tree,
            left_bottom_index: start_index,
            left_bottom: left_bottom.ok_or(SignatureError::InsufficientBottomTrees)?,
            right_bottom: right_bottom.ok_or(SignatureError::InsufficientBottomTrees)?,
            leaves_per_bottom_tree: self.params.leaves_per_bottom_tree(),
        };
        let public_key = PublicKey { root, parameter };
        Ok((public_key, secret_key))
    }

    /// Signs `message` for `epoch`.
    ///
    /// The epoch must be active and inside the prepared window; signing is
    /// deterministic in the secret key, the epoch and the message.
    pub fn sign(
        &self,
        secret_key: &SecretKey,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
    ) -> Result<Signature, SignatureError> {
        let at = epoch as u64;
        if at < secret_key.activation_epoch || at >= secret_key.activation_end() {
            return Err(SignatureError::KeyNotActive {
                epoch: at,
                activation_start: secret_key.activation_epoch,
                activation_end: secret_key.activation_end(),
            });
        }
        let prepared = secret_key.prepared_interval();
        if !prepared.contains(&at) {
            return Err(SignatureError::EpochNotPrepared {
                epoch: at,
                prepared_start: prepared.start,
                prepared_end: prepared.end,
            });
        }

        let tree_index = at / secret_key.leaves_per_bottom_tree;
        let bottom = if tree_index == secret_key.left_bottom_index {
            &secret_key.left_bottom
        } else {
            &secret_key.right_bottom
        };

        let mut path = bottom.co_path(at);
        path.extend(secret_key.top_tree.co_path(tree_index));

        let (rho, digits) = self.accepted_encoding(secret_key, epoch, message)?;

        let mut hashes = Vec::with_capacity(self.params.dimension);
        for (chain_index, &digit) in digits.iter().enumerate() {
            let start = secret_key.prf.domain_element(
                epoch,
                chain_index as u8,
                self.params.hash_len_fe,
            );
            hashes.push(self.hasher.chain_walk(
                &secret_key.parameter,
                epoch,
                chain_index as u8,
                0,
                digit,
                &start,
            ));
        }

        Ok(Signature { rho, hashes, path })
    }

    /// Checks `signature` on `message` for `epoch` against `public_key`.
    pub fn verify(
        &self,
        public_key: &PublicKey,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
        signature: &Signature,
    ) -> Result<bool, SignatureError> {
        if epoch as u64 >= self.params.num_epochs() {
            return Err(SignatureError::EpochTooLarge {
                epoch: epoch as u64,
                num_epochs: self.params.num_epochs(),
            });
        }
        if signature.hashes.len() != self.params.dimension
            || signature.path.len() != self.params.log_lifetime as usize
        {
            return Ok(false);
        }

        // Digits are recomputed from the carried randomness; the sum is not
        // checked, the root comparison is what decides.
        let digits = self.encoder.digits(
            &self.hasher,
            &public_key.parameter,
            epoch,
            &signature.rho,
            message,
        );

        let mut chain_ends = Vec::with_capacity(self.params.dimension);
        for (chain_index, &digit) in digits.iter().enumerate() {
            chain_ends.push(self.hasher.chain_walk(
                &public_key.parameter,
                epoch,
                chain_index as u8,
                digit,
                self.params.base - 1 - digit,
                &signature.hashes[chain_index],
            ));
        }

        let mut current = self
            .hasher
            .leaf_hash(&public_key.parameter, epoch, &chain_ends);
        let mut position = epoch as u64;
        for (level, sibling) in signature.path.iter().enumerate() {
            let (left, right) = if position % 2 == 0 {
                (current, *sibling)
            } else {
                (*sibling, current)
            };
            position >>= 1;
            current = self.hasher.tree_compress(
                &public_key.parameter,
                level as u8,
                position,
                &left,
                &right,
            );
        }

        Ok(current == public_key.root)
    }

    /// Slides the prepared window forward by one bottom tree, if the window
    /// is not already at the end of the activation range.
    ///
    /// The released left tree is dropped; the replacement comes from the
    /// cache when possible.
    pub fn advance_preparation(
        &self,
        secret_key: &mut SecretKey,
    ) -> Result<(), SignatureError> {
        if secret_key.left_bottom_index + 3 > secret_key.end_bottom_index {
            return Ok(());
        }
        let next_index = secret_key.left_bottom_index + 2;
        let mut rng = rand::rng();
        let tree = build_bottom_tree(
            &mut rng,
            &self.hasher,
            &secret_key.prf,
            &secret_key.parameter,
            &self.params,
            next_index,
            &self.cache,
        )?;
        secret_key.left_bottom = std::mem::replace(&mut secret_key.right_bottom, tree);
        secret_key.left_bottom_index += 1;
        Ok(())
    }

    /// Rejection-samples encoding randomness until the digits hit the target
    /// sum.
    fn accepted_encoding(
        &self,
        secret_key: &SecretKey,
        epoch: u32,
        message: &[u8; MESSAGE_LENGTH],
    ) -> Result<([F; MAX_RAND_LEN_FE], Vec<u8>), SignatureError> {
        for counter in 0..MAX_TRIES as u64 {
            let rho = secret_key.prf.randomness(
                epoch,
                message,
                counter,
                self.params.rand_len_fe,
            );
            let digits = self.encoder.digits(
                &self.hasher,
                &secret_key.parameter,
                epoch,
                &rho,
                message,
            );
            if self.encoder.is_accepted(&digits) {
                return Ok((rho, digits));
            }
        }
        Err(SignatureError::EncodingAttemptsExceeded { tries: MAX_TRIES })
    }
}

/// Rounds the requested activation window out to bottom-tree boundaries.
///
/// Returns the covered bottom-tree index range. The window is grown to at
/// least two bottom trees, shifted left if it would run past the lifetime
/// and clamped to the full lifetime if it is longer.
pub(crate) fn expand_activation_window(
    params: &Parameters,
    activation_epoch: u64,
    num_active_epochs: u64,
) -> Result<(u64, u64), SignatureError> {
    let total = params.num_epochs();
    let leaves = params.leaves_per_bottom_tree();
    let invalid = || SignatureError::InvalidActivationParameters {
        activation_epoch,
        num_active_epochs,
        num_epochs: total,
    };

    if num_active_epochs == 0 {
        return Err(invalid());
    }
    let end_epoch = activation_epoch
        .checked_add(num_active_epochs)
        .ok_or_else(invalid)?;
    if end_epoch > total {
        return Err(invalid());
    }

    let mut start = activation_epoch - activation_epoch % leaves;
    let mut end = end_epoch.div_ceil(leaves) * leaves;
    if end - start < 2 * leaves {
        end = start + 2 * leaves;
    }
    if end > total {
        let duration = end - start;
        if duration >= total {
            start = 0;
        } else {
            start = total - duration;
        }
        end = total;
    }

    let range = (start / leaves, end / leaves);
    if range.1 - range.0 < 2 {
        return Err(SignatureError::InsufficientBottomTrees);
    }
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Lifetime;

    fn params() -> Parameters {
        Lifetime::Lifetime2To8.parameters()
    }

    #[test]
    fn window_is_aligned_and_grown_to_two_trees() {
        assert_eq!(expand_activation_window(&params(), 0, 256), Ok((0, 16)));
        assert_eq!(expand_activation_window(&params(), 0, 16), Ok((0, 2)));
        assert_eq!(expand_activation_window(&params(), 5, 3), Ok((0, 2)));
        assert_eq!(expand_activation_window(&params(), 17, 40), Ok((1, 4)));
    }

    #[test]
    fn window_is_shifted_left_at_the_lifetime_end() {
        assert_eq!(expand_activation_window(&params(), 250, 6), Ok((14, 16)));
        assert_eq!(expand_activation_window(&params(), 255, 1), Ok((14, 16)));
    }

    #[test]
    fn window_is_clamped_to_the_lifetime() {
        assert_eq!(expand_activation_window(&params(), 0, 255), Ok((0, 16)));
        assert_eq!(expand_activation_window(&params(), 1, 255), Ok((0, 16)));
    }

    #[test]
    fn out_of_range_windows_are_rejected() {
        let err = expand_activation_window(&params(), 0, 257);
        assert_eq!(
            err,
            Err(SignatureError::InvalidActivationParameters {
                activation_epoch: 0,
                num_active_epochs: 257,
                num_epochs: 256,
            })
        );
        assert!(expand_activation_window(&params(), 256, 1).is_err());
        assert!(expand_activation_window(&params(), 0, 0).is_err());
    }
}
