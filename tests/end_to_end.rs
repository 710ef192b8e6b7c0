//! End-to-end scenarios: key generation over an activation window, signing
//! through the prepared window and verification against the public root.

use std::sync::OnceLock;

use hashsig::field::{from_canonical, to_canonical};
use hashsig::tree::BottomTreeCache;
use hashsig::{GeneralizedXmss, Lifetime, PublicKey, SecretKey, SignatureError, MESSAGE_LENGTH};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

const MESSAGE: [u8; MESSAGE_LENGTH] = [0x42; MESSAGE_LENGTH];
const SEED: [u8; 32] = [0x42; 32];

struct Fixture {
    scheme: GeneralizedXmss,
    pk: PublicKey,
    sk: SecretKey,
}

/// One shared full-window key pair for the read-only scenarios.
fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let scheme =
            GeneralizedXmss::with_cache(Lifetime::Lifetime2To8, BottomTreeCache::disabled());
        let mut rng = ChaCha12Rng::from_seed(SEED);
        let (pk, sk) = scheme.key_gen(&mut rng, 0, 256).expect("full window keygen");
        Fixture { scheme, pk, sk }
    })
}

fn flip_low_bit(fe: &mut hashsig::F) {
    *fe = from_canonical(to_canonical(*fe) ^ 1);
}

#[test]
fn s1_sign_and_verify_at_epoch_zero() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 0, &MESSAGE).unwrap();
    assert!(fx.scheme.verify(&fx.pk, 0, &MESSAGE, &signature).unwrap());
}

#[test]
fn s2_signature_is_bound_to_its_epoch() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 17, &MESSAGE).unwrap();
    assert!(fx.scheme.verify(&fx.pk, 17, &MESSAGE, &signature).unwrap());
    assert!(!fx.scheme.verify(&fx.pk, 18, &MESSAGE, &signature).unwrap());
}

#[test]
fn s3_flipped_randomness_rejects() {
    let fx = fixture();
    let mut signature = fx.scheme.sign(&fx.sk, 0, &MESSAGE).unwrap();
    flip_low_bit(&mut signature.rho[0]);
    assert!(!fx.scheme.verify(&fx.pk, 0, &MESSAGE, &signature).unwrap());
}

#[test]
fn s4_signing_outside_the_active_window_fails() {
    let scheme = GeneralizedXmss::with_cache(Lifetime::Lifetime2To8, BottomTreeCache::disabled());
    let mut rng = ChaCha12Rng::from_seed(SEED);
    let (_pk, sk) = scheme.key_gen(&mut rng, 0, 16).unwrap();

    let err = scheme.sign(&sk, 16, &MESSAGE).unwrap_err();
    assert_eq!(
        err,
        SignatureError::KeyNotActive {
            epoch: 16,
            activation_start: 0,
            activation_end: 16,
        }
    );
}

#[test]
fn s5_advancing_prepares_the_last_epoch() {
    let fx = fixture();
    let scheme = &fx.scheme;
    let mut sk = fx.sk.clone();

    // The freshly generated key only has the first two bottom trees ready.
    assert_eq!(sk.prepared_interval(), 0..32);
    let err = scheme.sign(&sk, 255, &MESSAGE).unwrap_err();
    assert!(matches!(err, SignatureError::EpochNotPrepared { .. }));

    let mut advances = 0;
    while !sk.prepared_interval().contains(&255) {
        scheme.advance_preparation(&mut sk).unwrap();
        advances += 1;
        assert!(advances <= 16, "advancing must terminate");
    }
    assert_eq!(advances, 14);
    assert_eq!(sk.left_bottom_index(), 14);
    assert_eq!(sk.prepared_interval(), 224..256);

    let signature = scheme.sign(&sk, 255, &MESSAGE).unwrap();
    assert!(scheme.verify(&fx.pk, 255, &MESSAGE, &signature).unwrap());

    // Epochs that slid out of the window are no longer signable.
    assert!(matches!(
        scheme.sign(&sk, 0, &MESSAGE),
        Err(SignatureError::EpochNotPrepared { .. })
    ));

    // Once at the end of the window, advancing becomes a no-op.
    scheme.advance_preparation(&mut sk).unwrap();
    assert_eq!(sk.left_bottom_index(), 14);
}

#[test]
fn s6_cache_reuse_reproduces_the_key() {
    let dir = std::env::temp_dir().join(format!("hashsig-e2e-cache-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let cold = GeneralizedXmss::with_cache(Lifetime::Lifetime2To8, BottomTreeCache::at_dir(&dir));
    let mut rng = ChaCha12Rng::from_seed(SEED);
    let (pk_cold, _) = cold.key_gen(&mut rng, 0, 256).unwrap();

    let entries = std::fs::read_dir(&dir).unwrap().count();
    assert_eq!(entries, 16, "every bottom tree is persisted");

    // Same seed, warm cache: every subtree is read back, the key is identical.
    let warm = GeneralizedXmss::with_cache(Lifetime::Lifetime2To8, BottomTreeCache::at_dir(&dir));
    let mut rng = ChaCha12Rng::from_seed(SEED);
    let (pk_warm, sk_warm) = warm.key_gen(&mut rng, 0, 256).unwrap();
    assert_eq!(pk_cold, pk_warm);

    // The cached key still signs and verifies.
    let signature = warm.sign(&sk_warm, 3, &MESSAGE).unwrap();
    assert!(warm.verify(&pk_warm, 3, &MESSAGE, &signature).unwrap());

    // And the root agrees with a cache-less run of the same seed.
    let fx = fixture();
    assert_eq!(pk_cold, fx.pk);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn tampered_chain_nodes_and_paths_reject() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 5, &MESSAGE).unwrap();
    assert!(fx.scheme.verify(&fx.pk, 5, &MESSAGE, &signature).unwrap());

    for chain in [0, 31, 63] {
        let mut tampered = signature.clone();
        flip_low_bit(&mut tampered.hashes[chain][0]);
        assert!(
            !fx.scheme.verify(&fx.pk, 5, &MESSAGE, &tampered).unwrap(),
            "flipped hashes[{chain}] must reject"
        );
    }

    for level in [0, 3, 4, 7] {
        let mut tampered = signature.clone();
        flip_low_bit(&mut tampered.path[level][2]);
        assert!(
            !fx.scheme.verify(&fx.pk, 5, &MESSAGE, &tampered).unwrap(),
            "flipped path[{level}] must reject"
        );
    }
}

#[test]
fn verification_is_bound_to_the_message() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 1, &MESSAGE).unwrap();
    let mut other = MESSAGE;
    other[0] ^= 0xff;
    assert!(!fx.scheme.verify(&fx.pk, 1, &other, &signature).unwrap());
}

#[test]
fn verification_rejects_epochs_beyond_the_lifetime() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 0, &MESSAGE).unwrap();
    let err = fx.scheme.verify(&fx.pk, 300, &MESSAGE, &signature).unwrap_err();
    assert_eq!(
        err,
        SignatureError::EpochTooLarge {
            epoch: 300,
            num_epochs: 256,
        }
    );
}

#[test]
fn malformed_signatures_reject_without_errors() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 0, &MESSAGE).unwrap();

    let mut short_path = signature.clone();
    short_path.path.pop();
    assert!(!fx.scheme.verify(&fx.pk, 0, &MESSAGE, &short_path).unwrap());

    let mut short_hashes = signature.clone();
    short_hashes.hashes.pop();
    assert!(!fx.scheme.verify(&fx.pk, 0, &MESSAGE, &short_hashes).unwrap());
}

#[test]
fn signatures_survive_serialization() {
    let fx = fixture();
    let signature = fx.scheme.sign(&fx.sk, 9, &MESSAGE).unwrap();

    let json = serde_json::to_string(&fx.pk).unwrap();
    let pk: PublicKey = serde_json::from_str(&json).unwrap();

    let bytes = bincode::serialize(&signature).unwrap();
    let signature: hashsig::Signature = bincode::deserialize(&bytes).unwrap();

    assert!(fx.scheme.verify(&pk, 9, &MESSAGE, &signature).unwrap());
}

#[test]
fn secret_key_exposes_its_window() {
    let fx = fixture();
    assert_eq!(fx.sk.activation_epoch(), 0);
    assert_eq!(fx.sk.num_active_epochs(), 256);
    assert_eq!(fx.sk.left_bottom_index(), 0);
    assert_eq!(fx.sk.prf_key().len(), 32);
    assert_eq!(fx.sk.parameter().len(), 5);
}

#[test]
fn accepted_signatures_carry_target_sum_digits() {
    // The committed digits are not carried explicitly, but the signature
    // must verify at the stored chain positions, which only happens when the
    // signer found an encoding with the exact target sum. Signing a few
    // different messages exercises the rejection loop.
    let fx = fixture();
    for (i, byte) in [0x00u8, 0x01, 0x7f, 0xff].into_iter().enumerate() {
        let mut message = MESSAGE;
        message[5] = byte;
        let epoch = 20 + i as u32;
        let signature = fx.scheme.sign(&fx.sk, epoch, &message).unwrap();
        assert!(fx.scheme.verify(&fx.pk, epoch, &message, &signature).unwrap());
    }
}
