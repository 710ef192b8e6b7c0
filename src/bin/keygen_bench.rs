//! Key-generation benchmark: seeded keygen with wall-clock timing, one
//! sign/verify round trip and a JSON summary for the comparison scripts.

use std::env;
use std::fs::File;
use std::io::Write;
use std::time::Instant;

use hashsig::field::to_canonical;
use hashsig::{GeneralizedXmss, Lifetime, MESSAGE_LENGTH};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde_json::json;
use sha3::{Digest, Sha3_256};

fn parse_seed(seed_hex: &str) -> [u8; 32] {
    let cleaned = seed_hex.trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(cleaned).unwrap_or_default();
    let mut seed = [0u8; 32];
    let copy_len = bytes.len().min(32);
    seed[..copy_len].copy_from_slice(&bytes[..copy_len]);
    seed
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let seed_hex = env::var("SEED_HEX").unwrap_or_else(|_| "42".repeat(32));
    let lifetime = env::var("LIFETIME")
        .ok()
        .and_then(|raw| Lifetime::parse(&raw))
        .unwrap_or(Lifetime::Lifetime2To8);

    let seed = parse_seed(&seed_hex);
    let mut rng = ChaCha12Rng::from_seed(seed);
    let scheme = GeneralizedXmss::new(lifetime);
    let num_epochs = scheme.params().num_epochs();

    println!("hashsig key generation benchmark");
    println!("lifetime: {lifetime} = {num_epochs} epochs");
    println!("seed: {}", hex::encode(seed));

    let start = Instant::now();
    let (pk, sk) = scheme
        .key_gen(&mut rng, 0, num_epochs)
        .expect("key generation with a full window");
    let keygen_seconds = start.elapsed().as_secs_f64();
    println!("key generation completed in {keygen_seconds:.3} s");

    let mut message = [0u8; MESSAGE_LENGTH];
    for (i, byte) in message.iter_mut().enumerate() {
        *byte = seed[i % seed.len()];
    }

    let start = Instant::now();
    let signature = scheme.sign(&sk, 0, &message).expect("signing epoch 0");
    let sign_seconds = start.elapsed().as_secs_f64();

    let start = Instant::now();
    let verify_ok = scheme
        .verify(&pk, 0, &message, &signature)
        .expect("epoch within the lifetime");
    let verify_seconds = start.elapsed().as_secs_f64();

    let root_bytes: Vec<u8> = pk
        .root
        .iter()
        .take(scheme.params().hash_len_fe)
        .flat_map(|fe| to_canonical(*fe).to_le_bytes())
        .collect();
    let root_digest = hex::encode(Sha3_256::digest(&root_bytes));

    println!("root: {}", hex::encode(&root_bytes));
    println!("verify: {verify_ok}");

    let summary = json!({
        "implementation": "hashsig",
        "lifetime": lifetime.to_string(),
        "parameters": {
            "dimension": 64,
            "base": 8,
            "target_sum": 375,
            "hash_len_fe": scheme.params().hash_len_fe,
        },
        "timing": {
            "keygen_seconds": keygen_seconds,
            "sign_seconds": sign_seconds,
            "verify_seconds": verify_seconds,
        },
        "keys": {
            "seed": hex::encode(seed),
            "root_hex": hex::encode(&root_bytes),
            "root_sha3": root_digest,
        },
        "verification": { "signature_valid": verify_ok },
    });

    match File::create("keygen_bench.json") {
        Ok(mut file) => {
            let pretty = serde_json::to_string_pretty(&summary).expect("serializable summary");
            if let Err(err) = file.write_all(pretty.as_bytes()) {
                eprintln!("failed to write keygen_bench.json: {err}");
            }
        }
        Err(err) => eprintln!("failed to create keygen_bench.json: {err}"),
    }

    println!("BENCHMARK_RESULT: {keygen_seconds:.6}");
}
