//! File-based sign/verify tool for cross-checking implementations.
//!
//! Public keys travel as JSON, signatures as bincode. Signing regenerates the
//! key pair from a seed, advances the prepared window to the requested epoch
//! and writes both artifacts; verification reads them back.

use std::env;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use hashsig::{GeneralizedXmss, Lifetime, PublicKey, Signature, MESSAGE_LENGTH};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

#[derive(Debug)]
enum Command {
    Sign {
        message: String,
        pk_json: String,
        sig_bin: String,
        seed_hex: Option<String>,
        epoch: u32,
        start_epoch: u64,
        num_active_epochs: u64,
        lifetime: Lifetime,
    },
    Verify {
        message: String,
        pk_json: String,
        sig_bin: String,
        epoch: u32,
        lifetime: Lifetime,
    },
}

fn print_usage() {
    eprintln!(
        "Usage:\n  hashsig_tool sign <message> <pk_json_out> <sig_bin_out> [seed_hex] [epoch] \
         [num_active_epochs] [start_epoch] [lifetime]\n  hashsig_tool verify <message> \
         <pk_json_path> <sig_bin_path> [epoch] [lifetime]"
    );
}

fn parse_lifetime(raw: Option<String>) -> Result<Lifetime, Box<dyn Error>> {
    let provided = raw.unwrap_or_else(|| "2^8".to_string());
    Lifetime::parse(&provided).ok_or_else(|| format!("unsupported lifetime '{provided}'").into())
}

fn parse_args() -> Result<Command, Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let command = args.next().ok_or("missing command")?;
    match command.as_str() {
        "sign" => {
            let message = args.next().ok_or("missing message")?;
            let pk_json = args.next().ok_or("missing pk_json_out path")?;
            let sig_bin = args.next().ok_or("missing sig_bin_out path")?;
            let seed_hex = args.next();
            let epoch = args
                .next()
                .map(|v| v.parse::<u32>())
                .transpose()?
                .unwrap_or(0);
            let num_active_epochs = args
                .next()
                .map(|v| v.parse::<u64>())
                .transpose()?
                .unwrap_or(256);
            let start_epoch = args
                .next()
                .map(|v| v.parse::<u64>())
                .transpose()?
                .unwrap_or(0);
            let lifetime = parse_lifetime(args.next())?;
            Ok(Command::Sign {
                message,
                pk_json,
                sig_bin,
                seed_hex,
                epoch,
                start_epoch,
                num_active_epochs,
                lifetime,
            })
        }
        "verify" => {
            let message = args.next().ok_or("missing message")?;
            let pk_json = args.next().ok_or("missing pk_json path")?;
            let sig_bin = args.next().ok_or("missing sig_bin path")?;
            let epoch = args
                .next()
                .map(|v| v.parse::<u32>())
                .transpose()?
                .unwrap_or(0);
            let lifetime = parse_lifetime(args.next())?;
            Ok(Command::Verify {
                message,
                pk_json,
                sig_bin,
                epoch,
                lifetime,
            })
        }
        _ => Err("unknown command".into()),
    }
}

fn parse_seed_hex(seed_hex: Option<String>) -> Result<[u8; 32], Box<dyn Error>> {
    let cleaned = seed_hex.unwrap_or_else(|| "42".repeat(32));
    let cleaned = cleaned.trim_start_matches("0x").trim_start_matches("0X");
    let bytes = hex::decode(cleaned).map_err(|_| "invalid hex in seed")?;
    if bytes.len() < 32 {
        return Err("seed hex must be at least 64 hex characters".into());
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes[..32]);
    Ok(seed)
}

fn message_to_bytes(message: &str) -> [u8; MESSAGE_LENGTH] {
    let mut bytes = [0u8; MESSAGE_LENGTH];
    let msg_bytes = message.as_bytes();
    let copy_len = msg_bytes.len().min(MESSAGE_LENGTH);
    bytes[..copy_len].copy_from_slice(&msg_bytes[..copy_len]);
    bytes
}

fn write_public_key<P: AsRef<Path>>(pk: &PublicKey, path: P) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, pk)?;
    writer.flush()?;
    Ok(())
}

fn read_public_key<P: AsRef<Path>>(path: P) -> Result<PublicKey, Box<dyn Error>> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_signature<P: AsRef<Path>>(signature: &Signature, path: P) -> Result<(), Box<dyn Error>> {
    let encoded = bincode::serialize(signature)?;
    let mut file = File::create(path)?;
    file.write_all(&encoded)?;
    Ok(())
}

fn read_signature<P: AsRef<Path>>(path: P) -> Result<Signature, Box<dyn Error>> {
    let mut buffer = Vec::new();
    File::open(path)?.read_to_end(&mut buffer)?;
    Ok(bincode::deserialize(&buffer)?)
}

#[allow(clippy::too_many_arguments)]
fn sign_command(
    message: String,
    pk_json_out: String,
    sig_bin_out: String,
    seed_hex: Option<String>,
    epoch: u32,
    start_epoch: u64,
    num_active_epochs: u64,
    lifetime: Lifetime,
) -> Result<(), Box<dyn Error>> {
    let seed = parse_seed_hex(seed_hex)?;
    let mut rng = ChaCha12Rng::from_seed(seed);
    let scheme = GeneralizedXmss::new(lifetime);
    let (pk, mut sk) = scheme.key_gen(&mut rng, start_epoch, num_active_epochs)?;

    let msg_bytes = message_to_bytes(&message);
    if (epoch as u64) < sk.activation_epoch()
        || (epoch as u64) >= sk.activation_epoch() + sk.num_active_epochs()
    {
        return Err(format!("epoch {epoch} is outside the active window").into());
    }
    while !sk.prepared_interval().contains(&(epoch as u64)) {
        scheme.advance_preparation(&mut sk)?;
    }

    let signature = scheme
        .sign(&sk, epoch, &msg_bytes)
        .map_err(|e| format!("failed to sign message at epoch {epoch}: {e}"))?;

    write_public_key(&pk, pk_json_out)?;
    write_signature(&signature, sig_bin_out)?;
    Ok(())
}

fn verify_command(
    message: String,
    pk_json_path: String,
    sig_bin_path: String,
    epoch: u32,
    lifetime: Lifetime,
) -> Result<bool, Box<dyn Error>> {
    let scheme = GeneralizedXmss::new(lifetime);
    let pk = read_public_key(pk_json_path)?;
    let signature = read_signature(sig_bin_path)?;
    let msg_bytes = message_to_bytes(&message);
    Ok(scheme.verify(&pk, epoch, &msg_bytes, &signature)?)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let command = match parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            print_usage();
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match command {
        Command::Sign {
            message,
            pk_json,
            sig_bin,
            seed_hex,
            epoch,
            start_epoch,
            num_active_epochs,
            lifetime,
        } => sign_command(
            message,
            pk_json,
            sig_bin,
            seed_hex,
            epoch,
            start_epoch,
            num_active_epochs,
            lifetime,
        ),
        Command::Verify {
            message,
            pk_json,
            sig_bin,
            epoch,
            lifetime,
        } => verify_command(message, pk_json, sig_bin, epoch, lifetime).map(|ok| {
            println!("VERIFY_RESULT:{ok}");
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
