//! On-disk cache of completed bottom trees.
//!
//! Entries are keyed by `(log_lifetime, tree index, PRF key, parameter)`
//! through a SHA-256 file name, so unrelated keys never read each other's
//! trees. Writes go through a create-then-rename so a crash cannot leave a
//! readable half-written entry; a per-cache mutex serializes all file access.
//!
//! The cache is strictly best-effort: any load problem, from a missing file
//! to a failed validation, behaves as a miss, and store failures are logged
//! and swallowed. Setting `HASH_ZIG_DISABLE_BT_CACHE` (or an unusable cache
//! directory) turns the whole cache into a no-op.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use p3_field::PrimeCharacteristicRing;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::field::{from_canonical, to_canonical, F, KOALABEAR_PRIME, ZERO_NODE};
use crate::params::{Parameters, PARAMETER_LEN};
use crate::symmetric::prf::ShakePrf;
use crate::symmetric::tweak_hash::PoseidonTweakHash;
use crate::tree::bottom::BottomTree;
use crate::tree::{HashTree, HashTreeLayer};

/// Disables the cache entirely when set to any value.
pub const DISABLE_ENV: &str = "HASH_ZIG_DISABLE_BT_CACHE";
/// Overrides the cache directory.
pub const DIR_ENV: &str = "HASH_ZIG_BT_CACHE_DIR";
/// Default cache directory, relative to the working directory.
pub const DEFAULT_DIR: &str = "tmp/bottom_tree_cache";

/// `BTC1` in little-endian file order.
const MAGIC: u32 = 0x4254_4331;
const VERSION: u8 = 1;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
enum CacheError {
    #[error("cache entry does not match the requested key material")]
    Mismatch,
    #[error("cache entry is malformed")]
    InvalidFile,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Handle to one cache directory (or to a disabled cache).
#[derive(Debug)]
pub struct BottomTreeCache {
    dir: Option<PathBuf>,
    lock: Mutex<()>,
}

impl BottomTreeCache {
    /// Cache configured from the environment, as used by key generation.
    pub fn from_env() -> Self {
        if std::env::var_os(DISABLE_ENV).is_some() {
            return Self::disabled();
        }
        let dir = std::env::var_os(DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR));
        Self::at_dir(dir)
    }

    /// Cache rooted at an explicit directory. Falls back to a disabled cache
    /// when the directory cannot be created.
    pub fn at_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        match fs::create_dir_all(&dir) {
            Ok(()) => BottomTreeCache {
                dir: Some(dir),
                lock: Mutex::new(()),
            },
            Err(_) => Self::disabled(),
        }
    }

    pub fn disabled() -> Self {
        BottomTreeCache {
            dir: None,
            lock: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Loads and validates the entry for `index`; any failure is a miss.
    pub(crate) fn load(
        &self,
        hasher: &PoseidonTweakHash,
        prf: &ShakePrf,
        parameter: &[F; PARAMETER_LEN],
        params: &Parameters,
        index: u64,
    ) -> Option<BottomTree> {
        let path = self.entry_path(prf, parameter, params, index)?;
        let _guard = self.lock.lock().expect("cache lock poisoned");

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "bottom tree cache read failed");
                return None;
            }
        };

        match read_entry(&bytes, hasher, prf, parameter, params, index) {
            Ok(tree) => Some(tree),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "ignoring unusable bottom tree cache entry"
                );
                None
            }
        }
    }

    /// Persists a completed bottom tree; failures are logged and swallowed.
    pub(crate) fn store(
        &self,
        prf: &ShakePrf,
        parameter: &[F; PARAMETER_LEN],
        params: &Parameters,
        tree: &BottomTree,
    ) {
        let Some(path) = self.entry_path(prf, parameter, params, tree.index()) else {
            return;
        };
        let bytes = write_entry(prf, parameter, params, tree);
        let _guard = self.lock.lock().expect("cache lock poisoned");
        if let Err(err) = atomic_write(&path, &bytes) {
            tracing::warn!(path = %path.display(), error = %err, "bottom tree cache store failed");
        }
    }

    fn entry_path(
        &self,
        prf: &ShakePrf,
        parameter: &[F; PARAMETER_LEN],
        params: &Parameters,
        index: u64,
    ) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let mut digest = Sha256::new();
        digest.update([params.log_lifetime as u8]);
        digest.update((index as u32).to_le_bytes());
        digest.update(prf.key());
        for fe in parameter {
            digest.update(to_canonical(*fe).to_le_bytes());
        }
        Some(dir.join(format!("{}.bt", hex::encode(digest.finalize()))))
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let stamp = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let temp = path.with_extension(format!("tmp.{}.{}", process::id(), stamp));
    fs::write(&temp, bytes)?;
    match fs::rename(&temp, path) {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = fs::remove_file(&temp);
            Err(err)
        }
    }
}

fn write_entry(
    prf: &ShakePrf,
    parameter: &[F; PARAMETER_LEN],
    params: &Parameters,
    tree: &BottomTree,
) -> Vec<u8> {
    let layers = tree.tree().layers();
    let mut out = Vec::new();

    out.extend_from_slice(&MAGIC.to_le_bytes());
    out.push(VERSION);
    out.push(params.log_lifetime as u8);
    out.extend_from_slice(&0u16.to_le_bytes());

    out.extend_from_slice(&(tree.index() as u32).to_le_bytes());
    out.extend_from_slice(prf.key());
    for fe in parameter {
        out.extend_from_slice(&to_canonical(*fe).to_le_bytes());
    }

    let root = layers
        .last()
        .and_then(|layer| layer.nodes().first())
        .copied()
        .unwrap_or(ZERO_NODE);
    for fe in root.iter().take(params.hash_len_fe) {
        out.extend_from_slice(&to_canonical(*fe).to_le_bytes());
    }

    out.extend_from_slice(&(layers.len() as u32).to_le_bytes());
    for layer in layers {
        out.extend_from_slice(&layer.start_index().to_le_bytes());
        out.extend_from_slice(&(layer.nodes().len() as u32).to_le_bytes());
        for node in layer.nodes() {
            for fe in node {
                out.extend_from_slice(&to_canonical(*fe).to_le_bytes());
            }
        }
    }

    out
}

fn read_entry(
    bytes: &[u8],
    hasher: &PoseidonTweakHash,
    prf: &ShakePrf,
    parameter: &[F; PARAMETER_LEN],
    params: &Parameters,
    index: u64,
) -> Result<BottomTree, CacheError> {
    let mut input = bytes;

    if read_u32(&mut input)? != MAGIC {
        return Err(CacheError::InvalidFile);
    }
    if read_u8(&mut input)? != VERSION {
        return Err(CacheError::InvalidFile);
    }
    if read_u8(&mut input)? as u32 != params.log_lifetime {
        return Err(CacheError::Mismatch);
    }
    if read_u16(&mut input)? != 0 {
        return Err(CacheError::InvalidFile);
    }

    if read_u32(&mut input)? as u64 != index {
        return Err(CacheError::Mismatch);
    }
    let key = take(&mut input, 32)?;
    if key != prf.key() {
        return Err(CacheError::Mismatch);
    }
    for expected in parameter {
        if read_fe(&mut input)? != *expected {
            return Err(CacheError::Mismatch);
        }
    }

    let mut root = ZERO_NODE;
    for slot in root.iter_mut().take(params.hash_len_fe) {
        *slot = read_fe(&mut input)?;
    }

    let depth = params.tree_depth() as usize;
    let num_layers = read_u32(&mut input)? as usize;
    if num_layers != depth + 1 {
        return Err(CacheError::InvalidFile);
    }

    let max_nodes = params.leaves_per_bottom_tree() as usize + 3;
    let mut layers = Vec::with_capacity(num_layers);
    for layer_index in 0..num_layers {
        let start_index = read_u64(&mut input)?;
        let count = read_u32(&mut input)? as usize;
        if count == 0 || count > max_nodes {
            return Err(CacheError::InvalidFile);
        }
        let is_root_layer = layer_index == num_layers - 1;
        if is_root_layer {
            if count != 1 {
                return Err(CacheError::InvalidFile);
            }
        } else if start_index % 2 != 0 || (start_index + count as u64) % 2 != 1 {
            return Err(CacheError::InvalidFile);
        }

        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            let mut node = ZERO_NODE;
            for (slot_index, slot) in node.iter_mut().enumerate() {
                let fe = read_fe(&mut input)?;
                if slot_index >= params.hash_len_fe && fe != F::ZERO {
                    return Err(CacheError::InvalidFile);
                }
                *slot = fe;
            }
            nodes.push(node);
        }
        layers.push(HashTreeLayer { start_index, nodes });
    }
    if !input.is_empty() {
        return Err(CacheError::InvalidFile);
    }

    if layers[0].start_index() != index * params.leaves_per_bottom_tree() {
        return Err(CacheError::InvalidFile);
    }

    let tree = HashTree::from_layers(layers);
    if !tree.recompute_matches(hasher, parameter, 0) {
        return Err(CacheError::InvalidFile);
    }
    if tree.root() != Some(&root) {
        return Err(CacheError::InvalidFile);
    }

    Ok(BottomTree::from_parts(index, tree))
}

fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8], CacheError> {
    if input.len() < len {
        return Err(CacheError::InvalidFile);
    }
    let (head, rest) = input.split_at(len);
    *input = rest;
    Ok(head)
}

fn read_u8(input: &mut &[u8]) -> Result<u8, CacheError> {
    Ok(take(input, 1)?[0])
}

fn read_u16(input: &mut &[u8]) -> Result<u16, CacheError> {
    let bytes = take(input, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(input: &mut &[u8]) -> Result<u32, CacheError> {
    let bytes = take(input, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(input: &mut &[u8]) -> Result<u64, CacheError> {
    let bytes = take(input, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

fn read_fe(input: &mut &[u8]) -> Result<F, CacheError> {
    let value = read_u32(input)?;
    if value >= KOALABEAR_PRIME {
        return Err(CacheError::InvalidFile);
    }
    Ok(from_canonical(value))
}
