//! Persistence of the vector index and its metadata sidecar.
//!
//! Both files are written to temporary siblings, flushed, and renamed into
//! place. The index header carries the SHA-256 of the sidecar, so a reader
//! that sees a vector file from one ingestion next to metadata from another
//! rejects the pair instead of serving misattributed citations.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use ius_civile_core::index::{IndexFile, VectorIndex};
use ius_civile_core::models::ChunkMeta;

use crate::config::Config;

/// Write the index and its sidecar under `config.data.dir`.
pub fn save_index(config: &Config, index: &VectorIndex) -> Result<()> {
    fs::create_dir_all(&config.data.dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.data.dir.display()
        )
    })?;

    let metas: Vec<&ChunkMeta> = index.metadata();
    let sidecar = serde_json::to_vec_pretty(&metas)?;
    let digest: [u8; 32] = Sha256::digest(&sidecar).into();
    let encoded = index.to_index_file(digest).encode();

    let meta_path = config.meta_path();
    let index_path = config.index_path();
    let meta_tmp = write_tmp(&meta_path, &sidecar)?;
    let index_tmp = write_tmp(&index_path, &encoded)?;

    fs::rename(&meta_tmp, &meta_path).with_context(|| {
        format!(
            "Failed to move {} into place at {}",
            meta_tmp.display(),
            meta_path.display()
        )
    })?;
    fs::rename(&index_tmp, &index_path).with_context(|| {
        format!(
            "Failed to move {} into place at {}",
            index_tmp.display(),
            index_path.display()
        )
    })?;

    tracing::debug!(
        chunks = index.len(),
        digest = %hex::encode(digest),
        "index saved"
    );
    Ok(())
}

fn write_tmp(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp = path.with_extension("tmp");
    let mut file =
        File::create(&tmp).with_context(|| format!("Failed to create {}", tmp.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    file.sync_all()?;
    Ok(tmp)
}

/// Load the persisted index.
///
/// Returns `Ok(None)` when nothing has been ingested yet (either file
/// missing). A pair that exists but does not belong together is an error.
pub fn load_index(config: &Config) -> Result<Option<VectorIndex>> {
    let index_path = config.index_path();
    let meta_path = config.meta_path();
    if !index_path.exists() || !meta_path.exists() {
        return Ok(None);
    }

    let sidecar =
        fs::read(&meta_path).with_context(|| format!("Failed to read {}", meta_path.display()))?;
    let bytes =
        fs::read(&index_path).with_context(|| format!("Failed to read {}", index_path.display()))?;
    let file = IndexFile::decode(&bytes)
        .with_context(|| format!("Invalid index file: {}", index_path.display()))?;

    let digest: [u8; 32] = Sha256::digest(&sidecar).into();
    if digest != file.sidecar_digest {
        bail!(
            "metadata sidecar does not match index (expected sha256 {}, found {}); re-run ingest",
            hex::encode(file.sidecar_digest),
            hex::encode(digest)
        );
    }

    let metas: Vec<ChunkMeta> = serde_json::from_slice(&sidecar)
        .with_context(|| format!("Invalid metadata sidecar: {}", meta_path.display()))?;
    let index = VectorIndex::from_parts(file, metas)?;
    Ok(Some(index))
}

/// Exclusive ingestion lock, released on drop.
///
/// Concurrent ingestions into the same data directory would race on the
/// final rename; the second one fails fast instead.
#[derive(Debug)]
pub struct IngestLock {
    path: PathBuf,
}

impl IngestLock {
    pub fn acquire(config: &Config) -> Result<Self> {
        fs::create_dir_all(&config.data.dir)?;
        let path = config.lock_path();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => bail!(
                "another ingestion is running (lock file {}); remove it if stale",
                path.display()
            ),
            Err(e) => Err(e).with_context(|| format!("Failed to create {}", path.display())),
        }
    }
}

impl Drop for IngestLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &Path) -> Config {
        let mut config = Config::minimal();
        config.data.dir = dir.to_path_buf();
        config
    }

    fn meta(n: usize) -> ChunkMeta {
        ChunkMeta {
            source: "codice.txt".into(),
            chunk: format!("testo {}", n),
            citation: format!("codice.txt — chunk {}", n),
        }
    }

    #[test]
    fn test_missing_files_load_as_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(load_index(&config_in(tmp.path())).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let mut index = VectorIndex::new(2);
        index
            .add(vec![vec![1.0, 0.0], vec![0.0, 2.0]], vec![meta(1), meta(2)])
            .unwrap();
        save_index(&config, &index).unwrap();

        let loaded = load_index(&config).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dims(), 2);
        assert_eq!(loaded.get(1).unwrap().meta, meta(2));
        assert_eq!(loaded.get(1).unwrap().vector, vec![0.0, 1.0]);
        assert!(!config.index_path().with_extension("tmp").exists());
    }

    #[test]
    fn test_foreign_sidecar_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let mut index = VectorIndex::new(2);
        index.add(vec![vec![1.0, 0.0]], vec![meta(1)]).unwrap();
        save_index(&config, &index).unwrap();

        std::fs::write(
            config.meta_path(),
            serde_json::to_vec_pretty(&vec![meta(7)]).unwrap(),
        )
        .unwrap();
        let err = load_index(&config).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_corrupt_header_is_an_error_not_a_panic() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let mut index = VectorIndex::new(2);
        index.add(vec![vec![1.0, 0.0]], vec![meta(1)]).unwrap();
        save_index(&config, &index).unwrap();

        let mut bytes = std::fs::read(config.index_path()).unwrap();
        bytes.truncate(52);
        bytes[8..12].copy_from_slice(&0u32.to_le_bytes());
        bytes[12..20].copy_from_slice(&(u64::MAX / 8).to_le_bytes());
        std::fs::write(config.index_path(), &bytes).unwrap();

        assert!(load_index(&config).is_err());
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = config_in(tmp.path());
        let lock = IngestLock::acquire(&config).unwrap();
        assert!(IngestLock::acquire(&config).is_err());
        drop(lock);
        assert!(IngestLock::acquire(&config).is_ok());
    }
}
