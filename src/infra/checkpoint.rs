// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Reads and writes one sub-artifact directory (retrieval/ or
// ranking/) of a persisted recommender.
//
// What gets saved per sub-artifact:
//   1. config.json    — RecsysConfig, to rebuild the architecture
//   2. vocab.json     — user and item vocabularies
//   3. model.mpk.gz   — all learned parameters
//   (+ index.json / tokenizer.json for retrieval)
//
// Weights use NamedMpkGzFileRecorder with FullPrecisionSettings
// rather than CompactRecorder: half precision would round the
// weights, and a restored engine must reproduce the trained
// engine's output exactly.
//
// Every read failure becomes RecsysError::Storage. The caller
// decides whether to retrain; this layer never does.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::domain::config::RecsysConfig;
use crate::domain::error::{RecsysError, Result};
use crate::domain::vocabulary::Vocabulary;

pub const CONFIG_FILE: &str = "config.json";
pub const VOCAB_FILE: &str = "vocab.json";
pub const MODEL_FILE: &str = "model.mpk.gz";
/// Path handed to the recorder; it appends ".mpk.gz" itself.
const MODEL_STEM: &str = "model";

/// The two vocabularies every sub-artifact carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabFile {
    pub users: Vocabulary,
    pub items: Vocabulary,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Create the directory (like `mkdir -p`).
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            RecsysError::Storage(format!("cannot create '{}': {e}", self.dir.display()))
        })
    }

    /// Fail with a StorageError listing every missing file.
    pub fn require(&self, files: &[&str]) -> Result<()> {
        if !self.dir.is_dir() {
            return Err(RecsysError::Storage(format!(
                "artifact directory '{}' does not exist",
                self.dir.display()
            )));
        }
        let missing: Vec<&str> = files
            .iter()
            .copied()
            .filter(|f| !self.dir.join(f).is_file())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(RecsysError::Storage(format!(
                "incomplete artifact '{}': missing {}",
                self.dir.display(),
                missing.join(", ")
            )))
        }
    }

    // ─── JSON files ───────────────────────────────────────────────────────────

    pub fn save_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.path(file);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).map_err(|e| {
            RecsysError::Storage(format!("cannot write '{}': {e}", path.display()))
        })?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    pub fn load_json<T: DeserializeOwned>(&self, file: &str) -> Result<T> {
        let path = self.path(file);
        let json = fs::read_to_string(&path).map_err(|e| {
            RecsysError::Storage(format!("cannot read '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            RecsysError::Storage(format!("cannot parse '{}': {e}", path.display()))
        })
    }

    pub fn save_config(&self, cfg: &RecsysConfig) -> Result<()> {
        self.save_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<RecsysConfig> {
        self.load_json(CONFIG_FILE)
    }

    pub fn save_vocab(&self, users: &Vocabulary, items: &Vocabulary) -> Result<()> {
        self.save_json(VOCAB_FILE, &VocabFile { users: users.clone(), items: items.clone() })
    }

    pub fn load_vocab(&self) -> Result<VocabFile> {
        self.load_json(VOCAB_FILE)
    }

    // ─── Model weights ────────────────────────────────────────────────────────

    pub fn save_model<B: Backend, M: Module<B>>(&self, model: &M) -> Result<()> {
        let path = self.path(MODEL_STEM);
        NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| {
                RecsysError::Storage(format!("cannot save weights to '{}': {e:?}", path.display()))
            })?;
        tracing::debug!("Saved weights to '{}'", self.path(MODEL_FILE).display());
        Ok(())
    }

    /// Load weights into `model`, which must have the saved architecture.
    pub fn load_model<B: Backend, M: Module<B>>(&self, model: M, device: &B::Device) -> Result<M> {
        let path = self.path(MODEL_STEM);
        let record = NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
            .load(path.clone(), device)
            .map_err(|e| {
                RecsysError::Storage(format!("cannot load weights from '{}': {e:?}", path.display()))
            })?;
        Ok(model.load_record(record))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::towers::{IdTower, IdTowerConfig};
    use burn::backend::NdArray;

    #[test]
    fn test_require_lists_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        fs::write(ckpt.path(CONFIG_FILE), "{}").unwrap();
        let err = ckpt.require(&[CONFIG_FILE, VOCAB_FILE, MODEL_FILE]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(VOCAB_FILE) && msg.contains(MODEL_FILE), "{msg}");
        assert!(!msg.contains(CONFIG_FILE), "{msg}");
    }

    #[test]
    fn test_missing_directory_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("absent"));
        assert!(matches!(ckpt.require(&[CONFIG_FILE]), Err(RecsysError::Storage(_))));
        assert!(matches!(ckpt.load_vocab(), Err(RecsysError::Storage(_))));
    }

    #[test]
    fn test_weights_round_trip_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let device = Default::default();

        let saved: IdTower<NdArray> = IdTowerConfig::new(4, 3).init(&device);
        ckpt.save_model::<NdArray, _>(&saved).unwrap();
        assert!(ckpt.path(MODEL_FILE).is_file());

        let fresh: IdTower<NdArray> = IdTowerConfig::new(4, 3).init(&device);
        let loaded = ckpt.load_model::<NdArray, _>(fresh, &device).unwrap();
        assert_eq!(
            saved.embedding.weight.val().into_data().to_vec::<f32>().unwrap(),
            loaded.embedding.weight.val().into_data().to_vec::<f32>().unwrap()
        );
    }
}
