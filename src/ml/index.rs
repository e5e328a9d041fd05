// ============================================================
// Layer 5 — Retrieval Index
// ============================================================
// A brute-force nearest-neighbour index over candidate
// embeddings. Similarity is the dot product, the same score the
// retrieval model is trained with.
//
//   RetrievalIndex — ids + a flat [n, dim] embedding matrix,
//                    queried by a full scan
//   LazyIndex      — Uninitialized | Built slot guarded by a
//                    mutex, so concurrent first queries build
//                    the index exactly once
//
// The index reflects the catalog at build time only; it is
// never refreshed for the lifetime of its owner.
//
// On disk the embeddings are stored as f64 so the JSON round
// trip reproduces every f32 value bit for bit.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::domain::error::{RecsysError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalIndex {
    ids:        Vec<String>,
    dim:        usize,
    embeddings: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    dim:        usize,
    ids:        Vec<String>,
    embeddings: Vec<f64>,
}

impl RetrievalIndex {
    pub fn new(ids: Vec<String>, dim: usize, embeddings: Vec<f32>) -> Result<Self> {
        if embeddings.len() != ids.len() * dim {
            return Err(RecsysError::Training(format!(
                "index expects {} x {} embedding values, got {}",
                ids.len(),
                dim,
                embeddings.len()
            )));
        }
        Ok(Self { ids, dim, embeddings })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Dot-product score of `query` against every candidate, in index order.
    pub fn scores(&self, query: &[f32]) -> Vec<f32> {
        self.embeddings
            .chunks_exact(self.dim.max(1))
            .map(|row| row.iter().zip(query).map(|(a, b)| a * b).sum())
            .collect()
    }

    /// The `min(k, len)` best candidates, highest score first.
    /// Equal scores keep index order.
    pub fn query(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(usize, f32)> = self.scores(query).into_iter().enumerate().collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        scored
            .into_iter()
            .map(|(i, score)| (self.ids[i].clone(), score))
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = IndexFile {
            dim:        self.dim,
            ids:        self.ids.clone(),
            embeddings: self.embeddings.iter().map(|&v| f64::from(v)).collect(),
        };
        fs::write(path, serde_json::to_vec(&file)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            RecsysError::Storage(format!("cannot read index '{}': {e}", path.display()))
        })?;
        let file: IndexFile = serde_json::from_slice(&bytes)?;
        let embeddings = file.embeddings.into_iter().map(|v| v as f32).collect();
        Self::new(file.ids, file.dim, embeddings)
            .map_err(|e| RecsysError::Storage(format!("corrupt index '{}': {e}", path.display())))
    }
}

// ─── LazyIndex ────────────────────────────────────────────────────────────────

enum IndexState {
    Uninitialized,
    Built(Arc<RetrievalIndex>),
}

pub struct LazyIndex {
    state: Mutex<IndexState>,
}

impl LazyIndex {
    pub fn new() -> Self {
        Self { state: Mutex::new(IndexState::Uninitialized) }
    }

    pub fn built(index: RetrievalIndex) -> Self {
        Self { state: Mutex::new(IndexState::Built(Arc::new(index))) }
    }

    /// Return the index, running `build` first if it does not exist yet.
    /// The lock is held across the build, so racing callers wait for
    /// the first one instead of building their own copy.
    pub fn get_or_build<F>(&self, build: F) -> Result<Arc<RetrievalIndex>>
    where
        F: FnOnce() -> Result<RetrievalIndex>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|_| RecsysError::State("retrieval index lock poisoned".into()))?;
        if let IndexState::Built(index) = &*state {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(build()?);
        tracing::info!("Built retrieval index over {} candidates", index.len());
        *state = IndexState::Built(Arc::clone(&index));
        Ok(index)
    }

    pub fn get(&self) -> Option<Arc<RetrievalIndex>> {
        match self.state.lock() {
            Ok(state) => match &*state {
                IndexState::Built(index) => Some(Arc::clone(index)),
                IndexState::Uninitialized => None,
            },
            Err(_) => None,
        }
    }

    pub fn is_built(&self) -> bool {
        self.get().is_some()
    }
}

impl Default for LazyIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::thread;

    fn sample_index() -> RetrievalIndex {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        // a·q = 1, b·q = 3, c·q = 2 for q = [1, 1]
        RetrievalIndex::new(ids, 2, vec![1.0, 0.0, 1.5, 1.5, 0.5, 1.5]).unwrap()
    }

    #[test]
    fn test_query_orders_by_score() {
        let hits = sample_index().query(&[1.0, 1.0], 2);
        let ids: Vec<&str> = hits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn test_k_larger_than_catalog() {
        let hits = sample_index().query(&[1.0, 1.0], 10);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        assert!(RetrievalIndex::new(vec!["a".into()], 3, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_save_load_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        let index = RetrievalIndex::new(
            vec!["x".into(), "y".into()],
            2,
            vec![0.1, -1.0e-7, 3.4028235e38, 0.333_333_34],
        )
        .unwrap();
        index.save(&path).unwrap();
        assert_eq!(RetrievalIndex::load(&path).unwrap(), index);
    }

    #[test]
    fn test_missing_index_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RetrievalIndex::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.is_storage());
    }

    #[test]
    fn test_lazy_index_builds_once_under_contention() {
        let lazy = Arc::new(LazyIndex::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lazy = Arc::clone(&lazy);
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    lazy.get_or_build(|| {
                        builds.fetch_add(1, AtomicOrdering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(10));
                        Ok(sample_index())
                    })
                    .unwrap()
                    .len()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), 3);
        }
        assert_eq!(builds.load(AtomicOrdering::SeqCst), 1);
        assert!(lazy.is_built());
    }

    #[test]
    fn test_failed_build_leaves_slot_empty() {
        let lazy = LazyIndex::new();
        let r = lazy.get_or_build(|| Err(RecsysError::Training("boom".into())));
        assert!(r.is_err());
        assert!(!lazy.is_built());
        assert!(lazy.get_or_build(|| Ok(sample_index())).is_ok());
    }
}
