// ============================================================
// Layer 5 — Serving Models
// ============================================================
// The two trained models in their serving form, each bundled
// with everything it needs to answer queries on its own:
//
//   Retriever — retrieval model + vocabularies + title
//               vectorizer + catalog + lazily built index
//               query(user, k) → (ids, scores), best first
//
//   Ranker    — ranking model + vocabularies
//               score(user, item) → predicted amount
//
// Unknown ids resolve to the OOV row of each embedding table,
// so neither call fails on an id it has never seen.
//
// Both implement Persistable; each owns one sub-directory
// (retrieval/ or ranking/) of a saved engine.

use std::path::Path;
use std::sync::Arc;

use burn::prelude::*;

use crate::data::batcher::index_tensor;
use crate::data::dataset::CatalogEntry;
use crate::data::vectorizer::TitleVectorizer;
use crate::domain::config::RecsysConfig;
use crate::domain::error::{RecsysError, Result};
use crate::domain::traits::Persistable;
use crate::domain::vocabulary::Vocabulary;
use crate::infra::checkpoint::{CheckpointManager, CONFIG_FILE, MODEL_FILE, VOCAB_FILE};
use crate::infra::tokenizer_store::{TokenizerStore, TOKENIZER_FILE};
use crate::ml::index::{LazyIndex, RetrievalIndex};
use crate::ml::ranking::{RankingModel, RankingModelConfig};
use crate::ml::retrieval::{tensor_to_vec, RetrievalModel, RetrievalModelConfig};
use crate::ml::InferBackend;

pub const INDEX_FILE: &str = "index.json";

type Device = <InferBackend as Backend>::Device;

// ─── Retriever ────────────────────────────────────────────────────────────────

pub struct Retriever {
    config:     RecsysConfig,
    user_vocab: Vocabulary,
    item_vocab: Vocabulary,
    vectorizer: TitleVectorizer,
    model:      RetrievalModel<InferBackend>,
    catalog:    Vec<CatalogEntry>,
    index:      LazyIndex,
    device:     Device,
}

impl Retriever {
    /// A freshly trained retriever; its index is built on first query.
    pub fn new(
        config:     RecsysConfig,
        user_vocab: Vocabulary,
        item_vocab: Vocabulary,
        vectorizer: TitleVectorizer,
        model:      RetrievalModel<InferBackend>,
        catalog:    Vec<CatalogEntry>,
    ) -> Self {
        Self {
            config,
            user_vocab,
            item_vocab,
            vectorizer,
            model,
            catalog,
            index: LazyIndex::new(),
            device: Default::default(),
        }
    }

    pub fn config(&self) -> &RecsysConfig {
        &self.config
    }

    pub fn model(&self) -> &RetrievalModel<InferBackend> {
        &self.model
    }

    pub fn user_vocab(&self) -> &Vocabulary {
        &self.user_vocab
    }

    pub fn item_vocab(&self) -> &Vocabulary {
        &self.item_vocab
    }

    /// The candidate index, built from the catalog on first use.
    pub fn index(&self) -> Result<Arc<RetrievalIndex>> {
        self.index
            .get_or_build(|| self.model.build_index(&self.catalog, &self.device))
    }

    pub fn is_index_built(&self) -> bool {
        self.index.is_built()
    }

    /// Query-tower output for one user.
    pub fn user_embedding(&self, user_id: &str) -> Result<Vec<f32>> {
        let row = self.user_vocab.lookup(user_id);
        tensor_to_vec(self.model.query_embedding(index_tensor(&[row], &self.device)))
    }

    /// Top `k` catalog items for `user_id`, highest similarity first.
    pub fn query(&self, user_id: &str, k: usize) -> Result<(Vec<String>, Vec<f32>)> {
        if !self.user_vocab.contains(user_id) {
            tracing::debug!("User '{user_id}' not in vocabulary, using OOV embedding");
        }
        let index = self.index()?;
        let query = self.user_embedding(user_id)?;
        Ok(index.query(&query, k).into_iter().unzip())
    }
}

impl Persistable for Retriever {
    fn save(&self, dir: &Path) -> Result<()> {
        let index = self.index()?;
        let ckpt = CheckpointManager::new(dir);
        ckpt.ensure_dir()?;
        ckpt.save_config(&self.config)?;
        ckpt.save_vocab(&self.user_vocab, &self.item_vocab)?;
        TokenizerStore::new(dir).save(self.vectorizer.tokenizer())?;
        ckpt.save_model::<InferBackend, _>(&self.model)?;
        index.save(&ckpt.path(INDEX_FILE))?;
        tracing::info!("Saved retrieval model to '{}'", dir.display());
        Ok(())
    }

    fn load(dir: &Path) -> Result<Self> {
        let ckpt = CheckpointManager::new(dir);
        ckpt.require(&[CONFIG_FILE, VOCAB_FILE, TOKENIZER_FILE, MODEL_FILE, INDEX_FILE])?;

        let config = ckpt.load_config()?;
        config
            .validate()
            .map_err(|e| RecsysError::Storage(format!("invalid stored config: {e}")))?;
        let vocab = ckpt.load_vocab()?;
        let vectorizer = TitleVectorizer::new(TokenizerStore::new(dir).load()?);

        let device: Device = Default::default();
        let model = RetrievalModelConfig::new(
            vocab.users.table_size(),
            vocab.items.table_size(),
            config.embedding_dim,
            config.max_tokens,
        )
        .init::<InferBackend>(&device);
        let model = ckpt.load_model::<InferBackend, _>(model, &device)?;

        let index = RetrievalIndex::load(&ckpt.path(INDEX_FILE))?;
        if index.dim() != config.embedding_dim {
            return Err(RecsysError::Storage(format!(
                "index dimension {} does not match embedding_dim {}",
                index.dim(),
                config.embedding_dim
            )));
        }
        tracing::info!(
            "Loaded retrieval model from '{}' ({} candidates)",
            dir.display(),
            index.len()
        );

        Ok(Self {
            config,
            user_vocab: vocab.users,
            item_vocab: vocab.items,
            vectorizer,
            model,
            catalog: Vec::new(),
            index: LazyIndex::built(index),
            device,
        })
    }
}

// ─── Ranker ───────────────────────────────────────────────────────────────────

pub struct Ranker {
    config:     RecsysConfig,
    user_vocab: Vocabulary,
    item_vocab: Vocabulary,
    model:      RankingModel<InferBackend>,
    device:     Device,
}

impl Ranker {
    pub fn new(
        config:     RecsysConfig,
        user_vocab: Vocabulary,
        item_vocab: Vocabulary,
        model:      RankingModel<InferBackend>,
    ) -> Self {
        Self { config, user_vocab, item_vocab, model, device: Default::default() }
    }

    pub fn config(&self) -> &RecsysConfig {
        &self.config
    }

    pub fn model(&self) -> &RankingModel<InferBackend> {
        &self.model
    }

    pub fn score(&self, user_id: &str, item_id: &str) -> Result<f32> {
        let scores = self.score_many(user_id, &[item_id.to_string()])?;
        scores
            .first()
            .copied()
            .ok_or_else(|| RecsysError::Training("ranking model returned no score".into()))
    }

    /// Scores for `items` against one user, in input order.
    pub fn score_many(&self, user_id: &str, items: &[String]) -> Result<Vec<f32>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let users = vec![self.user_vocab.lookup(user_id); items.len()];
        let rows: Vec<usize> = items.iter().map(|id| self.item_vocab.lookup(id)).collect();
        tensor_to_vec(self.model.forward(
            index_tensor(&users, &self.device),
            index_tensor(&rows, &self.device),
        ))
    }
}

impl Persistable for Ranker {
    fn save(&self, dir: &Path) -> Result<()> {
        let ckpt = CheckpointManager::new(dir);
        ckpt.ensure_dir()?;
        ckpt.save_config(&self.config)?;
        ckpt.save_vocab(&self.user_vocab, &self.item_vocab)?;
        ckpt.save_model::<InferBackend, _>(&self.model)?;
        tracing::info!("Saved ranking model to '{}'", dir.display());
        Ok(())
    }

    fn load(dir: &Path) -> Result<Self> {
        let ckpt = CheckpointManager::new(dir);
        ckpt.require(&[CONFIG_FILE, VOCAB_FILE, MODEL_FILE])?;

        let config = ckpt.load_config()?;
        config
            .validate()
            .map_err(|e| RecsysError::Storage(format!("invalid stored config: {e}")))?;
        let vocab = ckpt.load_vocab()?;

        let device: Device = Default::default();
        let model = RankingModelConfig::new(
            vocab.users.table_size(),
            vocab.items.table_size(),
            config.embedding_dim,
            config.layer_dims.clone(),
        )
        .init::<InferBackend>(&device);
        let model = ckpt.load_model::<InferBackend, _>(model, &device)?;
        tracing::info!("Loaded ranking model from '{}'", dir.display());

        Ok(Self { config, user_vocab: vocab.users, item_vocab: vocab.items, model, device })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    fn config() -> RecsysConfig {
        RecsysConfig {
            train_test_ratio: 0.8,
            batch_size:       2,
            layer_dims:       vec![4, 1],
            embedding_dim:    4,
            max_tokens:       8,
            num_recs:         2,
            epochs:           1,
            random_seed:      7,
            learning_rate:    0.01,
        }
    }

    fn retriever() -> Retriever {
        let cfg = config();
        let device = Default::default();
        let users = Vocabulary::from_ids(["1", "2"]);
        let items = Vocabulary::from_ids(["10", "11", "12"]);
        let vectorizer =
            TitleVectorizer::new(TokenizerStore::build(&["green tea", "black tea", "milk"], 8).unwrap());
        let catalog = ["10", "11", "12"]
            .iter()
            .zip(["green tea", "black tea", "milk"])
            .map(|(id, title)| CatalogEntry {
                item_id:      id.to_string(),
                item_index:   items.lookup(id),
                title_tokens: vectorizer.encode(title).unwrap(),
            })
            .collect();
        let model = RetrievalModelConfig::new(users.table_size(), items.table_size(), 4, 8)
            .init::<InferBackend>(&device);
        Retriever::new(cfg, users, items, vectorizer, model, catalog)
    }

    fn ranker() -> Ranker {
        let device = Default::default();
        let users = Vocabulary::from_ids(["1", "2"]);
        let items = Vocabulary::from_ids(["10", "11"]);
        let model = RankingModelConfig::new(users.table_size(), items.table_size(), 4, vec![4, 1])
            .init::<InferBackend>(&device);
        Ranker::new(config(), users, items, model)
    }

    #[test]
    fn test_index_is_built_on_first_query() {
        let r = retriever();
        assert!(!r.is_index_built());
        let (ids, scores) = r.query("1", 2).unwrap();
        assert!(r.is_index_built());
        assert_eq!(ids.len(), 2);
        assert_eq!(scores.len(), 2);
        assert!(scores[0] >= scores[1]);
    }

    #[test]
    fn test_query_caps_at_catalog_size() {
        let r = retriever();
        let (ids, _) = r.query("2", 50).unwrap();
        assert_eq!(ids.len(), 3);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_unknown_user_uses_oov_row() {
        let r = retriever();
        let (ids, scores) = r.query("999", 2).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_retriever_save_load_reproduces_queries() {
        let dir = tempfile::tempdir().unwrap();
        let r = retriever();
        r.save(dir.path()).unwrap();

        let restored = Retriever::load(dir.path()).unwrap();
        assert!(restored.is_index_built());
        assert_eq!(r.query("1", 3).unwrap(), restored.query("1", 3).unwrap());
    }

    #[test]
    fn test_retriever_load_rejects_partial_artifact() {
        let dir = tempfile::tempdir().unwrap();
        retriever().save(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join(INDEX_FILE)).unwrap();
        assert!(matches!(Retriever::load(dir.path()), Err(RecsysError::Storage(_))));
    }

    #[test]
    fn test_ranker_scores_match_batch_and_single() {
        let r = ranker();
        let many = r.score_many("1", &["10".into(), "11".into(), "unknown".into()]).unwrap();
        assert_eq!(many.len(), 3);
        assert!((r.score("1", "11").unwrap() - many[1]).abs() < 1e-5);
        assert!(many.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_ranker_save_load_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let r = ranker();
        r.save(dir.path()).unwrap();
        let restored = Ranker::load(dir.path()).unwrap();
        let items = vec!["10".to_string(), "11".to_string()];
        assert_eq!(r.score_many("2", &items).unwrap(), restored.score_many("2", &items).unwrap());
    }
}
