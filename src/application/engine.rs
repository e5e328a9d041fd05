// ============================================================
// Layer 2 — RecommendationEngine
// ============================================================
// Two-stage recommender: the retrieval model narrows the
// catalog to k candidates, the ranking model re-scores them.
//
// State machine:
//
//   Uninitialized ──fit──▶ Trained ─┐
//         │                         ├─ first infer builds the
//         └────load──▶ Loaded ──────┘   index ──▶ Ready
//
//   fit   — prepare data, train retrieval then ranking
//   eval  — Trained only; scores the held-out partition
//   infer — Trained or Loaded; retrieve k, re-rank by score
//   save  — Trained only; writes <path>/retrieval, <path>/ranking
//   load  — restores both sub-artifacts without training
//
// A failed fit or load leaves the engine exactly as it was.
// The engine never falls back to retraining on a load error;
// that choice belongs to the caller (see RecommendUseCase).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::dataset::PurchaseDataset;
use crate::data::preparer::DataPreparer;
use crate::domain::config::RecsysConfig;
use crate::domain::error::{RecsysError, Result};
use crate::domain::records::{ItemRecord, PurchaseRecord, Recommendation};
use crate::domain::traits::{Persistable, Recommender};
use crate::infra::metrics::EpochMetrics;
use crate::ml::inferencer::{Ranker, Retriever};
use crate::ml::trainer::{
    evaluate_ranking, evaluate_retrieval, train_ranking, train_retrieval, RankingMetrics,
    RetrievalMetrics,
};

pub const RETRIEVAL_DIR: &str = "retrieval";
pub const RANKING_DIR: &str = "ranking";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Trained,
    Loaded,
    /// Models present and the retrieval index built.
    Ready,
}

/// Per-epoch losses and partition sizes from one `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub train_examples: usize,
    pub test_examples:  usize,
    pub epochs:         Vec<EpochMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalReport {
    pub retrieval: RetrievalMetrics,
    pub ranking:   RankingMetrics,
}

struct Models {
    retriever: Retriever,
    ranker:    Ranker,
}

enum Slot {
    Empty,
    Trained { models: Models, test: PurchaseDataset, report: TrainReport },
    Loaded { models: Models },
}

pub struct RecommendationEngine {
    config: RecsysConfig,
    slot:   Slot,
}

impl RecommendationEngine {
    /// An untrained engine. Fails if `config` is out of range.
    pub fn new(config: RecsysConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, slot: Slot::Empty })
    }

    /// Build and train in one step.
    pub fn new_from_records(
        config:    RecsysConfig,
        purchases: &[PurchaseRecord],
        items:     &[ItemRecord],
    ) -> Result<Self> {
        let mut engine = Self::new(config)?;
        engine.fit(purchases, items)?;
        Ok(engine)
    }

    /// Restore a saved engine; its configuration comes from the artifact.
    pub fn restore_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let (config, models) = load_models(path.as_ref())?;
        Ok(Self { config, slot: Slot::Loaded { models } })
    }

    pub fn config(&self) -> &RecsysConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        match &self.slot {
            Slot::Empty => EngineState::Uninitialized,
            Slot::Trained { models, .. } | Slot::Loaded { models }
                if models.retriever.is_index_built() =>
            {
                EngineState::Ready
            }
            Slot::Trained { .. } => EngineState::Trained,
            Slot::Loaded { .. } => EngineState::Loaded,
        }
    }

    /// Report of the last `fit`, if the models were trained in this process.
    pub fn train_report(&self) -> Option<&TrainReport> {
        match &self.slot {
            Slot::Trained { report, .. } => Some(report),
            _ => None,
        }
    }

    // ─── fit ──────────────────────────────────────────────────────────────────

    pub fn fit(&mut self, purchases: &[PurchaseRecord], items: &[ItemRecord]) -> Result<&TrainReport> {
        let cfg = &self.config;
        tracing::info!("Fitting on {} purchases, {} items", purchases.len(), items.len());

        let data = DataPreparer::new(cfg).prepare(purchases, items)?;
        let device = Default::default();

        tracing::info!("Training retrieval model");
        let (retrieval, mut epochs) = train_retrieval(cfg, &data, &device)?;
        tracing::info!("Training ranking model");
        let (ranking, ranking_epochs) = train_ranking(cfg, &data, &device)?;
        epochs.extend(ranking_epochs);

        let report = TrainReport {
            train_examples: data.train.sample_count(),
            test_examples:  data.test.sample_count(),
            epochs,
        };
        let ranker = Ranker::new(
            cfg.clone(),
            data.user_vocab.clone(),
            data.item_vocab.clone(),
            ranking,
        );
        let retriever = Retriever::new(
            cfg.clone(),
            data.user_vocab,
            data.item_vocab,
            data.vectorizer,
            retrieval,
            data.catalog,
        );

        self.slot = Slot::Trained {
            models: Models { retriever, ranker },
            test: data.test,
            report,
        };
        tracing::info!("Engine trained");
        match &self.slot {
            Slot::Trained { report, .. } => Ok(report),
            _ => Err(RecsysError::State("engine lost its trained models".into())),
        }
    }

    // ─── eval ─────────────────────────────────────────────────────────────────

    pub fn eval(&self) -> Result<EvalReport> {
        let (models, test) = match &self.slot {
            Slot::Trained { models, test, .. } => (models, test),
            Slot::Loaded { .. } => {
                return Err(RecsysError::State(
                    "eval requires a trained engine; a loaded engine has no held-out partition".into(),
                ))
            }
            Slot::Empty => return Err(not_ready()),
        };
        let device = Default::default();
        let index = models.retriever.index()?;

        let retrieval = evaluate_retrieval(
            models.retriever.model(),
            &index,
            test,
            self.config.batch_size,
            &device,
        )?;
        let ranking = evaluate_ranking(models.ranker.model(), test, self.config.batch_size, &device)?;
        Ok(EvalReport { retrieval, ranking })
    }

    // ─── infer ────────────────────────────────────────────────────────────────

    /// Up to `k` items for `user_id`, ordered by ranking score, highest first.
    pub fn infer(&self, user_id: &str, k: usize) -> Result<Vec<Recommendation>> {
        let models = self.models()?;
        let (candidates, _similarity) = models.retriever.query(user_id, k)?;
        let weights = models.ranker.score_many(user_id, &candidates)?;

        let mut recs: Vec<Recommendation> = candidates
            .into_iter()
            .zip(weights)
            .map(|(item_id, weight)| Recommendation { item_id, weight })
            .collect();
        recs.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        tracing::debug!("Recommended {} items for user '{user_id}'", recs.len());
        Ok(recs)
    }

    // ─── save / load ──────────────────────────────────────────────────────────

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let models = match &self.slot {
            Slot::Trained { models, .. } => models,
            Slot::Loaded { .. } => {
                return Err(RecsysError::State("save requires a trained engine".into()))
            }
            Slot::Empty => return Err(not_ready()),
        };
        let path = path.as_ref();
        models.retriever.save(&path.join(RETRIEVAL_DIR))?;
        models.ranker.save(&path.join(RANKING_DIR))?;
        tracing::info!("Engine saved to '{}'", path.display());
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let (config, models) = load_models(path.as_ref())?;
        self.config = config;
        self.slot = Slot::Loaded { models };
        Ok(())
    }

    fn models(&self) -> Result<&Models> {
        match &self.slot {
            Slot::Trained { models, .. } | Slot::Loaded { models } => Ok(models),
            Slot::Empty => Err(not_ready()),
        }
    }
}

impl Recommender for RecommendationEngine {
    fn recommend(&self, user_id: &str, k: usize) -> Result<Vec<Recommendation>> {
        self.infer(user_id, k)
    }
}

fn not_ready() -> RecsysError {
    RecsysError::State("engine not ready: call fit or load first".into())
}

fn load_models(path: &Path) -> Result<(RecsysConfig, Models)> {
    if !path.is_dir() {
        return Err(RecsysError::Storage(format!(
            "model directory '{}' does not exist",
            path.display()
        )));
    }
    let retriever = Retriever::load(&path.join(RETRIEVAL_DIR))?;
    let ranker = Ranker::load(&path.join(RANKING_DIR))?;
    if retriever.config() != ranker.config() {
        return Err(RecsysError::Storage(format!(
            "'{}' holds retrieval and ranking models saved with different configs",
            path.display()
        )));
    }
    let config = retriever.config().clone();
    tracing::info!("Engine loaded from '{}'", path.display());
    Ok((config, Models { retriever, ranker }))
}
