// ============================================================
// Layer 2 — RecommendUseCase
// ============================================================
// The serving boundary's engine selection policy:
//
//   model_dir exists?  ── yes ──▶ restore_from_path
//          │
//          no
//          ▼
//   fit ▶ eval ▶ save   (once; later runs take the load path)
//
// The save goes through a staging dir, so `model_dir` exists
// only once a complete artifact is in it.
//
// A load failure is reported, never silently retrained over.
// Results are joined with the item catalog so the caller gets
// titles and prices alongside each item id.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::engine::RecommendationEngine;
use crate::application::train_use_case::{fit_and_evaluate, persist};
use crate::domain::config::RecsysConfig;
use crate::domain::records::ItemRecord;
use crate::domain::traits::{RecordSource, Recommender};

/// One recommendation with its catalog details, if known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedItem {
    pub item_id: String,
    pub weight:  f32,
    pub title:   Option<String>,
    pub price:   Option<f64>,
}

pub struct RecommendUseCase<S: RecordSource> {
    source: S,
    engine: RecommendationEngine,
}

impl<S: RecordSource> RecommendUseCase<S> {
    /// Load the engine from `model_dir`, or train and save it there on cold start.
    pub fn new(config: RecsysConfig, source: S, model_dir: impl Into<PathBuf>) -> Result<Self> {
        let model_dir = model_dir.into();
        let engine = if model_dir.exists() {
            tracing::info!("Restoring engine from '{}'", model_dir.display());
            RecommendationEngine::restore_from_path(&model_dir)
                .with_context(|| format!("loading model from '{}'", model_dir.display()))?
        } else {
            tracing::info!("No model at '{}', training a new one", model_dir.display());
            let (engine, outcome) = fit_and_evaluate(&config, &source)?;
            persist(&engine, &outcome.report, &model_dir)?;
            engine
        };
        Ok(Self { source, engine })
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    /// Top `k` items for `user_id` (the configured `num_recs` when `None`).
    pub fn recommend(&self, user_id: &str, k: Option<usize>) -> Result<Vec<RecommendedItem>> {
        let k = k.unwrap_or(self.engine.config().num_recs);
        let recs = self.engine.recommend(user_id, k)?;

        let items = self.source.items().unwrap_or_else(|e| {
            tracing::warn!("Item details unavailable: {e}");
            Vec::new()
        });
        let details: HashMap<&str, &ItemRecord> =
            items.iter().map(|i| (i.item_id.as_str(), i)).collect();

        Ok(recs
            .into_iter()
            .map(|r| {
                let item = details.get(r.item_id.as_str());
                RecommendedItem {
                    title:   item.map(|i| i.title.clone()),
                    price:   item.map(|i| i.price),
                    item_id: r.item_id,
                    weight:  r.weight,
                }
            })
            .collect())
    }
}
