// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one full offline training run:
//
//   Step 1: Read purchases + items      (Layer 4 - data)
//   Step 2: Fit both models             (Layer 2 - engine)
//   Step 3: Evaluate on the test split  (Layer 5 - ml)
//   Step 4: Save the artifact and the per-epoch losses into
//           `<model_dir>.partial`, then rename it to `model_dir`
//
// A failed run leaves no `model_dir` behind.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::engine::{EvalReport, RecommendationEngine, TrainReport};
use crate::domain::config::RecsysConfig;
use crate::domain::traits::RecordSource;
use crate::infra::metrics::MetricsLogger;

/// What a training run produced.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub report: TrainReport,
    pub eval:   EvalReport,
}

pub struct TrainUseCase<S: RecordSource> {
    config:    RecsysConfig,
    source:    S,
    model_dir: PathBuf,
}

impl<S: RecordSource> TrainUseCase<S> {
    pub fn new(config: RecsysConfig, source: S, model_dir: impl Into<PathBuf>) -> Self {
        Self { config, source, model_dir: model_dir.into() }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainOutcome> {
        let (engine, outcome) = fit_and_evaluate(&self.config, &self.source)?;
        persist(&engine, &outcome.report, &self.model_dir)?;
        Ok(outcome)
    }
}

/// Steps 1-3, shared with RecommendUseCase's cold start.
pub(crate) fn fit_and_evaluate<S: RecordSource>(
    config: &RecsysConfig,
    source: &S,
) -> Result<(RecommendationEngine, TrainOutcome)> {
    // ── Step 1: Read records ──────────────────────────────────────────────────
    let purchases = source.purchases().context("reading purchases")?;
    let items     = source.items().context("reading items")?;

    // ── Step 2: Fit ───────────────────────────────────────────────────────────
    let mut engine = RecommendationEngine::new(config.clone())?;
    let report = engine.fit(&purchases, &items)?.clone();

    // ── Step 3: Evaluate ──────────────────────────────────────────────────────
    let eval = engine.eval()?;
    for t in &eval.retrieval.top_k {
        tracing::info!("[retrieval] top_{}_accuracy={:.4}", t.k, t.accuracy);
    }
    tracing::info!("[ranking] rmse={:.4}", eval.ranking.rmse);

    Ok((engine, TrainOutcome { report, eval }))
}

/// Step 4: write engine + metrics to a staging dir, then swap it in.
pub(crate) fn persist(
    engine:    &RecommendationEngine,
    report:    &TrainReport,
    model_dir: &Path,
) -> Result<()> {
    let staging = staging_dir(model_dir);
    if staging.is_dir() {
        fs::remove_dir_all(&staging)
            .with_context(|| format!("clearing stale '{}'", staging.display()))?;
    }

    let written = write_artifact(engine, report, &staging).and_then(|()| {
        if model_dir.exists() {
            fs::remove_dir_all(model_dir)
                .with_context(|| format!("replacing '{}'", model_dir.display()))?;
        }
        fs::rename(&staging, model_dir)
            .with_context(|| format!("moving '{}' into place", staging.display()))
    });
    if written.is_err() && staging.is_dir() {
        if let Err(e) = fs::remove_dir_all(&staging) {
            tracing::warn!("Could not clean up '{}': {e}", staging.display());
        }
    }
    written.with_context(|| format!("saving model to '{}'", model_dir.display()))?;

    tracing::info!("Model published to '{}'", model_dir.display());
    Ok(())
}

fn write_artifact(engine: &RecommendationEngine, report: &TrainReport, dir: &Path) -> Result<()> {
    engine.save(dir)?;
    let logger = MetricsLogger::new(dir)?;
    logger.log_all(&report.epochs)?;
    tracing::info!("Epoch metrics written to '{}'", logger.csv_path().display());
    Ok(())
}

/// `<parent>/<name>.partial`, next to `model_dir`.
pub(crate) fn staging_dir(model_dir: &Path) -> PathBuf {
    let name = model_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    model_dir.with_file_name(format!("{name}.partial"))
}
