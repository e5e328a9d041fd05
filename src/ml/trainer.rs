// ============================================================
// Layer 5 — Training and Evaluation Loops
// ============================================================
// Both models share one epoch loop:
//
//   for epoch in 1..=epochs:
//       for batch in train_loader (reshuffled every epoch):
//           loss = model.forward_loss(batch)
//           stop with TrainingError if loss is not finite
//           θ ← Adam(θ, ∇loss)
//   finally: re-score the train set with the final θ and stop
//            with TrainingError if any loss is not finite
//
// The backend RNG is seeded from random_seed before each model
// is initialised, so a fit is repeatable.
//
// Training runs on MyBackend (Autodiff<NdArray>); the returned
// models are `.valid()` copies on the inner NdArray backend,
// which is what evaluation and serving use.
//
// Evaluation (no gradients, no shuffling, batches of 2x size):
//   retrieval — mean in-batch loss + factorized top-k accuracy:
//               for each test pair, the positive item's score is
//               compared against every catalog candidate; a hit
//               at k means fewer than k candidates outscore it
//   ranking   — MSE and RMSE against the purchase amounts
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::ElementConversion,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::{PurchaseBatch, PurchaseBatcher};
use crate::data::dataset::PurchaseDataset;
use crate::data::preparer::PreparedData;
use crate::domain::config::RecsysConfig;
use crate::domain::error::{RecsysError, Result};
use crate::infra::metrics::EpochMetrics;
use crate::ml::index::RetrievalIndex;
use crate::ml::ranking::{RankingModel, RankingModelConfig};
use crate::ml::retrieval::{tensor_to_vec, RetrievalModel, RetrievalModelConfig};
use crate::ml::{InferBackend, MyBackend};

/// Cut-offs reported by the factorized top-k metric.
pub const TOP_K_CUTOFFS: [usize; 5] = [1, 5, 10, 50, 100];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKAccuracy {
    pub k:        usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMetrics {
    pub examples: usize,
    pub loss:     f64,
    pub top_k:    Vec<TopKAccuracy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingMetrics {
    pub examples: usize,
    /// Mean squared error
    pub loss:     f64,
    pub rmse:     f64,
}

// ─── Training ─────────────────────────────────────────────────────────────────

pub fn train_retrieval(
    cfg:    &RecsysConfig,
    data:   &PreparedData,
    device: &<MyBackend as Backend>::Device,
) -> Result<(RetrievalModel<InferBackend>, Vec<EpochMetrics>)> {
    MyBackend::seed(cfg.random_seed);
    let model: RetrievalModel<MyBackend> = RetrievalModelConfig::new(
        data.user_vocab.table_size(),
        data.item_vocab.table_size(),
        cfg.embedding_dim,
        cfg.max_tokens,
    )
    .init(device);
    tracing::info!("Retrieval model ready: embedding_dim={}", cfg.embedding_dim);

    let (model, history) = fit_epochs(model, "retrieval", cfg, &data.train, device, |m, batch| {
        m.forward_loss(batch)
    })?;
    Ok((model.valid(), history))
}

pub fn train_ranking(
    cfg:    &RecsysConfig,
    data:   &PreparedData,
    device: &<MyBackend as Backend>::Device,
) -> Result<(RankingModel<InferBackend>, Vec<EpochMetrics>)> {
    MyBackend::seed(cfg.random_seed);
    let model: RankingModel<MyBackend> = RankingModelConfig::new(
        data.user_vocab.table_size(),
        data.item_vocab.table_size(),
        cfg.embedding_dim,
        cfg.layer_dims.clone(),
    )
    .init(device);
    tracing::info!("Ranking model ready: layers={:?}", cfg.layer_dims);

    let (model, history) = fit_epochs(model, "ranking", cfg, &data.train, device, |m, batch| {
        m.forward_loss(batch).0
    })?;
    Ok((model.valid(), history))
}

fn fit_epochs<M, F>(
    mut model: M,
    stage:     &str,
    cfg:       &RecsysConfig,
    train:     &PurchaseDataset,
    device:    &<MyBackend as Backend>::Device,
    loss_fn:   F,
) -> Result<(M, Vec<EpochMetrics>)>
where
    M: AutodiffModule<MyBackend>,
    F: Fn(&M, PurchaseBatch<MyBackend>) -> Tensor<MyBackend, 1>,
{
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init::<MyBackend, M>();

    let loader = DataLoaderBuilder::new(PurchaseBatcher::<MyBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.random_seed)
        .build(train.clone());

    let mut history = Vec::with_capacity(cfg.epochs);
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            let loss = loss_fn(&model, batch);
            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                return Err(RecsysError::Training(format!(
                    "{stage} loss became {loss_val} in epoch {epoch}"
                )));
            }
            loss_sum += loss_val;
            batches  += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let avg = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        tracing::info!("[{stage}] epoch {epoch:>3}/{} | train_loss={avg:.4}", cfg.epochs);
        history.push(EpochMetrics::new(stage, epoch, avg));
    }

    // losses above are taken before each step; re-score with the final parameters
    for batch in loader.iter() {
        let loss_val: f64 = loss_fn(&model, batch).into_scalar().elem::<f64>();
        if !loss_val.is_finite() {
            return Err(RecsysError::Training(format!(
                "{stage} parameters diverged: final loss is {loss_val}"
            )));
        }
    }

    Ok((model, history))
}

// ─── Evaluation ───────────────────────────────────────────────────────────────

pub fn evaluate_retrieval(
    model:      &RetrievalModel<InferBackend>,
    index:      &RetrievalIndex,
    test:       &PurchaseDataset,
    batch_size: usize,
    device:     &<InferBackend as Backend>::Device,
) -> Result<RetrievalMetrics> {
    let loader = DataLoaderBuilder::new(PurchaseBatcher::<InferBackend>::new(device.clone()))
        .batch_size(2 * batch_size)
        .build(test.clone());

    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut examples = 0usize;
    let mut hits     = [0usize; TOP_K_CUTOFFS.len()];

    for batch in loader.iter() {
        let loss: f64 = model.forward_loss(batch.clone()).into_scalar().elem::<f64>();
        loss_sum += loss;
        batches  += 1;

        let query    = tensor_to_vec(model.query_embedding(batch.users))?;
        let positive = tensor_to_vec(model.candidate_embedding(batch.items, batch.titles))?;
        let dim = index.dim().max(1);

        for (q, p) in query.chunks_exact(dim).zip(positive.chunks_exact(dim)) {
            let positive_score: f32 = q.iter().zip(p).map(|(a, b)| a * b).sum();
            let rank = index.scores(q).into_iter().filter(|&s| s > positive_score).count();
            for (hit, &k) in hits.iter_mut().zip(TOP_K_CUTOFFS.iter()) {
                if rank < k {
                    *hit += 1;
                }
            }
            examples += 1;
        }
    }

    let loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
    let top_k = TOP_K_CUTOFFS
        .iter()
        .zip(hits)
        .map(|(&k, hit)| TopKAccuracy {
            k,
            accuracy: if examples > 0 { hit as f64 / examples as f64 } else { 0.0 },
        })
        .collect();

    tracing::info!("[retrieval] eval on {examples} pairs | loss={loss:.4}");
    Ok(RetrievalMetrics { examples, loss, top_k })
}

pub fn evaluate_ranking(
    model:      &RankingModel<InferBackend>,
    test:       &PurchaseDataset,
    batch_size: usize,
    device:     &<InferBackend as Backend>::Device,
) -> Result<RankingMetrics> {
    let loader = DataLoaderBuilder::new(PurchaseBatcher::<InferBackend>::new(device.clone()))
        .batch_size(2 * batch_size)
        .build(test.clone());

    let mut squared_error = 0.0f64;
    let mut examples      = 0usize;

    for batch in loader.iter() {
        let labels = tensor_to_vec(batch.amounts.clone())?;
        let predictions = tensor_to_vec(model.forward(batch.users, batch.items))?;
        for (y, y_hat) in labels.iter().zip(&predictions) {
            let err = f64::from(*y_hat) - f64::from(*y);
            squared_error += err * err;
            examples += 1;
        }
    }

    let loss = if examples > 0 { squared_error / examples as f64 } else { f64::NAN };
    let rmse = loss.sqrt();
    tracing::info!("[ranking] eval on {examples} pairs | mse={loss:.4} | rmse={rmse:.4}");
    Ok(RankingMetrics { examples, loss, rmse })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preparer::DataPreparer;
    use crate::domain::records::{ItemRecord, PurchaseRecord};

    fn config() -> RecsysConfig {
        RecsysConfig {
            train_test_ratio: 0.75,
            batch_size:       2,
            layer_dims:       vec![8, 1],
            embedding_dim:    4,
            max_tokens:       8,
            num_recs:         2,
            epochs:           2,
            random_seed:      42,
            learning_rate:    0.05,
        }
    }

    fn prepared(cfg: &RecsysConfig) -> PreparedData {
        let purchases = vec![
            PurchaseRecord::new("1", "10", 2.0),
            PurchaseRecord::new("1", "11", 1.0),
            PurchaseRecord::new("2", "10", 5.0),
            PurchaseRecord::new("2", "12", 3.0),
            PurchaseRecord::new("3", "11", 1.0),
            PurchaseRecord::new("3", "12", 4.0),
            PurchaseRecord::new("4", "10", 2.0),
            PurchaseRecord::new("4", "11", 1.0),
        ];
        let items = vec![
            ItemRecord::new("10", "green tea"),
            ItemRecord::new("11", "black tea"),
            ItemRecord::new("12", "oat milk"),
        ];
        DataPreparer::new(cfg).prepare(&purchases, &items).unwrap()
    }

    #[test]
    fn test_training_records_one_row_per_epoch() {
        let cfg = config();
        let data = prepared(&cfg);
        let device = Default::default();

        let (_, retrieval) = train_retrieval(&cfg, &data, &device).unwrap();
        let (_, ranking) = train_ranking(&cfg, &data, &device).unwrap();

        assert_eq!(retrieval.iter().map(|m| m.epoch).collect::<Vec<_>>(), vec![1, 2]);
        assert!(retrieval.iter().all(|m| m.stage == "retrieval" && m.train_loss.is_finite()));
        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|m| m.stage == "ranking" && m.train_loss.is_finite()));
    }

    #[test]
    fn test_divergent_last_step_is_training_error() {
        let mut cfg = config();
        cfg.learning_rate = 1e30;
        cfg.epochs = 1;
        cfg.batch_size = 8;
        let data = prepared(&cfg);
        let device = Default::default();

        assert!(matches!(train_retrieval(&cfg, &data, &device), Err(RecsysError::Training(_))));
        assert!(matches!(train_ranking(&cfg, &data, &device), Err(RecsysError::Training(_))));
    }

    #[test]
    fn test_evaluation_reports_all_cutoffs_and_rmse() {
        let cfg = config();
        let data = prepared(&cfg);
        let train_device = Default::default();
        let device = Default::default();

        let (retrieval, _) = train_retrieval(&cfg, &data, &train_device).unwrap();
        let (ranking, _) = train_ranking(&cfg, &data, &train_device).unwrap();
        let index = retrieval.build_index(&data.catalog, &device).unwrap();

        let r = evaluate_retrieval(&retrieval, &index, &data.test, cfg.batch_size, &device).unwrap();
        assert_eq!(r.examples, data.test.sample_count());
        assert_eq!(r.top_k.iter().map(|t| t.k).collect::<Vec<_>>(), TOP_K_CUTOFFS.to_vec());
        // three catalog items: every positive is within the top 5
        assert!(r.top_k.iter().skip(1).all(|t| t.accuracy == 1.0));

        let m = evaluate_ranking(&ranking, &data.test, cfg.batch_size, &device).unwrap();
        assert_eq!(m.examples, data.test.sample_count());
        assert!((m.rmse - m.loss.sqrt()).abs() < 1e-12);
    }
}
