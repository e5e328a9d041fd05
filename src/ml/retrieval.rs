// ============================================================
// Layer 5 — Retrieval Model (two towers)
// ============================================================
// Learns user and item vectors that are close (high dot
// product) when the user bought the item.
//
//   query     = Dense(D)( UserTower(user) )                [B, D]
//   candidate = Dense(D)( ItemTower(item, title) )         [B, D]
//   scores    = query · candidateᵀ                         [B, B]
//
// Loss uses in-batch negatives: row i of `scores` is a softmax
// over every candidate in the batch, and the correct class is
// candidate i (the item user i actually bought). Every other
// item in the batch acts as a negative example.
//
// Reference: Yi et al. (2019) Sampling-Bias-Corrected Neural
//            Modeling for Large Corpus Item Recommendations

use burn::{
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::data::batcher::{catalog_tensors, PurchaseBatch};
use crate::data::dataset::CatalogEntry;
use crate::domain::error::{self, RecsysError};
use crate::ml::index::RetrievalIndex;
use crate::ml::towers::{IdTower, IdTowerConfig, ItemTower, ItemTowerConfig};

/// Catalog rows pushed through the candidate tower per forward pass.
const CATALOG_CHUNK: usize = 256;

#[derive(Config, Debug)]
pub struct RetrievalModelConfig {
    pub user_vocab_size: usize,
    pub item_vocab_size: usize,
    pub embedding_dim:   usize,
    pub max_tokens:      usize,
}

impl RetrievalModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RetrievalModel<B> {
        let d = self.embedding_dim;
        RetrievalModel {
            user_tower:      IdTowerConfig::new(self.user_vocab_size, d).init(device),
            query_dense:     LinearConfig::new(d, d).init(device),
            item_tower:      ItemTowerConfig::new(self.item_vocab_size, d, self.max_tokens)
                .init(device),
            candidate_dense: LinearConfig::new(2 * d, d).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct RetrievalModel<B: Backend> {
    pub user_tower:      IdTower<B>,
    pub query_dense:     Linear<B>,
    pub item_tower:      ItemTower<B>,
    pub candidate_dense: Linear<B>,
}

impl<B: Backend> RetrievalModel<B> {
    /// users: [batch, 1] → [batch, dim]
    pub fn query_embedding(&self, users: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.query_dense.forward(self.user_tower.forward(users))
    }

    /// items: [batch, 1], titles: [batch, tokens] → [batch, dim]
    pub fn candidate_embedding(
        &self,
        items:  Tensor<B, 2, Int>,
        titles: Tensor<B, 2, Int>,
    ) -> Tensor<B, 2> {
        self.candidate_dense.forward(self.item_tower.forward(items, titles))
    }

    /// In-batch softmax cross-entropy.
    pub fn forward_loss(&self, batch: PurchaseBatch<B>) -> Tensor<B, 1> {
        let query = self.query_embedding(batch.users);
        let candidate = self.candidate_embedding(batch.items, batch.titles);
        let [batch_size, _] = query.dims();
        let device = query.device();

        let scores = query.matmul(candidate.transpose());
        let targets = Tensor::<B, 1, Int>::arange(0..batch_size as i64, &device);

        CrossEntropyLossConfig::new()
            .init(&device)
            .forward(scores, targets)
    }

    /// Brute-force index over the candidate-tower output of every catalog entry.
    pub fn build_index(&self, catalog: &[CatalogEntry], device: &B::Device) -> error::Result<RetrievalIndex> {
        let mut embeddings = Vec::new();
        let mut dim = 0;
        for chunk in catalog.chunks(CATALOG_CHUNK) {
            let (items, titles) = catalog_tensors::<B>(chunk, device);
            let out = self.candidate_embedding(items, titles);
            dim = out.dims()[1];
            embeddings.extend(tensor_to_vec(out)?);
        }
        let ids = catalog.iter().map(|e| e.item_id.clone()).collect();
        RetrievalIndex::new(ids, dim, embeddings)
    }
}

/// Copy a float tensor back to host memory (row-major).
pub fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> error::Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| RecsysError::Training(format!("cannot read tensor data: {e:?}")))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::PurchaseBatcher;
    use crate::data::dataset::PurchaseSample;
    use burn::backend::NdArray;
    use burn::data::dataloader::batcher::Batcher;
    use burn::tensor::ElementConversion;

    fn model(device: &<NdArray as Backend>::Device) -> RetrievalModel<NdArray> {
        RetrievalModelConfig::new(3, 4, 8, 16).init(device)
    }

    #[test]
    fn test_model_config_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retrieval_model.json");
        RetrievalModelConfig::new(3, 4, 8, 16).save(&path).unwrap();

        let restored = RetrievalModelConfig::load(&path).unwrap();
        assert_eq!(restored.user_vocab_size, 3);
        assert_eq!(restored.item_vocab_size, 4);
        assert_eq!(restored.embedding_dim, 8);
        assert_eq!(restored.max_tokens, 16);
    }

    #[test]
    fn test_embedding_shapes() {
        let device = Default::default();
        let m = model(&device);
        let catalog: Vec<CatalogEntry> = (0..3)
            .map(|i| CatalogEntry {
                item_id:      format!("i{i}"),
                item_index:   i,
                title_tokens: vec![2, 3],
            })
            .collect();
        let index = m.build_index(&catalog, &device).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dim(), 8);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let device = Default::default();
        let m = model(&device);
        let batcher = PurchaseBatcher::<NdArray>::new(device);
        let samples = (0..3)
            .map(|i| PurchaseSample {
                user_index:   i,
                item_index:   i,
                title_tokens: vec![2, 2],
                amount:       1.0,
            })
            .collect();
        let loss: f64 = m.forward_loss(batcher.batch(samples)).into_scalar().elem::<f64>();
        assert!(loss.is_finite());
        assert!(loss > 0.0);
    }
}
