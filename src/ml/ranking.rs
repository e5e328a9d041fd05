// ============================================================
// Layer 5 — Ranking Model
// ============================================================
// Predicts how many units a user will buy of an item:
//
//   x = concat( UserTower(user), IdTower(item) )     [B, 2D]
//   x = ReLU(Dense(layer_dims[0])(x))
//   ...
//   y = Dense(1)(x)                                  [B, 1]
//
// Trained with mean-squared error against the purchase amount;
// evaluated with root-mean-squared error. The embedding tables
// are independent of the retrieval model's (no weight sharing).

use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::data::batcher::PurchaseBatch;
use crate::ml::towers::{IdTower, IdTowerConfig};

#[derive(Config, Debug)]
pub struct RankingModelConfig {
    pub user_vocab_size: usize,
    pub item_vocab_size: usize,
    pub embedding_dim:   usize,
    /// Dense widths; the last must be 1.
    pub layer_dims:      Vec<usize>,
}

impl RankingModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RankingModel<B> {
        let d = self.embedding_dim;
        let mut layers = Vec::with_capacity(self.layer_dims.len());
        let mut input = 2 * d;
        for &width in &self.layer_dims {
            layers.push(LinearConfig::new(input, width).init(device));
            input = width;
        }
        RankingModel {
            user_tower: IdTowerConfig::new(self.user_vocab_size, d).init(device),
            item_tower: IdTowerConfig::new(self.item_vocab_size, d).init(device),
            layers,
        }
    }
}

#[derive(Module, Debug)]
pub struct RankingModel<B: Backend> {
    pub user_tower: IdTower<B>,
    pub item_tower: IdTower<B>,
    pub layers:     Vec<Linear<B>>,
}

impl<B: Backend> RankingModel<B> {
    /// users, items: [batch, 1] → predicted amounts [batch, 1]
    pub fn forward(&self, users: Tensor<B, 2, Int>, items: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let mut x = Tensor::cat(
            vec![self.user_tower.forward(users), self.item_tower.forward(items)],
            1,
        );
        let last = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = relu(x);
            }
        }
        x
    }

    /// Mean-squared error against the purchase amounts.
    pub fn forward_loss(&self, batch: PurchaseBatch<B>) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let predictions = self.forward(batch.users, batch.items);
        let loss = MseLoss::new().forward(predictions.clone(), batch.amounts, Reduction::Mean);
        (loss, predictions)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::index_tensor;
    use burn::backend::NdArray;

    #[test]
    fn test_output_is_one_scalar_per_pair() {
        let device = Default::default();
        let m: RankingModel<NdArray> = RankingModelConfig::new(3, 3, 4, vec![8, 4, 1]).init(&device);
        assert_eq!(m.layers.len(), 3);
        let out = m.forward(index_tensor(&[0, 1, 2], &device), index_tensor(&[2, 2, 0], &device));
        assert_eq!(out.dims(), [3, 1]);
    }
}
