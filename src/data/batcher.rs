// ============================================================
// Layer 4 — Purchase Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec of
// PurchaseSamples into tensors.
//
// How batching works here:
//   Input:  N PurchaseSamples, each title row T tokens wide
//   Output: PurchaseBatch
//             users   [N, 1]  Int   (embedding rows)
//             items   [N, 1]  Int
//             titles  [N, T]  Int   (title token ids)
//             amounts [N, 1]  Float (regression labels)
//
// Ids are shaped [N, 1] because Burn's Embedding takes a
// [batch, seq] input; the towers flatten the seq axis away.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::{CatalogEntry, PurchaseSample};

// ─── PurchaseBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct PurchaseBatch<B: Backend> {
    pub users:   Tensor<B, 2, Int>,
    pub items:   Tensor<B, 2, Int>,
    pub titles:  Tensor<B, 2, Int>,
    pub amounts: Tensor<B, 2>,
}

// ─── PurchaseBatcher ──────────────────────────────────────────────────────────
/// Holds the target device so tensors are created in the right place.
#[derive(Clone, Debug)]
pub struct PurchaseBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PurchaseBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<PurchaseSample, PurchaseBatch<B>> for PurchaseBatcher<B> {
    fn batch(&self, items: Vec<PurchaseSample>) -> PurchaseBatch<B> {
        let users: Vec<usize> = items.iter().map(|s| s.user_index).collect();
        let item_rows: Vec<usize> = items.iter().map(|s| s.item_index).collect();
        let titles: Vec<&[u32]> = items.iter().map(|s| s.title_tokens.as_slice()).collect();
        let amounts: Vec<f32> = items.iter().map(|s| s.amount).collect();

        PurchaseBatch {
            users:   index_tensor(&users, &self.device),
            items:   index_tensor(&item_rows, &self.device),
            titles:  token_tensor(&titles, &self.device),
            amounts: Tensor::<B, 2>::from_data(
                TensorData::new(amounts, [items.len(), 1]),
                &self.device,
            ),
        }
    }
}

// ─── Tensor helpers ───────────────────────────────────────────────────────────

/// Embedding rows → Int tensor of shape [N, 1].
pub fn index_tensor<B: Backend>(rows: &[usize], device: &B::Device) -> Tensor<B, 2, Int> {
    let flat: Vec<i64> = rows.iter().map(|&r| r as i64).collect();
    Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [rows.len(), 1]), device)
}

/// Equal-width token rows → Int tensor of shape [N, T].
pub fn token_tensor<B: Backend>(rows: &[&[u32]], device: &B::Device) -> Tensor<B, 2, Int> {
    let width = rows.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<i64> = rows
        .iter()
        .flat_map(|r| r.iter().map(|&t| t as i64))
        .collect();
    Tensor::<B, 2, Int>::from_data(TensorData::new(flat, [rows.len(), width]), device)
}

/// Candidate-tower inputs for a slice of the catalog.
pub fn catalog_tensors<B: Backend>(
    entries: &[CatalogEntry],
    device:  &B::Device,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let rows: Vec<usize> = entries.iter().map(|e| e.item_index).collect();
    let titles: Vec<&[u32]> = entries.iter().map(|e| e.title_tokens.as_slice()).collect();
    (index_tensor(&rows, device), token_tensor(&titles, device))
}
