// ============================================================
// Layer 5 — Embedding Towers
// ============================================================
// IdTower   — id row → learned vector                  [B, D]
//             (the user tower, and the id-only item tower
//              used by the ranking model)
// ItemTower — id row + title tokens → two paths:
//               id path:   embedding lookup            [B, D]
//               text path: token embeddings, max-pooled [B, D]
//             concatenated                              [B, 2D]
//
// Rows come from a Vocabulary, whose last row is the OOV slot,
// so unknown ids always have a (learned) vector to fall back on.
// Title token 1 is the OOV token; see data::vectorizer.

use burn::{
    nn::{Embedding, EmbeddingConfig},
    prelude::*,
};

// ─── IdTower ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct IdTowerConfig {
    /// Vocabulary size including the OOV row.
    pub vocab_size: usize,
    pub dim:        usize,
}

impl IdTowerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> IdTower<B> {
        IdTower {
            embedding: EmbeddingConfig::new(self.vocab_size, self.dim).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct IdTower<B: Backend> {
    pub embedding: Embedding<B>,
}

/// The user tower is a plain id tower over the user vocabulary.
pub type UserTower<B> = IdTower<B>;

impl<B: Backend> IdTower<B> {
    /// ids: [batch, 1] → [batch, dim]
    pub fn forward(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let x = self.embedding.forward(ids);
        let [batch, _, dim] = x.dims();
        x.reshape([batch, dim])
    }
}

// ─── ItemTower ────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ItemTowerConfig {
    pub vocab_size: usize,
    pub dim:        usize,
    pub max_tokens: usize,
}

impl ItemTowerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ItemTower<B> {
        ItemTower {
            id_tower:       IdTowerConfig::new(self.vocab_size, self.dim).init(device),
            text_embedding: EmbeddingConfig::new(self.max_tokens, self.dim).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct ItemTower<B: Backend> {
    pub id_tower:       IdTower<B>,
    pub text_embedding: Embedding<B>,
}

impl<B: Backend> ItemTower<B> {
    /// ids: [batch, 1], titles: [batch, tokens] → [batch, 2 * dim]
    pub fn forward(&self, ids: Tensor<B, 2, Int>, titles: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let id_vec = self.id_tower.forward(ids);

        // [batch, tokens, dim] → [batch, dim, tokens] → max over tokens → [batch, dim]
        // ndarray's scatter (max_dim backward) only supports the last axis
        let tokens = self.text_embedding.forward(titles);
        let pooled = tokens.swap_dims(1, 2).max_dim(2);
        let [batch, dim, _] = pooled.dims();
        let text_vec = pooled.reshape([batch, dim]);

        Tensor::cat(vec![id_vec, text_vec], 1)
    }
}
