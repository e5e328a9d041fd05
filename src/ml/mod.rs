// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs a Burn module lives
// here; the data layer only hands over tensor batches.
//
//   towers.rs      — UserTower (id embedding) and ItemTower
//                    (id embedding + max-pooled title tokens)
//
//   retrieval.rs   — two-tower retrieval model trained with
//                    in-batch negatives
//
//   index.rs       — brute-force dot-product index and its
//                    build-once LazyIndex slot
//
//   ranking.rs     — dense regression head over user + item
//                    id embeddings
//
//   trainer.rs     — epoch loop (Adam), evaluation metrics
//
//   inferencer.rs  — Retriever and Ranker, the serving form of
//                    both models, with save/load
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::backend::{Autodiff, NdArray};

/// Backend used while training (records gradients).
pub type MyBackend = Autodiff<NdArray>;

/// Backend used for evaluation and serving.
pub type InferBackend = NdArray;

/// User and item embedding towers
pub mod towers;

/// Two-tower retrieval model
pub mod retrieval;

/// Candidate index built lazily from the catalog
pub mod index;

/// Purchase-amount ranking model
pub mod ranking;

/// Training loops and evaluation metrics
pub mod trainer;

/// Serving models with persistence
pub mod inferencer;
