// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns shared by the ML and application
// layers:
//
//   checkpoint.rs      — one sub-artifact directory: config,
//                        vocabularies and full-precision model
//                        weights (NamedMpkGzFileRecorder)
//
//   tokenizer_store.rs — builds the word-level title tokenizer
//                        and saves/loads it as tokenizer.json
//
//   metrics.rs         — per-epoch training loss appended to
//                        metrics.csv for later plotting
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Sub-artifact (config, vocab, weights) persistence
pub mod checkpoint;

/// Title tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Training metrics CSV logger
pub mod metrics;
