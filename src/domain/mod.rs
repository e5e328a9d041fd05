// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, enums and traits that define what the
// recommender works with:
//
//   records     — PurchaseRecord, ItemRecord, Recommendation
//   vocabulary  — ordered id sets with a reserved OOV slot
//   config      — RecsysConfig (explicit hyperparameters)
//   error       — RecsysError (Validation / State / Storage / Training)
//   traits      — RecordSource, Recommender, Persistable
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

pub mod config;
pub mod error;
pub mod records;
pub mod traits;
pub mod vocabulary;
