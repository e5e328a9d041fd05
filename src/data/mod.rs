// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from raw JSON records all the
// way to tensor batches.
//
// The pipeline flows in this order:
//
//   purchases.json / items.json
//       │
//       ▼
//   RecordLoader      → reads files, coerces typed records
//       │
//       ▼
//   DataPreparer      → validates, builds vocabularies,
//       │               builds the title tokenizer,
//       │               splits train/test deterministically
//       ▼
//   PurchaseDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   PurchaseBatcher   → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Reads purchase and item records from JSON files
pub mod loader;

/// Validation, vocabularies and the train/test partition
pub mod preparer;

/// Seeded shuffle and floor(ratio * N) split
pub mod splitter;

/// Item title → fixed-width token row
pub mod vectorizer;

/// Implements Burn's Dataset trait for purchase samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
