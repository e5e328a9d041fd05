// ============================================================
// Layer 4 — Data Preparer
// ============================================================
// Turns the raw record collections into everything the models
// train on, in one pass:
//
//   Step 1: Validate records           (ids present, amounts finite)
//   Step 2: Deduplicate the catalog    (first occurrence of an id wins)
//   Step 3: Build vocabularies         (users from purchases,
//                                       items from catalog + purchases)
//   Step 4: Build the title tokenizer  (bounded by max_tokens)
//   Step 5: Seeded shuffle + split     (floor(ratio * N) for training)
//   Step 6: Resolve samples            (ids → rows, titles → tokens)
//
// The resolved samples are the cached views: every epoch reuses
// them, so coercion and lookup never happen twice.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

use std::collections::{HashMap, HashSet};

use crate::data::dataset::{CatalogEntry, PurchaseDataset, PurchaseSample};
use crate::data::splitter::split_train_test;
use crate::data::vectorizer::TitleVectorizer;
use crate::domain::config::RecsysConfig;
use crate::domain::error::{RecsysError, Result};
use crate::domain::records::{ItemRecord, PurchaseRecord};
use crate::domain::vocabulary::Vocabulary;
use crate::infra::tokenizer_store::TokenizerStore;

/// Deterministic train/test partition of the purchase records.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub train: Vec<PurchaseRecord>,
    pub test:  Vec<PurchaseRecord>,
}

/// Output of [`DataPreparer::prepare`].
pub struct PreparedData {
    pub partition:  Partition,
    pub user_vocab: Vocabulary,
    pub item_vocab: Vocabulary,
    pub vectorizer: TitleVectorizer,
    /// Deduplicated catalog in input order.
    pub catalog:    Vec<CatalogEntry>,
    pub train:      PurchaseDataset,
    pub test:       PurchaseDataset,
}

pub struct DataPreparer {
    train_test_ratio: f64,
    seed:             u64,
    max_tokens:       usize,
}

impl DataPreparer {
    pub fn new(config: &RecsysConfig) -> Self {
        Self {
            train_test_ratio: config.train_test_ratio,
            seed:             config.random_seed,
            max_tokens:       config.max_tokens,
        }
    }

    pub fn prepare(&self, purchases: &[PurchaseRecord], items: &[ItemRecord]) -> Result<PreparedData> {
        // ── Step 1: Validate ──────────────────────────────────────────────────
        validate_purchases(purchases)?;
        validate_items(items)?;

        // ── Step 2: Deduplicate catalog ───────────────────────────────────────
        let mut seen = HashSet::new();
        let catalog_items: Vec<&ItemRecord> = items
            .iter()
            .filter(|item| seen.insert(item.item_id.as_str()))
            .collect();
        if catalog_items.len() < items.len() {
            tracing::warn!(
                "Dropped {} duplicate catalog entries",
                items.len() - catalog_items.len()
            );
        }

        // ── Step 3: Vocabularies ──────────────────────────────────────────────
        let user_vocab = Vocabulary::from_ids(purchases.iter().map(|p| p.user_id.as_str()));
        // items come from the catalog only; uncatalogued purchases land on OOV
        let item_vocab = Vocabulary::from_ids(catalog_items.iter().map(|i| i.item_id.as_str()));
        tracing::info!(
            "Vocabularies: {} users, {} items (+1 OOV slot each)",
            user_vocab.len(),
            item_vocab.len()
        );

        // ── Step 4: Title tokenizer ───────────────────────────────────────────
        let titles: Vec<&str> = catalog_items.iter().map(|i| i.title.as_str()).collect();
        let vectorizer = TitleVectorizer::new(TokenizerStore::build(&titles, self.max_tokens)?);

        let mut title_tokens: HashMap<&str, Vec<u32>> = HashMap::new();
        let mut catalog = Vec::with_capacity(catalog_items.len());
        for item in &catalog_items {
            let tokens = vectorizer.encode(&item.title)?;
            title_tokens.insert(item.item_id.as_str(), tokens.clone());
            catalog.push(CatalogEntry {
                item_id:      item.item_id.clone(),
                item_index:   item_vocab.lookup(&item.item_id),
                title_tokens: tokens,
            });
        }
        // purchased items missing from the catalog have no title
        let untitled = vectorizer.encode("")?;

        // ── Step 5: Split ─────────────────────────────────────────────────────
        let (train, test) = split_train_test(purchases.to_vec(), self.train_test_ratio, self.seed);
        if train.is_empty() {
            return Err(RecsysError::Validation(format!(
                "training partition is empty ({} purchases, ratio {})",
                purchases.len(),
                self.train_test_ratio
            )));
        }
        tracing::info!("Split: {} train, {} test", train.len(), test.len());

        // ── Step 6: Resolve samples ───────────────────────────────────────────
        let resolve = |records: &[PurchaseRecord]| -> Vec<PurchaseSample> {
            records
                .iter()
                .map(|p| PurchaseSample {
                    user_index:   user_vocab.lookup(&p.user_id),
                    item_index:   item_vocab.lookup(&p.item_id),
                    title_tokens: title_tokens
                        .get(p.item_id.as_str())
                        .cloned()
                        .unwrap_or_else(|| untitled.clone()),
                    amount:       p.amount,
                })
                .collect()
        };
        let train_set = PurchaseDataset::new(resolve(&train));
        let test_set  = PurchaseDataset::new(resolve(&test));

        Ok(PreparedData {
            partition: Partition { train, test },
            user_vocab,
            item_vocab,
            vectorizer,
            catalog,
            train: train_set,
            test: test_set,
        })
    }
}

fn validate_purchases(purchases: &[PurchaseRecord]) -> Result<()> {
    if purchases.is_empty() {
        return Err(RecsysError::Validation("no purchase records supplied".into()));
    }
    for (i, p) in purchases.iter().enumerate() {
        if p.user_id.trim().is_empty() {
            return Err(RecsysError::Validation(format!("purchase record #{i}: missing user_id")));
        }
        if p.item_id.trim().is_empty() {
            return Err(RecsysError::Validation(format!("purchase record #{i}: missing item_id")));
        }
        if !p.amount.is_finite() {
            return Err(RecsysError::Validation(format!(
                "purchase record #{i}: amount must be finite, got {}",
                p.amount
            )));
        }
    }
    Ok(())
}

fn validate_items(items: &[ItemRecord]) -> Result<()> {
    if items.is_empty() {
        return Err(RecsysError::Validation("item catalog is empty".into()));
    }
    for (i, item) in items.iter().enumerate() {
        if item.item_id.trim().is_empty() {
            return Err(RecsysError::Validation(format!("item record #{i}: missing item_id")));
        }
    }
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn config(ratio: f64, seed: u64) -> RecsysConfig {
        RecsysConfig {
            train_test_ratio: ratio,
            batch_size:       2,
            layer_dims:       vec![4, 1],
            embedding_dim:    4,
            max_tokens:       16,
            num_recs:         2,
            epochs:           1,
            random_seed:      seed,
            learning_rate:    0.05,
        }
    }

    fn purchases(n: usize) -> Vec<PurchaseRecord> {
        (0..n)
            .map(|i| PurchaseRecord::new(format!("u{}", i % 7), format!("i{}", i % 5), (i % 3) as f32 + 1.0))
            .collect()
    }

    fn items() -> Vec<ItemRecord> {
        (0..5).map(|i| ItemRecord::new(format!("i{i}"), format!("Item number {i}"))).collect()
    }

    #[test]
    fn test_split_is_deterministic() {
        let prep = DataPreparer::new(&config(0.8, 11));
        let a = prep.prepare(&purchases(40), &items()).unwrap();
        let b = prep.prepare(&purchases(40), &items()).unwrap();
        assert_eq!(a.partition, b.partition);
        assert_eq!(a.train.samples(), b.train.samples());
        assert_eq!(a.partition.train.len(), 32);
        assert_eq!(a.partition.test.len(), 8);
    }

    #[test]
    fn test_vocabulary_covers_training_ids_once() {
        let data = DataPreparer::new(&config(0.75, 1)).prepare(&purchases(20), &items()).unwrap();
        for p in &data.partition.train {
            assert!(data.user_vocab.contains(&p.user_id));
            assert!(data.item_vocab.contains(&p.item_id));
        }
        assert_eq!(data.user_vocab.table_size(), 7 + 1);
        assert_eq!(data.item_vocab.table_size(), 5 + 1);
    }

    #[test]
    fn test_duplicate_catalog_entries_are_dropped() {
        let mut catalog = items();
        catalog.push(ItemRecord::new("i0", "Duplicate"));
        let data = DataPreparer::new(&config(0.5, 1)).prepare(&purchases(10), &catalog).unwrap();
        assert_eq!(data.catalog.len(), 5);
    }

    #[test]
    fn test_uncatalogued_purchase_maps_to_oov() {
        let mut p = purchases(4);
        p.push(PurchaseRecord::new("u0", "ghost", 1.0));
        let data = DataPreparer::new(&config(0.5, 1)).prepare(&p, &items()).unwrap();
        assert!(!data.item_vocab.contains("ghost"));
        assert_eq!(data.item_vocab.lookup("ghost"), data.item_vocab.oov_index());
        assert_eq!(data.item_vocab.table_size(), 5 + 1);
        assert_eq!(data.catalog.len(), 5);
    }

    #[test]
    fn test_invalid_records_fail_validation() {
        let prep = DataPreparer::new(&config(0.8, 1));
        let bad_amount = vec![PurchaseRecord::new("u", "i0", f32::NAN)];
        assert!(matches!(prep.prepare(&bad_amount, &items()), Err(RecsysError::Validation(_))));

        let missing_user = vec![PurchaseRecord::new("", "i0", 1.0)];
        assert!(matches!(prep.prepare(&missing_user, &items()), Err(RecsysError::Validation(_))));

        assert!(matches!(prep.prepare(&purchases(5), &[]), Err(RecsysError::Validation(_))));
    }

    #[test]
    fn test_empty_training_partition_is_rejected() {
        // floor(0.5 * 1) = 0
        let prep = DataPreparer::new(&config(0.5, 1));
        assert!(matches!(prep.prepare(&purchases(1), &items()), Err(RecsysError::Validation(_))));
    }
}
