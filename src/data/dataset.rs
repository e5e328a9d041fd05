use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One purchase, already resolved to embedding rows and title tokens.
/// Built once by the DataPreparer and reused every epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseSample {
    pub user_index:   usize,
    pub item_index:   usize,
    pub title_tokens: Vec<u32>,
    pub amount:       f32,
}

/// One catalog item as seen by the candidate tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub item_id:      String,
    pub item_index:   usize,
    pub title_tokens: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct PurchaseDataset {
    samples: Vec<PurchaseSample>,
}

impl PurchaseDataset {
    pub fn new(samples: Vec<PurchaseSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn samples(&self) -> &[PurchaseSample] { &self.samples }
}

impl Dataset<PurchaseSample> for PurchaseDataset {
    fn get(&self, index: usize) -> Option<PurchaseSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
