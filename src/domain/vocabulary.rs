// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// An ordered set of unique ids. The position of an id is the
// row it owns in an embedding table; one extra row at the end
// (index == len) is reserved for out-of-vocabulary ids.
//
//   ids:    ["1", "2", "7"]
//   lookup: "1" → 0, "2" → 1, "7" → 2, anything else → 3 (OOV)
//   table:  4 rows
//
// Insertion order is preserved so the same input always
// produces the same id → row assignment.
//
// Reference: Rust Book §8 (Hash Maps)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    ids: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build from ids in order of first appearance; repeats are dropped.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self::default();
        for id in ids {
            vocab.insert(id.into());
        }
        vocab
    }

    fn insert(&mut self, id: String) {
        if !self.index.contains_key(&id) {
            self.index.insert(id.clone(), self.ids.len());
            self.ids.push(id);
        }
    }

    /// Row for `id`, or the OOV row if it was never seen.
    pub fn lookup(&self, id: &str) -> usize {
        self.index.get(id).copied().unwrap_or(self.ids.len())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn oov_index(&self) -> usize {
        self.ids.len()
    }

    /// Number of known ids (excluding the OOV slot).
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Embedding table size: known ids plus the OOV row.
    pub fn table_size(&self) -> usize {
        self.ids.len() + 1
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(ids: Vec<String>) -> Self {
        Self::from_ids(ids)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.ids
    }
}
