// ============================================================
// Layer 6 — Title Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level tokenizer used by the
// item tower's text path.
//
// Vocabulary layout (bounded by max_tokens):
//   0            [PAD]
//   1            [UNK]  ← every word outside the vocabulary
//   2..max_tokens-1     most frequent title words
//
// The tokenizer JSON is written in HuggingFace format and
// loaded with Tokenizer::from_bytes, which avoids the trainer
// API entirely. Ties in word frequency are broken
// alphabetically so the same catalog always produces the same
// vocabulary.
//
// Reference: tokenizers crate documentation (WordLevel model)

use std::collections::HashMap;
use std::path::PathBuf;

use tokenizers::Tokenizer;

use crate::domain::error::{RecsysError, Result};

pub const PAD_TOKEN_ID: u32 = 0;
pub const UNK_TOKEN_ID: u32 = 1;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Build a word-level tokenizer over item titles.
    pub fn build(titles: &[&str], max_tokens: usize) -> Result<Tokenizer> {
        // ── Step 1: Count words ───────────────────────────────────────────────
        let mut freq: HashMap<String, usize> = HashMap::new();
        for title in titles {
            for word in split_words(title) {
                *freq.entry(word).or_insert(0) += 1;
            }
        }

        // ── Step 2: Keep the most frequent max_tokens - 2 words ───────────────
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(max_tokens.saturating_sub(2));

        let mut vocab = serde_json::json!({
            "[PAD]": PAD_TOKEN_ID,
            "[UNK]": UNK_TOKEN_ID,
        });
        let mut next_id = 2usize;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: Assemble tokenizer JSON ───────────────────────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": 0, "content": "[PAD]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": 1, "content": "[UNK]", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let bytes = serde_json::to_vec(&tokenizer_json)?;
        let tokenizer = Tokenizer::from_bytes(bytes)
            .map_err(|e| RecsysError::Validation(format!("cannot build title tokenizer: {e}")))?;

        tracing::info!("Title tokenizer built with {} entries", next_id);
        Ok(tokenizer)
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path();
        tokenizer.save(&path, true).map_err(|e| {
            RecsysError::Storage(format!("cannot write tokenizer '{}': {e}", path.display()))
        })?;
        tracing::debug!("Saved title tokenizer to '{}'", path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path).map_err(|e| {
            RecsysError::Storage(format!("cannot load tokenizer from '{}': {e}", path.display()))
        })
    }
}

/// Lower-cased word runs, matching the Whitespace pre-tokenizer's `\w+` pieces.
fn split_words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn ids(tokenizer: &Tokenizer, text: &str) -> Vec<u32> {
        tokenizer.encode(text, false).unwrap().get_ids().to_vec()
    }

    #[test]
    fn test_vocabulary_is_bounded() {
        let titles = ["red apple", "green apple", "red pear", "blue plum"];
        // room for 2 words: "apple" (2) and "red" (2)
        let tok = TokenizerStore::build(&titles, 4).unwrap();
        assert_eq!(tok.get_vocab_size(false), 4);
        assert_eq!(ids(&tok, "apple"), vec![2]);
        assert_eq!(ids(&tok, "plum"), vec![UNK_TOKEN_ID]);
    }

    #[test]
    fn test_lowercases_titles() {
        let tok = TokenizerStore::build(&["Green Tea"], 16).unwrap();
        assert_eq!(ids(&tok, "GREEN tea"), ids(&tok, "green tea"));
        assert!(!ids(&tok, "green").contains(&UNK_TOKEN_ID));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());
        let tok = TokenizerStore::build(&["oat milk", "soy milk"], 16).unwrap();
        store.save(&tok).unwrap();
        assert!(store.exists());
        let back = store.load().unwrap();
        assert_eq!(ids(&back, "soy milk"), ids(&tok, "soy milk"));
    }
}
