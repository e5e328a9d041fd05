// ============================================================
// Layer 4 — Title Vectorizer
// ============================================================
// Turns an item title into a fixed-length row of token ids for
// the item tower's text path:
//
//   "Green Tea"  →  [5, 9, 9, 9, ..., 9]     (MAX_TITLE_TOKENS wide)
//   ""           →  [1, 1, 1, ..., 1]        ([UNK] only)
//
// The text path max-pools over tokens, and a max is unchanged
// by repeated values, so short titles are padded with their own
// last token. That gives masked max-pooling without a mask.
// Titles with no known words fall back to the [UNK] slot.
//
// Reference: Burn Book §4 (Datasets)

use tokenizers::Tokenizer;

use crate::domain::error::{RecsysError, Result};
use crate::infra::tokenizer_store::UNK_TOKEN_ID;

/// Width of every encoded title row.
pub const MAX_TITLE_TOKENS: usize = 16;

pub struct TitleVectorizer {
    tokenizer: Tokenizer,
}

impl TitleVectorizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn encode(&self, title: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(title, false)
            .map_err(|e| RecsysError::Validation(format!("cannot tokenise title '{title}': {e}")))?;
        Ok(pad_tokens(encoding.get_ids()))
    }
}

fn pad_tokens(ids: &[u32]) -> Vec<u32> {
    let mut row: Vec<u32> = ids.iter().copied().take(MAX_TITLE_TOKENS).collect();
    let fill = row.last().copied().unwrap_or(UNK_TOKEN_ID);
    row.resize(MAX_TITLE_TOKENS, fill);
    row
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::TokenizerStore;

    #[test]
    fn test_pads_with_last_token() {
        let row = pad_tokens(&[4, 7]);
        assert_eq!(row.len(), MAX_TITLE_TOKENS);
        assert_eq!(&row[..3], &[4, 7, 7]);
        assert!(row[2..].iter().all(|&t| t == 7));
    }

    #[test]
    fn test_truncates_long_titles() {
        let long: Vec<u32> = (2..100).collect();
        assert_eq!(pad_tokens(&long), (2..2 + MAX_TITLE_TOKENS as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_and_unknown_titles_use_oov_slot() {
        let tok = TokenizerStore::build(&["black coffee"], 8).unwrap();
        let v   = TitleVectorizer::new(tok);
        assert_eq!(v.encode("").unwrap(), vec![UNK_TOKEN_ID; MAX_TITLE_TOKENS]);
        assert_eq!(v.encode("matcha").unwrap(), vec![UNK_TOKEN_ID; MAX_TITLE_TOKENS]);
        assert_ne!(v.encode("coffee").unwrap()[0], UNK_TOKEN_ID);
    }
}
