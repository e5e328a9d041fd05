// ============================================================
// Layer 3 — Recommender Configuration
// ============================================================
// All hyperparameters for one recommender, passed explicitly
// into every component that needs them.
//
// There are no defaults here: the CLI (Layer 1) decides them
// and converts its arguments into this struct.
// The config is saved next to each persisted model so a
// restored engine rebuilds exactly the same architecture.
//
// Reference: serde documentation
//            Rust Book §9 (Error Handling)

use serde::{Deserialize, Serialize};

use crate::domain::error::{RecsysError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecsysConfig {
    /// Fraction of purchases used for training, in (0, 1).
    pub train_test_ratio: f64,
    pub batch_size:       usize,
    /// Ranking network widths; the last one must be 1.
    pub layer_dims:       Vec<usize>,
    pub embedding_dim:    usize,
    /// Size of the title-token vocabulary (padding + OOV included).
    pub max_tokens:       usize,
    /// Default number of recommendations (k).
    pub num_recs:         usize,
    pub epochs:           usize,
    pub random_seed:      u64,
    pub learning_rate:    f64,
}

impl RecsysConfig {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| -> Result<()> { Err(RecsysError::Validation(msg)) };

        if !(self.train_test_ratio > 0.0 && self.train_test_ratio < 1.0) {
            return fail(format!(
                "train_test_ratio must be in (0, 1), got {}",
                self.train_test_ratio
            ));
        }
        if self.batch_size == 0 {
            return fail("batch_size must be positive".into());
        }
        if self.embedding_dim == 0 {
            return fail("embedding_dim must be positive".into());
        }
        // slot 0 is padding and slot 1 is OOV
        if self.max_tokens < 2 {
            return fail(format!("max_tokens must be at least 2, got {}", self.max_tokens));
        }
        if self.num_recs == 0 {
            return fail("num_recs must be positive".into());
        }
        if self.epochs == 0 {
            return fail("epochs must be positive".into());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return fail(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        match self.layer_dims.last() {
            None => return fail("layer_dims must not be empty".into()),
            Some(&last) if last != 1 => {
                return fail(format!("last layer_dims entry must be 1, got {last}"))
            }
            _ => {}
        }
        if self.layer_dims.contains(&0) {
            return fail("layer_dims entries must be positive".into());
        }
        Ok(())
    }

    /// Parse the colon-separated form used in config files, e.g. "64:32:1".
    pub fn parse_layer_dims(s: &str) -> Result<Vec<usize>> {
        s.split(':')
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    RecsysError::Validation(format!("invalid layer width '{part}' in '{s}'"))
                })
            })
            .collect()
    }
}
