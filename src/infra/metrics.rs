// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records per-epoch training loss to a CSV file.
//
// Both models are trained in sequence, so every row is tagged
// with its stage:
//
//   stage,epoch,train_loss
//   retrieval,1,1.386294
//   retrieval,2,1.101830
//   ranking,1,9.512000
//   ...
//
// Output file: <model_dir>/metrics.csv
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// "retrieval" or "ranking"
    pub stage: String,

    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean loss over all training batches of the epoch
    pub train_loss: f64,
}

impl EpochMetrics {
    pub fn new(stage: impl Into<String>, epoch: usize, train_loss: f64) -> Self {
        Self { stage: stage.into(), epoch, train_loss }
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "stage,epoch,train_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{},{},{:.6}", m.stage, m.epoch, m.train_loss)?;
        Ok(())
    }

    pub fn log_all<'a>(&self, rows: impl IntoIterator<Item = &'a EpochMetrics>) -> Result<()> {
        for m in rows {
            self.log(m)?;
        }
        tracing::debug!("Logged epoch metrics to '{}'", self.csv_path.display());
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_once_and_appends_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new("retrieval", 1, 0.5)).unwrap();

        // reopening must not write a second header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger
            .log_all(&[EpochMetrics::new("ranking", 1, 2.25)])
            .unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(
            text,
            "stage,epoch,train_loss\nretrieval,1,0.500000\nranking,1,2.250000\n"
        );
    }
}
