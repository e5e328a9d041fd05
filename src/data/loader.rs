// ============================================================
// Layer 4 — Record Loader
// ============================================================
// Reads the recommender's two inputs from JSON array files:
//
//   purchases.json  [{"user_id": 1, "item_id": 10, "amount": 2, "date": ...}, ...]
//   items.json      [{"id": 10, "title": "Tea", "price": 3.5, ...}, ...]
//
// Each element is coerced into a typed record (see
// domain::records). The first malformed element aborts the
// load with a ValidationError naming its position, so no
// partially-parsed collection ever reaches the trainer.
//
// Reference: serde_json documentation
//            Rust Book §12 (Reading a File)

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::error::{RecsysError, Result};
use crate::domain::records::{ItemRecord, PurchaseRecord};
use crate::domain::traits::RecordSource;

/// File-backed record source.
pub struct RecordLoader {
    purchases_path: PathBuf,
    items_path:     PathBuf,
}

impl RecordLoader {
    pub fn new(purchases_path: impl Into<PathBuf>, items_path: impl Into<PathBuf>) -> Self {
        Self {
            purchases_path: purchases_path.into(),
            items_path:     items_path.into(),
        }
    }
}

impl RecordSource for RecordLoader {
    fn purchases(&self) -> Result<Vec<PurchaseRecord>> {
        let records = parse_records(read_array(&self.purchases_path)?, "purchase")?;
        tracing::info!(
            "Loaded {} purchases from '{}'",
            records.len(),
            self.purchases_path.display()
        );
        Ok(records)
    }

    fn items(&self) -> Result<Vec<ItemRecord>> {
        let records = parse_records(read_array(&self.items_path)?, "item")?;
        tracing::info!("Loaded {} items from '{}'", records.len(), self.items_path.display());
        Ok(records)
    }
}

fn read_array(path: &Path) -> Result<Vec<Value>> {
    let text = fs::read_to_string(path).map_err(|e| {
        RecsysError::Storage(format!("cannot read '{}': {e}", path.display()))
    })?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(values)) => Ok(values),
        Ok(_) => Err(RecsysError::Validation(format!(
            "'{}' must contain a JSON array of records",
            path.display()
        ))),
        Err(e) => Err(RecsysError::Validation(format!(
            "'{}' is not valid JSON: {e}",
            path.display()
        ))),
    }
}

/// Coerce raw JSON values into typed records.
/// Used by the file loader and by in-memory collaborators alike.
pub fn parse_records<T: DeserializeOwned>(values: Vec<Value>, kind: &str) -> Result<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value)
                .map_err(|e| RecsysError::Validation(format!("{kind} record #{i}: {e}")))
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_records_reports_index() {
        let values = vec![
            json!({"user_id": "1", "item_id": "10", "amount": 1}),
            json!({"user_id": "2", "amount": 1}),
        ];
        let err = parse_records::<PurchaseRecord>(values, "purchase").unwrap_err();
        match err {
            RecsysError::Validation(msg) => assert!(msg.contains("#1"), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_loads_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("purchases.json");
        let i = dir.path().join("items.json");
        fs::write(&p, r#"[{"user_id": 1, "item_id": 10, "item_amount": 2, "date": "2024-01-01"}]"#)
            .unwrap();
        fs::write(&i, r#"[{"id": 10, "title": "Green tea", "price": 3.5}]"#).unwrap();

        let loader = RecordLoader::new(&p, &i);
        let purchases = loader.purchases().unwrap();
        let items = loader.items().unwrap();
        assert_eq!(purchases, vec![PurchaseRecord::new("1", "10", 2.0)]);
        assert_eq!(items[0].item_id, "10");
        assert_eq!(items[0].title, "Green tea");
    }

    #[test]
    fn test_non_array_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("purchases.json");
        fs::write(&p, r#"{"user_id": 1}"#).unwrap();
        let loader = RecordLoader::new(&p, dir.path().join("missing.json"));
        assert!(matches!(loader.purchases(), Err(RecsysError::Validation(_))));
        assert!(matches!(loader.items(), Err(RecsysError::Storage(_))));
    }
}
