// ============================================================
// Layer 3 — Purchase and Item Records
// ============================================================
// The two logical inputs the recommender consumes from its
// collaborators, plus the (item, weight) pair it produces.
//
// Records arrive as loosely-typed JSON objects. Deserialising
// into these structs IS the coercion step:
//   - ids may be strings or integers → canonical String
//     (an integral float such as 10.0 becomes "10")
//   - amounts may be numbers or numeric strings → f32
//   - `item_amount` is accepted for `amount`, `id` for `item_id`
//   - any other field (date, time, ...) is ignored
//
// A missing or malformed field makes deserialisation fail;
// the loader turns that into a ValidationError.
//
// Reference: serde documentation (deserialize_with, alias)
//            Rust Book §5 (Structs)

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One historical purchase: a user bought `amount` units of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    #[serde(deserialize_with = "canonical_id")]
    pub user_id: String,

    #[serde(deserialize_with = "canonical_id")]
    pub item_id: String,

    /// Purchased quantity — the ranking model's regression label.
    #[serde(alias = "item_amount", deserialize_with = "numeric_amount")]
    pub amount: f32,
}

impl PurchaseRecord {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>, amount: f32) -> Self {
        Self { user_id: user_id.into(), item_id: item_id.into(), amount }
    }
}

/// One catalog entry. Only `item_id` and `title` feed the models;
/// prices are carried through so callers can render results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    #[serde(alias = "id", deserialize_with = "canonical_id")]
    pub item_id: String,

    pub title: String,

    #[serde(default)]
    pub price: f64,

    #[serde(default)]
    pub crossed_out_price: Option<f64>,
}

impl ItemRecord {
    pub fn new(item_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            title: title.into(),
            price: 0.0,
            crossed_out_price: None,
        }
    }
}

/// A recommended item with the ranking model's predicted weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: String,
    pub weight: f32,
}

// ─── Coercion helpers ─────────────────────────────────────────────────────────

fn canonical_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Ok(u.to_string())
            } else {
                let f = n.as_f64().unwrap_or(f64::NAN);
                // `as i64` saturates outside ±2^63
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.223_372_036_854_775_808e18 {
                    Ok(format!("{}", f as i64))
                } else {
                    Ok(n.to_string())
                }
            }
        }
        other => Err(de::Error::custom(format!(
            "expected a string or integer id, found {other}"
        ))),
    }
}

fn numeric_amount<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match amount {
        Some(a) if a.is_finite() => Ok(a as f32),
        _ => Err(de::Error::custom("amount must be a finite number")),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_ids_become_strings() {
        let p: PurchaseRecord =
            serde_json::from_value(json!({"user_id": 1, "item_id": 10.0, "amount": 2})).unwrap();
        assert_eq!(p.user_id, "1");
        assert_eq!(p.item_id, "10");
        assert_eq!(p.amount, 2.0);
    }

    #[test]
    fn test_huge_integral_float_ids_stay_distinct() {
        let a: PurchaseRecord =
            serde_json::from_value(json!({"user_id": 1e20, "item_id": "i", "amount": 1})).unwrap();
        let b: PurchaseRecord =
            serde_json::from_value(json!({"user_id": 2e20, "item_id": "i", "amount": 1})).unwrap();
        assert_ne!(a.user_id, b.user_id);
        assert_ne!(a.user_id, i64::MAX.to_string());
        assert_ne!(b.user_id, i64::MAX.to_string());
    }

    #[test]
    fn test_item_amount_alias_and_numeric_string() {
        let p: PurchaseRecord = serde_json::from_value(
            json!({"user_id": "u", "item_id": "i", "item_amount": "3.5", "date": "2023-01-01"}),
        )
        .unwrap();
        assert_eq!(p.amount, 3.5);
    }

    #[test]
    fn test_missing_amount_is_rejected() {
        let r = serde_json::from_value::<PurchaseRecord>(json!({"user_id": "u", "item_id": "i"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_non_numeric_amount_is_rejected() {
        let r = serde_json::from_value::<PurchaseRecord>(
            json!({"user_id": "u", "item_id": "i", "amount": "lots"}),
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_item_id_alias() {
        let item: ItemRecord =
            serde_json::from_value(json!({"id": 7, "title": "Tea", "price": 1.5})).unwrap();
        assert_eq!(item.item_id, "7");
        assert_eq!(item.crossed_out_price, None);
    }
}
