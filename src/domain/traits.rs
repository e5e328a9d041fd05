// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers:
//
//   RecordSource — where purchases and items come from
//                  (JSON files today; a database tomorrow)
//   Recommender  — anything that turns a user id into a
//                  weighted list of items
//   Persistable  — a trained component that can be written
//                  to a directory and restored from it
//
// The application layer only talks to these traits, so the
// serving boundary can swap the record source or the engine
// without touching the workflow code.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use crate::domain::error::Result;
use crate::domain::records::{ItemRecord, PurchaseRecord, Recommendation};

// ─── RecordSource ─────────────────────────────────────────────────────────────
/// Supplies the two logical inputs of the recommender.
pub trait RecordSource {
    fn purchases(&self) -> Result<Vec<PurchaseRecord>>;

    fn items(&self) -> Result<Vec<ItemRecord>>;
}

// ─── Recommender ──────────────────────────────────────────────────────────────
/// Produces up to `k` items for a user, strongest first.
pub trait Recommender {
    fn recommend(&self, user_id: &str, k: usize) -> Result<Vec<Recommendation>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// A component whose learned state lives in its own directory.
pub trait Persistable: Sized {
    /// Write this component's state under `dir` (created if missing).
    fn save(&self, dir: &Path) -> Result<()>;

    /// Restore a ready-to-use component from `dir`.
    fn load(dir: &Path) -> Result<Self>;
}
