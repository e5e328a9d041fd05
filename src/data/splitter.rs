// ============================================================
// Layer 4 — Train/Test Splitter
// ============================================================
// Shuffles records with a SEEDED generator and splits them:
//
//   split_at = floor(ratio * N)
//   train    = shuffled[..split_at]
//   test     = shuffled[split_at..]   (the exact complement)
//
// The same (records, seed, ratio) always yields the same two
// partitions: the shuffle depends only on the seed and the
// input order, never on hash-map iteration or thread timing.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.
//
// Reference: Rust Book §8 (Vectors)
//            rand crate documentation (SeedableRng)

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Deterministically shuffle `samples` and split into (train, test).
pub fn split_train_test<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).floor() as usize;
    let split_at = split_at.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..)
    let test = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} train, {} test (seed={})",
        samples.len(),
        test.len(),
        seed,
    );

    (samples, test)
}
