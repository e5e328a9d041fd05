// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`     — fits, evaluates and saves both models
//   2. `recommend` — loads (or cold-starts) the engine and
//                    prints a user's recommendations
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, RecommendArgs, TrainArgs};

use crate::data::loader::RecordLoader;
use crate::domain::config::RecsysConfig;

#[derive(Parser, Debug)]
#[command(
    name = "purchase-recsys",
    version = "0.1.0",
    about = "Two-stage purchase recommender: retrieve candidates, then re-rank them."
)]
pub struct Cli {
    /// The subcommand to run (train or recommend)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)     => run_train(args),
            Commands::Recommend(args) => run_recommend(args),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = RecsysConfig::try_from(args.model)?;
    let source = RecordLoader::new(&args.data.purchases, &args.data.items);
    tracing::info!("Training with {:?}", config);

    let outcome = TrainUseCase::new(config, source, &args.data.model_dir).execute()?;

    println!("Training complete. Model saved to '{}'.", args.data.model_dir);
    println!(
        "  {} train / {} test purchases",
        outcome.report.train_examples, outcome.report.test_examples
    );
    for t in &outcome.eval.retrieval.top_k {
        println!("  retrieval top_{:<3} accuracy: {:.4}", t.k, t.accuracy);
    }
    println!("  ranking RMSE: {:.4}", outcome.eval.ranking.rmse);
    Ok(())
}

/// Handles the `recommend` subcommand.
fn run_recommend(args: RecommendArgs) -> Result<()> {
    use crate::application::recommend_use_case::RecommendUseCase;

    let config = RecsysConfig::try_from(args.model)?;
    let source = RecordLoader::new(&args.data.purchases, &args.data.items);
    let use_case = RecommendUseCase::new(config, source, &args.data.model_dir)?;

    let recs = use_case.recommend(&args.user_id, args.k)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&recs)?);
        return Ok(());
    }

    println!("Recommendations for user '{}':", args.user_id);
    for (rank, r) in recs.iter().enumerate() {
        println!(
            "  {:>2}. {:<12} weight={:>8.4}  {}",
            rank + 1,
            r.item_id,
            r.weight,
            r.title.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
