// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands: `train` and `recommend`
// and all their configurable flags.
//
// Hyperparameter flags are shared through ModelArgs, so both
// commands build the same RecsysConfig. The defaults live here,
// at the presentation boundary; the core has none.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::domain::config::RecsysConfig;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train both models, evaluate them and save the artifact
    Train(TrainArgs),

    /// Recommend items for a user (trains first if no model exists)
    Recommend(RecommendArgs),
}

/// Where records come from and where the model lives.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// JSON array of purchases: {user_id, item_id, amount | item_amount, ...}
    #[arg(long, default_value = "data/purchases.json")]
    pub purchases: String,

    /// JSON array of items: {item_id | id, title, price, ...}
    #[arg(long, default_value = "data/items.json")]
    pub items: String,

    /// Directory holding retrieval/ and ranking/
    #[arg(long, default_value = "model")]
    pub model_dir: String,
}

/// Model hyperparameters.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Fraction of purchases used for training, in (0, 1)
    #[arg(long, default_value_t = 0.8)]
    pub train_test_ratio: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Ranking dense widths, colon separated; the last must be 1
    #[arg(long, default_value = "64:32:1")]
    pub layer_dims: String,

    #[arg(long, default_value_t = 32)]
    pub embedding_dim: usize,

    /// Size of the title word vocabulary (including [PAD] and [UNK])
    #[arg(long, default_value_t = 1000)]
    pub max_tokens: usize,

    /// Default number of recommendations per user
    #[arg(long, default_value_t = 6)]
    pub num_recs: usize,

    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    #[arg(long, default_value_t = 42)]
    pub random_seed: u64,

    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// All arguments for the `recommend` command
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// User to recommend for (unknown users still get results)
    #[arg(long)]
    pub user_id: String,

    /// Number of items to return (defaults to --num-recs)
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Convert CLI ModelArgs into the domain-layer RecsysConfig.
/// The domain layer never sees clap types.
impl TryFrom<ModelArgs> for RecsysConfig {
    type Error = crate::domain::error::RecsysError;

    fn try_from(a: ModelArgs) -> Result<Self, Self::Error> {
        let config = RecsysConfig {
            train_test_ratio: a.train_test_ratio,
            batch_size:       a.batch_size,
            layer_dims:       RecsysConfig::parse_layer_dims(&a.layer_dims)?,
            embedding_dim:    a.embedding_dim,
            max_tokens:       a.max_tokens,
            num_recs:         a.num_recs,
            epochs:           a.epochs,
            random_seed:      a.random_seed,
            learning_rate:    a.learning_rate,
        };
        config.validate()?;
        Ok(config)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_build_valid_config() {
        let cli = Cli::try_parse_from(["purchase-recsys", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg = RecsysConfig::try_from(args.model).unwrap();
        assert_eq!(cfg.layer_dims, vec![64, 32, 1]);
        assert_eq!(cfg.num_recs, 6);
        assert_eq!(args.data.model_dir, "model");
    }

    #[test]
    fn test_recommend_parses_user_and_k() {
        let cli = Cli::try_parse_from([
            "purchase-recsys", "recommend", "--user-id", "42", "-k", "3", "--layer-dims", "16:1",
        ])
        .unwrap();
        let Commands::Recommend(args) = cli.command else { panic!("expected recommend") };
        assert_eq!(args.user_id, "42");
        assert_eq!(args.k, Some(3));
        assert_eq!(RecsysConfig::try_from(args.model).unwrap().layer_dims, vec![16, 1]);
    }

    #[test]
    fn test_bad_layer_dims_are_rejected() {
        let cli = Cli::try_parse_from(["purchase-recsys", "train", "--layer-dims", "16:4"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert!(RecsysConfig::try_from(args.model).is_err());
    }
}
