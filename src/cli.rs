use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// meal_planner: builds daily meal plans that hit macro targets.
#[derive(Parser, Debug)]
#[command(name = "meal_planner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the recipe catalog JSON file.
    #[arg(short, long, global = true, default_value = "recipes.json")]
    pub catalog: PathBuf,

    /// Path to a planner configuration JSON file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a meal plan for a macro target.
    Generate(GenerateArgs),

    /// Score and rank the catalog for a macro target.
    Rank {
        #[command(flatten)]
        target: TargetArgs,

        #[command(flatten)]
        slots: SlotArgs,

        /// Recipes to show per meal type.
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Print the resolved scalability profile of every recipe.
    Scalability,

    /// Write a default configuration file.
    InitConfig {
        /// Destination path.
        path: PathBuf,
    },
}

/// Daily macro target.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Protein in grams.
    #[arg(long)]
    pub protein: f64,

    /// Carbohydrates in grams.
    #[arg(long)]
    pub carbs: f64,

    /// Fat in grams.
    #[arg(long)]
    pub fat: f64,

    /// Calories in kcal (derived with 4-4-9 when omitted).
    #[arg(long)]
    pub calories: Option<f64>,
}

/// Meal slot selection.
#[derive(Args, Debug, Clone)]
pub struct SlotArgs {
    /// Number of meals when no explicit meal types are given.
    #[arg(long, default_value = "3")]
    pub meals: usize,

    /// Explicit meal types, comma-separated (e.g. reggeli,ebéd,vacsora).
    #[arg(long, value_delimiter = ',')]
    pub meal_types: Vec<String>,

    /// Recipe ids to exclude, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub slots: SlotArgs,

    /// Override the maximum number of attempts.
    #[arg(long)]
    pub max_attempts: Option<usize>,

    /// Override the average score threshold.
    #[arg(long)]
    pub score_threshold: Option<f64>,

    /// Override the deviation (%) that triggers LP optimization.
    #[arg(long)]
    pub deviation_threshold: Option<f64>,

    /// Disable LP portion optimization.
    #[arg(long)]
    pub no_lp: bool,

    /// Disable recipe swapping.
    #[arg(long)]
    pub no_swap: bool,

    /// Pre-filter strategy.
    #[arg(long, value_enum, default_value_t = PreFilterKind::Strict)]
    pub prefilter: PreFilterKind,

    /// Print the full result as JSON.
    #[arg(long)]
    pub json: bool,

    /// Export the plan rows to a CSV file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Export optimized ingredient quantities to a CSV file.
    #[arg(long)]
    pub quantities_csv: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreFilterKind {
    /// Ingredient-derived energy split must match the target.
    Strict,
    /// Base macros must be cosine-similar to the target.
    Profile,
    /// Keep every recipe.
    Off,
}
