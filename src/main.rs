use std::path::Path;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use macro_meal_planner::catalog::{load_catalog, RecipeCatalog};
use macro_meal_planner::cli::{Cli, Command, GenerateArgs, PreFilterKind, SlotArgs, TargetArgs};
use macro_meal_planner::config::PlannerConfig;
use macro_meal_planner::error::{PlannerError, Result};
use macro_meal_planner::interface::{
    display_generation_result, display_rankings, display_scalability, write_plan_csv,
    write_quantities_csv,
};
use macro_meal_planner::models::{MacroVector, MealType};
use macro_meal_planner::planner::{
    GenerationMetadata, GenerationRequest, MacroProfileFilter, MealPlanGenerator, NoPreFilter,
    Preferences, RecipePreFilter, StrictMacroStructureFilter,
};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays clean for `--json`. `RUST_LOG` wins when set.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate(args) => cmd_generate(&cli.catalog, cli.config.as_deref(), args),
        Command::Rank {
            target,
            slots,
            limit,
        } => cmd_rank(&cli.catalog, cli.config.as_deref(), &target, &slots, limit),
        Command::Scalability => cmd_scalability(&cli.catalog),
        Command::InitConfig { path } => {
            PlannerConfig::write_default(&path)?;
            println!("Default configuration written to {}", path.display());
            Ok(())
        }
    }
}

fn open_catalog(path: &Path) -> Result<RecipeCatalog> {
    if !path.exists() {
        return Err(PlannerError::InvalidInput(format!(
            "recipe catalog not found: {}",
            path.display()
        )));
    }
    load_catalog(path)
}

fn target_from_args(args: &TargetArgs) -> MacroVector {
    match args.calories {
        Some(calories) => MacroVector::new(args.protein, args.carbs, args.fat, calories),
        None => MacroVector::from_grams(args.protein, args.carbs, args.fat),
    }
}

fn preferences_from_args(args: &SlotArgs) -> Result<Preferences> {
    let preferred_meal_types = args
        .meal_types
        .iter()
        .map(|s| MealType::parse(s))
        .collect::<Result<Vec<_>>>()?;
    Ok(Preferences {
        meal_count: args.meals,
        preferred_meal_types,
        exclude_recipe_ids: args.exclude.clone(),
        ..Default::default()
    })
}

fn build_prefilter(kind: PreFilterKind, catalog: &RecipeCatalog) -> Box<dyn RecipePreFilter> {
    match kind {
        PreFilterKind::Strict => Box::new(StrictMacroStructureFilter::from_catalog(catalog)),
        PreFilterKind::Profile => Box::new(MacroProfileFilter::default()),
        PreFilterKind::Off => Box::new(NoPreFilter),
    }
}

/// Generate a meal plan and render or export it.
fn cmd_generate(catalog_path: &Path, config_path: Option<&Path>, args: GenerateArgs) -> Result<()> {
    let catalog = open_catalog(catalog_path)?;
    let config = PlannerConfig::load(config_path)?;

    let mut settings = config.generation.clone();
    if let Some(max_attempts) = args.max_attempts {
        settings.max_attempts = max_attempts;
    }
    if let Some(threshold) = args.score_threshold {
        settings.score_threshold = threshold;
    }
    if let Some(threshold) = args.deviation_threshold {
        settings.deviation_threshold = threshold;
    }
    if args.no_lp {
        settings.enable_lp_optimization = false;
    }
    if args.no_swap {
        settings.enable_recipe_swapping = false;
    }

    for id in &args.slots.exclude {
        catalog.get_recipe(id)?;
    }
    if settings.enable_lp_optimization && !catalog.has_ingredient_data() {
        warn!("catalog has no ingredient nutrition, LP optimization cannot adjust portions");
    }

    let request = GenerationRequest {
        target: target_from_args(&args.target),
        preferences: preferences_from_args(&args.slots)?,
        settings,
    };

    let prefilter = build_prefilter(args.prefilter, &catalog);
    let generator = MealPlanGenerator::new(&catalog, config, prefilter);
    let result = generator.generate(&request);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        display_generation_result(&result);
    }

    if let (Some(path), Some(plan)) = (&args.csv, &result.final_meal_plan) {
        write_plan_csv(plan, path)?;
        eprintln!("Plan written to {}", path.display());
    }
    if let (Some(path), Some(lp)) = (&args.quantities_csv, &result.lp_optimization) {
        if lp.success {
            write_quantities_csv(lp, path)?;
            eprintln!("Optimized quantities written to {}", path.display());
        }
    }

    Ok(())
}

/// Print ranked recipes per meal type.
fn cmd_rank(
    catalog_path: &Path,
    config_path: Option<&Path>,
    target: &TargetArgs,
    slots: &SlotArgs,
    limit: usize,
) -> Result<()> {
    let catalog = open_catalog(catalog_path)?;
    let config = PlannerConfig::load(config_path)?;

    let request = GenerationRequest {
        preferences: preferences_from_args(slots)?,
        settings: config.generation.clone(),
        ..GenerationRequest::new(target_from_args(target))
    };
    let generator = MealPlanGenerator::new(&catalog, config, Box::new(NoPreFilter));
    let groups = generator.rank_candidates(&request, &mut GenerationMetadata::default())?;

    display_rankings(&groups, limit);
    Ok(())
}

/// Print every recipe's resolved scalability.
fn cmd_scalability(catalog_path: &Path) -> Result<()> {
    let catalog = open_catalog(catalog_path)?;
    let rows: Vec<_> = catalog
        .all_recipes()
        .map(|r| (r, catalog.scalability_for(&r.id)))
        .collect();
    display_scalability(&rows);
    Ok(())
}
