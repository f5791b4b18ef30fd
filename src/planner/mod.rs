pub mod combiner;
pub mod constants;
pub mod lp;
pub mod orchestrator;
pub mod prefilter;
pub mod ranking;
pub mod scoring;
pub mod similarity;
pub mod swap;
pub mod validator;

pub use combiner::{generate_meal_combinations, get_best_meal_combination, CombinationIter};
pub use lp::{build_lp_input, optimize_quantities, LpInput, LpOptimizationResult, LpStatus};
pub use orchestrator::{
    GenerationFailure, GenerationMetadata, GenerationRequest, GenerationStatus, MasterGenerationResult,
    MealPlanGenerator, Preferences, QualityMetrics,
};
pub use prefilter::{MacroProfileFilter, NoPreFilter, RecipePreFilter, StrictMacroStructureFilter};
pub use ranking::{adjust_for_variety, group_by_meal_type, rank_recipes, VarietyParams};
pub use scoring::{derive_scalability, score_recipe, score_recipes, RecipeScore};
pub use similarity::{cosine_similarity, normalize_vector, normalized_cosine_similarity};
pub use validator::{validate_meal_plan, ValidationResult};
