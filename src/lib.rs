pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod interface;
pub mod models;
pub mod planner;

pub use catalog::RecipeCatalog;
pub use config::PlannerConfig;
pub use error::{PlannerError, Result};
pub use models::{MacroVector, MealCombination, MealType};
pub use planner::{GenerationRequest, MasterGenerationResult, MealPlanGenerator};
