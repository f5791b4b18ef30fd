pub mod macros;
pub mod meal_type;
pub mod plan;
pub mod recipe;

pub use macros::{Macro, MacroDeviation, MacroVector};
pub use meal_type::{DistributionTable, MealTarget, MealType};
pub use plan::{MealCombination, PlannedMeal};
pub use recipe::{
    recipe_to_macro_vector, IngredientNutrition, IngredientType, RankedRecipe, Recipe,
    RecipeIngredient, RecipeMacros, RecipeScalability, RecipeWithHistory, UsageHistory,
};
