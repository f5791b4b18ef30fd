use serde::{Deserialize, Serialize};

use crate::models::macros::{derived_calories, Macro, MacroVector};
use crate::models::meal_type::MealType;
use crate::planner::constants::{
    FLAVORING_SCALE_RANGE, BOUND_SCALE_RANGE, NEUTRAL_SCALABILITY, PURE_MACRO_SCALE_RANGE,
    SUPPLEMENT_SCALE_RANGE,
};

/// Macro fields of a catalog recipe, as stored in the recipe database.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RecipeMacros {
    #[serde(rename = "Feherje_g", default)]
    pub protein_g: f64,

    #[serde(rename = "Szenhidrat_g", default)]
    pub carbs_g: f64,

    #[serde(rename = "Zsir_g", default)]
    pub fat_g: f64,

    /// Stored calories; derived via 4-4-9 when absent.
    #[serde(rename = "Kaloria", default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
}

/// Convert stored recipe macros to a [`MacroVector`].
pub fn recipe_to_macro_vector(macros: &RecipeMacros) -> MacroVector {
    let calories = macros
        .calories
        .unwrap_or_else(|| derived_calories(macros.protein_g, macros.carbs_g, macros.fat_g));
    MacroVector::new(macros.protein_g, macros.carbs_g, macros.fat_g, calories)
}

/// Role of an ingredient when portions are rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngredientType {
    /// Pure macro source (protein powder, oil).
    FoMakro,
    /// Supplementary ingredient.
    Kiegeszito,
    /// Flavoring.
    Izesito,
    /// Bound to other ingredients through a binding group.
    Kotott,
}

impl IngredientType {
    /// Default `(min, max)` scale factor range.
    pub fn default_scale_range(self) -> (f64, f64) {
        match self {
            IngredientType::FoMakro => PURE_MACRO_SCALE_RANGE,
            IngredientType::Kiegeszito => SUPPLEMENT_SCALE_RANGE,
            IngredientType::Izesito => FLAVORING_SCALE_RANGE,
            IngredientType::Kotott => BOUND_SCALE_RANGE,
        }
    }
}

impl Default for IngredientType {
    fn default() -> Self {
        IngredientType::Kiegeszito
    }
}

/// One ingredient line of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub ingredient_id: String,
    #[serde(default)]
    pub name: String,
    pub quantity_g: f64,
    #[serde(default)]
    pub ingredient_type: IngredientType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_scale_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scale_factor: Option<f64>,
}

impl RecipeIngredient {
    /// Effective `(min, max)` scale range after per-ingredient overrides.
    pub fn scale_range(&self) -> (f64, f64) {
        let (min, max) = self.ingredient_type.default_scale_range();
        (
            self.min_scale_factor.unwrap_or(min),
            self.max_scale_factor.unwrap_or(max),
        )
    }

    pub fn is_bound(&self) -> bool {
        self.binding_group.is_some()
    }
}

/// Nutrition of an ingredient per 100 g.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientNutrition {
    pub ingredient_id: String,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
}

impl IngredientNutrition {
    /// Macros contributed by one gram of the ingredient.
    pub fn per_gram(&self) -> MacroVector {
        let calories = self
            .calories
            .unwrap_or_else(|| derived_calories(self.protein, self.carbs, self.fat));
        MacroVector::new(self.protein, self.carbs, self.fat, calories) * 0.01
    }
}

/// A catalog recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub meal_types: Vec<MealType>,
    #[serde(flatten)]
    pub macros: RecipeMacros,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ingredients: Vec<RecipeIngredient>,
}

impl Recipe {
    pub fn macro_vector(&self) -> MacroVector {
        recipe_to_macro_vector(&self.macros)
    }
}

/// Usage history of a recipe for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageHistory {
    pub recipe_id: String,
    #[serde(default)]
    pub is_favorite: bool,
    /// `None` when the recipe has never been used.
    #[serde(default)]
    pub days_since_last_use: Option<u32>,
    #[serde(default)]
    pub usage_count_last_7_days: u32,
    #[serde(default)]
    pub usage_count_last_30_days: u32,
}

/// How far a recipe's portion can be scaled per macro, plus its macro densities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeScalability {
    pub recipe_id: String,
    pub protein_scalability: f64,
    pub carbs_scalability: f64,
    pub fat_scalability: f64,
    /// Grams of protein per 100 g of recipe.
    #[serde(default)]
    pub protein_density: f64,
    #[serde(default)]
    pub carbs_density: f64,
    #[serde(default)]
    pub fat_density: f64,
}

impl RecipeScalability {
    /// Profile used when nothing is known about a recipe.
    pub fn neutral(recipe_id: &str) -> Self {
        Self {
            recipe_id: recipe_id.to_string(),
            protein_scalability: NEUTRAL_SCALABILITY,
            carbs_scalability: NEUTRAL_SCALABILITY,
            fat_scalability: NEUTRAL_SCALABILITY,
            protein_density: 0.0,
            carbs_density: 0.0,
            fat_density: 0.0,
        }
    }

    /// Scalability of one macro. Calories follow the mean of the three nutrients.
    pub fn for_macro(&self, m: Macro) -> f64 {
        match m {
            Macro::Protein => self.protein_scalability,
            Macro::Carbs => self.carbs_scalability,
            Macro::Fat => self.fat_scalability,
            Macro::Calories => {
                (self.protein_scalability + self.carbs_scalability + self.fat_scalability) / 3.0
            }
        }
    }
}

/// A recipe joined with its usage history; `base_score` is filled by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeWithHistory {
    pub recipe_id: String,
    pub name: String,
    pub meal_types: Vec<MealType>,
    pub base_macros: MacroVector,
    pub is_favorite: bool,
    pub days_since_last_use: Option<u32>,
    pub usage_count_last_7_days: u32,
    pub usage_count_last_30_days: u32,
    pub base_score: f64,
}

impl RecipeWithHistory {
    pub fn from_parts(recipe: &Recipe, history: Option<&UsageHistory>) -> Self {
        let history = history.cloned().unwrap_or_default();
        Self {
            recipe_id: recipe.id.clone(),
            name: recipe.name.clone(),
            meal_types: recipe.meal_types.clone(),
            base_macros: recipe.macro_vector(),
            is_favorite: history.is_favorite,
            days_since_last_use: history.days_since_last_use,
            usage_count_last_7_days: history.usage_count_last_7_days,
            usage_count_last_30_days: history.usage_count_last_30_days,
            base_score: 0.0,
        }
    }

    pub fn serves(&self, meal_type: MealType) -> bool {
        self.meal_types.contains(&meal_type)
    }
}

/// A scored recipe after variety adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedRecipe {
    pub recipe: RecipeWithHistory,
    pub penalty: f64,
    pub reward: f64,
    /// `base_score - penalty + reward`, not clamped.
    pub final_score: f64,
}

impl RankedRecipe {
    pub fn id(&self) -> &str {
        &self.recipe.recipe_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_to_macro_vector_derives_calories() {
        let macros: RecipeMacros =
            serde_json::from_str(r#"{"Feherje_g": 20, "Szenhidrat_g": 30, "Zsir_g": 10}"#)
                .unwrap();
        let v = recipe_to_macro_vector(&macros);
        assert_eq!(v.calories, 290.0);
        assert_eq!(v.protein, 20.0);
    }

    #[test]
    fn test_stored_calories_are_kept() {
        let macros = RecipeMacros {
            protein_g: 20.0,
            carbs_g: 30.0,
            fat_g: 10.0,
            calories: Some(300.0),
        };
        assert_eq!(recipe_to_macro_vector(&macros).calories, 300.0);
    }

    #[test]
    fn test_ingredient_scale_range_override() {
        let ing = RecipeIngredient {
            ingredient_id: "oil".to_string(),
            name: "Olive oil".to_string(),
            quantity_g: 10.0,
            ingredient_type: IngredientType::Izesito,
            binding_group: None,
            min_scale_factor: None,
            max_scale_factor: Some(1.5),
        };
        assert_eq!(ing.scale_range(), (FLAVORING_SCALE_RANGE.0, 1.5));
    }

    #[test]
    fn test_per_gram_nutrition() {
        let rice = IngredientNutrition {
            ingredient_id: "rice".to_string(),
            protein: 7.0,
            carbs: 78.0,
            fat: 1.0,
            calories: None,
        };
        let pg = rice.per_gram();
        assert!((pg.carbs - 0.78).abs() < 1e-9);
        assert!((pg.calories - 3.49).abs() < 1e-9);
    }

    #[test]
    fn test_ingredient_type_wire_names() {
        let t: IngredientType = serde_json::from_str("\"FO_MAKRO\"").unwrap();
        assert_eq!(t, IngredientType::FoMakro);
        let t: IngredientType = serde_json::from_str("\"KOTOTT\"").unwrap();
        assert_eq!(t, IngredientType::Kotott);
    }
}
