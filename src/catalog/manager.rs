use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, Result};
use crate::models::{
    IngredientNutrition, Recipe, RecipeScalability, RecipeWithHistory, UsageHistory,
};
use crate::planner::scoring::derive_scalability;

/// On-disk layout of a recipe catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogData {
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub scalability: Vec<RecipeScalability>,
    #[serde(default)]
    pub history: Vec<UsageHistory>,
    /// Ingredient macros per 100 g.
    #[serde(default)]
    pub nutrition: Vec<IngredientNutrition>,
}

/// Read-only view over recipes, their history, scalability and ingredient nutrition.
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    /// Recipes keyed by id, iterated in id order.
    recipes: BTreeMap<String, Recipe>,
    scalability: HashMap<String, RecipeScalability>,
    history: HashMap<String, UsageHistory>,
    nutrition: HashMap<String, IngredientNutrition>,
}

impl RecipeCatalog {
    /// Build a catalog; later entries with the same id replace earlier ones.
    pub fn new(data: CatalogData) -> Self {
        Self {
            recipes: data
                .recipes
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect(),
            scalability: data
                .scalability
                .into_iter()
                .map(|s| (s.recipe_id.clone(), s))
                .collect(),
            history: data
                .history
                .into_iter()
                .map(|h| (h.recipe_id.clone(), h))
                .collect(),
            nutrition: data
                .nutrition
                .into_iter()
                .map(|n| (n.ingredient_id.clone(), n))
                .collect(),
        }
    }

    pub fn recipe(&self, id: &str) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    /// Like [`recipe`](Self::recipe) but an unknown id is an error.
    pub fn get_recipe(&self, id: &str) -> Result<&Recipe> {
        self.recipe(id)
            .ok_or_else(|| PlannerError::RecipeNotFound(id.to_string()))
    }

    pub fn history(&self, id: &str) -> Option<&UsageHistory> {
        self.history.get(id)
    }

    pub fn nutrition(&self) -> &HashMap<String, IngredientNutrition> {
        &self.nutrition
    }

    pub fn all_recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Scalability profile: stored entry, else derived from ingredients, else neutral.
    pub fn scalability_for(&self, id: &str) -> RecipeScalability {
        if let Some(stored) = self.scalability.get(id) {
            return stored.clone();
        }
        self.recipe(id)
            .and_then(|r| derive_scalability(r, &self.nutrition))
            .unwrap_or_else(|| RecipeScalability::neutral(id))
    }

    /// Resolved scalability for every recipe in the catalog.
    pub fn scalability_table(&self) -> HashMap<String, RecipeScalability> {
        self.recipes
            .keys()
            .map(|id| (id.clone(), self.scalability_for(id)))
            .collect()
    }

    /// Recipes joined with their history, skipping excluded ids.
    pub fn recipes_with_history(&self, exclude: &[String]) -> Vec<RecipeWithHistory> {
        self.recipes
            .values()
            .filter(|r| !exclude.contains(&r.id))
            .map(|r| RecipeWithHistory::from_parts(r, self.history(&r.id)))
            .collect()
    }

    /// Whether the recipe has at least one ingredient with nutrition data.
    pub fn has_ingredient_nutrition(&self, id: &str) -> bool {
        self.recipe(id).is_some_and(|r| {
            r.ingredients
                .iter()
                .any(|i| self.nutrition.contains_key(&i.ingredient_id))
        })
    }

    /// Whether any recipe carries ingredient-level nutrition.
    pub fn has_ingredient_data(&self) -> bool {
        self.recipes.keys().any(|id| self.has_ingredient_nutrition(id))
    }

    /// Snapshot back into the on-disk layout.
    pub fn to_data(&self) -> CatalogData {
        let mut scalability: Vec<RecipeScalability> = self.scalability.values().cloned().collect();
        scalability.sort_by(|a, b| a.recipe_id.cmp(&b.recipe_id));
        let mut history: Vec<UsageHistory> = self.history.values().cloned().collect();
        history.sort_by(|a, b| a.recipe_id.cmp(&b.recipe_id));
        let mut nutrition: Vec<IngredientNutrition> = self.nutrition.values().cloned().collect();
        nutrition.sort_by(|a, b| a.ingredient_id.cmp(&b.ingredient_id));

        CatalogData {
            recipes: self.recipes.values().cloned().collect(),
            scalability,
            history,
            nutrition,
        }
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientType, MealType, RecipeIngredient, RecipeMacros};

    fn recipe(id: &str, ingredients: Vec<RecipeIngredient>) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: id.to_string(),
            meal_types: vec![MealType::Ebed],
            macros: RecipeMacros {
                protein_g: 30.0,
                carbs_g: 40.0,
                fat_g: 10.0,
                calories: None,
            },
            ingredients,
        }
    }

    fn rice() -> RecipeIngredient {
        RecipeIngredient {
            ingredient_id: "rice".to_string(),
            name: "Rice".to_string(),
            quantity_g: 100.0,
            ingredient_type: IngredientType::Kiegeszito,
            binding_group: None,
            min_scale_factor: None,
            max_scale_factor: None,
        }
    }

    fn catalog() -> RecipeCatalog {
        RecipeCatalog::new(CatalogData {
            recipes: vec![recipe("plain", Vec::new()), recipe("rice-bowl", vec![rice()])],
            scalability: vec![RecipeScalability {
                recipe_id: "stored".to_string(),
                protein_scalability: 0.9,
                carbs_scalability: 0.8,
                fat_scalability: 0.7,
                protein_density: 0.0,
                carbs_density: 0.0,
                fat_density: 0.0,
            }],
            history: vec![UsageHistory {
                recipe_id: "plain".to_string(),
                is_favorite: true,
                days_since_last_use: Some(12),
                usage_count_last_7_days: 0,
                usage_count_last_30_days: 2,
            }],
            nutrition: vec![IngredientNutrition {
                ingredient_id: "rice".to_string(),
                protein: 7.0,
                carbs: 78.0,
                fat: 1.0,
                calories: None,
            }],
        })
    }

    #[test]
    fn test_scalability_resolution_order() {
        let catalog = catalog();
        assert_eq!(catalog.scalability_for("stored").protein_scalability, 0.9);
        assert_eq!(catalog.scalability_for("plain"), RecipeScalability::neutral("plain"));
        let derived = catalog.scalability_for("rice-bowl");
        assert!((derived.carbs_scalability - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_join_and_exclusion() {
        let catalog = catalog();
        let joined = catalog.recipes_with_history(&["rice-bowl".to_string()]);
        assert_eq!(joined.len(), 1);
        assert!(joined[0].is_favorite);
        assert_eq!(joined[0].days_since_last_use, Some(12));
        assert!((joined[0].base_macros.calories - 370.0).abs() < 1e-9);
    }

    #[test]
    fn test_ingredient_data_detection() {
        let catalog = catalog();
        assert!(catalog.has_ingredient_data());
        assert!(catalog.has_ingredient_nutrition("rice-bowl"));
        assert!(!catalog.has_ingredient_nutrition("plain"));
        assert!(matches!(
            catalog.get_recipe("missing"),
            Err(PlannerError::RecipeNotFound(_))
        ));
    }
}
