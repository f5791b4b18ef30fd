use std::collections::HashMap;

use tracing::debug;

use crate::catalog::RecipeCatalog;
use crate::models::{MacroVector, RecipeWithHistory};
use crate::planner::constants::{
    DEFAULT_PROFILE_SIMILARITY_FLOOR, DEFAULT_STRUCTURE_TOLERANCE_PP, KCAL_PER_G_CARBS,
    KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN,
};
use crate::planner::similarity::cosine_similarity;

/// Narrows the candidate set once, before scoring.
pub trait RecipePreFilter {
    fn name(&self) -> &str;

    /// Whether this filter has the data it needs for these recipes.
    fn is_applicable(&self, _recipes: &[RecipeWithHistory]) -> bool {
        true
    }

    fn filter(&self, recipes: Vec<RecipeWithHistory>, target: &MacroVector) -> Vec<RecipeWithHistory>;
}

/// Percent of energy from protein, carbs and fat (4-4-9). `None` without energy.
pub fn energy_split(macros: &MacroVector) -> Option<[f64; 3]> {
    let kcal = [
        macros.protein * KCAL_PER_G_PROTEIN,
        macros.carbs * KCAL_PER_G_CARBS,
        macros.fat * KCAL_PER_G_FAT,
    ];
    let total: f64 = kcal.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(kcal.map(|k| k / total * 100.0))
}

/// Keeps recipes whose ingredient-derived energy split is within
/// `tolerance_pp` percentage points of the target's, per macro.
///
/// Recipes without ingredient nutrition pass unchanged.
#[derive(Debug, Clone)]
pub struct StrictMacroStructureFilter {
    /// Ingredient-derived macros per recipe id.
    structures: HashMap<String, MacroVector>,
    pub tolerance_pp: f64,
}

impl StrictMacroStructureFilter {
    pub fn new(structures: HashMap<String, MacroVector>, tolerance_pp: f64) -> Self {
        Self {
            structures,
            tolerance_pp,
        }
    }

    /// Sum each recipe's ingredient macros from the catalog's nutrition table.
    pub fn from_catalog(catalog: &RecipeCatalog) -> Self {
        let nutrition = catalog.nutrition();
        let structures = catalog
            .all_recipes()
            .filter_map(|recipe| {
                let mut known = false;
                let total: MacroVector = recipe
                    .ingredients
                    .iter()
                    .filter_map(|ing| {
                        let data = nutrition.get(&ing.ingredient_id)?;
                        known = true;
                        Some(data.per_gram() * ing.quantity_g)
                    })
                    .sum();
                known.then(|| (recipe.id.clone(), total))
            })
            .collect();
        Self::new(structures, DEFAULT_STRUCTURE_TOLERANCE_PP)
    }

    fn matches(&self, structure: &MacroVector, target_split: &[f64; 3]) -> bool {
        match energy_split(structure) {
            Some(split) => split
                .iter()
                .zip(target_split)
                .all(|(a, b)| (a - b).abs() <= self.tolerance_pp),
            None => false,
        }
    }
}

impl RecipePreFilter for StrictMacroStructureFilter {
    fn name(&self) -> &str {
        "strict_macro_structure"
    }

    fn is_applicable(&self, recipes: &[RecipeWithHistory]) -> bool {
        recipes
            .iter()
            .any(|r| self.structures.contains_key(&r.recipe_id))
    }

    fn filter(&self, recipes: Vec<RecipeWithHistory>, target: &MacroVector) -> Vec<RecipeWithHistory> {
        let Some(target_split) = energy_split(target) else {
            return recipes;
        };
        let before = recipes.len();
        let kept: Vec<RecipeWithHistory> = recipes
            .into_iter()
            .filter(|r| match self.structures.get(&r.recipe_id) {
                Some(structure) => self.matches(structure, &target_split),
                None => true,
            })
            .collect();
        debug!(before, after = kept.len(), "strict macro structure filter");
        kept
    }
}

/// Keeps recipes whose base macros are cosine-similar enough to the target.
#[derive(Debug, Clone)]
pub struct MacroProfileFilter {
    pub min_similarity: f64,
}

impl Default for MacroProfileFilter {
    fn default() -> Self {
        Self {
            min_similarity: DEFAULT_PROFILE_SIMILARITY_FLOOR,
        }
    }
}

impl RecipePreFilter for MacroProfileFilter {
    fn name(&self) -> &str {
        "macro_profile"
    }

    fn filter(&self, recipes: Vec<RecipeWithHistory>, target: &MacroVector) -> Vec<RecipeWithHistory> {
        recipes
            .into_iter()
            .filter(|r| cosine_similarity(&r.base_macros, target).similarity >= self.min_similarity)
            .collect()
    }
}

/// Passes every recipe through.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreFilter;

impl RecipePreFilter for NoPreFilter {
    fn name(&self) -> &str {
        "none"
    }

    fn filter(&self, recipes: Vec<RecipeWithHistory>, _target: &MacroVector) -> Vec<RecipeWithHistory> {
        recipes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MealType;

    fn recipe(id: &str, macros: MacroVector) -> RecipeWithHistory {
        RecipeWithHistory {
            recipe_id: id.to_string(),
            name: id.to_string(),
            meal_types: vec![MealType::Ebed],
            base_macros: macros,
            is_favorite: false,
            days_since_last_use: None,
            usage_count_last_7_days: 0,
            usage_count_last_30_days: 0,
            base_score: 0.0,
        }
    }

    #[test]
    fn test_energy_split_sums_to_hundred() {
        let split = energy_split(&MacroVector::from_grams(20.0, 30.0, 10.0)).unwrap();
        assert!((split.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert!(energy_split(&MacroVector::zero()).is_none());
    }

    #[test]
    fn test_strict_filter_drops_mismatched_structure() {
        let target = MacroVector::from_grams(120.0, 150.0, 50.0);
        let structures: HashMap<String, MacroVector> = [
            ("balanced".to_string(), MacroVector::from_grams(24.0, 30.0, 10.0)),
            ("greasy".to_string(), MacroVector::from_grams(5.0, 5.0, 40.0)),
        ]
        .into_iter()
        .collect();
        let filter = StrictMacroStructureFilter::new(structures, 20.0);

        let recipes = vec![
            recipe("balanced", target),
            recipe("greasy", target),
            recipe("unknown", target),
        ];
        assert!(filter.is_applicable(&recipes));
        let kept: Vec<String> = filter
            .filter(recipes, &target)
            .into_iter()
            .map(|r| r.recipe_id)
            .collect();
        assert_eq!(kept, vec!["balanced", "unknown"]);
    }

    #[test]
    fn test_strict_filter_not_applicable_without_data() {
        let filter = StrictMacroStructureFilter::new(HashMap::new(), 20.0);
        let recipes = vec![recipe("a", MacroVector::from_grams(1.0, 1.0, 1.0))];
        assert!(!filter.is_applicable(&recipes));
    }

    #[test]
    fn test_profile_filter_floor() {
        let target = MacroVector::from_grams(120.0, 150.0, 50.0);
        let filter = MacroProfileFilter::default();
        let recipes = vec![
            recipe("close", target * 0.3),
            recipe("far", MacroVector::new(0.0, 0.0, 100.0, 0.0)),
        ];
        let kept = filter.filter(recipes, &target);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].recipe_id, "close");
    }
}
