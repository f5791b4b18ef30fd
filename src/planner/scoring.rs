use std::collections::HashMap;

use serde::Serialize;

use crate::models::{
    IngredientNutrition, Macro, MacroVector, Recipe, RecipeScalability, RecipeWithHistory,
};
use crate::planner::constants::*;
use crate::planner::similarity::cosine_similarity;

/// Score breakdown for one recipe against a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RecipeScore {
    /// Combined score in [0, 100].
    pub total_score: f64,
    pub cosine_similarity: f64,
    /// Scalability averaged with the target's gram share per macro, in [0, 1].
    pub weighted_scalability: f64,
}

/// Gram share of protein, carbs and fat in a target; equal thirds for an empty target.
fn target_gram_weights(target: &MacroVector) -> [f64; 3] {
    let grams = target.protein + target.carbs + target.fat;
    if grams <= 0.0 {
        return [1.0 / 3.0; 3];
    }
    [
        target.protein / grams,
        target.carbs / grams,
        target.fat / grams,
    ]
}

/// Score a recipe by profile similarity and how well its macros can be scaled.
///
/// A missing scalability profile counts as neutral (0.5 per macro).
pub fn score_recipe(
    recipe_macros: &MacroVector,
    target: &MacroVector,
    scalability: Option<&RecipeScalability>,
) -> RecipeScore {
    let similarity = cosine_similarity(recipe_macros, target).similarity;

    let weights = target_gram_weights(target);
    let weighted_scalability = match scalability {
        Some(s) => Macro::NUTRIENTS
            .iter()
            .zip(weights)
            .map(|(m, w)| s.for_macro(*m).clamp(0.0, 1.0) * w)
            .sum(),
        None => NEUTRAL_SCALABILITY,
    };

    let total_score = (100.0
        * (SIMILARITY_WEIGHT * similarity + SCALABILITY_WEIGHT * weighted_scalability))
        .clamp(0.0, 100.0);

    RecipeScore {
        total_score,
        cosine_similarity: similarity,
        weighted_scalability,
    }
}

/// Fill `base_score` on every recipe.
pub fn score_recipes(
    recipes: Vec<RecipeWithHistory>,
    target: &MacroVector,
    scalability: &HashMap<String, RecipeScalability>,
) -> Vec<RecipeWithHistory> {
    recipes
        .into_iter()
        .map(|mut recipe| {
            let score = score_recipe(
                &recipe.base_macros,
                target,
                scalability.get(&recipe.recipe_id),
            );
            recipe.base_score = score.total_score;
            recipe
        })
        .collect()
}

/// Derive a recipe's scalability profile from its ingredient composition.
///
/// Per macro M: `min(1, (independent_ratio + 0.4 * bound_ratio) * avg_density / reference_M)`,
/// halved for fat when the average fat density exceeds 80 g/100 g.
/// Returns `None` when no ingredient has nutrition data.
pub fn derive_scalability(
    recipe: &Recipe,
    nutrition: &HashMap<String, IngredientNutrition>,
) -> Option<RecipeScalability> {
    let mut total_mass = 0.0;
    // Per macro: (independent grams, bound grams, density-weighted grams)
    let mut acc = [(0.0_f64, 0.0_f64, 0.0_f64); 3];

    for ing in &recipe.ingredients {
        let Some(data) = nutrition.get(&ing.ingredient_id) else {
            continue;
        };
        total_mass += ing.quantity_g;
        let densities = [data.protein, data.carbs, data.fat];
        for (slot, density) in acc.iter_mut().zip(densities) {
            let grams = ing.quantity_g * density / 100.0;
            if ing.is_bound() {
                slot.1 += grams;
            } else {
                slot.0 += grams;
            }
            slot.2 += grams * density;
        }
    }

    if total_mass <= 0.0 {
        return None;
    }

    let references = [
        REFERENCE_PROTEIN_DENSITY,
        REFERENCE_CARBS_DENSITY,
        REFERENCE_FAT_DENSITY,
    ];
    let mut skala = [0.0; 3];
    let mut recipe_density = [0.0; 3];
    for (i, (independent, bound, weighted)) in acc.iter().enumerate() {
        let grams = independent + bound;
        recipe_density[i] = grams / total_mass * 100.0;
        if grams <= 0.0 {
            continue;
        }
        let avg_density = weighted / grams;
        skala[i] = scalability_formula(
            independent / grams,
            bound / grams,
            avg_density,
            references[i],
            Macro::NUTRIENTS[i] == Macro::Fat,
        );
    }

    Some(RecipeScalability {
        recipe_id: recipe.id.clone(),
        protein_scalability: skala[0],
        carbs_scalability: skala[1],
        fat_scalability: skala[2],
        protein_density: recipe_density[0],
        carbs_density: recipe_density[1],
        fat_density: recipe_density[2],
    })
}

/// Scalability of one macro from its independent/bound split and density.
pub fn scalability_formula(
    independent_ratio: f64,
    bound_ratio: f64,
    avg_density: f64,
    reference_density: f64,
    is_fat: bool,
) -> f64 {
    if reference_density <= 0.0 {
        return 0.0;
    }
    let structural = independent_ratio + BOUND_SCALABILITY_WEIGHT * bound_ratio;
    let mut new_skala = (structural * (avg_density / reference_density)).min(1.0);
    if is_fat && avg_density > HIGH_FAT_DENSITY {
        new_skala *= 0.5;
    }
    new_skala.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IngredientType, MealType, RecipeIngredient, RecipeMacros};

    fn nutrition(id: &str, p: f64, c: f64, f: f64) -> (String, IngredientNutrition) {
        (
            id.to_string(),
            IngredientNutrition {
                ingredient_id: id.to_string(),
                protein: p,
                carbs: c,
                fat: f,
                calories: None,
            },
        )
    }

    fn ingredient(id: &str, grams: f64, group: Option<&str>) -> RecipeIngredient {
        RecipeIngredient {
            ingredient_id: id.to_string(),
            name: id.to_string(),
            quantity_g: grams,
            ingredient_type: if group.is_some() {
                IngredientType::Kotott
            } else {
                IngredientType::Kiegeszito
            },
            binding_group: group.map(str::to_string),
            min_scale_factor: None,
            max_scale_factor: None,
        }
    }

    #[test]
    fn test_formula_reference_case_is_one() {
        let s = scalability_formula(1.0, 0.0, REFERENCE_PROTEIN_DENSITY, REFERENCE_PROTEIN_DENSITY, false);
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_formula_halves_dense_fat() {
        // 90 g/100 g fat: unadjusted = min(1, 0.5 * 90/30) = 1.0, halved to 0.5
        let unadjusted = scalability_formula(0.5, 0.0, 90.0, REFERENCE_FAT_DENSITY, false);
        let fat = scalability_formula(0.5, 0.0, 90.0, REFERENCE_FAT_DENSITY, true);
        assert!((fat - unadjusted * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_bound_ingredients_scale_less() {
        let free = scalability_formula(1.0, 0.0, 30.0, 60.0, false);
        let bound = scalability_formula(0.0, 1.0, 30.0, 60.0, false);
        assert!(bound < free);
    }

    #[test]
    fn test_identical_profile_scores_high() {
        let target = MacroVector::new(120.0, 150.0, 50.0, 1460.0);
        let full = RecipeScalability {
            recipe_id: "r".to_string(),
            protein_scalability: 1.0,
            carbs_scalability: 1.0,
            fat_scalability: 1.0,
            protein_density: 0.0,
            carbs_density: 0.0,
            fat_density: 0.0,
        };
        let score = score_recipe(&target, &target, Some(&full));
        assert!((score.total_score - 100.0).abs() < 1e-6);
        assert!((score.weighted_scalability - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_scalability_is_neutral() {
        let target = MacroVector::new(120.0, 150.0, 50.0, 1460.0);
        let score = score_recipe(&target, &target, None);
        assert!((score.weighted_scalability - NEUTRAL_SCALABILITY).abs() < 1e-12);
        assert!((score.total_score - (70.0 + 15.0)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_recipe_scores_only_scalability() {
        let target = MacroVector::new(120.0, 150.0, 50.0, 1460.0);
        let score = score_recipe(&MacroVector::zero(), &target, None);
        assert_eq!(score.cosine_similarity, 0.0);
        assert!((score.total_score - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_derive_scalability_from_ingredients() {
        let table: HashMap<String, IngredientNutrition> = [
            nutrition("chicken", 25.0, 0.0, 3.0),
            nutrition("rice", 7.0, 78.0, 1.0),
        ]
        .into_iter()
        .collect();

        let recipe = Recipe {
            id: "r1".to_string(),
            name: "Chicken rice".to_string(),
            meal_types: vec![MealType::Ebed],
            macros: RecipeMacros::default(),
            ingredients: vec![ingredient("chicken", 200.0, None), ingredient("rice", 100.0, None)],
        };

        let s = derive_scalability(&recipe, &table).unwrap();
        assert!(s.protein_scalability > 0.0 && s.protein_scalability <= 1.0);
        assert!((s.carbs_scalability - 1.0).abs() < 1e-9);
        // 50 g protein + 7 g protein over 300 g
        assert!((s.protein_density - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_derive_scalability_without_data() {
        let recipe = Recipe {
            id: "r1".to_string(),
            name: "Mystery".to_string(),
            meal_types: vec![MealType::Ebed],
            macros: RecipeMacros::default(),
            ingredients: vec![ingredient("unknown", 100.0, Some("g1"))],
        };
        assert!(derive_scalability(&recipe, &HashMap::new()).is_none());
    }
}
