use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::macros::{MacroDeviation, MacroVector};
use crate::models::meal_type::MealType;
use crate::models::recipe::RankedRecipe;
use crate::planner::constants::QUALITY_THRESHOLD;

/// A recipe placed into a meal slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub recipe: RankedRecipe,
    /// Share of the daily target assigned to this slot, in percent.
    pub target_percent: f64,
    /// Allowed distance from `target_percent`, in percentage points.
    pub tolerance: f64,
    /// Recipe macros scaled by `target_percent / 100`.
    pub assigned_macros: MacroVector,
}

/// One recipe per meal slot with combined macros and scores.
///
/// Built only through [`MealCombination::new`], which keeps
/// `average_score`, `total_score` and `meets_threshold` consistent with the meals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCombination {
    pub meal_plan_id: String,
    pub meals: BTreeMap<MealType, PlannedMeal>,
    pub total_macros: MacroVector,
    pub target_macros: MacroVector,
    pub deviation: MacroDeviation,
    pub total_score: f64,
    pub average_score: f64,
    /// True iff `average_score >= 80`.
    pub meets_threshold: bool,
}

impl MealCombination {
    pub fn new(meals: BTreeMap<MealType, PlannedMeal>, target_macros: MacroVector) -> Self {
        let total_macros: MacroVector = meals.values().map(|m| m.assigned_macros).sum();
        let deviation = MacroDeviation::between(&total_macros, &target_macros);
        let total_score: f64 = meals.values().map(|m| m.recipe.final_score).sum();
        let average_score = if meals.is_empty() {
            0.0
        } else {
            total_score / meals.len() as f64
        };
        let meal_plan_id = format!(
            "plan-{}",
            meals
                .iter()
                .map(|(meal_type, m)| format!("{}:{}", meal_type, m.recipe.id()))
                .collect::<Vec<_>>()
                .join("+")
        );

        Self {
            meal_plan_id,
            meals,
            total_macros,
            target_macros,
            deviation,
            total_score,
            average_score,
            meets_threshold: average_score >= QUALITY_THRESHOLD,
        }
    }

    /// Recipe ids in slot order.
    pub fn recipe_ids(&self) -> Vec<&str> {
        self.meals.values().map(|m| m.recipe.id()).collect()
    }

    pub fn contains_recipe(&self, recipe_id: &str) -> bool {
        self.meals.values().any(|m| m.recipe.id() == recipe_id)
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}
