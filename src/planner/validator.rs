use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValidationCriteria;
use crate::models::{Macro, MacroDeviation, MacroVector, MealCombination, MealType};
use crate::planner::constants::{
    DEVIATION_CHECK_WEIGHT, DISTRIBUTION_CHECK_WEIGHT, KCAL_PER_G_CARBS, KCAL_PER_G_FAT,
    NUTRITION_CHECK_WEIGHT, QUALITY_CHECK_WEIGHT,
};
use crate::planner::lp::LpOptimizationResult;

// ─── Check results ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviationValidation {
    pub passes: bool,
    pub total_deviation_percent: f64,
    pub max_individual_deviation_percent: f64,
    pub deviation: MacroDeviation,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealDistributionCheck {
    pub meal_type: MealType,
    pub actual_percent: f64,
    pub target_percent: f64,
    pub tolerance: f64,
    pub passes: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionValidation {
    pub passes: bool,
    pub meals: Vec<MealDistributionCheck>,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityValidation {
    pub passes: bool,
    pub average_score: f64,
    pub min_recipe_score: f64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutritionValidation {
    pub passes: bool,
    /// Grams of protein per kcal.
    pub protein_density: f64,
    pub fat_percent: f64,
    pub carb_percent: f64,
    pub protein_density_ok: bool,
    pub fat_percent_ok: bool,
    pub carb_percent_ok: bool,
    pub violations: Vec<String>,
}

impl NutritionValidation {
    /// Number of the three sub-checks that passed.
    pub fn passed_checks(&self) -> usize {
        [self.protein_density_ok, self.fat_percent_ok, self.carb_percent_ok]
            .iter()
            .filter(|ok| **ok)
            .count()
    }
}

/// Outcome of all four checks.
///
/// `is_valid` needs the deviation and quality checks; distribution and
/// nutrition only lower `overall_score`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub overall_score: f64,
    pub deviation_validation: DeviationValidation,
    pub distribution_validation: DistributionValidation,
    pub quality_validation: QualityValidation,
    pub nutrition_validation: NutritionValidation,
    /// True when deviation and nutrition were checked against LP output.
    pub used_lp_macros: bool,
}

impl ValidationResult {
    pub fn violations(&self) -> impl Iterator<Item = &String> {
        self.deviation_validation
            .violations
            .iter()
            .chain(&self.distribution_validation.violations)
            .chain(&self.quality_validation.violations)
            .chain(&self.nutrition_validation.violations)
    }
}

// ─── Checks ─────────────────────────────────────────────────────────────────

pub fn validate_deviation(
    actual: &MacroVector,
    target: &MacroVector,
    criteria: &ValidationCriteria,
) -> DeviationValidation {
    let deviation = MacroDeviation::between(actual, target);
    let mut violations = Vec::new();

    if deviation.total_percent > criteria.max_total_deviation_percent {
        violations.push(format!(
            "total deviation {:.1}% exceeds {:.1}%",
            deviation.total_percent, criteria.max_total_deviation_percent
        ));
    }
    for m in Macro::ALL {
        let d = deviation.get(m);
        if d > criteria.max_individual_deviation_percent {
            violations.push(format!(
                "{} deviation {:.1}% exceeds {:.1}%",
                m.label(),
                d,
                criteria.max_individual_deviation_percent
            ));
        }
    }

    DeviationValidation {
        passes: violations.is_empty(),
        total_deviation_percent: deviation.total_percent,
        max_individual_deviation_percent: deviation.max_individual(),
        deviation,
        violations,
    }
}

/// Compare each meal's share of the day's calories against its slot target.
pub fn validate_distribution(combination: &MealCombination) -> DistributionValidation {
    let total_calories = combination.total_macros.calories;
    let mut meals = Vec::with_capacity(combination.len());
    let mut violations = Vec::new();

    for (meal_type, meal) in &combination.meals {
        let actual_percent = if total_calories > 0.0 {
            meal.assigned_macros.calories / total_calories * 100.0
        } else {
            0.0
        };
        let tolerance = meal.tolerance;
        let passes = (actual_percent - meal.target_percent).abs() <= tolerance;
        if !passes {
            violations.push(format!(
                "{} has {:.1}% of calories, expected {:.1}% ± {:.1}",
                meal_type, actual_percent, meal.target_percent, tolerance
            ));
        }
        meals.push(MealDistributionCheck {
            meal_type: *meal_type,
            actual_percent,
            target_percent: meal.target_percent,
            tolerance,
            passes,
        });
    }

    DistributionValidation {
        passes: violations.is_empty(),
        meals,
        violations,
    }
}

pub fn validate_quality(
    combination: &MealCombination,
    criteria: &ValidationCriteria,
) -> QualityValidation {
    let mut violations = Vec::new();

    for (meal_type, meal) in &combination.meals {
        if meal.recipe.final_score < criteria.min_recipe_score {
            violations.push(format!(
                "{} recipe {} scores {:.1}, below {:.1}",
                meal_type,
                meal.recipe.id(),
                meal.recipe.final_score,
                criteria.min_recipe_score
            ));
        }
    }
    if combination.average_score < criteria.min_average_score {
        violations.push(format!(
            "average score {:.1} below {:.1}",
            combination.average_score, criteria.min_average_score
        ));
    }

    let min_recipe_score = combination
        .meals
        .values()
        .map(|m| m.recipe.final_score)
        .fold(f64::INFINITY, f64::min);

    QualityValidation {
        passes: violations.is_empty(),
        average_score: combination.average_score,
        min_recipe_score: if min_recipe_score.is_finite() {
            min_recipe_score
        } else {
            0.0
        },
        violations,
    }
}

/// Protein density and fat/carb energy shares. Zero calories fails every sub-check.
pub fn validate_nutrition(macros: &MacroVector, criteria: &ValidationCriteria) -> NutritionValidation {
    let mut violations = Vec::new();

    if macros.calories <= 0.0 {
        violations.push("plan has no calories".to_string());
        return NutritionValidation {
            violations,
            ..Default::default()
        };
    }

    let protein_density = macros.protein / macros.calories;
    let fat_percent = macros.fat * KCAL_PER_G_FAT / macros.calories * 100.0;
    let carb_percent = macros.carbs * KCAL_PER_G_CARBS / macros.calories * 100.0;

    let protein_density_ok = protein_density >= criteria.min_protein_density;
    let fat_percent_ok = fat_percent <= criteria.max_fat_percent;
    let carb_percent_ok = carb_percent >= criteria.min_carb_percent;

    if !protein_density_ok {
        violations.push(format!(
            "protein density {:.3} g/kcal below {:.3}",
            protein_density, criteria.min_protein_density
        ));
    }
    if !fat_percent_ok {
        violations.push(format!(
            "fat provides {:.1}% of calories, above {:.1}%",
            fat_percent, criteria.max_fat_percent
        ));
    }
    if !carb_percent_ok {
        violations.push(format!(
            "carbs provide {:.1}% of calories, below {:.1}%",
            carb_percent, criteria.min_carb_percent
        ));
    }

    NutritionValidation {
        passes: violations.is_empty(),
        protein_density,
        fat_percent,
        carb_percent,
        protein_density_ok,
        fat_percent_ok,
        carb_percent_ok,
        violations,
    }
}

/// Run all four checks. A successful LP result replaces the combination's
/// macros for the deviation and nutrition checks.
pub fn validate_meal_plan(
    combination: &MealCombination,
    lp_result: Option<&LpOptimizationResult>,
    criteria: &ValidationCriteria,
) -> ValidationResult {
    let lp_macros = lp_result
        .filter(|lp| lp.success)
        .map(|lp| lp.optimized_macros);
    let macros = lp_macros.unwrap_or(combination.total_macros);

    let deviation_validation = validate_deviation(&macros, &combination.target_macros, criteria);
    let distribution_validation = validate_distribution(combination);
    let quality_validation = validate_quality(combination, criteria);
    let nutrition_validation = validate_nutrition(&macros, criteria);

    let weighted = [
        (deviation_validation.passes, DEVIATION_CHECK_WEIGHT),
        (distribution_validation.passes, DISTRIBUTION_CHECK_WEIGHT),
        (quality_validation.passes, QUALITY_CHECK_WEIGHT),
        (nutrition_validation.passes, NUTRITION_CHECK_WEIGHT),
    ];
    let overall_score = weighted
        .iter()
        .filter(|(passes, _)| *passes)
        .map(|(_, w)| w)
        .sum();

    let is_valid = deviation_validation.passes && quality_validation.passes;

    debug!(
        plan = %combination.meal_plan_id,
        is_valid,
        overall_score,
        used_lp_macros = lp_macros.is_some(),
        "meal plan validated"
    );

    ValidationResult {
        is_valid,
        overall_score,
        deviation_validation,
        distribution_validation,
        quality_validation,
        nutrition_validation,
        used_lp_macros: lp_macros.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlannedMeal, RankedRecipe, RecipeWithHistory};
    use std::collections::BTreeMap;

    fn meal(id: &str, meal_type: MealType, macros: MacroVector, pct: f64, score: f64) -> PlannedMeal {
        PlannedMeal {
            recipe: RankedRecipe {
                recipe: RecipeWithHistory {
                    recipe_id: id.to_string(),
                    name: id.to_string(),
                    meal_types: vec![meal_type],
                    base_macros: macros,
                    is_favorite: false,
                    days_since_last_use: None,
                    usage_count_last_7_days: 0,
                    usage_count_last_30_days: 0,
                    base_score: score,
                },
                penalty: 0.0,
                reward: 0.0,
                final_score: score,
            },
            target_percent: pct,
            tolerance: 5.0,
            assigned_macros: macros * (pct / 100.0),
        }
    }

    fn combination(day: MacroVector, target: MacroVector, score: f64) -> MealCombination {
        let meals: BTreeMap<MealType, PlannedMeal> = [
            (MealType::Reggeli, 30.0),
            (MealType::Ebed, 40.0),
            (MealType::Vacsora, 30.0),
        ]
        .into_iter()
        .map(|(m, pct)| (m, meal(&m.to_string(), m, day, pct, score)))
        .collect();
        MealCombination::new(meals, target)
    }

    #[test]
    fn test_on_target_plan_is_valid() {
        let target = MacroVector::new(200.0, 100.0, 30.0, 1470.0);
        let combo = combination(target, target, 90.0);
        let result = validate_meal_plan(&combo, None, &ValidationCriteria::default());
        assert!(result.is_valid);
        assert_eq!(result.overall_score, 100.0);
        assert!(result.violations().next().is_none());
    }

    #[test]
    fn test_low_scores_invalidate() {
        let target = MacroVector::new(200.0, 100.0, 30.0, 1470.0);
        let combo = combination(target, target, 65.0);
        let result = validate_meal_plan(&combo, None, &ValidationCriteria::default());
        assert!(!result.is_valid);
        assert!(!result.quality_validation.passes);
        assert_eq!(result.overall_score, 75.0);
    }

    #[test]
    fn test_nutrition_failure_is_advisory() {
        // 60% of energy from fat
        let day = MacroVector::new(100.0, 60.0, 100.0, 1540.0);
        let combo = combination(day, day, 90.0);
        let result = validate_meal_plan(&combo, None, &ValidationCriteria::default());
        assert!(!result.nutrition_validation.fat_percent_ok);
        assert!(result.is_valid);
        assert_eq!(result.overall_score, 85.0);
    }

    #[test]
    fn test_zero_calories_fail_without_nan() {
        let result = validate_nutrition(&MacroVector::zero(), &ValidationCriteria::default());
        assert!(!result.passes);
        assert_eq!(result.passed_checks(), 0);
        assert!(!result.protein_density.is_nan());
    }

    #[test]
    fn test_individual_deviation_limit() {
        let target = MacroVector::new(100.0, 100.0, 100.0, 1700.0);
        let actual = MacroVector::new(100.0, 70.0, 100.0, 1700.0);
        let result = validate_deviation(&actual, &target, &ValidationCriteria::default());
        // total 7.5%, carbs 30%
        assert!(!result.passes);
        assert_eq!(result.violations.len(), 1);
    }

    #[test]
    fn test_distribution_flags_heavy_meal() {
        let target = MacroVector::new(120.0, 150.0, 50.0, 1530.0);
        let mut meals: BTreeMap<MealType, PlannedMeal> = BTreeMap::new();
        meals.insert(MealType::Reggeli, meal("b", MealType::Reggeli, target * 2.0, 30.0, 90.0));
        meals.insert(MealType::Ebed, meal("l", MealType::Ebed, target, 40.0, 90.0));
        meals.insert(MealType::Vacsora, meal("d", MealType::Vacsora, target, 30.0, 90.0));
        let combo = MealCombination::new(meals, target);

        let result = validate_distribution(&combo);
        assert!(!result.passes);
        let breakfast = &result.meals[0];
        assert_eq!(breakfast.meal_type, MealType::Reggeli);
        assert!(breakfast.actual_percent > breakfast.target_percent + breakfast.tolerance);
    }

    #[test]
    fn test_lp_macros_replace_combination_macros() {
        use crate::planner::lp::{LpDeviations, LpMetadata, LpStatus};

        let target = MacroVector::new(120.0, 150.0, 50.0, 1530.0);
        let short = MacroVector::new(120.0, 20.0, 50.0, 1010.0);
        let combo = combination(short, target, 90.0);
        let criteria = ValidationCriteria::default();
        assert!(!validate_meal_plan(&combo, None, &criteria).is_valid);

        let lp = LpOptimizationResult {
            success: true,
            status: LpStatus::Optimal,
            message: None,
            optimized_quantities: Vec::new(),
            optimized_macros: target,
            deviations: LpDeviations::default(),
            objective: 0.0,
            metadata: LpMetadata::default(),
        };
        let result = validate_meal_plan(&combo, Some(&lp), &criteria);
        assert!(result.is_valid);
        assert!(result.used_lp_macros);
    }
}
