use std::collections::BTreeMap;

use crate::models::{MealType, RankedRecipe, Recipe, RecipeScalability};
use crate::planner::orchestrator::MasterGenerationResult;
use crate::planner::validator::ValidationResult;

fn check_mark(passes: bool) -> &'static str {
    if passes { "ok" } else { "FAIL" }
}

/// Display a generation result: plan table, LP portions, validation and metrics.
pub fn display_generation_result(result: &MasterGenerationResult) {
    println!();
    println!("=== Meal Plan ({:?}) ===", result.status);
    println!();

    let Some(plan) = &result.final_meal_plan else {
        println!("No meal plan generated.");
        display_failures(&result.generation_metadata.failure_reasons);
        return;
    };

    let name_width = plan
        .meals
        .values()
        .map(|m| m.recipe.recipe.name.chars().count())
        .max()
        .unwrap_or(10);

    for (meal_type, meal) in &plan.meals {
        let favorite = if meal.recipe.recipe.is_favorite { " *" } else { "" };
        println!(
            "{:<8} {:<width$} {:>5.1}% | score {:>6.2} | {}{}",
            meal_type.name(),
            meal.recipe.recipe.name,
            meal.target_percent,
            meal.recipe.final_score,
            meal.assigned_macros.summary(),
            favorite,
            width = name_width
        );
    }

    println!();
    println!("Target: {}", plan.target_macros.summary());
    println!("Plan:   {}", plan.total_macros.summary());
    println!(
        "Deviation: {:.1}% (max single {:.1}%) | average score {:.2}",
        plan.deviation.total_percent,
        plan.deviation.max_individual(),
        plan.average_score
    );

    if let Some(lp) = &result.lp_optimization {
        println!();
        if lp.success {
            println!("--- Optimized portions ---");
            for q in &lp.optimized_quantities {
                let group = q
                    .binding_group
                    .as_deref()
                    .map(|g| format!(" [{}]", g))
                    .unwrap_or_default();
                println!(
                    "  {:<8} {:<20} {:>7.1} g -> {:>7.1} g (x{:.2}){}",
                    q.meal_type.name(),
                    q.ingredient_id,
                    q.original_quantity,
                    q.optimized_quantity,
                    q.scale_factor,
                    group
                );
            }
            println!("Optimized: {}", lp.optimized_macros.summary());
            println!("Deviation after LP: {:.1}%", lp.deviations.total_percent());
        } else {
            println!(
                "LP optimization failed ({:?}): {}",
                lp.status,
                lp.message.as_deref().unwrap_or("")
            );
        }
    }

    display_validation(&result.validation);

    let metrics = &result.quality_metrics;
    println!();
    println!("--- Quality ---");
    println!("Final deviation:     {:.1}%", metrics.final_deviation_percent);
    println!("Average score:       {:.2}", metrics.final_average_score);
    println!("Recipe diversity:    {:.0}", metrics.recipe_diversity_score);
    println!("Nutritional balance: {:.0}", metrics.nutritional_balance_score);
    println!("User satisfaction:   {:.1}", metrics.user_satisfaction_score);
    println!("Attempts:            {}", result.generation_metadata.attempts);

    display_failures(&result.generation_metadata.failure_reasons);
    println!();
}

fn display_validation(validation: &ValidationResult) {
    println!();
    println!(
        "--- Validation: {} (score {:.0}/100) ---",
        if validation.is_valid { "valid" } else { "invalid" },
        validation.overall_score
    );
    println!("  deviation    {}", check_mark(validation.deviation_validation.passes));
    println!("  distribution {}", check_mark(validation.distribution_validation.passes));
    println!("  quality      {}", check_mark(validation.quality_validation.passes));
    println!("  nutrition    {}", check_mark(validation.nutrition_validation.passes));
    for violation in validation.violations() {
        println!("    - {}", violation);
    }
}

fn display_failures(reasons: &[String]) {
    if reasons.is_empty() {
        return;
    }
    println!();
    println!("--- Failure reasons ---");
    for reason in reasons {
        println!("  {}", reason);
    }
}

/// Display the top `limit` ranked recipes per meal slot.
pub fn display_rankings(groups: &BTreeMap<MealType, Vec<RankedRecipe>>, limit: usize) {
    for (meal_type, ranked) in groups {
        println!();
        println!("=== {} ({} candidates) ===", meal_type, ranked.len());
        if ranked.is_empty() {
            println!("  (none)");
            continue;
        }
        for (i, r) in ranked.iter().take(limit).enumerate() {
            let mut tags = Vec::new();
            if r.penalty > 0.0 {
                tags.push(format!("recent -{:.0}", r.penalty));
            }
            if r.reward > 0.0 {
                tags.push(format!("favorite +{:.0}", r.reward));
            }
            let tags_str = if tags.is_empty() {
                String::new()
            } else {
                format!("  [{}]", tags.join(", "))
            };
            println!(
                "{:>3}. {} ({}) base {:.2} => {:.2}{}",
                i + 1,
                r.recipe.name,
                r.id(),
                r.recipe.base_score,
                r.final_score,
                tags_str
            );
        }
    }
    println!();
}

/// Display resolved scalability profiles.
pub fn display_scalability(rows: &[(&Recipe, RecipeScalability)]) {
    if rows.is_empty() {
        println!("Catalog has no recipes.");
        return;
    }

    let width = rows
        .iter()
        .map(|(r, _)| r.name.chars().count())
        .max()
        .unwrap_or(10);

    println!();
    println!(
        "{:<width$}  {:>6} {:>6} {:>6} | {:>6} {:>6} {:>6}",
        "recipe", "P", "C", "F", "P/100", "C/100", "F/100",
        width = width
    );
    for (recipe, s) in rows {
        println!(
            "{:<width$}  {:>6.2} {:>6.2} {:>6.2} | {:>6.1} {:>6.1} {:>6.1}",
            recipe.name,
            s.protein_scalability,
            s.carbs_scalability,
            s.fat_scalability,
            s.protein_density,
            s.carbs_density,
            s.fat_density,
            width = width
        );
    }
    println!();
}
