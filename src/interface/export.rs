use std::io::Write;
use std::path::Path;

use crate::error::Result;
use crate::models::MealCombination;
use crate::planner::lp::LpOptimizationResult;

const PLAN_HEADER: [&str; 10] = [
    "meal_type",
    "recipe_id",
    "recipe_name",
    "target_percent",
    "final_score",
    "protein_g",
    "carbs_g",
    "fat_g",
    "calories",
    "favorite",
];

/// Write one row per planned meal.
pub fn write_plan_csv_to<W: Write>(writer: W, plan: &MealCombination) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(PLAN_HEADER)?;

    for (meal_type, meal) in &plan.meals {
        let macros = &meal.assigned_macros;
        wtr.write_record([
            meal_type.name().to_string(),
            meal.recipe.id().to_string(),
            meal.recipe.recipe.name.clone(),
            format!("{:.1}", meal.target_percent),
            format!("{:.2}", meal.recipe.final_score),
            format!("{:.1}", macros.protein),
            format!("{:.1}", macros.carbs),
            format!("{:.1}", macros.fat),
            format!("{:.0}", macros.calories),
            meal.recipe.recipe.is_favorite.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_plan_csv(plan: &MealCombination, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_plan_csv_to(file, plan)
}

/// Write one row per optimized ingredient quantity.
pub fn write_quantities_csv(lp: &LpOptimizationResult, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "meal_type",
        "recipe_id",
        "ingredient_id",
        "binding_group",
        "original_g",
        "optimized_g",
        "scale_factor",
    ])?;

    for q in &lp.optimized_quantities {
        wtr.write_record([
            q.meal_type.name().to_string(),
            q.recipe_id.clone(),
            q.ingredient_id.clone(),
            q.binding_group.clone().unwrap_or_default(),
            format!("{:.1}", q.original_quantity),
            format!("{:.1}", q.optimized_quantity),
            format!("{:.3}", q.scale_factor),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
