use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::RecipeCatalog;
use crate::config::LpSettings;
use crate::models::{
    IngredientType, Macro, MacroDeviation, MacroVector, MealCombination, MealType,
};
use crate::planner::constants::{
    DYNAMIC_BOUND_GROWTH, DYNAMIC_BOUND_MAX, DYNAMIC_BOUND_MIN, DYNAMIC_BOUND_REFERENCE_KCAL,
    PURE_MACRO_CALORIE_SHARE,
};

/// Slack on bound checks when reading solver output.
const BOUND_EPSILON: f64 = 1e-9;

/// An ingredient quantity the optimizer may rescale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientConstraint {
    pub ingredient_id: String,
    pub recipe_id: String,
    pub meal_type: MealType,
    /// Macros contributed by one gram.
    pub per_gram: MacroVector,
    /// Grams in the planned meal before optimization.
    pub base_quantity: f64,
    pub min_scale_factor: f64,
    pub max_scale_factor: f64,
    /// Members of the same group (within one recipe in one meal) share a scale factor.
    pub binding_group: Option<String>,
    pub ingredient_type: IngredientType,
    /// Recipe scalability of this ingredient's dominant macro.
    pub dominant_scalability: f64,
}

impl IngredientConstraint {
    /// Macros at scale factor 1.
    pub fn base_contribution(&self) -> MacroVector {
        self.per_gram * self.base_quantity
    }

    /// The nutrient contributing the most grams.
    pub fn dominant_macro(&self) -> Macro {
        Macro::NUTRIENTS
            .into_iter()
            .max_by(|a, b| {
                self.per_gram
                    .get(*a)
                    .partial_cmp(&self.per_gram.get(*b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(Macro::Protein)
    }

    /// Upper scale bound: declared maximum intersected with the dynamic bound.
    pub fn effective_upper(&self, target_calories: f64) -> f64 {
        self.max_scale_factor
            .min(dynamic_upper_bound(target_calories, self.dominant_scalability))
    }

    fn group_key(&self) -> Option<(MealType, &str, &str)> {
        self.binding_group
            .as_deref()
            .map(|g| (self.meal_type, self.recipe_id.as_str(), g))
    }
}

/// `clamp(1 + (target_calories / 2200) * 1.5 * scalability, 1.2, 5.0)`.
pub fn dynamic_upper_bound(target_calories: f64, scalability: f64) -> f64 {
    (1.0 + (target_calories / DYNAMIC_BOUND_REFERENCE_KCAL)
        * DYNAMIC_BOUND_GROWTH
        * scalability)
        .clamp(DYNAMIC_BOUND_MIN, DYNAMIC_BOUND_MAX)
}

/// Everything the optimizer needs for one combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpInput {
    pub constraints: Vec<IngredientConstraint>,
    /// Macros the optimizer cannot rescale.
    pub fixed_macros: MacroVector,
    pub target: MacroVector,
}

/// Per macro, the part of `assigned` not covered by `tracked`, floored at zero.
fn untracked_remainder(assigned: &MacroVector, tracked: &MacroVector) -> MacroVector {
    let rest = |m: Macro| (assigned.get(m) - tracked.get(m)).max(0.0);
    MacroVector::new(
        rest(Macro::Protein),
        rest(Macro::Carbs),
        rest(Macro::Fat),
        rest(Macro::Calories),
    )
}

/// Turn a combination into LP constraints using the catalog's ingredient data.
///
/// Quantities are scaled by each meal's share so they agree with the
/// combination's assigned macros. Whatever a meal's usable ingredients do not
/// account for (unknown ingredients, or the whole meal) is carried as fixed macros.
pub fn build_lp_input(combination: &MealCombination, catalog: &RecipeCatalog) -> LpInput {
    let mut constraints = Vec::new();
    let mut fixed_macros = MacroVector::zero();

    for (meal_type, meal) in &combination.meals {
        let share = meal.target_percent / 100.0;
        let recipe_id = meal.recipe.id();
        let scalability = catalog.scalability_for(recipe_id);

        let usable: Vec<IngredientConstraint> = catalog
            .recipe(recipe_id)
            .map(|recipe| recipe.ingredients.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|ing| {
                let nutrition = catalog.nutrition().get(&ing.ingredient_id)?;
                let (min_scale_factor, max_scale_factor) = ing.scale_range();
                let mut constraint = IngredientConstraint {
                    ingredient_id: ing.ingredient_id.clone(),
                    recipe_id: recipe_id.to_string(),
                    meal_type: *meal_type,
                    per_gram: nutrition.per_gram(),
                    base_quantity: ing.quantity_g * share,
                    min_scale_factor,
                    max_scale_factor,
                    binding_group: ing.binding_group.clone(),
                    ingredient_type: ing.ingredient_type,
                    dominant_scalability: 0.0,
                };
                constraint.dominant_scalability = scalability.for_macro(constraint.dominant_macro());
                Some(constraint)
            })
            .collect();

        // Ingredients without nutrition data stay at their original size.
        let tracked: MacroVector = usable.iter().map(|c| c.base_contribution()).sum();
        fixed_macros += untracked_remainder(&meal.assigned_macros, &tracked);
        constraints.extend(usable);
    }

    LpInput {
        constraints,
        fixed_macros,
        target: combination.target_macros,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Timeout,
    NoVariables,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedQuantity {
    pub ingredient_id: String,
    pub recipe_id: String,
    pub meal_type: MealType,
    pub original_quantity: f64,
    pub optimized_quantity: f64,
    pub scale_factor: f64,
    pub binding_group: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LpDeviations {
    /// `optimized - target` per macro.
    pub absolute: MacroVector,
    pub percent: MacroDeviation,
}

impl LpDeviations {
    pub fn total_percent(&self) -> f64 {
        self.percent.total_percent
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LpMetadata {
    pub variables: usize,
    pub constraints: usize,
    pub solve_time_ms: f64,
}

/// Outcome of an LP run. Failures are reported here, never substituted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpOptimizationResult {
    pub success: bool,
    pub status: LpStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub optimized_quantities: Vec<OptimizedQuantity>,
    pub optimized_macros: MacroVector,
    pub deviations: LpDeviations,
    pub objective: f64,
    pub metadata: LpMetadata,
}

impl LpOptimizationResult {
    fn failure(status: LpStatus, message: String, metadata: LpMetadata) -> Self {
        Self {
            success: false,
            status,
            message: Some(message),
            optimized_quantities: Vec::new(),
            optimized_macros: MacroVector::zero(),
            deviations: LpDeviations::default(),
            objective: 0.0,
            metadata,
        }
    }
}

/// A decision variable: one independent ingredient or one binding group.
struct ScaleUnit {
    members: Vec<usize>,
    lower: f64,
    upper: f64,
}

fn collect_units(input: &LpInput) -> Vec<ScaleUnit> {
    let target_calories = input.target.calories;
    let mut units = Vec::new();
    let mut groups: BTreeMap<(MealType, &str, &str), Vec<usize>> = BTreeMap::new();

    for (idx, c) in input.constraints.iter().enumerate() {
        match c.group_key() {
            Some(key) => groups.entry(key).or_default().push(idx),
            None => units.push(ScaleUnit {
                members: vec![idx],
                lower: c.min_scale_factor,
                upper: c.effective_upper(target_calories),
            }),
        }
    }

    for members in groups.into_values() {
        let lower = members
            .iter()
            .map(|&i| input.constraints[i].min_scale_factor)
            .fold(f64::NEG_INFINITY, f64::max);
        let upper = members
            .iter()
            .map(|&i| input.constraints[i].effective_upper(target_calories))
            .fold(f64::INFINITY, f64::min);
        units.push(ScaleUnit {
            members,
            lower,
            upper,
        });
    }

    units
}

/// Run `solve` on a worker thread and wait at most `budget` for its result.
///
/// On timeout the worker is detached; its result is dropped when it finishes.
pub fn solve_within<T, F>(solve: F, budget: Duration) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone if the budget already ran out.
        let _ = tx.send(solve());
    });
    rx.recv_timeout(budget).ok()
}

/// Minimize weighted macro deviation over ingredient scale factors.
///
/// Slack is measured in percent of each target so the weights compare across
/// grams and kcal. Each variable also pays `scaling_penalty * |scale - 1|`.
pub fn optimize_quantities(input: &LpInput, settings: &LpSettings) -> LpOptimizationResult {
    let start = Instant::now();
    let elapsed_ms = || start.elapsed().as_secs_f64() * 1000.0;
    let mut metadata = LpMetadata::default();

    if input.constraints.is_empty() {
        return LpOptimizationResult::failure(
            LpStatus::NoVariables,
            "no ingredient-level data for the selected recipes".to_string(),
            metadata,
        );
    }

    let bad_coefficient = input.constraints.iter().any(|c| {
        !c.base_quantity.is_finite() || c.per_gram.as_array().iter().any(|v| !v.is_finite())
    });
    if bad_coefficient {
        return LpOptimizationResult::failure(
            LpStatus::Error,
            "non-finite ingredient coefficient".to_string(),
            metadata,
        );
    }

    let units = collect_units(input);
    if let Some(unit) = units.iter().find(|u| u.lower > u.upper + BOUND_EPSILON) {
        let first = &input.constraints[unit.members[0]];
        return LpOptimizationResult::failure(
            LpStatus::Infeasible,
            format!(
                "empty scale range [{:.3}, {:.3}] for {} in {}",
                unit.lower, unit.upper, first.ingredient_id, first.recipe_id
            ),
            metadata,
        );
    }

    let mut problem = Problem::new(OptimizationDirection::Minimize);
    let mut scale_vars: Vec<Variable> = Vec::with_capacity(units.len());

    for unit in &units {
        let upper = unit.upper.max(unit.lower);
        let scale = problem.add_var(0.0, (unit.lower, upper));
        let spread = problem.add_var(settings.scaling_penalty, (0.0, f64::INFINITY));
        // spread >= |scale - 1|
        let mut above = LinearExpr::empty();
        above.add(scale, 1.0);
        above.add(spread, -1.0);
        problem.add_constraint(above, ComparisonOp::Le, 1.0);
        let mut below = LinearExpr::empty();
        below.add(scale, 1.0);
        below.add(spread, 1.0);
        problem.add_constraint(below, ComparisonOp::Ge, 1.0);

        scale_vars.push(scale);
        metadata.variables += 2;
        metadata.constraints += 2;
    }

    let unit_contribution = |unit: &ScaleUnit| -> MacroVector {
        unit.members
            .iter()
            .map(|&i| input.constraints[i].base_contribution())
            .sum()
    };
    let contributions: Vec<MacroVector> = units.iter().map(unit_contribution).collect();
    let weights = settings.weights();

    for m in Macro::ALL {
        let target = input.target.get(m);
        if target <= 0.0 {
            continue;
        }
        let per_percent = 100.0 / target;
        let excess = problem.add_var(
            weights.get(m) * settings.excess_penalty * per_percent,
            (0.0, 2.0 * target),
        );
        let deficit = problem.add_var(
            weights.get(m) * settings.deficit_penalty * per_percent,
            (0.0, target),
        );

        let mut expr = LinearExpr::empty();
        for (var, contribution) in scale_vars.iter().zip(&contributions) {
            let coeff = contribution.get(m);
            if coeff != 0.0 {
                expr.add(*var, coeff);
            }
        }
        expr.add(excess, -1.0);
        expr.add(deficit, 1.0);
        problem.add_constraint(expr, ComparisonOp::Eq, target - input.fixed_macros.get(m));

        metadata.variables += 2;
        metadata.constraints += 1;
    }

    if settings.limit_pure_macro_calories && input.target.calories > 0.0 {
        let mut expr = LinearExpr::empty();
        let mut has_pure_macro = false;
        for (unit, var) in units.iter().zip(&scale_vars) {
            let kcal: f64 = unit
                .members
                .iter()
                .map(|&i| &input.constraints[i])
                .filter(|c| c.ingredient_type == IngredientType::FoMakro)
                .map(|c| c.base_contribution().calories)
                .sum();
            if kcal > 0.0 {
                expr.add(*var, kcal);
                has_pure_macro = true;
            }
        }
        if has_pure_macro {
            problem.add_constraint(
                expr,
                ComparisonOp::Le,
                PURE_MACRO_CALORIE_SHARE * input.target.calories,
            );
            metadata.constraints += 1;
        }
    }

    let budget = Duration::from_millis(settings.timeout_ms);
    let Some(solved) = solve_within(move || problem.solve(), budget) else {
        metadata.solve_time_ms = elapsed_ms();
        warn!(timeout_ms = settings.timeout_ms, "LP solve exceeded time budget");
        return LpOptimizationResult::failure(
            LpStatus::Timeout,
            format!("no solution within {} ms", settings.timeout_ms),
            metadata,
        );
    };
    metadata.solve_time_ms = elapsed_ms();

    let solution = match solved {
        Ok(solution) => solution,
        Err(err) => {
            let status = match err {
                minilp::Error::Infeasible => LpStatus::Infeasible,
                minilp::Error::Unbounded => LpStatus::Unbounded,
            };
            warn!(?status, variables = metadata.variables, "LP solve failed");
            return LpOptimizationResult::failure(status, err.to_string(), metadata);
        }
    };

    let mut optimized_quantities = Vec::with_capacity(input.constraints.len());
    let mut optimized_macros = input.fixed_macros;

    for ((unit, var), contribution) in units.iter().zip(&scale_vars).zip(&contributions) {
        let scale_factor = solution[*var].clamp(unit.lower, unit.upper.max(unit.lower));
        optimized_macros += *contribution * scale_factor;
        for &i in &unit.members {
            let c = &input.constraints[i];
            optimized_quantities.push(OptimizedQuantity {
                ingredient_id: c.ingredient_id.clone(),
                recipe_id: c.recipe_id.clone(),
                meal_type: c.meal_type,
                original_quantity: c.base_quantity,
                optimized_quantity: c.base_quantity * scale_factor,
                scale_factor,
                binding_group: c.binding_group.clone(),
            });
        }
    }

    let deviations = LpDeviations {
        absolute: optimized_macros + input.target * -1.0,
        percent: MacroDeviation::between(&optimized_macros, &input.target),
    };

    debug!(
        variables = metadata.variables,
        constraints = metadata.constraints,
        total_deviation = deviations.percent.total_percent,
        solve_time_ms = metadata.solve_time_ms,
        "LP solved"
    );

    LpOptimizationResult {
        success: true,
        status: LpStatus::Optimal,
        message: None,
        optimized_quantities,
        optimized_macros,
        deviations,
        objective: solution.objective(),
        metadata,
    }
}
