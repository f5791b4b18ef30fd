use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{MealCombination, MealTarget, MealType, RankedRecipe};
use crate::planner::combiner::assemble_combination;

/// One accepted replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeSwap {
    pub meal_type: MealType,
    pub removed_recipe_id: String,
    pub added_recipe_id: String,
    pub average_score_before: f64,
    pub average_score_after: f64,
}

/// Best single replacement: the largest positive score gain over every slot
/// and every ranked alternative not already in the plan, skipping
/// replacements that would rebuild a plan id in `tried`.
fn best_replacement(
    combination: &MealCombination,
    groups: &BTreeMap<MealType, Vec<RankedRecipe>>,
    tried: &HashSet<String>,
) -> Option<(MealType, MealCombination)> {
    let mut options: Vec<(MealType, &RankedRecipe, f64)> = combination
        .meals
        .iter()
        .filter_map(|(meal_type, meal)| Some((meal_type, meal, groups.get(meal_type)?)))
        .flat_map(move |(meal_type, meal, group)| {
            group
                .iter()
                .filter(move |r| !combination.contains_recipe(r.id()))
                .map(move |r| (*meal_type, r, r.final_score - meal.recipe.final_score))
        })
        .filter(|(_, _, gain)| *gain > 0.0)
        .collect();
    options.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    options.into_iter().find_map(|(slot, alternative, _)| {
        let candidate = with_replacement(combination, slot, alternative);
        (!tried.contains(&candidate.meal_plan_id)).then_some((slot, candidate))
    })
}

fn with_replacement(
    combination: &MealCombination,
    slot: MealType,
    replacement: &RankedRecipe,
) -> MealCombination {
    assemble_combination(
        combination.meals.iter().map(|(meal_type, meal)| {
            let share = MealTarget {
                percent: meal.target_percent,
                tolerance: meal.tolerance,
            };
            let recipe = if *meal_type == slot {
                replacement
            } else {
                &meal.recipe
            };
            (*meal_type, share, recipe)
        }),
        &combination.target_macros,
    )
}

/// Swap low-scoring recipes for better-ranked alternatives, up to `max_swaps`
/// times. Returns the improved combination and the swaps made, or `None` if
/// no swap strictly raised the average score. Replacements that would
/// rebuild a plan id in `tried` are skipped. The input is never modified.
pub fn improve_by_swapping(
    combination: &MealCombination,
    groups: &BTreeMap<MealType, Vec<RankedRecipe>>,
    max_swaps: usize,
    tried: &HashSet<String>,
) -> Option<(MealCombination, Vec<RecipeSwap>)> {
    let mut current = combination.clone();
    let mut swaps = Vec::new();

    for _ in 0..max_swaps {
        let Some((slot, candidate)) = best_replacement(&current, groups, tried) else {
            break;
        };
        if candidate.average_score <= current.average_score {
            break;
        }

        let removed = current
            .meals
            .get(&slot)
            .map(|m| m.recipe.id().to_string())
            .unwrap_or_default();
        let added = candidate
            .meals
            .get(&slot)
            .map(|m| m.recipe.id().to_string())
            .unwrap_or_default();
        debug!(
            meal_type = %slot,
            removed = %removed,
            added = %added,
            before = current.average_score,
            after = candidate.average_score,
            "recipe swapped"
        );
        swaps.push(RecipeSwap {
            meal_type: slot,
            removed_recipe_id: removed,
            added_recipe_id: added,
            average_score_before: current.average_score,
            average_score_after: candidate.average_score,
        });
        current = candidate;
    }

    (!swaps.is_empty()).then_some((current, swaps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MacroVector, RecipeWithHistory};

    fn ranked(id: &str, meal_type: MealType, score: f64) -> RankedRecipe {
        RankedRecipe {
            recipe: RecipeWithHistory {
                recipe_id: id.to_string(),
                name: id.to_string(),
                meal_types: vec![meal_type],
                base_macros: MacroVector::from_grams(30.0, 40.0, 10.0),
                is_favorite: false,
                days_since_last_use: None,
                usage_count_last_7_days: 0,
                usage_count_last_30_days: 0,
                base_score: score,
            },
            penalty: 0.0,
            reward: 0.0,
            final_score: score,
        }
    }

    fn share(percent: f64) -> MealTarget {
        MealTarget {
            percent,
            tolerance: 5.0,
        }
    }

    #[test]
    fn test_swaps_largest_gain_first_and_stops_at_limit() {
        let lunch_low = ranked("lunch-low", MealType::Ebed, 60.0);
        let dinner_low = ranked("dinner-low", MealType::Vacsora, 70.0);
        let combination = assemble_combination(
            [
                (MealType::Ebed, share(50.0), &lunch_low),
                (MealType::Vacsora, share(50.0), &dinner_low),
            ],
            &MacroVector::from_grams(60.0, 80.0, 20.0),
        );

        let mut groups = BTreeMap::new();
        groups.insert(
            MealType::Ebed,
            vec![ranked("lunch-top", MealType::Ebed, 90.0), lunch_low.clone()],
        );
        groups.insert(
            MealType::Vacsora,
            vec![ranked("dinner-top", MealType::Vacsora, 85.0), dinner_low.clone()],
        );

        let (improved, swaps) = improve_by_swapping(&combination, &groups, 1, &HashSet::new()).unwrap();
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].added_recipe_id, "lunch-top");
        assert!((improved.average_score - 80.0).abs() < 1e-9);
        // Original untouched
        assert!((combination.average_score - 65.0).abs() < 1e-9);

        let (both, swaps) = improve_by_swapping(&combination, &groups, 2, &HashSet::new()).unwrap();
        assert_eq!(swaps.len(), 2);
        assert!((both.average_score - 87.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_better_alternative_returns_none() {
        let lunch = ranked("lunch", MealType::Ebed, 90.0);
        let combination = assemble_combination(
            [(MealType::Ebed, share(100.0), &lunch)],
            &MacroVector::from_grams(30.0, 40.0, 10.0),
        );
        let mut groups = BTreeMap::new();
        groups.insert(
            MealType::Ebed,
            vec![lunch.clone(), ranked("worse", MealType::Ebed, 70.0)],
        );
        assert!(improve_by_swapping(&combination, &groups, 2, &HashSet::new()).is_none());
    }

    #[test]
    fn test_tried_plans_are_not_rebuilt() {
        let lunch_top = ranked("lunch-top", MealType::Ebed, 90.0);
        let lunch_low = ranked("lunch-low", MealType::Ebed, 60.0);
        let lunch_mid = ranked("lunch-mid", MealType::Ebed, 75.0);
        let target = MacroVector::from_grams(30.0, 40.0, 10.0);
        let combination = assemble_combination([(MealType::Ebed, share(100.0), &lunch_low)], &target);
        let top_plan = assemble_combination([(MealType::Ebed, share(100.0), &lunch_top)], &target);

        let mut groups = BTreeMap::new();
        groups.insert(
            MealType::Ebed,
            vec![lunch_top.clone(), lunch_mid.clone(), lunch_low.clone()],
        );

        let tried: HashSet<String> = [top_plan.meal_plan_id.clone()].into_iter().collect();
        let (improved, swaps) = improve_by_swapping(&combination, &groups, 2, &tried).unwrap();
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].added_recipe_id, "lunch-mid");
        assert!(!tried.contains(&improved.meal_plan_id));

        let tried: HashSet<String> = [
            top_plan.meal_plan_id.clone(),
            assemble_combination([(MealType::Ebed, share(100.0), &lunch_mid)], &target).meal_plan_id,
        ]
        .into_iter()
        .collect();
        assert!(improve_by_swapping(&combination, &groups, 2, &tried).is_none());
    }
}
