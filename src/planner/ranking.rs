use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::VarietySettings;
use crate::models::{MealType, RankedRecipe, RecipeWithHistory};
use crate::planner::constants::{
    DEFAULT_FAVORITE_BOOST, DEFAULT_RECENT_PENALTY, FAVORITE_DAYS_THRESHOLD,
    RECENT_DAYS_THRESHOLD,
};

/// Parameters of the history-based score adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarietyParams {
    pub recent_usage_penalty: f64,
    pub favorite_not_used_reward: f64,
    pub recent_days_threshold: u32,
    pub favorite_days_threshold: u32,
}

impl Default for VarietyParams {
    fn default() -> Self {
        Self {
            recent_usage_penalty: DEFAULT_RECENT_PENALTY,
            favorite_not_used_reward: DEFAULT_FAVORITE_BOOST,
            recent_days_threshold: RECENT_DAYS_THRESHOLD,
            favorite_days_threshold: FAVORITE_DAYS_THRESHOLD,
        }
    }
}

impl VarietyParams {
    pub fn new(recent_penalty: f64, favorite_boost: f64, windows: &VarietySettings) -> Self {
        Self {
            recent_usage_penalty: recent_penalty,
            favorite_not_used_reward: favorite_boost,
            recent_days_threshold: windows.recent_days_threshold,
            favorite_days_threshold: windows.favorite_days_threshold,
        }
    }
}

/// Whether the recipe was used inside the recency window or this week.
fn is_recently_used(recipe: &RecipeWithHistory, params: &VarietyParams) -> bool {
    let within_window = recipe
        .days_since_last_use
        .is_some_and(|days| days <= params.recent_days_threshold);
    within_window || recipe.usage_count_last_7_days > 0
}

/// Whether a favorite has gone unused for longer than the favorite window.
fn is_neglected_favorite(recipe: &RecipeWithHistory, params: &VarietyParams) -> bool {
    recipe.is_favorite
        && recipe
            .days_since_last_use
            .is_none_or(|days| days > params.favorite_days_threshold)
}

/// Apply recency penalty and favorite reward to one scored recipe.
pub fn adjust_for_variety(recipe: RecipeWithHistory, params: &VarietyParams) -> RankedRecipe {
    let penalty = if is_recently_used(&recipe, params) {
        params.recent_usage_penalty
    } else {
        0.0
    };
    let reward = if is_neglected_favorite(&recipe, params) {
        params.favorite_not_used_reward
    } else {
        0.0
    };
    let final_score = recipe.base_score - penalty + reward;

    RankedRecipe {
        recipe,
        penalty,
        reward,
        final_score,
    }
}

/// Adjust every recipe and sort by final score, best first.
pub fn rank_recipes(recipes: Vec<RecipeWithHistory>, params: &VarietyParams) -> Vec<RankedRecipe> {
    let mut ranked: Vec<RankedRecipe> = recipes
        .into_iter()
        .map(|r| adjust_for_variety(r, params))
        .collect();
    sort_by_final_score(&mut ranked);
    ranked
}

/// Sort descending by final score; ties keep the lower recipe id first.
pub fn sort_by_final_score(ranked: &mut [RankedRecipe]) {
    ranked.sort_by(|a, b| match b.final_score.partial_cmp(&a.final_score) {
        Some(std::cmp::Ordering::Equal) | None => a.id().cmp(b.id()),
        Some(ord) => ord,
    });
}

/// Group ranked recipes by the slots they can fill, preserving rank order.
///
/// A recipe serving several meal types appears in each of their groups.
pub fn group_by_meal_type(
    ranked: &[RankedRecipe],
    slots: &[MealType],
) -> BTreeMap<MealType, Vec<RankedRecipe>> {
    slots
        .iter()
        .map(|&slot| {
            let group: Vec<RankedRecipe> = ranked
                .iter()
                .filter(|r| r.recipe.serves(slot))
                .cloned()
                .collect();
            (slot, group)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MacroVector;

    fn recipe(id: &str, score: f64, favorite: bool, days: Option<u32>, week: u32) -> RecipeWithHistory {
        RecipeWithHistory {
            recipe_id: id.to_string(),
            name: id.to_string(),
            meal_types: vec![MealType::Ebed],
            base_macros: MacroVector::from_grams(30.0, 40.0, 10.0),
            is_favorite: favorite,
            days_since_last_use: days,
            usage_count_last_7_days: week,
            usage_count_last_30_days: week,
            base_score: score,
        }
    }

    #[test]
    fn test_recent_use_is_penalized() {
        let params = VarietyParams::default();
        let ranked = adjust_for_variety(recipe("a", 90.0, false, Some(2), 1), &params);
        assert_eq!(ranked.penalty, DEFAULT_RECENT_PENALTY);
        assert_eq!(ranked.final_score, 90.0 - DEFAULT_RECENT_PENALTY);
    }

    #[test]
    fn test_weekly_usage_alone_is_penalized() {
        let params = VarietyParams::default();
        let ranked = adjust_for_variety(recipe("a", 90.0, false, Some(5), 1), &params);
        assert_eq!(ranked.penalty, DEFAULT_RECENT_PENALTY);
    }

    #[test]
    fn test_neglected_favorite_rewarded_unclamped() {
        let params = VarietyParams::default();
        let ranked = adjust_for_variety(recipe("a", 95.0, true, Some(10), 0), &params);
        assert_eq!(ranked.penalty, 0.0);
        assert_eq!(ranked.reward, DEFAULT_FAVORITE_BOOST);
        assert!(ranked.final_score > 100.0);

        let never_used = adjust_for_variety(recipe("b", 80.0, true, None, 0), &params);
        assert_eq!(never_used.reward, DEFAULT_FAVORITE_BOOST);
    }

    #[test]
    fn test_recent_favorite_gets_no_reward() {
        let params = VarietyParams::default();
        let ranked = adjust_for_variety(recipe("a", 80.0, true, Some(1), 1), &params);
        assert_eq!(ranked.reward, 0.0);
        assert_eq!(ranked.penalty, DEFAULT_RECENT_PENALTY);
    }

    #[test]
    fn test_rank_orders_by_final_score() {
        let params = VarietyParams::default();
        let ranked = rank_recipes(
            vec![
                recipe("recent", 95.0, false, Some(1), 2),
                recipe("fav", 82.0, true, None, 0),
                recipe("plain", 85.0, false, None, 0),
            ],
            &params,
        );
        let ids: Vec<&str> = ranked.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["fav", "plain", "recent"]);
    }
}
