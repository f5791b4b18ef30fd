use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::config::CombinerSettings;
use crate::models::{
    DistributionTable, MacroVector, MealCombination, MealTarget, MealType, PlannedMeal,
    RankedRecipe,
};

/// One slot of the search: its share of the day and the candidates to try.
#[derive(Debug, Clone)]
pub struct SlotCandidates<'a> {
    pub meal_type: MealType,
    pub target: MealTarget,
    pub candidates: &'a [RankedRecipe],
}

/// Build the search slots from grouped rankings, keeping the top `top_n` per slot.
pub fn build_slots<'a>(
    groups: &'a BTreeMap<MealType, Vec<RankedRecipe>>,
    distribution: &DistributionTable,
    top_n: usize,
) -> Vec<SlotCandidates<'a>> {
    let meal_types: Vec<MealType> = groups.keys().copied().collect();
    distribution
        .shares_for(&meal_types)
        .into_iter()
        .map(|(meal_type, target)| {
            let all = groups.get(&meal_type).map(Vec::as_slice).unwrap_or(&[]);
            SlotCandidates {
                meal_type,
                target,
                candidates: &all[..all.len().min(top_n)],
            }
        })
        .collect()
}

/// Assemble a combination, scaling each recipe by its slot share.
pub fn assemble_combination<'r>(
    assignments: impl IntoIterator<Item = (MealType, MealTarget, &'r RankedRecipe)>,
    target: &MacroVector,
) -> MealCombination {
    let meals: BTreeMap<MealType, PlannedMeal> = assignments
        .into_iter()
        .map(|(meal_type, share, recipe)| {
            (
                meal_type,
                PlannedMeal {
                    recipe: recipe.clone(),
                    target_percent: share.percent,
                    tolerance: share.tolerance,
                    assigned_macros: recipe.recipe.base_macros * (share.percent / 100.0),
                },
            )
        })
        .collect();
    MealCombination::new(meals, *target)
}

/// Lazily walks every assignment of one candidate per slot, depth-first in rank
/// order, and yields the accepted combinations.
///
/// Bound the walk with [`Iterator::take`]; nothing past the last taken item is built.
pub struct CombinationIter<'a> {
    slots: Vec<SlotCandidates<'a>>,
    target: MacroVector,
    min_average_score: f64,
    allow_partial: bool,
    cursor: Option<Vec<usize>>,
}

impl<'a> CombinationIter<'a> {
    pub fn new(
        slots: Vec<SlotCandidates<'a>>,
        target: MacroVector,
        min_average_score: f64,
        allow_partial: bool,
    ) -> Self {
        let searchable = !slots.is_empty() && slots.iter().all(|s| !s.candidates.is_empty());
        let cursor = searchable.then(|| vec![0; slots.len()]);
        Self {
            slots,
            target,
            min_average_score,
            allow_partial,
            cursor,
        }
    }

    /// Step the odometer: the last slot varies fastest.
    fn advance(&mut self) {
        let Some(indices) = self.cursor.as_mut() else {
            return;
        };
        for pos in (0..indices.len()).rev() {
            indices[pos] += 1;
            if indices[pos] < self.slots[pos].candidates.len() {
                return;
            }
            indices[pos] = 0;
        }
        self.cursor = None;
    }

    fn has_repeated_recipe(&self, indices: &[usize]) -> bool {
        let mut seen = HashSet::with_capacity(indices.len());
        self.slots
            .iter()
            .zip(indices)
            .any(|(slot, &i)| !seen.insert(slot.candidates[i].id()))
    }
}

impl Iterator for CombinationIter<'_> {
    type Item = MealCombination;

    fn next(&mut self) -> Option<MealCombination> {
        loop {
            let indices = self.cursor.clone()?;
            self.advance();

            if self.has_repeated_recipe(&indices) {
                continue;
            }

            let combination = assemble_combination(
                self.slots
                    .iter()
                    .zip(&indices)
                    .map(|(slot, &i)| (slot.meal_type, slot.target, &slot.candidates[i])),
                &self.target,
            );

            if self.allow_partial || combination.average_score >= self.min_average_score {
                return Some(combination);
            }
        }
    }
}

/// Sort combinations by average score, best first.
pub fn sort_by_average_score(combinations: &mut [MealCombination]) {
    combinations.sort_by(|a, b| {
        b.average_score
            .partial_cmp(&a.average_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Collect up to `max_combinations` accepted combinations, best average score first.
pub fn generate_meal_combinations(
    groups: &BTreeMap<MealType, Vec<RankedRecipe>>,
    distribution: &DistributionTable,
    target: &MacroVector,
    settings: &CombinerSettings,
) -> Vec<MealCombination> {
    let slots = build_slots(groups, distribution, settings.top_n);
    let mut combinations: Vec<MealCombination> = CombinationIter::new(
        slots,
        *target,
        settings.min_average_score,
        settings.allow_partial,
    )
    .take(settings.max_combinations)
    .collect();

    sort_by_average_score(&mut combinations);

    debug!(
        generated = combinations.len(),
        meeting_threshold = combinations.iter().filter(|c| c.meets_threshold).count(),
        "meal combinations generated"
    );
    combinations
}

/// Pick the best combination: the highest-scoring one that meets the quality
/// threshold, else (with `allow_fallback`) the highest-scoring one overall.
pub fn get_best_meal_combination(
    combinations: &[MealCombination],
    allow_fallback: bool,
) -> Option<&MealCombination> {
    let best_of = |pred: &dyn Fn(&MealCombination) -> bool| {
        combinations.iter().filter(|c| pred(c)).max_by(|a, b| {
            a.average_score
                .partial_cmp(&b.average_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.deviation.total_percent.total_cmp(&a.deviation.total_percent))
        })
    };

    best_of(&|c| c.meets_threshold).or_else(|| {
        if allow_fallback {
            best_of(&|_| true)
        } else {
            None
        }
    })
}
