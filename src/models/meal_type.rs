use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::error::{PlannerError, Result};
use crate::planner::constants::{
    DEFAULT_DISTRIBUTION_TOLERANCE, DEFAULT_MEAL_DISTRIBUTION, DINNER_PERCENT_WITHOUT_SNACKS,
    DINNER_PERCENT_WITH_SNACKS, MEAL_TYPE_MATCH_THRESHOLD,
};

/// A named slot in a daily plan, in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MealType {
    #[serde(rename = "reggeli", alias = "breakfast")]
    Reggeli,
    #[serde(rename = "tizorai", alias = "tízórai", alias = "morning_snack")]
    Tizorai,
    #[serde(rename = "ebed", alias = "ebéd", alias = "lunch")]
    Ebed,
    #[serde(rename = "uzsonna", alias = "afternoon_snack", alias = "snack")]
    Uzsonna,
    #[serde(rename = "vacsora", alias = "dinner")]
    Vacsora,
}

impl MealType {
    pub const ALL: [MealType; 5] = [
        MealType::Reggeli,
        MealType::Tizorai,
        MealType::Ebed,
        MealType::Uzsonna,
        MealType::Vacsora,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MealType::Reggeli => "reggeli",
            MealType::Tizorai => "tízórai",
            MealType::Ebed => "ebéd",
            MealType::Uzsonna => "uzsonna",
            MealType::Vacsora => "vacsora",
        }
    }

    pub fn is_snack(self) -> bool {
        matches!(self, MealType::Tizorai | MealType::Uzsonna)
    }

    /// Slots used when the caller gives only a meal count.
    pub fn default_slots(meal_count: usize) -> Vec<MealType> {
        match meal_count {
            0 => Vec::new(),
            1 => vec![MealType::Ebed],
            2 => vec![MealType::Reggeli, MealType::Ebed],
            3 => vec![MealType::Reggeli, MealType::Ebed, MealType::Vacsora],
            4 => vec![
                MealType::Reggeli,
                MealType::Ebed,
                MealType::Uzsonna,
                MealType::Vacsora,
            ],
            _ => MealType::ALL.to_vec(),
        }
    }

    /// Parse a meal type leniently: accents optional, English aliases accepted,
    /// close misspellings resolved by Jaro-Winkler similarity.
    pub fn parse(input: &str) -> Result<MealType> {
        let key = fold_accents(input.trim()).to_lowercase().replace([' ', '-'], "_");
        let exact = match key.as_str() {
            "reggeli" | "breakfast" => Some(MealType::Reggeli),
            "tizorai" | "morning_snack" => Some(MealType::Tizorai),
            "ebed" | "lunch" => Some(MealType::Ebed),
            "uzsonna" | "afternoon_snack" | "snack" => Some(MealType::Uzsonna),
            "vacsora" | "dinner" => Some(MealType::Vacsora),
            _ => None,
        };
        if let Some(meal_type) = exact {
            return Ok(meal_type);
        }

        const NAMES: [(&str, MealType); 10] = [
            ("reggeli", MealType::Reggeli),
            ("breakfast", MealType::Reggeli),
            ("tizorai", MealType::Tizorai),
            ("morning_snack", MealType::Tizorai),
            ("ebed", MealType::Ebed),
            ("lunch", MealType::Ebed),
            ("uzsonna", MealType::Uzsonna),
            ("afternoon_snack", MealType::Uzsonna),
            ("vacsora", MealType::Vacsora),
            ("dinner", MealType::Vacsora),
        ];

        NAMES
            .iter()
            .map(|(name, meal_type)| (jaro_winkler(&key, name), *meal_type))
            .filter(|(score, _)| *score >= MEAL_TYPE_MATCH_THRESHOLD)
            .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(_, meal_type)| meal_type)
            .ok_or_else(|| PlannerError::UnknownMealType(input.to_string()))
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'Á' => 'a',
            'é' | 'É' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'Ó' | 'ö' | 'Ö' | 'ő' | 'Ő' => 'o',
            'ú' | 'Ú' | 'ü' | 'Ü' | 'ű' | 'Ű' => 'u',
            other => other,
        })
        .collect()
}

/// Target share of daily calories for one meal slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MealTarget {
    /// Percent of daily intake.
    pub percent: f64,
    /// Allowed distance from `percent`, in percentage points.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_tolerance() -> f64 {
    DEFAULT_DISTRIBUTION_TOLERANCE
}

/// Data-driven per-meal-type distribution table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionTable {
    #[serde(default = "default_targets")]
    pub targets: BTreeMap<MealType, MealTarget>,
    /// Dinner share when the plan has no snack slots.
    #[serde(default = "default_dinner_without_snacks")]
    pub dinner_percent_without_snacks: f64,
    /// Dinner share when at least one snack slot is present.
    #[serde(default = "default_dinner_with_snacks")]
    pub dinner_percent_with_snacks: f64,
}

fn default_targets() -> BTreeMap<MealType, MealTarget> {
    DEFAULT_MEAL_DISTRIBUTION.clone()
}

fn default_dinner_without_snacks() -> f64 {
    DINNER_PERCENT_WITHOUT_SNACKS
}

fn default_dinner_with_snacks() -> f64 {
    DINNER_PERCENT_WITH_SNACKS
}

impl Default for DistributionTable {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            dinner_percent_without_snacks: DINNER_PERCENT_WITHOUT_SNACKS,
            dinner_percent_with_snacks: DINNER_PERCENT_WITH_SNACKS,
        }
    }
}

impl DistributionTable {
    /// Raw table entry for a slot, with the dinner share chosen by snack presence.
    pub fn raw_target(&self, meal_type: MealType, has_snacks: bool) -> MealTarget {
        let mut target = self.targets.get(&meal_type).copied().unwrap_or(MealTarget {
            percent: 0.0,
            tolerance: DEFAULT_DISTRIBUTION_TOLERANCE,
        });
        if meal_type == MealType::Vacsora {
            target.percent = if has_snacks {
                self.dinner_percent_with_snacks
            } else {
                self.dinner_percent_without_snacks
            };
        }
        target
    }

    /// Targets for the selected slots, rescaled so the percentages sum to 100.
    ///
    /// If every selected slot has a zero share, the day is split evenly.
    pub fn shares_for(&self, slots: &[MealType]) -> Vec<(MealType, MealTarget)> {
        let has_snacks = slots.iter().any(|m| m.is_snack());
        let raw: Vec<(MealType, MealTarget)> = slots
            .iter()
            .map(|&m| (m, self.raw_target(m, has_snacks)))
            .collect();

        let sum: f64 = raw.iter().map(|(_, t)| t.percent).sum();
        if sum <= 0.0 {
            let even = 100.0 / slots.len().max(1) as f64;
            return raw
                .into_iter()
                .map(|(m, t)| {
                    (
                        m,
                        MealTarget {
                            percent: even,
                            ..t
                        },
                    )
                })
                .collect();
        }

        raw.into_iter()
            .map(|(m, t)| {
                (
                    m,
                    MealTarget {
                        percent: t.percent * 100.0 / sum,
                        ..t
                    },
                )
            })
            .collect()
    }
}
