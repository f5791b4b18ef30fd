use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{DistributionTable, MacroVector};
use crate::planner::constants::*;

/// Runtime configuration. Every field has a default, so partial files are valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub generation: AlgorithmSettings,
    #[serde(default)]
    pub combiner: CombinerSettings,
    #[serde(default)]
    pub variety: VarietySettings,
    #[serde(default)]
    pub lp: LpSettings,
    #[serde(default)]
    pub validation: ValidationCriteria,
    #[serde(default)]
    pub distribution: DistributionTable,
}

/// Orchestrator loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmSettings {
    pub max_attempts: usize,
    /// Average score a combination needs; also the validator's average floor.
    pub score_threshold: f64,
    /// Total deviation (%) that triggers LP optimization.
    pub deviation_threshold: f64,
    /// Total deviation (%) the validator accepts.
    pub final_deviation_limit: f64,
    pub enable_lp_optimization: bool,
    pub enable_recipe_swapping: bool,
    pub max_swaps: usize,
}

impl Default for AlgorithmSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            score_threshold: DEFAULT_MIN_AVERAGE_SCORE,
            deviation_threshold: DEFAULT_LP_TRIGGER_PERCENT,
            final_deviation_limit: DEFAULT_MAX_TOTAL_DEVIATION,
            enable_lp_optimization: true,
            enable_recipe_swapping: true,
            max_swaps: DEFAULT_MAX_SWAPS,
        }
    }
}

/// Combination search limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinerSettings {
    pub top_n: usize,
    pub max_combinations: usize,
    pub min_average_score: f64,
    /// Keep combinations below `min_average_score` in the result set.
    pub allow_partial: bool,
    /// Fall back to the best combination when none meets the threshold.
    pub allow_fallback: bool,
}

impl Default for CombinerSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            min_average_score: DEFAULT_MIN_AVERAGE_SCORE,
            allow_partial: false,
            allow_fallback: true,
        }
    }
}

/// Recency and favorite windows for variety adjustment.
///
/// The penalty and reward amounts come from the request's preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VarietySettings {
    pub recent_days_threshold: u32,
    pub favorite_days_threshold: u32,
}

impl Default for VarietySettings {
    fn default() -> Self {
        Self {
            recent_days_threshold: RECENT_DAYS_THRESHOLD,
            favorite_days_threshold: FAVORITE_DAYS_THRESHOLD,
        }
    }
}

/// LP objective weights and penalties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LpSettings {
    pub protein_weight: f64,
    pub carbs_weight: f64,
    pub fat_weight: f64,
    pub calories_weight: f64,
    pub excess_penalty: f64,
    pub deficit_penalty: f64,
    pub scaling_penalty: f64,
    /// Cap calories from `FO_MAKRO` ingredients at 10% of target calories.
    pub limit_pure_macro_calories: bool,
    pub timeout_ms: u64,
}

impl Default for LpSettings {
    fn default() -> Self {
        Self {
            protein_weight: DEFAULT_PROTEIN_WEIGHT,
            carbs_weight: DEFAULT_CARBS_WEIGHT,
            fat_weight: DEFAULT_FAT_WEIGHT,
            calories_weight: DEFAULT_CALORIES_WEIGHT,
            excess_penalty: DEFAULT_EXCESS_PENALTY,
            deficit_penalty: DEFAULT_DEFICIT_PENALTY,
            scaling_penalty: DEFAULT_SCALING_PENALTY,
            limit_pure_macro_calories: true,
            timeout_ms: LP_TIMEOUT_MS,
        }
    }
}

impl LpSettings {
    /// Objective weights as a vector indexed like [`MacroVector`].
    pub fn weights(&self) -> MacroVector {
        MacroVector::new(
            self.protein_weight,
            self.carbs_weight,
            self.fat_weight,
            self.calories_weight,
        )
    }
}

/// Validator thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationCriteria {
    pub max_total_deviation_percent: f64,
    pub max_individual_deviation_percent: f64,
    pub min_recipe_score: f64,
    pub min_average_score: f64,
    pub min_protein_density: f64,
    pub max_fat_percent: f64,
    pub min_carb_percent: f64,
}

impl Default for ValidationCriteria {
    fn default() -> Self {
        Self {
            max_total_deviation_percent: DEFAULT_MAX_TOTAL_DEVIATION,
            max_individual_deviation_percent: DEFAULT_MAX_INDIVIDUAL_DEVIATION,
            min_recipe_score: DEFAULT_MIN_RECIPE_SCORE,
            min_average_score: DEFAULT_MIN_AVERAGE_SCORE,
            min_protein_density: DEFAULT_MIN_PROTEIN_DENSITY,
            max_fat_percent: DEFAULT_MAX_FAT_PERCENT,
            min_carb_percent: DEFAULT_MIN_CARB_PERCENT,
        }
    }
}

impl PlannerConfig {
    /// Load from a JSON file; a missing path yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.exists() => {
                let content = fs::read_to_string(p)?;
                Ok(serde_json::from_str(&content)?)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Write the default configuration as pretty JSON.
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validation criteria with the generation thresholds folded in.
    pub fn effective_criteria(&self, settings: &AlgorithmSettings) -> ValidationCriteria {
        ValidationCriteria {
            max_total_deviation_percent: settings.final_deviation_limit,
            min_average_score: settings.score_threshold,
            ..self.validation.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_match_constants() {
        let config = PlannerConfig::default();
        assert_eq!(config.generation.max_attempts, 10);
        assert_eq!(config.generation.deviation_threshold, 12.0);
        assert_eq!(config.combiner.top_n, 3);
        assert_eq!(config.combiner.max_combinations, 50);
        assert_eq!(config.lp.deficit_penalty, 3.0);
        assert_eq!(config.validation.max_individual_deviation_percent, 25.0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"generation": {"max_attempts": 4}, "lp": {"scaling_penalty": 0.5}}"#)
            .unwrap();

        let config = PlannerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.generation.max_attempts, 4);
        assert!(config.generation.enable_lp_optimization);
        assert_eq!(config.lp.scaling_penalty, 0.5);
        assert_eq!(config.lp.excess_penalty, 2.0);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = PlannerConfig::load(Some(Path::new("/nonexistent/planner.json"))).unwrap();
        assert_eq!(config.generation.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_effective_criteria_uses_generation_limits() {
        let config = PlannerConfig::default();
        let settings = AlgorithmSettings {
            final_deviation_limit: 15.0,
            score_threshold: 85.0,
            ..Default::default()
        };
        let criteria = config.effective_criteria(&settings);
        assert_eq!(criteria.max_total_deviation_percent, 15.0);
        assert_eq!(criteria.min_average_score, 85.0);
        assert_eq!(criteria.min_recipe_score, 70.0);
    }
}
