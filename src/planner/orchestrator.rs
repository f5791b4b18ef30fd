use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::RecipeCatalog;
use crate::config::{AlgorithmSettings, CombinerSettings, PlannerConfig};
use crate::error::{PlannerError, Result};
use crate::models::{MacroVector, MealCombination, MealType, RankedRecipe};
use crate::planner::combiner::{generate_meal_combinations, get_best_meal_combination};
use crate::planner::constants::{DEFAULT_FAVORITE_BOOST, DEFAULT_RECENT_PENALTY};
use crate::planner::lp::{build_lp_input, optimize_quantities, LpOptimizationResult, LpStatus};
use crate::planner::prefilter::RecipePreFilter;
use crate::planner::ranking::{group_by_meal_type, rank_recipes, VarietyParams};
use crate::planner::scoring::score_recipes;
use crate::planner::swap::{improve_by_swapping, RecipeSwap};
use crate::planner::validator::{validate_meal_plan, ValidationResult};

// ─── Request ────────────────────────────────────────────────────────────────

/// User preferences for one generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub meal_count: usize,
    /// Explicit slots; when empty, slots follow `meal_count`.
    pub preferred_meal_types: Vec<MealType>,
    pub exclude_recipe_ids: Vec<String>,
    pub favorite_boost: f64,
    pub recent_penalty: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            meal_count: 3,
            preferred_meal_types: Vec::new(),
            exclude_recipe_ids: Vec::new(),
            favorite_boost: DEFAULT_FAVORITE_BOOST,
            recent_penalty: DEFAULT_RECENT_PENALTY,
        }
    }
}

impl Preferences {
    /// Meal slots in daily order, without duplicates.
    pub fn slots(&self) -> Vec<MealType> {
        if self.preferred_meal_types.is_empty() {
            return MealType::default_slots(self.meal_count);
        }
        let mut slots = self.preferred_meal_types.clone();
        slots.sort();
        slots.dedup();
        slots
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub target: MacroVector,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub settings: AlgorithmSettings,
}

impl GenerationRequest {
    pub fn new(target: MacroVector) -> Self {
        Self {
            target,
            preferences: Preferences::default(),
            settings: AlgorithmSettings::default(),
        }
    }
}

// ─── Result ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Success,
    MaxAttemptsReached,
    FailedValidation,
    FailedGeneration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Filtering,
    Scoring,
    Ranking,
    Generation,
    Swapping,
    LpOptimization,
    Validation,
}

/// Why an attempt, or the whole call, did not produce a valid plan.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    InsufficientRecipes { available: usize, required: usize },
    NoCombinations,
    ScoreBelowThreshold { attempt: usize, average: f64, threshold: f64 },
    LpFailed { attempt: usize, status: LpStatus, message: String },
    ValidationFailed { attempt: usize, violations: Vec<String> },
    NoUntriedCombinations { attempt: usize },
    MaxAttemptsReached { attempts: usize },
    Pipeline(String),
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationFailure::InsufficientRecipes {
                available,
                required,
            } => write!(
                f,
                "insufficient recipes: {} available, {} required",
                available, required
            ),
            GenerationFailure::NoCombinations => {
                write!(f, "no meal combination could be generated")
            }
            GenerationFailure::ScoreBelowThreshold {
                attempt,
                average,
                threshold,
            } => write!(
                f,
                "attempt {}: average score {:.1} below threshold {:.1}",
                attempt, average, threshold
            ),
            GenerationFailure::LpFailed {
                attempt,
                status,
                message,
            } => write!(
                f,
                "attempt {}: LP optimization failed ({:?}): {}",
                attempt, status, message
            ),
            GenerationFailure::ValidationFailed {
                attempt,
                violations,
            } => write!(
                f,
                "attempt {}: validation failed: {}",
                attempt,
                violations.join("; ")
            ),
            GenerationFailure::NoUntriedCombinations { attempt } => {
                write!(f, "attempt {}: no untried combinations left", attempt)
            }
            GenerationFailure::MaxAttemptsReached { attempts } => {
                write!(f, "maximum attempts reached ({})", attempts)
            }
            GenerationFailure::Pipeline(message) => write!(f, "pipeline error: {}", message),
        }
    }
}

impl From<PlannerError> for GenerationFailure {
    fn from(err: PlannerError) -> Self {
        match err {
            PlannerError::InsufficientRecipes {
                available,
                required,
            } => GenerationFailure::InsufficientRecipes {
                available,
                required,
            },
            other => GenerationFailure::Pipeline(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub attempts: usize,
    pub steps_completed: Vec<PipelineStep>,
    pub failure_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefilter: Option<String>,
    pub swaps: Vec<RecipeSwap>,
}

impl GenerationMetadata {
    fn complete(&mut self, step: PipelineStep) {
        if !self.steps_completed.contains(&step) {
            self.steps_completed.push(step);
        }
    }

    fn fail(&mut self, failure: GenerationFailure) {
        debug!(reason = %failure, "generation failure recorded");
        self.failure_reasons.push(failure.to_string());
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub final_deviation_percent: f64,
    pub final_average_score: f64,
    pub recipe_diversity_score: f64,
    pub nutritional_balance_score: f64,
    pub user_satisfaction_score: f64,
}

impl QualityMetrics {
    pub fn compute(
        combination: &MealCombination,
        lp: Option<&LpOptimizationResult>,
        validation: &ValidationResult,
    ) -> Self {
        let final_deviation_percent = match lp {
            Some(result) if result.success => result.deviations.total_percent(),
            _ => combination.deviation.total_percent,
        };

        let meals = combination.len().max(1) as f64;
        let distinct: HashSet<&str> = combination.recipe_ids().into_iter().collect();
        let favorites = combination
            .meals
            .values()
            .filter(|m| m.recipe.recipe.is_favorite)
            .count() as f64;

        Self {
            final_deviation_percent,
            final_average_score: combination.average_score,
            recipe_diversity_score: distinct.len() as f64 / meals * 100.0,
            nutritional_balance_score: validation.nutrition_validation.passed_checks() as f64
                / 3.0
                * 100.0,
            user_satisfaction_score: (0.7 * combination.average_score
                + 30.0 * favorites / meals)
                .min(100.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterGenerationResult {
    pub success: bool,
    pub status: GenerationStatus,
    pub final_meal_plan: Option<MealCombination>,
    pub lp_optimization: Option<LpOptimizationResult>,
    pub validation: ValidationResult,
    pub generation_metadata: GenerationMetadata,
    pub quality_metrics: QualityMetrics,
}

impl MasterGenerationResult {
    fn failed_generation(metadata: GenerationMetadata) -> Self {
        Self {
            success: false,
            status: GenerationStatus::FailedGeneration,
            final_meal_plan: None,
            lp_optimization: None,
            validation: ValidationResult::default(),
            generation_metadata: metadata,
            quality_metrics: QualityMetrics::default(),
        }
    }
}

/// One evaluated combination.
struct Attempt {
    combination: MealCombination,
    lp: Option<LpOptimizationResult>,
    validation: ValidationResult,
}

impl Attempt {
    fn beats(&self, other: &Attempt) -> bool {
        match self
            .validation
            .overall_score
            .total_cmp(&other.validation.overall_score)
        {
            std::cmp::Ordering::Equal => {
                self.combination.average_score > other.combination.average_score
            }
            ord => ord.is_gt(),
        }
    }

    fn into_result(
        self,
        status: GenerationStatus,
        metadata: GenerationMetadata,
    ) -> MasterGenerationResult {
        let quality_metrics =
            QualityMetrics::compute(&self.combination, self.lp.as_ref(), &self.validation);
        MasterGenerationResult {
            success: status == GenerationStatus::Success,
            status,
            final_meal_plan: Some(self.combination),
            lp_optimization: self.lp,
            validation: self.validation,
            generation_metadata: metadata,
            quality_metrics,
        }
    }
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Runs filter, score, rank, then a bounded loop of
/// generate / swap / optimize / validate attempts.
pub struct MealPlanGenerator<'a> {
    catalog: &'a RecipeCatalog,
    config: PlannerConfig,
    prefilter: Box<dyn RecipePreFilter + 'a>,
}

impl<'a> MealPlanGenerator<'a> {
    pub fn new(
        catalog: &'a RecipeCatalog,
        config: PlannerConfig,
        prefilter: Box<dyn RecipePreFilter + 'a>,
    ) -> Self {
        Self {
            catalog,
            config,
            prefilter,
        }
    }

    /// Generate a plan. Never fails: pipeline errors become a `failed_generation` result.
    pub fn generate(&self, request: &GenerationRequest) -> MasterGenerationResult {
        let mut metadata = GenerationMetadata::default();
        match self.run(request, &mut metadata) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "meal plan generation aborted");
                metadata.fail(GenerationFailure::from(err));
                MasterGenerationResult::failed_generation(metadata)
            }
        }
    }

    /// Filter, score, rank and group recipes for the requested slots.
    pub fn rank_candidates(
        &self,
        request: &GenerationRequest,
        metadata: &mut GenerationMetadata,
    ) -> Result<BTreeMap<MealType, Vec<RankedRecipe>>> {
        let target = &request.target;
        let slots = request.preferences.slots();
        if slots.is_empty() {
            return Err(PlannerError::InvalidInput(
                "at least one meal slot is required".to_string(),
            ));
        }

        let mut recipes = self
            .catalog
            .recipes_with_history(&request.preferences.exclude_recipe_ids);
        if self.prefilter.is_applicable(&recipes) {
            recipes = self.prefilter.filter(recipes, target);
            metadata.prefilter = Some(self.prefilter.name().to_string());
        } else {
            debug!(filter = self.prefilter.name(), "pre-filter skipped, no ingredient data");
        }
        metadata.complete(PipelineStep::Filtering);

        if recipes.len() < slots.len() {
            return Err(PlannerError::InsufficientRecipes {
                available: recipes.len(),
                required: slots.len(),
            });
        }

        let scored = score_recipes(recipes, target, &self.catalog.scalability_table());
        metadata.complete(PipelineStep::Scoring);

        let params = VarietyParams::new(
            request.preferences.recent_penalty,
            request.preferences.favorite_boost,
            &self.config.variety,
        );
        let ranked = rank_recipes(scored, &params);
        metadata.complete(PipelineStep::Ranking);

        Ok(group_by_meal_type(&ranked, &slots))
    }

    fn run(
        &self,
        request: &GenerationRequest,
        metadata: &mut GenerationMetadata,
    ) -> Result<MasterGenerationResult> {
        let target = request.target;
        if target.as_array().iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(PlannerError::InvalidInput(format!(
                "target macros must be finite and non-negative: {}",
                target.summary()
            )));
        }

        let settings = &request.settings;
        info!(
            target = %target.summary(),
            max_attempts = settings.max_attempts,
            "generating meal plan"
        );

        let groups = self.rank_candidates(request, metadata)?;
        let criteria = self.config.effective_criteria(settings);

        let mut tried: HashSet<String> = HashSet::new();
        let mut best: Option<Attempt> = None;
        let mut exhausted = false;

        for attempt in 1..=settings.max_attempts {
            metadata.attempts = attempt;

            let combiner = CombinerSettings {
                top_n: self.config.combiner.top_n + attempt - 1,
                min_average_score: settings.score_threshold,
                allow_partial: true,
                ..self.config.combiner.clone()
            };
            let combinations =
                generate_meal_combinations(&groups, &self.config.distribution, &target, &combiner);
            if combinations.is_empty() {
                metadata.fail(GenerationFailure::NoCombinations);
                return Ok(MasterGenerationResult::failed_generation(std::mem::take(metadata)));
            }
            metadata.complete(PipelineStep::Generation);

            let untried: Vec<MealCombination> = combinations
                .into_iter()
                .filter(|c| !tried.contains(&c.meal_plan_id))
                .collect();
            let Some(mut combination) =
                get_best_meal_combination(&untried, combiner.allow_fallback).cloned()
            else {
                metadata.fail(GenerationFailure::NoUntriedCombinations { attempt });
                exhausted = true;
                break;
            };
            tried.insert(combination.meal_plan_id.clone());

            if combination.average_score < settings.score_threshold {
                metadata.fail(GenerationFailure::ScoreBelowThreshold {
                    attempt,
                    average: combination.average_score,
                    threshold: settings.score_threshold,
                });
                if settings.enable_recipe_swapping {
                    if let Some((improved, swaps)) =
                        improve_by_swapping(&combination, &groups, settings.max_swaps, &tried)
                    {
                        metadata.complete(PipelineStep::Swapping);
                        metadata.swaps.extend(swaps);
                        tried.insert(improved.meal_plan_id.clone());
                        combination = improved;
                    }
                }
            }

            let lp = if settings.enable_lp_optimization
                && combination.deviation.total_percent > settings.deviation_threshold
            {
                let input = build_lp_input(&combination, self.catalog);
                let result = optimize_quantities(&input, &self.config.lp);
                metadata.complete(PipelineStep::LpOptimization);
                if !result.success {
                    metadata.fail(GenerationFailure::LpFailed {
                        attempt,
                        status: result.status,
                        message: result.message.clone().unwrap_or_default(),
                    });
                }
                Some(result)
            } else {
                None
            };

            let validation = validate_meal_plan(&combination, lp.as_ref(), &criteria);
            metadata.complete(PipelineStep::Validation);

            let current = Attempt {
                combination,
                lp,
                validation,
            };

            if current.validation.is_valid {
                info!(
                    attempt,
                    plan = %current.combination.meal_plan_id,
                    score = current.validation.overall_score,
                    "meal plan accepted"
                );
                return Ok(current.into_result(GenerationStatus::Success, std::mem::take(metadata)));
            }

            metadata.fail(GenerationFailure::ValidationFailed {
                attempt,
                violations: current.validation.violations().cloned().collect(),
            });
            if best.as_ref().is_none_or(|b| current.beats(b)) {
                best = Some(current);
            }
        }

        let status = if exhausted {
            GenerationStatus::FailedValidation
        } else {
            metadata.fail(GenerationFailure::MaxAttemptsReached {
                attempts: metadata.attempts,
            });
            GenerationStatus::MaxAttemptsReached
        };
        warn!(?status, attempts = metadata.attempts, "no valid meal plan found");

        Ok(match best {
            Some(attempt) => attempt.into_result(status, std::mem::take(metadata)),
            None => MasterGenerationResult::failed_generation(std::mem::take(metadata)),
        })
    }
}
