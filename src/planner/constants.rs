use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::meal_type::{MealTarget, MealType};

/// Energy per gram of protein (kcal).
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;

/// Energy per gram of carbohydrate (kcal).
pub const KCAL_PER_G_CARBS: f64 = 4.0;

/// Energy per gram of fat (kcal).
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Average score a combination needs to count as meeting the quality bar.
pub const QUALITY_THRESHOLD: f64 = 80.0;

// ─────────────────────────────────────────────────────────────────────────────
// Recipe scoring
// ─────────────────────────────────────────────────────────────────────────────

/// Scalability assumed per macro when a recipe has no profile.
pub const NEUTRAL_SCALABILITY: f64 = 0.5;

/// Share of the recipe score coming from cosine similarity.
pub const SIMILARITY_WEIGHT: f64 = 0.7;

/// Share of the recipe score coming from weighted scalability.
pub const SCALABILITY_WEIGHT: f64 = 0.3;

/// Reference densities (g per 100 g) at which a macro counts as fully scalable.
pub const REFERENCE_PROTEIN_DENSITY: f64 = 25.0;
pub const REFERENCE_CARBS_DENSITY: f64 = 60.0;
pub const REFERENCE_FAT_DENSITY: f64 = 30.0;

/// Weight of bound-ingredient mass relative to independent mass in scalability.
pub const BOUND_SCALABILITY_WEIGHT: f64 = 0.4;

/// Fat density (g/100 g) above which fat scalability is halved.
pub const HIGH_FAT_DENSITY: f64 = 80.0;

// ─────────────────────────────────────────────────────────────────────────────
// Variety adjustment
// ─────────────────────────────────────────────────────────────────────────────

/// Score subtracted from recently used recipes.
pub const DEFAULT_RECENT_PENALTY: f64 = 15.0;

/// Score added to favorites that have not been used lately.
pub const DEFAULT_FAVORITE_BOOST: f64 = 10.0;

/// Days within which a use counts as recent.
pub const RECENT_DAYS_THRESHOLD: u32 = 3;

/// Days a favorite must go unused before it earns the reward.
pub const FAVORITE_DAYS_THRESHOLD: u32 = 7;

// ─────────────────────────────────────────────────────────────────────────────
// Meal combination
// ─────────────────────────────────────────────────────────────────────────────

/// Ranked recipes tried per slot.
pub const DEFAULT_TOP_N: usize = 3;

/// Upper bound on collected combinations per search.
pub const DEFAULT_MAX_COMBINATIONS: usize = 50;

/// Minimum Jaro-Winkler similarity to accept a misspelled meal type.
pub const MEAL_TYPE_MATCH_THRESHOLD: f64 = 0.9;

/// Default tolerance around each meal's share, in percentage points.
pub const DEFAULT_DISTRIBUTION_TOLERANCE: f64 = 5.0;

/// Dinner share for plans without snacks.
pub const DINNER_PERCENT_WITHOUT_SNACKS: f64 = 33.0;

/// Dinner share for plans with at least one snack.
pub const DINNER_PERCENT_WITH_SNACKS: f64 = 22.0;

/// Default share of daily intake per meal type.
/// Dinner is listed with its with-snacks share; see [`DINNER_PERCENT_WITHOUT_SNACKS`].
pub static DEFAULT_MEAL_DISTRIBUTION: LazyLock<BTreeMap<MealType, MealTarget>> =
    LazyLock::new(|| {
        let tol = DEFAULT_DISTRIBUTION_TOLERANCE;
        let mut m = BTreeMap::new();
        m.insert(MealType::Reggeli, MealTarget { percent: 28.0, tolerance: tol });
        m.insert(MealType::Tizorai, MealTarget { percent: 6.0, tolerance: tol });
        m.insert(MealType::Ebed, MealTarget { percent: 39.0, tolerance: tol });
        m.insert(MealType::Uzsonna, MealTarget { percent: 5.0, tolerance: tol });
        m.insert(
            MealType::Vacsora,
            MealTarget {
                percent: DINNER_PERCENT_WITH_SNACKS,
                tolerance: tol,
            },
        );
        m
    });

// ─────────────────────────────────────────────────────────────────────────────
// LP optimizer
// ─────────────────────────────────────────────────────────────────────────────

/// Total deviation (%) above which the LP optimizer runs.
pub const DEFAULT_LP_TRIGGER_PERCENT: f64 = 12.0;

/// Objective weights per macro.
pub const DEFAULT_PROTEIN_WEIGHT: f64 = 0.3;
pub const DEFAULT_CARBS_WEIGHT: f64 = 0.25;
pub const DEFAULT_FAT_WEIGHT: f64 = 0.25;
pub const DEFAULT_CALORIES_WEIGHT: f64 = 0.2;

/// Multiplier on overshoot slack.
pub const DEFAULT_EXCESS_PENALTY: f64 = 2.0;

/// Multiplier on shortfall slack; deficits cost more than excess.
pub const DEFAULT_DEFICIT_PENALTY: f64 = 3.0;

/// Cost per unit of `|scale - 1|` on each decision variable.
pub const DEFAULT_SCALING_PENALTY: f64 = 1.0;

/// Calorie target at which the dynamic bound grows by exactly `1.5 x scalability`.
pub const DYNAMIC_BOUND_REFERENCE_KCAL: f64 = 2200.0;

/// Growth factor in the dynamic upper bound.
pub const DYNAMIC_BOUND_GROWTH: f64 = 1.5;

/// Clamp range for the dynamic upper bound.
pub const DYNAMIC_BOUND_MIN: f64 = 1.2;
pub const DYNAMIC_BOUND_MAX: f64 = 5.0;

/// Cap on calories from pure-macro ingredients, as a share of target calories.
pub const PURE_MACRO_CALORIE_SHARE: f64 = 0.10;

/// Solver time budget in milliseconds.
pub const LP_TIMEOUT_MS: u64 = 30_000;

/// Default `(min, max)` scale factors per ingredient type.
pub const PURE_MACRO_SCALE_RANGE: (f64, f64) = (0.5, 2.0);
pub const SUPPLEMENT_SCALE_RANGE: (f64, f64) = (0.5, 2.0);
pub const FLAVORING_SCALE_RANGE: (f64, f64) = (0.8, 1.2);
pub const BOUND_SCALE_RANGE: (f64, f64) = (0.7, 1.5);

// ─────────────────────────────────────────────────────────────────────────────
// Validation
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_MAX_TOTAL_DEVIATION: f64 = 20.0;
pub const DEFAULT_MAX_INDIVIDUAL_DEVIATION: f64 = 25.0;
pub const DEFAULT_MIN_RECIPE_SCORE: f64 = 70.0;
pub const DEFAULT_MIN_AVERAGE_SCORE: f64 = 80.0;

/// Grams of protein per kcal.
pub const DEFAULT_MIN_PROTEIN_DENSITY: f64 = 0.12;
pub const DEFAULT_MAX_FAT_PERCENT: f64 = 40.0;
pub const DEFAULT_MIN_CARB_PERCENT: f64 = 15.0;

/// Overall validation score weights (sum to 100).
pub const DEVIATION_CHECK_WEIGHT: f64 = 40.0;
pub const DISTRIBUTION_CHECK_WEIGHT: f64 = 20.0;
pub const QUALITY_CHECK_WEIGHT: f64 = 25.0;
pub const NUTRITION_CHECK_WEIGHT: f64 = 15.0;

// ─────────────────────────────────────────────────────────────────────────────
// Orchestration
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Recipe swaps tried on a below-threshold combination.
pub const DEFAULT_MAX_SWAPS: usize = 2;

/// Minimum base-macro cosine similarity kept by the macro-profile pre-filter.
pub const DEFAULT_PROFILE_SIMILARITY_FLOOR: f64 = 0.7;

/// Allowed energy-split distance (percentage points) in the strict pre-filter.
pub const DEFAULT_STRUCTURE_TOLERANCE_PP: f64 = 20.0;
