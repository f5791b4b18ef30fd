use std::ops::{Add, AddAssign, Mul};

use serde::{Deserialize, Serialize};

use crate::planner::constants::{KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};

/// One axis of a [`MacroVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Macro {
    Protein,
    Carbs,
    Fat,
    Calories,
}

impl Macro {
    pub const ALL: [Macro; 4] = [Macro::Protein, Macro::Carbs, Macro::Fat, Macro::Calories];

    /// The three gram-valued macronutrients (calories excluded).
    pub const NUTRIENTS: [Macro; 3] = [Macro::Protein, Macro::Carbs, Macro::Fat];

    pub fn label(self) -> &'static str {
        match self {
            Macro::Protein => "protein",
            Macro::Carbs => "carbs",
            Macro::Fat => "fat",
            Macro::Calories => "calories",
        }
    }
}

/// A 4-dimensional nutrient profile: grams of protein, carbs and fat plus kcal.
///
/// Calories are stored independently and are not guaranteed to match the
/// 4-4-9 rule; use [`MacroVector::from_grams`] when they should.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroVector {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub calories: f64,
}

impl MacroVector {
    pub fn new(protein: f64, carbs: f64, fat: f64, calories: f64) -> Self {
        Self {
            protein,
            carbs,
            fat,
            calories,
        }
    }

    /// Build a vector whose calories follow the 4-4-9 kcal/g rule.
    pub fn from_grams(protein: f64, carbs: f64, fat: f64) -> Self {
        Self::new(protein, carbs, fat, derived_calories(protein, carbs, fat))
    }

    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, m: Macro) -> f64 {
        match m {
            Macro::Protein => self.protein,
            Macro::Carbs => self.carbs,
            Macro::Fat => self.fat,
            Macro::Calories => self.calories,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.protein, self.carbs, self.fat, self.calories]
    }

    #[inline]
    pub fn dot(&self, other: &MacroVector) -> f64 {
        self.protein * other.protein
            + self.carbs * other.carbs
            + self.fat * other.fat
            + self.calories * other.calories
    }

    #[inline]
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.as_array().iter().all(|v| *v == 0.0)
    }

    /// Short display string for logs and tables.
    pub fn summary(&self) -> String {
        format!(
            "P:{:.1}g C:{:.1}g F:{:.1}g {:.0} kcal",
            self.protein, self.carbs, self.fat, self.calories
        )
    }
}

/// Calories from grams using 4 kcal/g protein, 4 kcal/g carbs, 9 kcal/g fat.
pub fn derived_calories(protein: f64, carbs: f64, fat: f64) -> f64 {
    protein * KCAL_PER_G_PROTEIN + carbs * KCAL_PER_G_CARBS + fat * KCAL_PER_G_FAT
}

impl Add for MacroVector {
    type Output = MacroVector;

    fn add(self, rhs: MacroVector) -> MacroVector {
        MacroVector::new(
            self.protein + rhs.protein,
            self.carbs + rhs.carbs,
            self.fat + rhs.fat,
            self.calories + rhs.calories,
        )
    }
}

impl AddAssign for MacroVector {
    fn add_assign(&mut self, rhs: MacroVector) {
        *self = *self + rhs;
    }
}

impl Mul<f64> for MacroVector {
    type Output = MacroVector;

    fn mul(self, factor: f64) -> MacroVector {
        MacroVector::new(
            self.protein * factor,
            self.carbs * factor,
            self.fat * factor,
            self.calories * factor,
        )
    }
}

impl std::iter::Sum for MacroVector {
    fn sum<I: Iterator<Item = MacroVector>>(iter: I) -> Self {
        iter.fold(MacroVector::zero(), |acc, v| acc + v)
    }
}

/// Per-macro absolute percentage deviation from a target, plus their mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroDeviation {
    pub protein_percent: f64,
    pub carbs_percent: f64,
    pub fat_percent: f64,
    pub calories_percent: f64,
    /// Unweighted mean of the four per-macro deviations.
    pub total_percent: f64,
}

impl MacroDeviation {
    /// `|actual - target| / target * 100` per macro; a zero target contributes 0.
    pub fn between(actual: &MacroVector, target: &MacroVector) -> Self {
        let pct = |m: Macro| deviation_percent(actual.get(m), target.get(m));
        let protein_percent = pct(Macro::Protein);
        let carbs_percent = pct(Macro::Carbs);
        let fat_percent = pct(Macro::Fat);
        let calories_percent = pct(Macro::Calories);
        Self {
            protein_percent,
            carbs_percent,
            fat_percent,
            calories_percent,
            total_percent: (protein_percent + carbs_percent + fat_percent + calories_percent)
                / 4.0,
        }
    }

    pub fn get(&self, m: Macro) -> f64 {
        match m {
            Macro::Protein => self.protein_percent,
            Macro::Carbs => self.carbs_percent,
            Macro::Fat => self.fat_percent,
            Macro::Calories => self.calories_percent,
        }
    }

    /// Largest single-macro deviation.
    pub fn max_individual(&self) -> f64 {
        Macro::ALL
            .into_iter()
            .map(|m| self.get(m))
            .fold(0.0, f64::max)
    }
}

#[inline]
pub fn deviation_percent(actual: f64, target: f64) -> f64 {
    if target > 0.0 {
        (actual - target).abs() / target * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_grams_uses_4_4_9() {
        let v = MacroVector::from_grams(20.0, 30.0, 10.0);
        assert!((v.calories - 290.0).abs() < 1e-9);
    }

    #[test]
    fn test_deviation_mean_of_four() {
        let target = MacroVector::new(100.0, 200.0, 50.0, 1650.0);
        let actual = MacroVector::new(110.0, 180.0, 50.0, 1650.0);
        let dev = MacroDeviation::between(&actual, &target);
        assert!((dev.protein_percent - 10.0).abs() < 1e-9);
        assert!((dev.carbs_percent - 10.0).abs() < 1e-9);
        assert_eq!(dev.fat_percent, 0.0);
        assert!((dev.total_percent - 5.0).abs() < 1e-9);
        assert!((dev.max_individual() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_target_contributes_nothing() {
        let dev = MacroDeviation::between(
            &MacroVector::new(10.0, 10.0, 10.0, 10.0),
            &MacroVector::new(0.0, 10.0, 10.0, 10.0),
        );
        assert_eq!(dev.protein_percent, 0.0);
        assert_eq!(dev.total_percent, 0.0);
    }
}
