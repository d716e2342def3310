//! Health scoring for a single consumption entry.
//!
//! score = 50 + (protein / calories) * 100 + (fiber - sugars) * 2,
//! clamped to [0, 100] and rounded. Zero-calorie entries contribute no
//! protein term.

use crate::Nutrients;

const BASE_SCORE: f64 = 50.0;
const PROTEIN_RATIO_WEIGHT: f64 = 100.0;
const FIBER_SUGAR_WEIGHT: f64 = 2.0;

/// Score an entry's nutrient snapshot
pub fn health_score(calories: f64, protein: f64, fiber: f64, sugars: f64) -> u8 {
    let protein_term = if calories > 0.0 {
        protein / calories * PROTEIN_RATIO_WEIGHT
    } else {
        0.0
    };

    let raw = BASE_SCORE + protein_term + (fiber - sugars) * FIBER_SUGAR_WEIGHT;
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

impl Nutrients {
    pub fn health_score(&self) -> u8 {
        health_score(self.calories, self.protein, self.fiber, self.sugars)
    }
}
