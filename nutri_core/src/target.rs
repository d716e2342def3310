//! Target-calorie derivation.
//!
//! The daily target is derived from body measurements and the dietary goal:
//! 1. Convert to centimeters and kilograms
//! 2. Baseline = 22 * kg + 6 * cm
//! 3. Apply the goal multiplier
//! 4. Round to the nearest 10 (ties to even) and clamp to [1200, 4000]
//!
//! Implausible measurements do not fail. They produce a preview that the
//! caller must not persist until the user resubmits with confirmation.

use crate::{DietaryGoal, Error, Height, PlausibilityBounds, Result, Weight};

/// Lowest target ever recommended
pub const MIN_TARGET_CALORIES: u32 = 1200;

/// Highest target ever recommended
pub const MAX_TARGET_CALORIES: u32 = 4000;

/// Target assigned at signup, before any profile exists
pub const DEFAULT_TARGET_CALORIES: u32 = 2000;

const KCAL_PER_KG: f64 = 22.0;
const KCAL_PER_CM: f64 = 6.0;

impl DietaryGoal {
    /// Multiplier applied to the baseline
    pub fn multiplier(&self) -> f64 {
        match self {
            DietaryGoal::WeightLoss => 0.8,
            DietaryGoal::WeightGain => 1.15,
            DietaryGoal::Maintain | DietaryGoal::EatHealthy => 1.0,
        }
    }
}

/// Result of a target derivation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Safe to persist
    Committed { target_calories: u32 },
    /// Measurements look implausible; `preview` is for display only
    NeedsConfirmation { preview: u32 },
}

impl TargetOutcome {
    pub fn target_calories(&self) -> u32 {
        match self {
            TargetOutcome::Committed { target_calories } => *target_calories,
            TargetOutcome::NeedsConfirmation { preview } => *preview,
        }
    }

    pub fn requires_confirmation(&self) -> bool {
        matches!(self, TargetOutcome::NeedsConfirmation { .. })
    }
}

/// Target computed without committing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetPreview {
    pub target_calories: u32,
    pub requires_confirmation: bool,
}

/// Derive the target from already-converted metric measurements
pub fn calculate_target_calories(height_cm: f64, weight_kg: f64, goal: DietaryGoal) -> u32 {
    let baseline = KCAL_PER_KG * weight_kg + KCAL_PER_CM * height_cm;
    let raw = baseline * goal.multiplier();
    let rounded = (raw / 10.0).round_ties_even() * 10.0;
    let clamped = rounded.clamp(MIN_TARGET_CALORIES as f64, MAX_TARGET_CALORIES as f64);

    tracing::debug!(
        "Target calories: baseline {:.1}, goal {}, raw {:.1} -> {}",
        baseline,
        goal,
        raw,
        clamped
    );
    clamped as u32
}

fn validate_measurement(what: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "{} must be a positive number, got {}",
            what, value
        )));
    }
    Ok(())
}

/// Compute the target and report whether it needs confirmation
pub fn preview_target(
    height: Height,
    weight: Weight,
    goal: DietaryGoal,
    bounds: &PlausibilityBounds,
) -> Result<TargetPreview> {
    validate_measurement("height", height.value)?;
    validate_measurement("weight", weight.value)?;

    let height_cm = height.cm();
    let weight_kg = weight.kg();

    Ok(TargetPreview {
        target_calories: calculate_target_calories(height_cm, weight_kg, goal),
        requires_confirmation: bounds.is_unrealistic(height_cm, weight_kg),
    })
}

/// Derive the target, gating implausible measurements on explicit consent
///
/// Phase one (`confirm_unrealistic = false`) returns `NeedsConfirmation`
/// for implausible input. Phase two resubmits with `confirm_unrealistic = true`
/// and always commits.
pub fn compute_target(
    height: Height,
    weight: Weight,
    goal: DietaryGoal,
    confirm_unrealistic: bool,
    bounds: &PlausibilityBounds,
) -> Result<TargetOutcome> {
    let preview = preview_target(height, weight, goal, bounds)?;

    if preview.requires_confirmation && !confirm_unrealistic {
        tracing::warn!(
            "Unusual measurements ({} {}, {} {}), confirmation required",
            height.value,
            height.unit,
            weight.value,
            weight.unit
        );
        return Ok(TargetOutcome::NeedsConfirmation {
            preview: preview.target_calories,
        });
    }

    Ok(TargetOutcome::Committed {
        target_calories: preview.target_calories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeightUnit, WeightUnit};

    const GOALS: [DietaryGoal; 4] = [
        DietaryGoal::WeightLoss,
        DietaryGoal::Maintain,
        DietaryGoal::EatHealthy,
        DietaryGoal::WeightGain,
    ];

    fn cm(v: f64) -> Height {
        Height::new(v, HeightUnit::Cm)
    }

    fn kg(v: f64) -> Weight {
        Weight::new(v, WeightUnit::Kg)
    }

    fn commit(h: Height, w: Weight, goal: DietaryGoal) -> u32 {
        compute_target(h, w, goal, false, &PlausibilityBounds::default())
            .unwrap()
            .target_calories()
    }

    #[test]
    fn test_maintain_scenario() {
        // 22*70 + 6*170 = 1540 + 1020 = 2560
        let outcome =
            compute_target(cm(170.0), kg(70.0), DietaryGoal::Maintain, false, &PlausibilityBounds::default())
                .unwrap();
        assert_eq!(outcome, TargetOutcome::Committed { target_calories: 2560 });
    }

    #[test]
    fn test_weight_loss_scenario() {
        // 2560 * 0.8 = 2048 -> 2050
        assert_eq!(commit(cm(170.0), kg(70.0), DietaryGoal::WeightLoss), 2050);
    }

    #[test]
    fn test_weight_gain_and_eat_healthy() {
        // 2560 * 1.15 = 2944 -> 2940
        assert_eq!(commit(cm(170.0), kg(70.0), DietaryGoal::WeightGain), 2940);
        assert_eq!(commit(cm(170.0), kg(70.0), DietaryGoal::EatHealthy), 2560);
    }

    #[test]
    fn test_clamped_to_floor_and_ceiling() {
        // 22*30 + 6*100 = 1260 * 0.8 = 1008 -> 1200
        assert_eq!(commit(cm(100.0), kg(30.0), DietaryGoal::WeightLoss), 1200);
        // 22*200 + 6*220 = 5720 -> 4000
        assert_eq!(commit(cm(220.0), kg(200.0), DietaryGoal::Maintain), 4000);
    }

    #[test]
    fn test_exact_ties_round_to_even_ten() {
        // 22*70.5 + 6*169 = 2565 -> 2560
        assert_eq!(calculate_target_calories(169.0, 70.5, DietaryGoal::Maintain), 2560);
        // 22*71.5 + 6*167 = 2575 -> 2580
        assert_eq!(calculate_target_calories(167.0, 71.5, DietaryGoal::Maintain), 2580);
    }

    #[test]
    fn test_target_always_in_range_and_multiple_of_ten() {
        let bounds = PlausibilityBounds::default();
        let mut h = 50.0;
        while h <= 300.0 {
            let mut w = 10.0;
            while w <= 400.0 {
                for goal in GOALS {
                    let t = compute_target(cm(h), kg(w), goal, true, &bounds)
                        .unwrap()
                        .target_calories();
                    assert!((MIN_TARGET_CALORIES..=MAX_TARGET_CALORIES).contains(&t));
                    assert_eq!(t % 10, 0, "h={} w={} goal={}", h, w, goal);
                }
                w += 7.3;
            }
            h += 11.7;
        }
    }

    #[test]
    fn test_imperial_matches_metric() {
        let bounds = PlausibilityBounds::default();
        for (h_in, w_lb) in [(67.0, 154.0), (60.0, 110.0), (74.5, 210.0), (70.0, 180.3)] {
            for goal in GOALS {
                let imperial = compute_target(
                    Height::new(h_in, HeightUnit::In),
                    Weight::new(w_lb, WeightUnit::Lb),
                    goal,
                    false,
                    &bounds,
                )
                .unwrap()
                .target_calories();
                let metric = compute_target(
                    cm(h_in * 2.54),
                    kg(w_lb * 0.45359237),
                    goal,
                    false,
                    &bounds,
                )
                .unwrap()
                .target_calories();
                assert!(imperial.abs_diff(metric) <= 10);
            }
        }
    }

    #[test]
    fn test_unrealistic_requires_confirmation() {
        let bounds = PlausibilityBounds::default();
        let outcome = compute_target(cm(90.0), kg(70.0), DietaryGoal::Maintain, false, &bounds).unwrap();
        assert!(outcome.requires_confirmation());
        // 22*70 + 6*90 = 2080
        assert_eq!(outcome, TargetOutcome::NeedsConfirmation { preview: 2080 });

        let confirmed = compute_target(cm(90.0), kg(70.0), DietaryGoal::Maintain, true, &bounds).unwrap();
        assert_eq!(confirmed, TargetOutcome::Committed { target_calories: 2080 });
    }

    #[test]
    fn test_unrealistic_imperial_is_checked_after_conversion() {
        // 400 lb = 181 kg, sane; 700 lb = 317 kg, not
        let bounds = PlausibilityBounds::default();
        let sane = preview_target(cm(180.0), Weight::new(400.0, WeightUnit::Lb), DietaryGoal::Maintain, &bounds).unwrap();
        assert!(!sane.requires_confirmation);
        let heavy = preview_target(cm(180.0), Weight::new(700.0, WeightUnit::Lb), DietaryGoal::Maintain, &bounds).unwrap();
        assert!(heavy.requires_confirmation);
    }

    #[test]
    fn test_custom_bounds() {
        let bounds = PlausibilityBounds {
            min_height_cm: 180.0,
            ..PlausibilityBounds::default()
        };
        let outcome = compute_target(cm(170.0), kg(70.0), DietaryGoal::Maintain, false, &bounds).unwrap();
        assert!(outcome.requires_confirmation());
    }

    #[test]
    fn test_non_positive_measurement_is_invalid() {
        let bounds = PlausibilityBounds::default();
        assert!(matches!(
            compute_target(cm(0.0), kg(70.0), DietaryGoal::Maintain, true, &bounds),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            preview_target(cm(170.0), kg(f64::NAN), DietaryGoal::Maintain, &bounds),
            Err(Error::InvalidInput(_))
        ));
    }
}
