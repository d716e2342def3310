//! Profile completion and profile updates.
//!
//! A user starts `Incomplete` (no height/weight recorded) and is confined to
//! onboarding until a submission commits. Once `Complete` the state is
//! terminal: later edits always keep both measurements.

use crate::target::compute_target;
use crate::{
    DietaryGoal, Error, Height, PlausibilityBounds, Result, TargetOutcome, User, Weight,
};

/// Onboarding progress of a user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileState {
    Incomplete,
    Complete,
}

impl User {
    pub fn profile_state(&self) -> ProfileState {
        if self.height.is_some() && self.weight.is_some() {
            ProfileState::Complete
        } else {
            ProfileState::Incomplete
        }
    }
}

/// Areas of the app a request can reach
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Feature {
    Onboarding,
    ProfileStatus,
    TargetPreview,
    ProfileEdit,
    Foods,
    Consumption,
    UserAdmin,
}

impl Feature {
    fn reachable_while_incomplete(&self) -> bool {
        matches!(
            self,
            Feature::Onboarding | Feature::ProfileStatus | Feature::TargetPreview
        )
    }
}

/// Confine incomplete users to onboarding
pub fn gate(user: &User, feature: Feature) -> Result<()> {
    match user.profile_state() {
        ProfileState::Complete => Ok(()),
        ProfileState::Incomplete if feature.reachable_while_incomplete() => Ok(()),
        ProfileState::Incomplete => {
            tracing::debug!("User {} gated from {:?}", user.username, feature);
            Err(Error::ProfileIncomplete(format!(
                "{} must complete onboarding before using this feature",
                user.username
            )))
        }
    }
}

/// Partial change to a user's body/goal profile
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProfileUpdate {
    pub height: Option<Height>,
    pub weight: Option<Weight>,
    pub dietary_goal: Option<DietaryGoal>,
    pub confirm_unrealistic: bool,
}

impl ProfileUpdate {
    /// A full onboarding submission
    pub fn onboarding(
        height: Height,
        weight: Weight,
        dietary_goal: DietaryGoal,
        confirm_unrealistic: bool,
    ) -> Self {
        Self {
            height: Some(height),
            weight: Some(weight),
            dietary_goal: Some(dietary_goal),
            confirm_unrealistic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.height.is_none() && self.weight.is_none() && self.dietary_goal.is_none()
    }
}

/// What to do with a profile update
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileDecision {
    /// Persist this user record
    Commit(User),
    /// Persist nothing; show the preview and ask for confirmation
    NeedsConfirmation { preview: u32 },
}

/// Merge an update over the stored profile and re-derive the target
///
/// Both measurements must be present after merging. The target is always
/// recomputed so it never goes stale.
pub fn apply_profile_update(
    user: &User,
    update: &ProfileUpdate,
    bounds: &PlausibilityBounds,
) -> Result<ProfileDecision> {
    if update.is_empty() {
        return Err(Error::InvalidInput("no profile fields to update".into()));
    }

    let height = update.height.or(user.height);
    let weight = update.weight.or(user.weight);
    let goal = update.dietary_goal.unwrap_or(user.dietary_goal);

    let (height, weight) = match (height, weight) {
        (Some(h), Some(w)) => (h, w),
        _ => {
            return Err(Error::InvalidInput(
                "please enter both height and weight".into(),
            ))
        }
    };

    match compute_target(height, weight, goal, update.confirm_unrealistic, bounds)? {
        TargetOutcome::NeedsConfirmation { preview } => {
            Ok(ProfileDecision::NeedsConfirmation { preview })
        }
        TargetOutcome::Committed { target_calories } => {
            let mut updated = user.clone();
            updated.height = Some(height);
            updated.weight = Some(weight);
            updated.dietary_goal = goal;
            updated.target_calories = target_calories;
            Ok(ProfileDecision::Commit(updated))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeightUnit, Role, WeightUnit};
    use chrono::Utc;
    use uuid::Uuid;

    fn new_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "sam".into(),
            role: Role::User,
            height: None,
            weight: None,
            dietary_goal: DietaryGoal::Maintain,
            target_calories: 2000,
            created_at: Utc::now(),
        }
    }

    fn onboard(user: &User, height_cm: f64, confirm: bool) -> ProfileDecision {
        let update = ProfileUpdate::onboarding(
            Height::new(height_cm, HeightUnit::Cm),
            Weight::new(70.0, WeightUnit::Kg),
            DietaryGoal::WeightLoss,
            confirm,
        );
        apply_profile_update(user, &update, &PlausibilityBounds::default()).unwrap()
    }

    #[test]
    fn test_new_user_is_incomplete_and_gated() {
        let user = new_user();
        assert_eq!(user.profile_state(), ProfileState::Incomplete);
        assert!(gate(&user, Feature::Onboarding).is_ok());
        assert!(gate(&user, Feature::ProfileStatus).is_ok());
        assert!(gate(&user, Feature::TargetPreview).is_ok());
        for feature in [
            Feature::Foods,
            Feature::Consumption,
            Feature::ProfileEdit,
            Feature::UserAdmin,
        ] {
            assert!(matches!(
                gate(&user, feature),
                Err(Error::ProfileIncomplete(_))
            ));
        }
    }

    #[test]
    fn test_onboarding_completes_profile() {
        let user = new_user();
        let ProfileDecision::Commit(done) = onboard(&user, 170.0, false) else {
            panic!("expected commit");
        };
        assert_eq!(done.profile_state(), ProfileState::Complete);
        assert_eq!(done.target_calories, 2050);
        assert_eq!(done.dietary_goal, DietaryGoal::WeightLoss);
        assert!(gate(&done, Feature::Foods).is_ok());
    }

    #[test]
    fn test_unconfirmed_unrealistic_stays_incomplete() {
        let user = new_user();
        let decision = onboard(&user, 260.0, false);
        assert!(matches!(decision, ProfileDecision::NeedsConfirmation { .. }));
        assert_eq!(user.profile_state(), ProfileState::Incomplete);

        let ProfileDecision::Commit(done) = onboard(&user, 260.0, true) else {
            panic!("expected commit after confirmation");
        };
        assert_eq!(done.profile_state(), ProfileState::Complete);
    }

    #[test]
    fn test_partial_update_rederives_target() {
        let user = new_user();
        let ProfileDecision::Commit(done) = onboard(&user, 170.0, false) else {
            panic!("expected commit");
        };

        let update = ProfileUpdate {
            dietary_goal: Some(DietaryGoal::Maintain),
            ..ProfileUpdate::default()
        };
        let ProfileDecision::Commit(edited) =
            apply_profile_update(&done, &update, &PlausibilityBounds::default()).unwrap()
        else {
            panic!("expected commit");
        };
        assert_eq!(edited.target_calories, 2560);
        assert_eq!(edited.profile_state(), ProfileState::Complete);
    }

    #[test]
    fn test_update_without_measurements_rejected() {
        let user = new_user();
        let update = ProfileUpdate {
            dietary_goal: Some(DietaryGoal::WeightGain),
            ..ProfileUpdate::default()
        };
        assert!(matches!(
            apply_profile_update(&user, &update, &PlausibilityBounds::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_empty_update_rejected() {
        let user = new_user();
        assert!(matches!(
            apply_profile_update(&user, &ProfileUpdate::default(), &PlausibilityBounds::default()),
            Err(Error::InvalidInput(_))
        ));
    }
}
