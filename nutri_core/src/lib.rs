#![forbid(unsafe_code)]

//! Core domain model and business logic for the Nutri food log.
//!
//! This crate provides:
//! - Domain types (users, foods, consumption entries)
//! - Unit conversion and target-calorie derivation
//! - Health scoring for logged entries
//! - Food ownership and entry access rules
//! - Profile completion gating
//! - Persistence (locked JSON store, audit log, CSV import)

pub mod types;
pub mod error;
pub mod units;
pub mod config;
pub mod logging;
pub mod target;
pub mod health;
pub mod ownership;
pub mod profile;
pub mod consumption;
pub mod audit;
pub mod import;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use units::{to_cm, to_kg, HeightUnit, WeightUnit};
pub use config::{Config, PlausibilityBounds};
pub use target::{
    calculate_target_calories, compute_target, preview_target, TargetOutcome, TargetPreview,
    MAX_TARGET_CALORIES, MIN_TARGET_CALORIES,
};
pub use health::health_score;
pub use ownership::{
    authorize_entry_access, authorize_food_mutation, can_access_entry, can_mutate,
    resolve_log_target, FoodAction,
};
pub use profile::{
    apply_profile_update, gate, Feature, ProfileDecision, ProfileState, ProfileUpdate,
};
pub use consumption::{apply_entry_update, build_entry, EntryUpdate};
pub use audit::{AuditLog, ProfileChange};
pub use import::{parse_food_csv, read_food_csv};
pub use store::{Database, ImportSummary, ProfileOutcome, Store};
