//! Core domain types for the Nutri food log.
//!
//! This module defines the fundamental types used throughout the system:
//! - Roles, dietary goals and meal types
//! - Body measurements
//! - Users, food items and consumption entries
//! - The acting user passed explicitly into every rule

use crate::units::{to_cm, to_kg, HeightUnit, WeightUnit};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type UserId = Uuid;
pub type FoodId = Uuid;
pub type EntryId = Uuid;

// ============================================================================
// Enumerations
// ============================================================================

/// Role of an account
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    User,
}

/// Dietary goal driving the calorie multiplier
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DietaryGoal {
    WeightLoss,
    #[default]
    Maintain,
    EatHealthy,
    WeightGain,
}

/// Meal slot a consumption entry belongs to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl DietaryGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            DietaryGoal::WeightLoss => "weight_loss",
            DietaryGoal::Maintain => "maintain",
            DietaryGoal::EatHealthy => "eat_healthy",
            DietaryGoal::WeightGain => "weight_gain",
        }
    }
}

impl FromStr for DietaryGoal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "weight_loss" => Ok(DietaryGoal::WeightLoss),
            "maintain" => Ok(DietaryGoal::Maintain),
            "eat_healthy" => Ok(DietaryGoal::EatHealthy),
            "weight_gain" => Ok(DietaryGoal::WeightGain),
            other => Err(Error::InvalidInput(format!(
                "dietary goal must be one of weight_loss, maintain, eat_healthy, weight_gain; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DietaryGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Breakfast" => Ok(MealType::Breakfast),
            "Lunch" => Ok(MealType::Lunch),
            "Dinner" => Ok(MealType::Dinner),
            "Snack" => Ok(MealType::Snack),
            other => Err(Error::InvalidInput(format!(
                "meal type must be one of Breakfast, Lunch, Dinner, Snack; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

// ============================================================================
// Measurements
// ============================================================================

/// A height as entered by the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Height {
    pub value: f64,
    pub unit: HeightUnit,
}

/// A weight as entered by the user
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Weight {
    pub value: f64,
    pub unit: WeightUnit,
}

impl Height {
    pub fn new(value: f64, unit: HeightUnit) -> Self {
        Self { value, unit }
    }

    pub fn cm(&self) -> f64 {
        to_cm(self.value, self.unit)
    }
}

impl Weight {
    pub fn new(value: f64, unit: WeightUnit) -> Self {
        Self { value, unit }
    }

    pub fn kg(&self) -> f64 {
        to_kg(self.value, self.unit)
    }
}

// ============================================================================
// Records
// ============================================================================

/// The acting user, passed explicitly into every rule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user account with its body/goal profile
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
    pub height: Option<Height>,
    pub weight: Option<Weight>,
    pub dietary_goal: DietaryGoal,
    pub target_calories: u32,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// The six tracked nutrient values
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Nutrients {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugars: f64,
}

impl Nutrients {
    /// Scale every nutrient by a portion multiplier
    pub fn scaled(&self, portion: f64) -> Self {
        Self {
            calories: self.calories * portion,
            protein: self.protein * portion,
            carbs: self.carbs * portion,
            fat: self.fat * portion,
            fiber: self.fiber * portion,
            sugars: self.sugars * portion,
        }
    }

    /// Reject negative or non-finite values
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
            ("fiber", self.fiber),
            ("sugars", self.sugars),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidInput(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A food in the shared catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FoodItem {
    pub id: FoodId,
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Nutrients,
    #[serde(default)]
    pub nutrition_density: f64,
    /// `None` marks a system/imported food
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a food
#[derive(Clone, Debug, PartialEq)]
pub struct NewFood {
    pub name: String,
    pub nutrients: Nutrients,
    pub nutrition_density: f64,
}

/// Partial change to an existing food
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FoodUpdate {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugars: Option<f64>,
    pub nutrition_density: Option<f64>,
}

impl FoodUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Nutrients after applying this update over `current`
    pub fn merged_nutrients(&self, current: &Nutrients) -> Nutrients {
        Nutrients {
            calories: self.calories.unwrap_or(current.calories),
            protein: self.protein.unwrap_or(current.protein),
            carbs: self.carbs.unwrap_or(current.carbs),
            fat: self.fat.unwrap_or(current.fat),
            fiber: self.fiber.unwrap_or(current.fiber),
            sugars: self.sugars.unwrap_or(current.sugars),
        }
    }
}

/// A logged consumption with its nutrient snapshot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionEntry {
    pub id: EntryId,
    pub user_id: UserId,
    pub food_id: FoodId,
    pub date: NaiveDate,
    pub portion: f64,
    #[serde(flatten)]
    pub nutrients: Nutrients,
    pub health_score: u8,
    pub meal_type: Option<MealType>,
    pub created_at: DateTime<Utc>,
}
