//! Consumption entries and their nutrient snapshots.
//!
//! An entry copies the food's nutrients scaled by the portion at log time.
//! Later edits to the food never touch existing entries; only an explicit
//! portion change re-snapshots.

use crate::{ConsumptionEntry, Error, FoodItem, MealType, Result, UserId};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

fn validate_portion(portion: f64) -> Result<()> {
    if !portion.is_finite() || portion <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "portion must be greater than zero, got {}",
            portion
        )));
    }
    Ok(())
}

fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
    if date > today {
        return Err(Error::InvalidInput(format!(
            "date {} is in the future",
            date
        )));
    }
    Ok(())
}

/// Build a new entry with a portion-scaled snapshot and its health score
pub fn build_entry(
    user_id: UserId,
    food: &FoodItem,
    portion: f64,
    date: NaiveDate,
    meal_type: Option<MealType>,
    today: NaiveDate,
) -> Result<ConsumptionEntry> {
    validate_portion(portion)?;
    validate_date(date, today)?;

    let nutrients = food.nutrients.scaled(portion);
    let health_score = nutrients.health_score();

    tracing::debug!(
        "Snapshot of '{}' x{}: {:.1} kcal, score {}",
        food.name,
        portion,
        nutrients.calories,
        health_score
    );

    Ok(ConsumptionEntry {
        id: Uuid::new_v4(),
        user_id,
        food_id: food.id,
        date,
        portion,
        nutrients,
        health_score,
        meal_type,
        created_at: Utc::now(),
    })
}

/// Changes to an existing entry
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EntryUpdate {
    pub portion: Option<f64>,
    pub date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.portion.is_none() && self.date.is_none() && self.meal_type.is_none()
    }
}

/// Apply an update; a new portion re-snapshots from the current food record
pub fn apply_entry_update(
    entry: &mut ConsumptionEntry,
    food: &FoodItem,
    update: &EntryUpdate,
    today: NaiveDate,
) -> Result<()> {
    if update.is_empty() {
        return Err(Error::InvalidInput("no entry fields to update".into()));
    }
    if let Some(portion) = update.portion {
        validate_portion(portion)?;
    }
    if let Some(date) = update.date {
        validate_date(date, today)?;
    }

    if let Some(portion) = update.portion {
        entry.portion = portion;
        entry.nutrients = food.nutrients.scaled(portion);
        entry.health_score = entry.nutrients.health_score();
    }
    if let Some(date) = update.date {
        entry.date = date;
    }
    if let Some(meal_type) = update.meal_type {
        entry.meal_type = Some(meal_type);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Nutrients;

    fn lentils() -> FoodItem {
        FoodItem {
            id: Uuid::new_v4(),
            name: "Lentils".into(),
            nutrients: Nutrients {
                calories: 100.0,
                protein: 10.0,
                carbs: 15.0,
                fat: 1.0,
                fiber: 2.5,
                sugars: 1.0,
            },
            nutrition_density: 0.0,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_entry_scales_snapshot_and_scores_it() {
        let food = lentils();
        let entry = build_entry(Uuid::new_v4(), &food, 2.0, day(3), Some(MealType::Lunch), day(3)).unwrap();

        assert_eq!(entry.nutrients.calories, 200.0);
        assert_eq!(entry.nutrients.protein, 20.0);
        assert_eq!(entry.nutrients.fiber, 5.0);
        assert_eq!(entry.nutrients.sugars, 2.0);
        // 50 + 10 + 6
        assert_eq!(entry.health_score, 66);
        assert_eq!(entry.food_id, food.id);
    }

    #[test]
    fn test_snapshot_is_independent_of_food_edits() {
        let mut food = lentils();
        let entry = build_entry(Uuid::new_v4(), &food, 1.0, day(3), None, day(3)).unwrap();

        food.nutrients.calories = 999.0;
        assert_eq!(entry.nutrients.calories, 100.0);
    }

    #[test]
    fn test_rejects_bad_portion_and_future_date() {
        let food = lentils();
        let user = Uuid::new_v4();
        assert!(matches!(
            build_entry(user, &food, 0.0, day(3), None, day(3)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            build_entry(user, &food, -1.0, day(3), None, day(3)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            build_entry(user, &food, 1.0, day(4), None, day(3)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_portion_update_resnapshots() {
        let mut food = lentils();
        let mut entry = build_entry(Uuid::new_v4(), &food, 1.0, day(3), None, day(3)).unwrap();

        food.nutrients.calories = 50.0;
        let update = EntryUpdate {
            portion: Some(3.0),
            ..EntryUpdate::default()
        };
        apply_entry_update(&mut entry, &food, &update, day(3)).unwrap();

        assert_eq!(entry.portion, 3.0);
        assert_eq!(entry.nutrients.calories, 150.0);
        // 50 + (30/150)*100 + (7.5-3)*2 = 50 + 20 + 9
        assert_eq!(entry.health_score, 79);
    }

    #[test]
    fn test_date_update_keeps_snapshot() {
        let food = lentils();
        let mut entry = build_entry(Uuid::new_v4(), &food, 1.0, day(3), None, day(5)).unwrap();
        let before = entry.nutrients;

        let update = EntryUpdate {
            date: Some(day(1)),
            meal_type: Some(MealType::Snack),
            ..EntryUpdate::default()
        };
        apply_entry_update(&mut entry, &food, &update, day(5)).unwrap();

        assert_eq!(entry.date, day(1));
        assert_eq!(entry.meal_type, Some(MealType::Snack));
        assert_eq!(entry.nutrients, before);
    }

    #[test]
    fn test_invalid_update_leaves_entry_untouched() {
        let food = lentils();
        let mut entry = build_entry(Uuid::new_v4(), &food, 1.0, day(3), None, day(3)).unwrap();
        let original = entry.clone();

        let update = EntryUpdate {
            portion: Some(2.0),
            date: Some(day(9)),
            ..EntryUpdate::default()
        };
        assert!(apply_entry_update(&mut entry, &food, &update, day(3)).is_err());
        assert_eq!(entry, original);
    }
}
