//! Locked JSON store for users, foods and consumption entries.
//!
//! Every mutation runs inside `Store::transaction`, which holds an exclusive
//! lock on a sidecar lock file across load, mutate and save. Uniqueness and
//! ownership checks therefore see the same record the write replaces, even
//! with several processes racing on the same data directory.
//!
//! The store file is replaced atomically:
//! 1. Serialize to a temp file in the same directory
//! 2. Sync to disk
//! 3. Rename over the original

use crate::audit::{AuditLog, ProfileChange};
use crate::consumption::{apply_entry_update, build_entry, EntryUpdate};
use crate::ownership::{authorize_entry_access, authorize_food_mutation, resolve_log_target, FoodAction};
use crate::profile::{apply_profile_update, ProfileDecision, ProfileUpdate};
use crate::target::DEFAULT_TARGET_CALORIES;
use crate::{
    Actor, ConsumptionEntry, DietaryGoal, EntryId, Error, FoodId, FoodItem, FoodUpdate, MealType,
    NewFood, PlausibilityBounds, Result, Role, User, UserId,
};
use chrono::{NaiveDate, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

const STORE_FILE: &str = "nutri.json";
const LOCK_FILE: &str = "nutri.lock";
const AUDIT_FILE: &str = "audit/profile_changes.jsonl";

/// Everything the store persists
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub foods: Vec<FoodItem>,
    #[serde(default)]
    pub entries: Vec<ConsumptionEntry>,
}

/// Result of a profile submission
#[derive(Clone, Debug, PartialEq)]
pub enum ProfileOutcome {
    Committed {
        user: User,
        change: Option<ProfileChange>,
    },
    NeedsConfirmation {
        preview: u32,
    },
}

/// Counts from a catalog import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
}

fn normalized_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn validate_density(density: f64) -> Result<()> {
    if !density.is_finite() || density < 0.0 {
        return Err(Error::InvalidInput(format!(
            "nutrition density must be a non-negative number, got {}",
            density
        )));
    }
    Ok(())
}

// ============================================================================
// In-memory rules
// ============================================================================

impl Database {
    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn food(&self, id: FoodId) -> Result<&FoodItem> {
        self.foods
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| Error::NotFound(format!("food {}", id)))
    }

    pub fn food_by_name(&self, name: &str) -> Option<&FoodItem> {
        self.foods.iter().find(|f| f.name == name)
    }

    pub fn entry(&self, id: EntryId) -> Result<&ConsumptionEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("entry {}", id)))
    }

    fn ensure_unique_food_name(&self, name: &str, except: Option<FoodId>) -> Result<()> {
        match self.food_by_name(name) {
            Some(existing) if Some(existing.id) != except => Err(Error::Conflict(format!(
                "a food named '{}' already exists",
                name
            ))),
            _ => Ok(()),
        }
    }

    /// Create an account with an empty profile
    pub fn add_user(&mut self, username: &str, role: Role) -> Result<User> {
        let username = normalized_name(username, "username")?;
        if self.user_by_name(&username).is_some() {
            return Err(Error::Conflict(format!(
                "username '{}' is already taken",
                username
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            username,
            role,
            height: None,
            weight: None,
            dietary_goal: DietaryGoal::default(),
            target_calories: DEFAULT_TARGET_CALORIES,
            created_at: Utc::now(),
        };
        self.users.push(user.clone());
        Ok(user)
    }

    /// Delete a user and every entry they own
    pub fn remove_user(&mut self, actor: &Actor, user_id: UserId) -> Result<(User, usize)> {
        if !actor.is_admin() {
            return Err(Error::Forbidden("only admins can delete users".into()));
        }
        let user = self.user(user_id)?.clone();

        let before = self.entries.len();
        self.entries.retain(|e| e.user_id != user_id);
        let removed = before - self.entries.len();
        self.users.retain(|u| u.id != user_id);

        Ok((user, removed))
    }

    /// Add a food owned by the actor
    pub fn add_food(&mut self, actor: &Actor, new_food: NewFood) -> Result<FoodItem> {
        let food = self.insert_food(new_food, Some(actor.user_id))?;
        Ok(food)
    }

    fn insert_food(&mut self, new_food: NewFood, owner: Option<UserId>) -> Result<FoodItem> {
        let name = normalized_name(&new_food.name, "food name")?;
        new_food.nutrients.validate()?;
        validate_density(new_food.nutrition_density)?;
        self.ensure_unique_food_name(&name, None)?;

        let food = FoodItem {
            id: Uuid::new_v4(),
            name,
            nutrients: new_food.nutrients,
            nutrition_density: new_food.nutrition_density,
            created_by: owner,
            created_at: Utc::now(),
        };
        self.foods.push(food.clone());
        Ok(food)
    }

    /// Add unowned system foods, skipping names already in the catalog
    pub fn add_system_foods(&mut self, actor: &Actor, foods: Vec<NewFood>) -> Result<ImportSummary> {
        if !actor.is_admin() {
            return Err(Error::Forbidden("only admins can import system foods".into()));
        }

        let mut summary = ImportSummary::default();
        for new_food in foods {
            match self.insert_food(new_food, None) {
                Ok(_) => summary.inserted += 1,
                Err(Error::Conflict(_)) | Err(Error::InvalidInput(_)) => summary.skipped += 1,
                Err(e) => return Err(e),
            }
        }
        Ok(summary)
    }

    /// Edit a food after checking ownership against the stored record
    pub fn edit_food(&mut self, actor: &Actor, food_id: FoodId, update: &FoodUpdate) -> Result<FoodItem> {
        if update.is_empty() {
            return Err(Error::InvalidInput("no food fields to update".into()));
        }

        let current = self.food(food_id)?;
        authorize_food_mutation(actor, current, FoodAction::Edit)?;

        let name = match &update.name {
            Some(name) => {
                let name = normalized_name(name, "food name")?;
                self.ensure_unique_food_name(&name, Some(food_id))?;
                name
            }
            None => current.name.clone(),
        };
        let nutrients = update.merged_nutrients(&current.nutrients);
        nutrients.validate()?;
        let density = update.nutrition_density.unwrap_or(current.nutrition_density);
        validate_density(density)?;

        let food = self
            .foods
            .iter_mut()
            .find(|f| f.id == food_id)
            .ok_or_else(|| Error::NotFound(format!("food {}", food_id)))?;
        food.name = name;
        food.nutrients = nutrients;
        food.nutrition_density = density;
        Ok(food.clone())
    }

    /// Delete a food unless entries still reference it
    pub fn remove_food(&mut self, actor: &Actor, food_id: FoodId) -> Result<FoodItem> {
        let food = self.food(food_id)?.clone();
        authorize_food_mutation(actor, &food, FoodAction::Delete)?;

        let references = self.entries.iter().filter(|e| e.food_id == food_id).count();
        if references > 0 {
            return Err(Error::InUse(format!(
                "'{}' is referenced by {} consumption entr{}",
                food.name,
                references,
                if references == 1 { "y" } else { "ies" }
            )));
        }

        self.foods.retain(|f| f.id != food_id);
        Ok(food)
    }

    /// Log a consumption for the actor (or, for admins, on behalf of a user)
    #[allow(clippy::too_many_arguments)]
    pub fn log_entry(
        &mut self,
        actor: &Actor,
        for_user: Option<UserId>,
        food_id: FoodId,
        portion: f64,
        date: NaiveDate,
        meal_type: Option<MealType>,
        today: NaiveDate,
    ) -> Result<ConsumptionEntry> {
        let user_id = resolve_log_target(actor, for_user)?;
        self.user(user_id)?;
        let food = self.food(food_id)?;

        let entry = build_entry(user_id, food, portion, date, meal_type, today)?;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn edit_entry(
        &mut self,
        actor: &Actor,
        entry_id: EntryId,
        update: &EntryUpdate,
        today: NaiveDate,
    ) -> Result<ConsumptionEntry> {
        let entry = self.entry(entry_id)?;
        authorize_entry_access(actor, entry)?;
        let food = self.food(entry.food_id)?.clone();

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == entry_id)
            .ok_or_else(|| Error::NotFound(format!("entry {}", entry_id)))?;
        apply_entry_update(entry, &food, update, today)?;
        Ok(entry.clone())
    }

    pub fn remove_entry(&mut self, actor: &Actor, entry_id: EntryId) -> Result<ConsumptionEntry> {
        let entry = self.entry(entry_id)?.clone();
        authorize_entry_access(actor, &entry)?;
        self.entries.retain(|e| e.id != entry_id);
        Ok(entry)
    }

    /// Entries of one user, newest first
    pub fn entries_for(
        &self,
        actor: &Actor,
        for_user: Option<UserId>,
        date: Option<NaiveDate>,
        meal_type: Option<MealType>,
    ) -> Result<Vec<ConsumptionEntry>> {
        let user_id = resolve_log_target(actor, for_user)?;
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| date.map_or(true, |d| e.date == d))
            .filter(|e| meal_type.map_or(true, |m| e.meal_type == Some(m)))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(entries)
    }

    /// Apply a profile update to `target`, honoring the confirmation gate
    pub fn update_profile(
        &mut self,
        actor: &Actor,
        target: UserId,
        update: &ProfileUpdate,
        bounds: &PlausibilityBounds,
    ) -> Result<ProfileOutcome> {
        if actor.user_id != target && !actor.is_admin() {
            return Err(Error::Forbidden(
                "you can only update your own profile".into(),
            ));
        }

        let current = self.user(target)?;
        match apply_profile_update(current, update, bounds)? {
            ProfileDecision::NeedsConfirmation { preview } => {
                Ok(ProfileOutcome::NeedsConfirmation { preview })
            }
            ProfileDecision::Commit(updated) => {
                let change = ProfileChange::between(current, &updated, actor);
                if let Some(slot) = self.users.iter_mut().find(|u| u.id == target) {
                    *slot = updated.clone();
                }
                Ok(ProfileOutcome::Committed {
                    user: updated,
                    change,
                })
            }
        }
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// File-backed store rooted in a data directory
pub struct Store {
    path: PathBuf,
    lock_path: PathBuf,
    audit_path: PathBuf,
    bounds: PlausibilityBounds,
}

impl Store {
    /// Open (or prepare) the store in `data_dir`
    pub fn open(data_dir: &Path, bounds: PlausibilityBounds) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(STORE_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            audit_path: data_dir.join(AUDIT_FILE),
            bounds,
        })
    }

    pub fn bounds(&self) -> &PlausibilityBounds {
        &self.bounds
    }

    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.audit_path.clone())
    }

    fn lock_file(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn load(&self) -> Result<Database> {
        if !self.path.exists() {
            tracing::debug!("No store file at {:?}, starting empty", self.path);
            return Ok(Database::default());
        }

        let mut contents = String::new();
        File::open(&self.path)?.read_to_string(&mut contents)?;
        let db = serde_json::from_str(&contents)?;
        Ok(db)
    }

    fn save(&self, db: &Database) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "store path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(db)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Snapshot of the store under a shared lock
    pub fn read(&self) -> Result<Database> {
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let db = self.load();
        lock.unlock()?;
        db
    }

    /// Load, mutate and save under an exclusive lock
    ///
    /// Nothing is written when `f` fails.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Database) -> Result<T>,
    {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;

        let result = self.load().and_then(|mut db| {
            let value = f(&mut db)?;
            self.save(&db)?;
            Ok(value)
        });

        lock.unlock()?;
        result
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    pub fn find_user_by_name(&self, username: &str) -> Result<User> {
        self.read()?
            .user_by_name(username)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user '{}'", username)))
    }

    pub fn signup(&self, username: &str) -> Result<User> {
        let user = self.transaction(|db| db.add_user(username, Role::User))?;
        tracing::info!("Signed up user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Return the first admin, creating one named `username` if none exists
    pub fn ensure_admin(&self, username: &str) -> Result<User> {
        self.transaction(|db| {
            if let Some(admin) = db.users.iter().find(|u| u.role == Role::Admin) {
                return Ok(admin.clone());
            }
            let admin = db.add_user(username, Role::Admin)?;
            tracing::info!("Bootstrapped admin {} ({})", admin.username, admin.id);
            Ok(admin)
        })
    }

    pub fn delete_user(&self, actor: &Actor, user_id: UserId) -> Result<(User, usize)> {
        let (user, removed) = self.transaction(|db| db.remove_user(actor, user_id))?;
        tracing::info!(
            "Deleted user {} and {} consumption entries",
            user.username,
            removed
        );
        Ok((user, removed))
    }

    // ------------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------------

    /// Update a profile and audit what changed
    ///
    /// The audit record is written before the store is saved, so a failed
    /// append leaves the profile untouched.
    pub fn update_profile(
        &self,
        actor: &Actor,
        target: UserId,
        update: &ProfileUpdate,
    ) -> Result<ProfileOutcome> {
        let bounds = self.bounds;
        let audit = self.audit_log();
        let outcome = self.transaction(|db| {
            let outcome = db.update_profile(actor, target, update, &bounds)?;
            if let ProfileOutcome::Committed {
                change: Some(change),
                ..
            } = &outcome
            {
                audit.append(change)?;
            }
            Ok(outcome)
        })?;

        if let ProfileOutcome::Committed { user, .. } = &outcome {
            tracing::info!(
                "Profile of {} saved, target {} kcal",
                user.username,
                user.target_calories
            );
        }
        Ok(outcome)
    }

    /// Onboarding submission for the actor's own profile
    pub fn submit_onboarding(&self, actor: &Actor, submission: &ProfileUpdate) -> Result<ProfileOutcome> {
        if submission.height.is_none() || submission.weight.is_none() || submission.dietary_goal.is_none() {
            return Err(Error::InvalidInput(
                "onboarding requires height, weight and dietary goal".into(),
            ));
        }
        self.update_profile(actor, actor.user_id, submission)
    }

    // ------------------------------------------------------------------------
    // Foods
    // ------------------------------------------------------------------------

    pub fn list_foods(&self) -> Result<Vec<FoodItem>> {
        let mut foods = self.read()?.foods;
        foods.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(foods)
    }

    pub fn find_food_by_name(&self, name: &str) -> Result<FoodItem> {
        self.read()?
            .food_by_name(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("food '{}'", name)))
    }

    pub fn create_food(&self, actor: &Actor, new_food: NewFood) -> Result<FoodItem> {
        let food = self.transaction(|db| db.add_food(actor, new_food))?;
        tracing::info!("Created food '{}' owned by {}", food.name, actor.user_id);
        Ok(food)
    }

    pub fn update_food(&self, actor: &Actor, food_id: FoodId, update: &FoodUpdate) -> Result<FoodItem> {
        let food = self.transaction(|db| db.edit_food(actor, food_id, update))?;
        tracing::info!("Updated food '{}'", food.name);
        Ok(food)
    }

    pub fn delete_food(&self, actor: &Actor, food_id: FoodId) -> Result<FoodItem> {
        let food = self.transaction(|db| db.remove_food(actor, food_id))?;
        tracing::info!("Deleted food '{}'", food.name);
        Ok(food)
    }

    pub fn import_foods(&self, actor: &Actor, foods: Vec<NewFood>) -> Result<ImportSummary> {
        let summary = self.transaction(|db| db.add_system_foods(actor, foods))?;
        tracing::info!(
            "Imported {} system foods ({} skipped)",
            summary.inserted,
            summary.skipped
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Consumption
    // ------------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub fn log_entry(
        &self,
        actor: &Actor,
        for_user: Option<UserId>,
        food_id: FoodId,
        portion: f64,
        date: NaiveDate,
        meal_type: Option<MealType>,
        today: NaiveDate,
    ) -> Result<ConsumptionEntry> {
        let entry = self.transaction(|db| {
            db.log_entry(actor, for_user, food_id, portion, date, meal_type, today)
        })?;
        tracing::info!(
            "Logged entry {} for user {}: {:.0} kcal, score {}",
            entry.id,
            entry.user_id,
            entry.nutrients.calories,
            entry.health_score
        );
        Ok(entry)
    }

    pub fn update_entry(
        &self,
        actor: &Actor,
        entry_id: EntryId,
        update: &EntryUpdate,
        today: NaiveDate,
    ) -> Result<ConsumptionEntry> {
        let entry = self.transaction(|db| db.edit_entry(actor, entry_id, update, today))?;
        tracing::info!("Updated entry {}", entry.id);
        Ok(entry)
    }

    pub fn delete_entry(&self, actor: &Actor, entry_id: EntryId) -> Result<ConsumptionEntry> {
        let entry = self.transaction(|db| db.remove_entry(actor, entry_id))?;
        tracing::info!("Deleted entry {}", entry.id);
        Ok(entry)
    }

    pub fn list_entries(
        &self,
        actor: &Actor,
        for_user: Option<UserId>,
        date: Option<NaiveDate>,
        meal_type: Option<MealType>,
    ) -> Result<Vec<ConsumptionEntry>> {
        self.read()?.entries_for(actor, for_user, date, meal_type)
    }
}
