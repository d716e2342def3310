//! Access rules for the shared food catalog and consumption entries.
//!
//! Food mutation rules, in order:
//! 1. Admins may mutate any food
//! 2. Unowned (system/imported) foods are admin-only
//! 3. Owners may mutate their own foods
//! 4. Everyone else is denied
//!
//! Creating a food is always allowed; the creator becomes its owner.

use crate::{Actor, ConsumptionEntry, Error, FoodItem, Result, Role, UserId};
use std::fmt;

/// A mutation of an existing food
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FoodAction {
    Edit,
    Delete,
}

impl fmt::Display for FoodAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoodAction::Edit => f.write_str("edit"),
            FoodAction::Delete => f.write_str("delete"),
        }
    }
}

/// Decide whether an actor may edit or delete a food
pub fn can_mutate(actor_role: Role, actor_user_id: UserId, owner: Option<UserId>) -> bool {
    match (actor_role, owner) {
        (Role::Admin, _) => true,
        (Role::User, None) => false,
        (Role::User, Some(owner)) => owner == actor_user_id,
    }
}

/// Fail with `Forbidden` unless the actor may mutate the food
pub fn authorize_food_mutation(actor: &Actor, food: &FoodItem, action: FoodAction) -> Result<()> {
    if can_mutate(actor.role, actor.user_id, food.created_by) {
        return Ok(());
    }

    tracing::warn!(
        "Denied {} of food '{}' ({}) for user {}",
        action,
        food.name,
        food.id,
        actor.user_id
    );
    Err(Error::Forbidden(format!(
        "you can only {} food items you created",
        action
    )))
}

/// Admins or the owning user may read and change an entry
pub fn can_access_entry(actor: &Actor, entry_owner: UserId) -> bool {
    actor.is_admin() || actor.user_id == entry_owner
}

pub fn authorize_entry_access(actor: &Actor, entry: &ConsumptionEntry) -> Result<()> {
    if can_access_entry(actor, entry.user_id) {
        Ok(())
    } else {
        tracing::warn!("Denied access to entry {} for user {}", entry.id, actor.user_id);
        Err(Error::Forbidden(
            "you don't have permission for this entry".into(),
        ))
    }
}

/// Pick the user a consumption is logged for
///
/// Regular users always log for themselves and any requested id is ignored.
/// Admins log on behalf of someone and must name them.
pub fn resolve_log_target(actor: &Actor, requested: Option<UserId>) -> Result<UserId> {
    match actor.role {
        Role::User => Ok(actor.user_id),
        Role::Admin => requested.ok_or_else(|| {
            Error::InvalidInput("admin must specify which user the entry is for".into())
        }),
    }
}
