//! Append-only audit log of profile changes.
//!
//! Each committed change to a user's body/goal profile is appended as one
//! JSON line, under an exclusive file lock.

use crate::{Actor, Result, Role, User, UserId};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Old and new value of one profile field
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub from: Value,
    pub to: Value,
}

/// One audited profile change
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileChange {
    pub user_id: UserId,
    pub changed_by: UserId,
    pub changed_by_role: Role,
    pub changed_fields: BTreeMap<String, FieldChange>,
    pub changed_at: DateTime<Utc>,
}

fn profile_fields(user: &User) -> [(&'static str, Value); 6] {
    [
        ("height_value", json_of(user.height.map(|h| h.value))),
        ("height_unit", json_of(user.height.map(|h| h.unit))),
        ("weight_value", json_of(user.weight.map(|w| w.value))),
        ("weight_unit", json_of(user.weight.map(|w| w.unit))),
        ("dietary_goal", json_of(user.dietary_goal)),
        ("target_calories", json_of(user.target_calories)),
    ]
}

fn json_of<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl ProfileChange {
    /// Diff two versions of a user; `None` when nothing audited changed
    pub fn between(old: &User, new: &User, changed_by: &Actor) -> Option<Self> {
        let changed_fields: BTreeMap<String, FieldChange> = profile_fields(old)
            .into_iter()
            .zip(profile_fields(new))
            .filter(|((_, from), (_, to))| from != to)
            .map(|((name, from), (_, to))| (name.to_string(), FieldChange { from, to }))
            .collect();

        if changed_fields.is_empty() {
            return None;
        }

        Some(Self {
            user_id: new.id,
            changed_by: changed_by.user_id,
            changed_by_role: changed_by.role,
            changed_fields,
            changed_at: Utc::now(),
        })
    }
}

/// JSONL-based audit log with file locking
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read every change in the log, skipping malformed lines
    pub fn read_changes(&self) -> Result<Vec<ProfileChange>> {
        read_changes(&self.path)
    }

    /// Append one change as a JSON line
    pub fn append(&self, change: &ProfileChange) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(change)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!(
            "Audited {} profile field(s) for user {}",
            change.changed_fields.len(),
            change.user_id
        );
        Ok(())
    }
}

/// Read all changes from an audit log file
pub fn read_changes(path: &Path) -> Result<Vec<ProfileChange>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut changes = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ProfileChange>(&line) {
            Ok(change) => changes.push(change),
            Err(e) => {
                tracing::warn!("Failed to parse audit record at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    Ok(changes)
}
