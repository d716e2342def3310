//! Bulk import of system foods from CSV datasets.
//!
//! Headers are matched case-insensitively against the common spellings used
//! by public food datasets. Rows without a name are dropped, unparseable or
//! negative numbers become 0, and the first row wins for duplicate names.

use crate::{NewFood, Nutrients, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

const NAME_COLUMNS: &[&str] = &["food", "food_name", "name"];
const CALORIE_COLUMNS: &[&str] = &["caloric value", "caloric_value", "calories"];
const PROTEIN_COLUMNS: &[&str] = &["protein"];
const CARB_COLUMNS: &[&str] = &["carbohydrates", "carbs"];
const FAT_COLUMNS: &[&str] = &["fat"];
const FIBER_COLUMNS: &[&str] = &["dietary fiber", "dietary_fiber", "fiber"];
const SUGAR_COLUMNS: &[&str] = &["sugars", "sugar"];
const DENSITY_COLUMNS: &[&str] = &["nutrition density", "nutrition_density"];

struct ColumnMap {
    index: HashMap<String, usize>,
}

impl ColumnMap {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        Self { index }
    }

    fn pick<'r>(&self, record: &'r StringRecord, names: &[&str]) -> Option<&'r str> {
        names
            .iter()
            .find_map(|n| self.index.get(*n))
            .and_then(|&i| record.get(i))
    }

    fn number(&self, record: &StringRecord, names: &[&str]) -> f64 {
        self.pick(record, names)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .unwrap_or(0.0)
    }
}

/// Parse foods from any CSV reader
pub fn parse_food_csv<R: Read>(reader: R) -> Result<Vec<NewFood>> {
    let mut csv_reader = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = ColumnMap::new(csv_reader.headers()?);

    let mut seen = HashSet::new();
    let mut foods = Vec::new();
    let mut dropped = 0usize;

    for record in csv_reader.records() {
        let record = record?;
        let name = columns
            .pick(&record, NAME_COLUMNS)
            .map(str::trim)
            .unwrap_or_default();

        if name.is_empty() || !seen.insert(name.to_string()) {
            dropped += 1;
            continue;
        }

        foods.push(NewFood {
            name: name.to_string(),
            nutrients: Nutrients {
                calories: columns.number(&record, CALORIE_COLUMNS),
                protein: columns.number(&record, PROTEIN_COLUMNS),
                carbs: columns.number(&record, CARB_COLUMNS),
                fat: columns.number(&record, FAT_COLUMNS),
                fiber: columns.number(&record, FIBER_COLUMNS),
                sugars: columns.number(&record, SUGAR_COLUMNS),
            },
            nutrition_density: columns.number(&record, DENSITY_COLUMNS),
        });
    }

    tracing::info!(
        "Parsed {} foods from CSV ({} rows dropped as blank or duplicate)",
        foods.len(),
        dropped
    );
    Ok(foods)
}

/// Parse foods from a CSV file on disk
pub fn read_food_csv(path: &Path) -> Result<Vec<NewFood>> {
    let file = std::fs::File::open(path)?;
    parse_food_csv(file)
}
