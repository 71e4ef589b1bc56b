use std::collections::{HashMap, HashSet};
use std::fmt;

use pitwall_common::CellAddress;
use thiserror::Error;

use crate::layout::{
    Layout, SETUP_KEYS, STINT_COUNT, STINT_TOTAL_COL, boost_mini_column, stint_column,
};

/// A single problem found in a layout, addressed by a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    pub path: String,
    pub message: String,
}

impl SchemaIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every issue found by [`Layout::validate`], reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell layout: {}", summarize(.issues))]
pub struct ValidationError {
    issues: Vec<SchemaIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<SchemaIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[SchemaIssue] {
        &self.issues
    }
}

fn summarize(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Layout {
    /// Check that no two fields share a cell, that the stint/boost column
    /// functions are injective over 1..=8, and that the setup remapping is a
    /// permutation of the rows it refers to.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let mut owners: HashMap<CellAddress, String> = HashMap::new();
        for entry in self.entries() {
            let path = format!("{}.{}", entry.group.name(), entry.key);
            if let Some(previous) = owners.get(&entry.cell) {
                issues.push(SchemaIssue::new(
                    &path,
                    format!("cell {} is already bound to `{previous}`", entry.cell),
                ));
            } else {
                owners.insert(entry.cell, path);
            }
        }

        check_column_fn(&mut issues, "stint_column", stint_column);
        check_column_fn(&mut issues, "boost_mini_column", boost_mini_column);
        if self.boost_mini_stints.len() != STINT_COUNT as usize {
            issues.push(SchemaIssue::new(
                "boost_mini_stints",
                format!(
                    "expected {STINT_COUNT} mini-stints, found {}",
                    self.boost_mini_stints.len()
                ),
            ));
        }
        for (index, mini) in (1..=STINT_COUNT).zip(&self.boost_mini_stints) {
            let column = boost_mini_column(index);
            if Some(mini.val1.col) != column || Some(mini.val2.col) != column {
                issues.push(SchemaIssue::new(
                    format!("boost_mini_stints.{}", mini.key),
                    format!("not in boost_mini_column({index})"),
                ));
            }
        }
        for index in 1..=STINT_COUNT {
            if stint_column(index) == Some(STINT_TOTAL_COL) {
                issues.push(SchemaIssue::new(
                    format!("stint_column({index})"),
                    "collides with the stint total column",
                ));
            }
        }

        let mut wear_rows = HashSet::new();
        let mut setup_rows = HashSet::new();
        for (idx, part) in self.setup_parts.iter().enumerate() {
            let path = format!("setup_parts[{idx}]");
            if part.wear_part >= self.car_parts.len() {
                issues.push(SchemaIssue::new(
                    &path,
                    format!("wear row {} is outside the car-part table", part.wear_part),
                ));
            } else if !wear_rows.insert(part.wear_part) {
                issues.push(SchemaIssue::new(
                    &path,
                    format!("wear row {} is used twice", part.wear_part),
                ));
            }
            if let Some(row) = part.setup_row {
                if row >= self.setup_results.len() {
                    issues.push(SchemaIssue::new(
                        &path,
                        format!("setup row {row} is outside the setup result block"),
                    ));
                } else if !setup_rows.insert(row) {
                    issues.push(SchemaIssue::new(
                        &path,
                        format!("setup row {row} is used twice"),
                    ));
                } else if SETUP_KEYS[row] != part.key {
                    issues.push(SchemaIssue::new(
                        &path,
                        format!("`{}` reads setup row `{}`", part.key, SETUP_KEYS[row]),
                    ));
                }
            }
        }
        if setup_rows.len() != self.setup_results.len() {
            issues.push(SchemaIssue::new(
                "setup_parts",
                "not every setup result row is reported",
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

fn check_column_fn(issues: &mut Vec<SchemaIssue>, name: &str, column: fn(u32) -> Option<u32>) {
    let mut seen = HashSet::new();
    for index in 1..=STINT_COUNT {
        match column(index) {
            Some(col) if !seen.insert(col) => issues.push(SchemaIssue::new(
                format!("{name}({index})"),
                format!("column {col} is produced twice"),
            )),
            Some(_) => {}
            None => issues.push(SchemaIssue::new(
                format!("{name}({index})"),
                "no column inside the declared domain",
            )),
        }
    }
    for outside in [0, STINT_COUNT + 1] {
        if column(outside).is_some() {
            issues.push(SchemaIssue::new(
                format!("{name}({outside})"),
                "produces a column outside the declared domain",
            ));
        }
    }
}
