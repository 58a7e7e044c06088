use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result, Stage};
use crate::table::{normalize_name, TableKind};

/// Meaning assigned to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Source,
    Target,
    Label,
}

impl Role {
    /// Column name picked by default for this role.
    pub fn well_known_name(self) -> &'static str {
        match self {
            Role::Source => "source",
            Role::Target => "target",
            Role::Label => "label",
        }
    }

    /// Table the role's column lives in.
    pub fn table(self) -> TableKind {
        match self {
            Role::Source | Role::Target => TableKind::Edges,
            Role::Label => TableKind::Nodes,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.well_known_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChoice {
    Resolved(String),
    Unresolved,
}

impl ColumnChoice {
    /// Apply an explicit caller choice, falling back to the default for `role`.
    ///
    /// `Some("")` means the caller kept the empty option and is always
    /// unresolved. A non-empty choice must name one of `columns` once folded the
    /// way headers are (lowercase, `type` read as `relation_type`).
    pub fn select(role: Role, columns: &[String], explicit: Option<&str>) -> Result<ColumnChoice> {
        let Some(choice) = explicit else {
            return Ok(resolve(role, columns));
        };
        if choice.trim().is_empty() {
            return Ok(ColumnChoice::Unresolved);
        }
        find_column(role.table(), columns, choice).map(ColumnChoice::Resolved)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ColumnChoice::Resolved(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            ColumnChoice::Resolved(c) => Some(c.as_str()),
            ColumnChoice::Unresolved => None,
        }
    }

    /// Unresolved columns stop the pipeline.
    pub fn require(self, role: Role) -> Result<String> {
        match self {
            ColumnChoice::Resolved(c) => Ok(c),
            ColumnChoice::Unresolved => Err(ConvertError::UnresolvedColumn { role }),
        }
    }
}

/// Default column for `role`: the first column named after it, ignoring case.
pub fn resolve(role: Role, columns: &[String]) -> ColumnChoice {
    columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(role.well_known_name()))
        .map(|c| ColumnChoice::Resolved(c.clone()))
        .unwrap_or(ColumnChoice::Unresolved)
}

/// Look up a user-typed column name among normalized `columns`.
pub fn find_column(table: TableKind, columns: &[String], name: &str) -> Result<String> {
    let folded = normalize_name(name);
    columns
        .iter()
        .find(|c| **c == folded)
        .cloned()
        .ok_or_else(|| ConvertError::UnknownColumn {
            table,
            column: name.trim().to_string(),
            stage: Stage::Resolve,
        })
}

/// What a selection widget offers for one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnOptions {
    pub role: Role,
    /// Available columns, followed by `""` when there is no default.
    pub options: Vec<String>,
    pub preselected: usize,
}

impl ColumnOptions {
    pub fn for_role(role: Role, columns: &[String]) -> ColumnOptions {
        let mut options = columns.to_vec();
        let preselected = match resolve(role, columns) {
            ColumnChoice::Resolved(c) => options.iter().position(|o| *o == c).unwrap_or_default(),
            ColumnChoice::Unresolved => {
                options.push(String::new());
                options.len() - 1
            }
        };

        ColumnOptions {
            role,
            options,
            preselected,
        }
    }

    pub fn default_choice(&self) -> ColumnChoice {
        match self.options.get(self.preselected) {
            Some(c) if !c.is_empty() => ColumnChoice::Resolved(c.clone()),
            _ => ColumnChoice::Unresolved,
        }
    }
}

/// Columns offered as edge attributes once source and target are chosen.
pub fn remaining_columns(columns: &[String], source: &str, target: &str) -> Vec<String> {
    columns
        .iter()
        .filter(|c| c.as_str() != source && c.as_str() != target)
        .cloned()
        .collect()
}
