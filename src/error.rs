use serde::Serialize;
use thiserror::Error;

use crate::resolve::Role;
use crate::table::TableKind;

/// Pipeline stage that detected an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Resolve,
    Build,
    Serialize,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    /// No edges file was supplied.
    #[error("You need to upload a file with relations.")]
    MissingRelationsFile,

    #[error("the {table} file has no rows (is the separator right?)")]
    EmptyInput { table: TableKind },

    #[error(
        "the {table} file does not look separated by {delimiter:?}: line {line} has {found} fields, expected {expected}"
    )]
    DelimiterMismatch {
        table: TableKind,
        delimiter: char,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("failed to read the {table} file: {source}")]
    Csv {
        table: TableKind,
        #[source]
        source: csv::Error,
    },

    #[error("no {role} column selected")]
    UnresolvedColumn { role: Role },

    #[error("column {column:?} does not exist in the {table} file")]
    UnknownColumn {
        table: TableKind,
        column: String,
        /// Resolve for user choices, build for columns the builder looks up.
        stage: Stage,
    },

    #[error("row {row} has an empty {role} value")]
    EmptyEndpoint { row: usize, role: Role },

    #[error("edge {row} references node {label:?} which is missing from the nodes file")]
    DanglingEdgeReference { row: usize, label: String },

    #[error("cannot serialize attribute {attribute:?}: {reason}")]
    Serialization { attribute: String, reason: String },
}

impl ConvertError {
    /// Stable kind name for callers that display or match on errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::MissingRelationsFile => "MissingRelationsFileError",
            ConvertError::EmptyInput { .. } => "EmptyInputError",
            ConvertError::DelimiterMismatch { .. } => "DelimiterMismatchError",
            ConvertError::Csv { .. } => "CsvError",
            ConvertError::UnresolvedColumn { .. } => "UnresolvedColumnError",
            ConvertError::UnknownColumn { .. } => "UnknownColumnError",
            ConvertError::EmptyEndpoint { .. } => "EmptyEndpointError",
            ConvertError::DanglingEdgeReference { .. } => "DanglingEdgeReferenceError",
            ConvertError::Serialization { .. } => "SerializationError",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            ConvertError::MissingRelationsFile
            | ConvertError::EmptyInput { .. }
            | ConvertError::DelimiterMismatch { .. }
            | ConvertError::Csv { .. } => Stage::Load,
            ConvertError::UnresolvedColumn { .. } => Stage::Resolve,
            ConvertError::UnknownColumn { stage, .. } => *stage,
            ConvertError::EmptyEndpoint { .. } | ConvertError::DanglingEdgeReference { .. } => {
                Stage::Build
            }
            ConvertError::Serialization { .. } => Stage::Serialize,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            stage: self.stage(),
            message: self.to_string(),
        }
    }
}

/// Error as handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub stage: Stage,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_json() {
        let err = ConvertError::UnresolvedColumn { role: Role::Source };
        let json = serde_json::to_value(err.report()).unwrap();
        assert_eq!(json["kind"], "UnresolvedColumnError");
        assert_eq!(json["stage"], "resolve");
        assert_eq!(json["message"], "no source column selected");
    }

    #[test]
    fn test_stages() {
        assert_eq!(ConvertError::MissingRelationsFile.stage(), Stage::Load);
        let err = ConvertError::Serialization {
            attribute: "weight".to_string(),
            reason: "bad".to_string(),
        };
        assert_eq!(err.stage(), Stage::Serialize);
        assert!(err.to_string().contains("\"weight\""));
    }
}
