use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::{ConvertError, Result, Stage};

/// `type` is reserved for edges by both output formats.
pub const RESERVED_COLUMN: &str = "type";
pub const RENAMED_RESERVED_COLUMN: &str = "relation_type";

/// Which input a table was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Edges,
    Nodes,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::Edges => write!(f, "relations"),
            TableKind::Nodes => write!(f, "nodes"),
        }
    }
}

/// Field separator of the input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiter(u8);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(b',');
    pub const SEMICOLON: Delimiter = Delimiter(b';');
    pub const TAB: Delimiter = Delimiter(b'\t');

    pub fn byte(self) -> u8 {
        self.0
    }

    pub fn as_char(self) -> char {
        self.0 as char
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::COMMA
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comma" => return Ok(Delimiter::COMMA),
            "semicolon" => return Ok(Delimiter::SEMICOLON),
            "tab" | "\\t" => return Ok(Delimiter::TAB),
            _ => {}
        }
        match s.as_bytes() {
            [b] if b.is_ascii() && *b != b'"' && *b != b'\n' && *b != b'\r' => Ok(Delimiter(*b)),
            _ => Err(format!(
                "invalid separator {s:?}: use comma, semicolon, tab or a single ASCII character"
            )),
        }
    }
}

/// A parsed delimited file with normalized column names.
#[derive(Debug, Clone)]
pub struct Table {
    kind: TableKind,
    columns: Vec<String>,
    rows: Vec<StringRecord>,
}

impl Table {
    /// Parse `raw` into a table. Column names come out lowercased, with `type`
    /// renamed to `relation_type` and duplicates suffixed `.1`, `.2`, ...
    pub fn load(kind: TableKind, raw: &[u8], delimiter: Delimiter) -> Result<Table> {
        let raw = raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter.byte())
            .has_headers(true)
            .flexible(true)
            .from_reader(raw);

        let headers = reader
            .headers()
            .map_err(|source| ConvertError::Csv { table: kind, source })?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(ConvertError::EmptyInput { table: kind });
        }

        if headers.len() == 1 {
            let other = [',', ';', '\t']
                .into_iter()
                .filter(|c| *c != delimiter.as_char())
                .find(|c| headers[0].contains(*c));
            if let Some(other) = other {
                return Err(ConvertError::DelimiterMismatch {
                    table: kind,
                    delimiter: delimiter.as_char(),
                    line: 1,
                    expected: headers[0].split(other).count(),
                    found: 1,
                });
            }
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let mut record = record.map_err(|source| ConvertError::Csv { table: kind, source })?;
            // Short rows are missing trailing cells; only extra fields point at the separator.
            if record.len() > headers.len() {
                return Err(ConvertError::DelimiterMismatch {
                    table: kind,
                    delimiter: delimiter.as_char(),
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            while record.len() < headers.len() {
                record.push_field("");
            }
            rows.push(record);
        }

        if rows.is_empty() {
            return Err(ConvertError::EmptyInput { table: kind });
        }

        let columns = normalize_columns(&headers);
        debug!(table = %kind, columns = ?columns, rows = rows.len(), "loaded table");

        Ok(Table {
            kind,
            columns,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like `column_index`, but a missing column is an error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ConvertError::UnknownColumn {
                table: self.kind,
                column: name.to_string(),
                stage: Stage::Build,
            })
    }

    /// Raw cell value; rows always have one field per column.
    pub fn value(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).unwrap_or_default()
    }
}

/// Fold a header or a user-typed column name to its loaded form.
pub fn normalize_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    if name == RESERVED_COLUMN {
        RENAMED_RESERVED_COLUMN.to_string()
    } else {
        name
    }
}

fn normalize_columns(headers: &StringRecord) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(headers.len());

    for (i, header) in headers.iter().enumerate() {
        let mut name = normalize_name(header);
        if name.is_empty() {
            name = format!("unnamed: {i}");
        }

        let mut unique = name.clone();
        let mut n = 1;
        while seen.contains(&unique) {
            unique = format!("{name}.{n}");
            n += 1;
        }
        seen.insert(unique.clone());
        columns.push(unique);
    }

    columns
}
