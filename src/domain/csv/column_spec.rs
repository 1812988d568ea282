// ============================================================
// COLUMN SPEC
// ============================================================
// Destination column description and identifier sanitization

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Fallback identifier for headers that sanitize to nothing
pub const UNNAMED_COLUMN: &str = "unnamed_column";

/// Scalar type hint for a destination column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
    Float,
    Boolean,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Parse a loose type name as written in configuration files
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "string" | "str" | "varchar" => Some(ColumnType::Text),
            "int" | "integer" | "bigint" | "i64" => Some(ColumnType::Integer),
            "float" | "double" | "real" | "decimal" | "numeric" | "f64" => {
                Some(ColumnType::Float)
            }
            "bool" | "boolean" => Some(ColumnType::Boolean),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Boolean => write!(f, "boolean"),
        }
    }
}

/// One destination column, in CSV order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Original header text, kept for round-tripping
    pub name: String,

    /// Sanitized SQL identifier (always emitted quoted)
    pub ident: String,

    /// Declared or inferred scalar type
    pub column_type: ColumnType,

    /// Whether NULL is acceptable in this column
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        let ident = sanitize_identifier(&name);
        Self {
            name,
            ident,
            column_type,
            nullable: true,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Build an all-text column list from a header row
    pub fn from_headers(headers: &[String]) -> Vec<ColumnSpec> {
        let mut specs: Vec<ColumnSpec> = headers.iter().map(ColumnSpec::text).collect();
        dedupe_identifiers(&mut specs);
        specs
    }

    /// Parse `name:type[!]` declarations, e.g. `a:int, b:text!, c`.
    /// A trailing `!` marks the column NOT NULL; a missing type means text.
    pub fn parse_list(declaration: &str) -> Result<Vec<ColumnSpec>, String> {
        let mut specs = Vec::new();

        for part in declaration.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (decl, nullable) = match part.strip_suffix('!') {
                Some(rest) => (rest, false),
                None => (part, true),
            };

            let (name, column_type) = match decl.rsplit_once(':') {
                Some((name, ty)) => {
                    let column_type = ColumnType::parse(ty)
                        .ok_or_else(|| format!("unknown column type '{}' for '{}'", ty, name))?;
                    (name.trim(), column_type)
                }
                None => (decl, ColumnType::Text),
            };

            if name.is_empty() {
                return Err(format!("column declaration '{}' has no name", part));
            }

            let mut spec = ColumnSpec::new(name, column_type);
            spec.nullable = nullable;
            specs.push(spec);
        }

        if specs.is_empty() {
            return Err("column list is empty".to_string());
        }

        dedupe_identifiers(&mut specs);
        Ok(specs)
    }

    /// Does `key` refer to this column by logical name or identifier?
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.ident == key
    }
}

/// Restrict a name to `[A-Za-z0-9_]`, preserving case.
pub fn sanitize_identifier(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if cleaned.chars().all(|c| c == '_') {
        UNNAMED_COLUMN.to_string()
    } else {
        cleaned
    }
}

/// Derive a table name from a CSV file name (`my file.csv` -> `my_file`)
pub fn table_name_from_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let stem = file_name
        .strip_suffix(".csv")
        .or_else(|| file_name.strip_suffix(".CSV"))
        .unwrap_or(&file_name);

    sanitize_identifier(stem)
}

/// Make identifiers unique (case-insensitively) by suffixing `_2`, `_3`, ...
pub fn dedupe_identifiers(specs: &mut [ColumnSpec]) {
    let mut used: HashSet<String> = HashSet::new();

    for spec in specs.iter_mut() {
        let base = spec.ident.clone();
        let mut candidate = base.clone();
        let mut idx = 2;
        while used.contains(&candidate.to_ascii_lowercase()) {
            candidate = format!("{}_{}", base, idx);
            idx += 1;
        }
        used.insert(candidate.to_ascii_lowercase());
        spec.ident = candidate;
    }
}
