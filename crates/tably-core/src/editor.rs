//! Column editors for the presentation boundary
//!
//! A `ColumnEditor` is resolved once from a column's declared type and turns
//! the text a user typed into a typed `Value`. The engine core never looks at
//! declared types; only the layer that accepts keyboard input does.

use crate::Value;
use chrono::{NaiveDate, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnEditor {
    Integer,
    Float,
    Date,
    Boolean,
    Text,
}

impl ColumnEditor {
    /// Pick the editor for a store-specific declared type such as
    /// `"varchar(40)"`, `"int8"` or `"timestamp with time zone"`.
    pub fn from_declared_type(declared_type: &str) -> Self {
        let lowered = declared_type.trim().to_lowercase();
        // MySQL spells booleans as tinyint(1); check before the size is stripped
        if lowered == "tinyint(1)" {
            return ColumnEditor::Boolean;
        }
        let base = lowered
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(" unsigned");

        if is_boolean_type(base) {
            ColumnEditor::Boolean
        } else if is_integer_type(base) {
            ColumnEditor::Integer
        } else if is_float_type(base) {
            ColumnEditor::Float
        } else if is_date_type(base) {
            ColumnEditor::Date
        } else {
            ColumnEditor::Text
        }
    }

    /// Parse user input into a value for this column.
    ///
    /// `"null"` (any case) becomes NULL and the empty string stays an empty
    /// string. Input that does not fit the column type is kept as text and
    /// left for the store to accept or reject.
    pub fn parse_input(&self, input: &str) -> Value {
        if input.is_empty() {
            return Value::String(String::new());
        }
        if input.eq_ignore_ascii_case("null") {
            return Value::Null;
        }

        let trimmed = input.trim();
        match self {
            ColumnEditor::Text => Value::String(input.to_string()),
            ColumnEditor::Integer => trimmed
                .parse::<i64>()
                .map(Value::Int64)
                .unwrap_or_else(|_| Value::String(input.to_string())),
            ColumnEditor::Float => trimmed
                .parse::<f64>()
                .map(Value::Float64)
                .unwrap_or_else(|_| Value::String(input.to_string())),
            ColumnEditor::Boolean => match trimmed.to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Value::Bool(true),
                "false" | "f" | "0" | "no" => Value::Bool(false),
                _ => Value::String(input.to_string()),
            },
            ColumnEditor::Date => {
                if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
                    Value::Date(date)
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
                    Value::DateTime(dt)
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
                    Value::DateTime(dt)
                } else {
                    Value::String(input.to_string())
                }
            }
        }
    }
}

fn is_boolean_type(col_type: &str) -> bool {
    matches!(col_type, "bool" | "boolean" | "bit")
}

fn is_integer_type(col_type: &str) -> bool {
    matches!(
        col_type,
        "int2"
            | "int4"
            | "int8"
            | "smallint"
            | "integer"
            | "bigint"
            | "int"
            | "mediumint"
            | "tinyint"
            | "serial"
            | "bigserial"
            | "smallserial"
    )
}

fn is_float_type(col_type: &str) -> bool {
    matches!(
        col_type,
        "float4"
            | "float8"
            | "real"
            | "double precision"
            | "double"
            | "float"
            | "numeric"
            | "decimal"
            | "money"
    )
}

fn is_date_type(col_type: &str) -> bool {
    col_type == "date"
        || col_type == "datetime"
        || col_type == "datetime2"
        || col_type.starts_with("timestamp")
}
