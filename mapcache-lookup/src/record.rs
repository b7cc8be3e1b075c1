//! Structured records returned by lookups

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// Type of a record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Boolean,
    Int,
    Float,
    String,
    /// Homogeneous array of the element type
    Array(Box<FieldType>),
    /// Nested record
    Record(RecordSchema),
    /// Value may be any of the listed types
    Choice(Vec<FieldType>),
}

impl FieldType {
    /// Widen two observed types into one that accepts both
    ///
    /// Int and Float widen to Float, identical types stay as they are, and
    /// anything else becomes a Choice.
    pub fn merge(self, other: FieldType) -> FieldType {
        match (self, other) {
            (a, b) if a == b => a,
            (FieldType::Int, FieldType::Float) | (FieldType::Float, FieldType::Int) => {
                FieldType::Float
            }
            (FieldType::Choice(mut options), FieldType::Choice(others)) => {
                for other in others {
                    if !options.contains(&other) {
                        options.push(other);
                    }
                }
                FieldType::Choice(options)
            }
            (FieldType::Choice(mut options), other) | (other, FieldType::Choice(mut options)) => {
                if !options.contains(&other) {
                    options.push(other);
                }
                FieldType::Choice(options)
            }
            (a, b) => FieldType::Choice(vec![a, b]),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::String => write!(f, "string"),
            FieldType::Array(element) => write!(f, "array<{}>", element),
            FieldType::Record(_) => write!(f, "record"),
            FieldType::Choice(options) => {
                let names: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                write!(f, "choice<{}>", names.join("|"))
            }
        }
    }
}

/// A named, typed field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

impl RecordField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Ordered list of fields describing a record
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordSchema {
    fields: Vec<RecordField>,
}

impl RecordSchema {
    pub fn new(fields: Vec<RecordField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Value held by a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<FieldValue>),
    Record(Box<Record>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text form of the value; `None` for null
    ///
    /// Scalars use their natural text form; arrays and records render as JSON.
    pub fn as_string(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Boolean(b) => Some(b.to_string()),
            FieldValue::Int(i) => Some(i.to_string()),
            FieldValue::Float(x) => Some(x.to_string()),
            FieldValue::Array(_) | FieldValue::Record(_) => Some(self.to_json().to_string()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(x) => Some(*x),
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            FieldValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldValue::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Convert back to a JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::Int(i) => JsonValue::from(*i),
            FieldValue::Float(x) => serde_json::Number::from_f64(*x)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::String(s) => JsonValue::String(s.clone()),
            FieldValue::Array(items) => JsonValue::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Record(record) => record.to_json(),
        }
    }
}

static NULL: FieldValue = FieldValue::Null;

/// A structured record: field values plus the schema they conform to
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: RecordSchema,
    values: HashMap<String, FieldValue>,
}

impl Record {
    /// Build a record; fields missing from `values` read as null
    pub fn new(schema: RecordSchema, values: HashMap<String, FieldValue>) -> Self {
        Self { schema, values }
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Value of a schema field; `None` when the schema has no such field
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.schema.field(field)?;
        Some(self.values.get(field).unwrap_or(&NULL))
    }

    pub fn get_as_string(&self, field: &str) -> Option<String> {
        self.get(field).and_then(FieldValue::as_string)
    }

    pub fn get_as_i64(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }

    pub fn get_as_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn get_as_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_bool)
    }

    pub fn get_as_record(&self, field: &str) -> Option<&Record> {
        self.get(field).and_then(FieldValue::as_record)
    }

    /// Render as a JSON object in schema field order
    pub fn to_json(&self) -> JsonValue {
        let mut object = serde_json::Map::new();
        for name in self.schema.field_names() {
            let value = self.values.get(name).map(FieldValue::to_json).unwrap_or(JsonValue::Null);
            object.insert(name.to_string(), value);
        }
        JsonValue::Object(object)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
