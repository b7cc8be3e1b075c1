//! JSON record reader with schema inference or a fixed schema

use crate::error::ParseError;
use crate::reader::RecordReader;
use crate::record::{FieldType, FieldValue, Record, RecordField, RecordSchema};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use tracing::debug;

/// Where the reader gets its schema from
#[derive(Debug, Clone, Default)]
pub enum SchemaAccess {
    /// Derive the schema from each payload
    #[default]
    Infer,
    /// Coerce every payload into this schema
    Fixed(RecordSchema),
}

/// Reads one JSON object per payload
///
/// A top-level array yields its first element. Scalars, empty arrays and
/// invalid JSON are parse errors.
#[derive(Debug, Clone, Default)]
pub struct JsonRecordReader {
    schema_access: SchemaAccess,
}

impl JsonRecordReader {
    pub fn new(schema_access: SchemaAccess) -> Self {
        Self { schema_access }
    }

    /// Reader that infers the schema from the payload
    pub fn infer() -> Self {
        Self::new(SchemaAccess::Infer)
    }

    /// Reader that applies a fixed schema
    pub fn with_schema(schema: RecordSchema) -> Self {
        Self::new(SchemaAccess::Fixed(schema))
    }

    pub fn schema_access(&self) -> &SchemaAccess {
        &self.schema_access
    }
}

impl RecordReader for JsonRecordReader {
    fn parse(&self, bytes: &[u8], schema_hint: Option<&RecordSchema>) -> Result<Record, ParseError> {
        let value: JsonValue = serde_json::from_slice(bytes)?;
        let object = first_object(value)?;

        let schema = match (schema_hint, &self.schema_access) {
            (Some(hint), _) => Some(hint),
            (None, SchemaAccess::Fixed(schema)) => Some(schema),
            (None, SchemaAccess::Infer) => None,
        };

        match schema {
            Some(schema) => record_with_schema(schema, object),
            None => {
                let record = infer_record(object);
                debug!("Inferred schema with {} fields", record.schema().len());
                Ok(record)
            }
        }
    }
}

fn first_object(value: JsonValue) -> Result<Map<String, JsonValue>, ParseError> {
    match value {
        JsonValue::Object(object) => Ok(object),
        JsonValue::Array(items) => match items.into_iter().next() {
            Some(JsonValue::Object(object)) => Ok(object),
            Some(other) => Err(ParseError::NotARecord(json_kind(&other).to_string())),
            None => Err(ParseError::NoRecord),
        },
        other => Err(ParseError::NotARecord(json_kind(&other).to_string())),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Infer a schema from a JSON object; every inferred field is nullable
pub fn infer_schema(object: &Map<String, JsonValue>) -> RecordSchema {
    let fields = object
        .iter()
        .map(|(name, value)| {
            RecordField::new(name.clone(), infer_type(value).unwrap_or(FieldType::String))
        })
        .collect();
    RecordSchema::new(fields)
}

// None for null, which carries no type information
fn infer_type(value: &JsonValue) -> Option<FieldType> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(_) => Some(FieldType::Boolean),
        JsonValue::Number(n) if n.is_i64() => Some(FieldType::Int),
        JsonValue::Number(_) => Some(FieldType::Float),
        JsonValue::String(_) => Some(FieldType::String),
        JsonValue::Array(items) => {
            let element = items
                .iter()
                .filter_map(infer_type)
                .reduce(FieldType::merge)
                .unwrap_or(FieldType::String);
            Some(FieldType::Array(Box::new(element)))
        }
        JsonValue::Object(object) => Some(FieldType::Record(infer_schema(object))),
    }
}

fn infer_record(object: Map<String, JsonValue>) -> Record {
    let schema = infer_schema(&object);
    let values = object
        .into_iter()
        .map(|(name, value)| (name, infer_value(value)))
        .collect();
    Record::new(schema, values)
}

fn infer_value(value: JsonValue) -> FieldValue {
    match value {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(b) => FieldValue::Boolean(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Int(i),
            None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => FieldValue::String(s),
        JsonValue::Array(items) => FieldValue::Array(items.into_iter().map(infer_value).collect()),
        JsonValue::Object(object) => FieldValue::Record(Box::new(infer_record(object))),
    }
}

fn record_with_schema(
    schema: &RecordSchema,
    mut object: Map<String, JsonValue>,
) -> Result<Record, ParseError> {
    let mut values = HashMap::with_capacity(schema.len());

    for field in schema.fields() {
        let value = match object.remove(&field.name) {
            None | Some(JsonValue::Null) if field.nullable => FieldValue::Null,
            None | Some(JsonValue::Null) => {
                return Err(ParseError::SchemaMismatch {
                    field: field.name.clone(),
                    reason: "required field is missing".to_string(),
                })
            }
            Some(value) => coerce(&field.name, &field.field_type, value)?,
        };
        values.insert(field.name.clone(), value);
    }

    Ok(Record::new(schema.clone(), values))
}

fn coerce(field: &str, field_type: &FieldType, value: JsonValue) -> Result<FieldValue, ParseError> {
    let mismatch = |value: &JsonValue| ParseError::SchemaMismatch {
        field: field.to_string(),
        reason: format!("expected {}, found {}", field_type, json_kind(value)),
    };

    match (field_type, value) {
        (_, JsonValue::Null) => Ok(FieldValue::Null),

        (FieldType::Boolean, JsonValue::Bool(b)) => Ok(FieldValue::Boolean(b)),
        (FieldType::Boolean, JsonValue::String(s)) => {
            s.trim().parse().map(FieldValue::Boolean).map_err(|_| mismatch(&JsonValue::String(s)))
        }

        (FieldType::Int, JsonValue::Number(n)) => n
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| mismatch(&JsonValue::Number(n))),
        (FieldType::Int, JsonValue::String(s)) => {
            s.trim().parse().map(FieldValue::Int).map_err(|_| mismatch(&JsonValue::String(s)))
        }

        (FieldType::Float, JsonValue::Number(n)) => n
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| mismatch(&JsonValue::Number(n))),
        (FieldType::Float, JsonValue::String(s)) => {
            s.trim().parse().map(FieldValue::Float).map_err(|_| mismatch(&JsonValue::String(s)))
        }

        (FieldType::String, JsonValue::String(s)) => Ok(FieldValue::String(s)),
        (FieldType::String, JsonValue::Bool(b)) => Ok(FieldValue::String(b.to_string())),
        (FieldType::String, JsonValue::Number(n)) => Ok(FieldValue::String(n.to_string())),

        (FieldType::Array(element), JsonValue::Array(items)) => items
            .into_iter()
            .map(|item| coerce(field, element, item))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::Array),

        (FieldType::Record(schema), JsonValue::Object(object)) => {
            record_with_schema(schema, object).map(|record| FieldValue::Record(Box::new(record)))
        }

        (FieldType::Choice(options), value) => options
            .iter()
            .find_map(|option| coerce(field, option, value.clone()).ok())
            .ok_or_else(|| mismatch(&value)),

        (_, value) => Err(mismatch(&value)),
    }
}
