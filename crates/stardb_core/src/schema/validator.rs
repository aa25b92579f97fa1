//! Candidate validation against a `CollectionSchema`.
//!
//! Validation never mutates or coerces the candidate. Checks run in a fixed
//! order so the reported violation is deterministic:
//! 1. presence of every required field, in `required` order;
//! 2. type and bounds of every declared field, in `fields` order.
//!
//! Undeclared extra fields are ignored, as the `$jsonSchema` validator does
//! without `additionalProperties: false`.

use super::{BsonType, CollectionSchema, FieldSpec};
use crate::model::service::{Revenue, ValidationError};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;

/// A field value that passed its type and bound checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Int(i32),
    Decimal(Revenue),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => BsonType::String.type_name(),
            Self::Int(_) => BsonType::Int.type_name(),
            Self::Decimal(_) => BsonType::Decimal.type_name(),
        }
    }

    /// JSON rendering used when reporting this value in an error.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Int(number) => Value::from(*number),
            Self::Decimal(revenue) => Value::String(revenue.to_string()),
        }
    }
}

/// Typed values of every declared field present in a valid candidate.
pub type ValidatedDocument = BTreeMap<String, FieldValue>;

/// Validates `candidate` against `schema`, failing on the first violation.
pub fn validate_candidate(
    schema: &CollectionSchema,
    candidate: &Value,
) -> Result<ValidatedDocument, ValidationError> {
    let document = candidate
        .as_object()
        .ok_or(ValidationError::InvalidDocument {
            found: json_type_name(candidate),
        })?;

    for required in &schema.required {
        if !document.contains_key(required) {
            return Err(ValidationError::MissingField(required.clone()));
        }
    }

    let mut validated = ValidatedDocument::new();
    for field in &schema.fields {
        if let Some(value) = document.get(&field.name) {
            validated.insert(field.name.clone(), check_field(field, value)?);
        }
    }
    Ok(validated)
}

fn check_field(field: &FieldSpec, value: &Value) -> Result<FieldValue, ValidationError> {
    match field.bson_type {
        BsonType::String => check_string(field, value),
        BsonType::Int => check_int(field, value),
        BsonType::Decimal => check_decimal(field, value),
    }
}

fn check_string(field: &FieldSpec, value: &Value) -> Result<FieldValue, ValidationError> {
    let text = value
        .as_str()
        .ok_or_else(|| type_mismatch(field, value))?;

    if let Some(max_length) = field.max_length {
        let length = text.chars().count();
        if length > max_length as usize {
            return Err(ValidationError::invalid_field(
                &field.name,
                format!("length {length} exceeds maxLength {max_length}"),
                value.clone(),
            ));
        }
    }
    Ok(FieldValue::Text(text.to_string()))
}

fn check_int(field: &FieldSpec, value: &Value) -> Result<FieldValue, ValidationError> {
    // Floats are rejected even when integral: `12.0` is a double, not an int.
    let number = match value {
        Value::Number(number) if !number.is_f64() => number
            .as_i64()
            .and_then(|wide| i32::try_from(wide).ok())
            .ok_or_else(|| {
                ValidationError::invalid_field(
                    &field.name,
                    format!("{number} does not fit a 32-bit int"),
                    value.clone(),
                )
            })?,
        _ => return Err(type_mismatch(field, value)),
    };

    if let Some(minimum) = field.minimum {
        if i64::from(number) < minimum {
            return Err(ValidationError::invalid_field(
                &field.name,
                format!("must be >= {minimum}"),
                value.clone(),
            ));
        }
    }
    Ok(FieldValue::Int(number))
}

fn check_decimal(field: &FieldSpec, value: &Value) -> Result<FieldValue, ValidationError> {
    match value {
        Value::String(text) => Revenue::parse(text)
            .map(FieldValue::Decimal)
            .map_err(|reason| ValidationError::invalid_field(&field.name, reason, value.clone())),
        Value::Number(number) => match (number.as_i64(), number.as_u64()) {
            (Some(integer), _) => Ok(FieldValue::Decimal(Revenue::from_integer(integer))),
            (None, Some(unsigned)) => {
                Ok(FieldValue::Decimal(Revenue::from(Decimal::from(unsigned))))
            }
            (None, None) => Err(ValidationError::invalid_field(
                &field.name,
                "expected a decimal string; binary floating-point numbers lose exact digits",
                value.clone(),
            )),
        },
        _ => Err(type_mismatch(field, value)),
    }
}

fn type_mismatch(field: &FieldSpec, value: &Value) -> ValidationError {
    ValidationError::invalid_field(
        &field.name,
        format!(
            "expected {}, found {}",
            field.bson_type.type_name(),
            json_type_name(value)
        ),
        value.clone(),
    )
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(number) if number.is_f64() => "double",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
