//! Declarative collection schemas.
//!
//! # Responsibility
//! - Describe a collection's validator as plain data (`CollectionSchema`).
//! - Render the validator to canonical `$jsonSchema` JSON and to SQLite DDL.
//! - Check the declaration itself before it is registered.
//!
//! # Invariants
//! - Collection and field names are plain SQL identifiers.
//! - Every required field is a declared property.
//! - Canonical JSON is key-sorted, so equal schemas render identically.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod validator;

pub use validator::{validate_candidate, FieldValue, ValidatedDocument};

/// Name of the collection holding service records.
pub const SERVICES_COLLECTION: &str = "services";

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Storage type of a declared field, named after the BSON type it mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BsonType {
    /// UTF-8 text.
    String,
    /// 32-bit signed integer.
    Int,
    /// Exact decimal.
    Decimal,
}

impl BsonType {
    pub fn type_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Decimal => "decimal",
        }
    }

    fn sql_affinity(self) -> &'static str {
        match self {
            Self::String | Self::Decimal => "TEXT",
            Self::Int => "INTEGER",
        }
    }

    fn sql_typeof(self) -> &'static str {
        match self {
            Self::String | Self::Decimal => "text",
            Self::Int => "integer",
        }
    }
}

/// What the store does with a write that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationAction {
    /// Reject the write.
    Error,
}

impl ValidationAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
        }
    }
}

/// One declared property of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub bson_type: BsonType,
    /// Maximum length in characters; strings only.
    pub max_length: Option<u32>,
    /// Inclusive lower bound; ints only.
    pub minimum: Option<i64>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, bson_type: BsonType) -> Self {
        Self {
            name: name.into(),
            bson_type,
            max_length: None,
            minimum: None,
        }
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }
}

/// Declarative validator for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub collection: String,
    /// Required field names, in the order presence is checked.
    pub required: Vec<String>,
    /// Declared properties, in the order values are checked.
    pub fields: Vec<FieldSpec>,
    pub validation_action: ValidationAction,
}

/// The `services` validator: required `name`, `subscribers`, `revenue`.
pub fn services_schema() -> CollectionSchema {
    CollectionSchema {
        collection: SERVICES_COLLECTION.to_string(),
        required: vec![
            "name".to_string(),
            "subscribers".to_string(),
            "revenue".to_string(),
        ],
        fields: vec![
            FieldSpec::new("name", BsonType::String).max_length(50),
            FieldSpec::new("subscribers", BsonType::Int).minimum(0),
            FieldSpec::new("revenue", BsonType::Decimal),
        ],
        validation_action: ValidationAction::Error,
    }
}

/// Problem found in a schema declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaDefinitionError {
    InvalidIdentifier(String),
    DuplicateField(String),
    UndeclaredRequiredField(String),
    ConstraintNotApplicable {
        field: String,
        constraint: &'static str,
        bson_type: BsonType,
    },
}

impl Display for SchemaDefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "`{name}` is not a valid identifier"),
            Self::DuplicateField(name) => write!(f, "field `{name}` is declared twice"),
            Self::UndeclaredRequiredField(name) => {
                write!(f, "required field `{name}` has no property declaration")
            }
            Self::ConstraintNotApplicable {
                field,
                constraint,
                bson_type,
            } => write!(
                f,
                "constraint `{constraint}` on field `{field}` does not apply to type `{}`",
                bson_type.type_name()
            ),
        }
    }
}

impl Error for SchemaDefinitionError {}

impl CollectionSchema {
    /// Returns the declared property named `name`.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Checks the declaration is well-formed.
    pub fn check(&self) -> Result<(), SchemaDefinitionError> {
        ensure_identifier(&self.collection)?;

        for (index, field) in self.fields.iter().enumerate() {
            ensure_identifier(&field.name)?;
            if self.fields[..index].iter().any(|prev| prev.name == field.name) {
                return Err(SchemaDefinitionError::DuplicateField(field.name.clone()));
            }
            if field.max_length.is_some() && field.bson_type != BsonType::String {
                return Err(SchemaDefinitionError::ConstraintNotApplicable {
                    field: field.name.clone(),
                    constraint: "maxLength",
                    bson_type: field.bson_type,
                });
            }
            if field.minimum.is_some() && field.bson_type != BsonType::Int {
                return Err(SchemaDefinitionError::ConstraintNotApplicable {
                    field: field.name.clone(),
                    constraint: "minimum",
                    bson_type: field.bson_type,
                });
            }
        }

        for required in &self.required {
            if self.field(required).is_none() {
                return Err(SchemaDefinitionError::UndeclaredRequiredField(
                    required.clone(),
                ));
            }
        }

        Ok(())
    }

    /// Renders the validator in `$jsonSchema` form.
    pub fn to_validator(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut property = Map::new();
            property.insert("bsonType".to_string(), json!(field.bson_type.type_name()));
            if let Some(max_length) = field.max_length {
                property.insert("maxLength".to_string(), json!(max_length));
            }
            if let Some(minimum) = field.minimum {
                property.insert("minimum".to_string(), json!(minimum));
            }
            properties.insert(field.name.clone(), Value::Object(property));
        }

        json!({
            "validator": {
                "$jsonSchema": {
                    "bsonType": "object",
                    "required": self.required,
                    "properties": properties,
                }
            },
            "validationAction": self.validation_action.as_str(),
        })
    }

    /// Canonical text form used for registry storage and comparison.
    pub fn canonical_validator(&self) -> String {
        self.to_validator().to_string()
    }

    /// `CREATE TABLE` statement enforcing the validator with CHECK constraints.
    ///
    /// Call `check()` first: names are interpolated into the statement.
    pub fn create_table_sql(&self) -> String {
        let mut columns = vec!["    id TEXT PRIMARY KEY NOT NULL".to_string()];
        for field in &self.fields {
            let name = &field.name;
            let mut checks = vec![format!("typeof({name}) = '{}'", field.bson_type.sql_typeof())];
            if let Some(max_length) = field.max_length {
                checks.push(format!("length({name}) <= {max_length}"));
            }
            if field.bson_type == BsonType::Int {
                checks.push(format!("{name} BETWEEN {} AND {}", i32::MIN, i32::MAX));
            }
            if let Some(minimum) = field.minimum {
                checks.push(format!("{name} >= {minimum}"));
            }

            let null_clause = if self.required.contains(name) {
                " NOT NULL"
            } else {
                ""
            };
            let check_clause = if null_clause.is_empty() {
                format!("{name} IS NULL OR ({})", checks.join(" AND "))
            } else {
                checks.join(" AND ")
            };
            columns.push(format!(
                "    {name} {}{null_clause} CHECK ({check_clause})",
                field.bson_type.sql_affinity()
            ));
        }

        format!(
            "CREATE TABLE {} (\n{}\n);",
            self.collection,
            columns.join(",\n")
        )
    }
}

fn ensure_identifier(name: &str) -> Result<(), SchemaDefinitionError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(SchemaDefinitionError::InvalidIdentifier(name.to_string()))
    }
}
