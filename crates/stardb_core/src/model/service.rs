//! Service record domain model.
//!
//! # Responsibility
//! - Define `ServiceRecord`, the only entity stored in the `services` collection.
//! - Provide an exact-decimal `Revenue` type for currency amounts.
//! - Report invariant violations as structured `ValidationError`s.
//!
//! # Invariants
//! - `name` holds at most `NAME_MAX_CHARS` Unicode scalar values.
//! - `subscribers` is a non-negative 32-bit integer.
//! - `revenue` keeps its decimal scale: `"112000.00"` stays `"112000.00"`.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque identifier returned for every stored record.
pub type RecordId = Uuid;

/// Maximum `name` length, counted in characters.
pub const NAME_MAX_CHARS: usize = 50;

static DECIMAL_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").expect("valid decimal regex"));

/// Structured rejection produced when a candidate or record breaks the
/// collection contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Candidate was not a document (JSON object) at all.
    InvalidDocument { found: &'static str },
    /// A required field is absent.
    MissingField(String),
    /// A field is present but violates its type or bound.
    InvalidField {
        field: String,
        reason: String,
        value: Value,
    },
}

impl ValidationError {
    pub(crate) fn invalid_field(
        field: impl Into<String>,
        reason: impl Into<String>,
        value: Value,
    ) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
            value,
        }
    }

    /// Returns the offending field name, when the error concerns one field.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::InvalidDocument { .. } => None,
            Self::MissingField(field) => Some(field),
            Self::InvalidField { field, .. } => Some(field),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDocument { found } => {
                write!(f, "candidate must be a document, found {found}")
            }
            Self::MissingField(field) => write!(f, "missing required field `{field}`"),
            Self::InvalidField {
                field,
                reason,
                value,
            } => write!(f, "invalid field `{field}`: {reason} (got {value})"),
        }
    }
}

impl Error for ValidationError {}

/// Exact decimal currency amount.
///
/// Serialized as a decimal string so JSON consumers never see a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revenue(Decimal);

impl Revenue {
    /// Parses a canonical decimal literal such as `"48000.00"` or `"-3"`.
    ///
    /// Only literals that read back unchanged are accepted: a leading `+`,
    /// leading zeros and negative zero are rejected, as are exponents, `NaN`,
    /// infinities, digit separators and surrounding whitespace.
    ///
    /// Precision is capped at 28 fractional digits and a 96-bit mantissa
    /// (about 28 significant digits). Decimal128 allows 34, so some values
    /// a Decimal128 store would take are rejected here.
    pub fn parse(text: &str) -> Result<Self, String> {
        if !DECIMAL_LITERAL_RE.is_match(text) {
            return Err(format!(
                "`{text}` is not a canonical decimal literal (expected `-?digits[.digits]` without leading zeros)"
            ));
        }
        let value = Decimal::from_str_exact(text)
            .map_err(|err| format!("`{text}` cannot be represented exactly: {err}"))?;
        if value.is_zero() && text.starts_with('-') {
            return Err(format!("`{text}` is negative zero"));
        }
        Ok(Self(value))
    }

    /// Wraps an integer amount with scale zero.
    pub fn from_integer(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    /// Returns the underlying decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Number of fractional digits carried by this amount.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }
}

impl Display for Revenue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl From<Decimal> for Revenue {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

/// Canonical record stored in the `services` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawServiceRecord")]
pub struct ServiceRecord {
    pub name: String,
    pub subscribers: i32,
    pub revenue: Revenue,
}

impl ServiceRecord {
    /// Builds a record and checks its invariants.
    pub fn new(
        name: impl Into<String>,
        subscribers: i32,
        revenue: Revenue,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            name: name.into(),
            subscribers,
            revenue,
        };
        record.validate()?;
        Ok(record)
    }

    /// Validates record invariants.
    ///
    /// Checked in field order so the first violation is deterministic.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_chars = self.name.chars().count();
        if name_chars > NAME_MAX_CHARS {
            return Err(ValidationError::invalid_field(
                "name",
                format!("length {name_chars} exceeds maximum of {NAME_MAX_CHARS} characters"),
                Value::String(self.name.clone()),
            ));
        }
        if self.subscribers < 0 {
            return Err(ValidationError::invalid_field(
                "subscribers",
                "must be >= 0",
                Value::from(self.subscribers),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawServiceRecord {
    name: String,
    subscribers: i32,
    revenue: Revenue,
}

impl TryFrom<RawServiceRecord> for ServiceRecord {
    type Error = ValidationError;

    fn try_from(raw: RawServiceRecord) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.subscribers, raw.revenue)
    }
}

/// A stored record together with the id assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredService {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: ServiceRecord,
}

#[cfg(test)]
mod tests {
    use super::{Revenue, ServiceRecord, ValidationError, NAME_MAX_CHARS};

    #[test]
    fn revenue_parse_keeps_scale() {
        let revenue = Revenue::parse("112000.00").unwrap();
        assert_eq!(revenue.to_string(), "112000.00");
        assert_eq!(revenue.scale(), 2);
    }

    #[test]
    fn revenue_parse_rejects_non_literals() {
        for text in [
            "", " 1.00", "1e3", "NaN", "1_000", "1.", ".5", "12,5", "+1.00", "007.50", "-0",
            "-0.00",
        ] {
            assert!(Revenue::parse(text).is_err(), "`{text}` should be rejected");
        }
    }

    #[test]
    fn revenue_parse_accepts_canonical_edge_literals() {
        for text in ["0", "0.00", "-0.50", "10.0", "-7"] {
            assert_eq!(Revenue::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn revenue_parse_rejects_more_digits_than_supported() {
        let err = Revenue::parse("123456789012345678901234567890").unwrap_err();
        assert!(err.contains("cannot be represented exactly"), "unexpected error: {err}");
    }

    #[test]
    fn name_limit_counts_characters_not_bytes() {
        let name = "é".repeat(NAME_MAX_CHARS);
        assert!(name.len() > NAME_MAX_CHARS);
        ServiceRecord::new(name, 1, Revenue::from_integer(1)).unwrap();
    }

    #[test]
    fn new_rejects_negative_subscribers() {
        let err = ServiceRecord::new("A", -1, Revenue::from_integer(1)).unwrap_err();
        assert_eq!(err.field(), Some("subscribers"));
        assert!(matches!(err, ValidationError::InvalidField { .. }));
    }
}
