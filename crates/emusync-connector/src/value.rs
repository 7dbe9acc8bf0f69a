//! Typed attribute values and per-type coercion.
//!
//! External attributes arrive loosely typed; wire objects want native field
//! values. The codec here is an exhaustive dispatch over a closed set of
//! tagged variants: each declared [`AttributeType`] has one conversion per
//! direction, so a mapper never sees an unchecked cast.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::error::{ConnectorError, ConnectorResult};
use crate::secret::SecretString;

/// Declared type of a schema attribute.
///
/// The string-like tags (`String`, `StringCaseIgnore`, `StringUri`,
/// `StringDn`, `Uuid`) differ only in schema metadata; at runtime they all
/// coerce through the same string extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    String,
    StringCaseIgnore,
    StringUri,
    StringDn,
    Uuid,
    Integer,
    Boolean,
    Decimal,
    /// Zoned timestamp carried natively on the wire object (date precision).
    Date,
    /// Zoned timestamp carried natively on the wire object.
    DateTime,
    /// Zoned timestamp serialized as a calendar-date string on the wire.
    DateString,
    /// Zoned timestamp serialized as an offset date-time string on the wire.
    DateTimeString,
    /// Opaque guarded value; never logged or serialized implicitly.
    Secret,
}

impl AttributeType {
    /// Whether this tag coerces through the generic string extraction.
    pub fn is_string_like(&self) -> bool {
        matches!(
            self,
            AttributeType::String
                | AttributeType::StringCaseIgnore
                | AttributeType::StringUri
                | AttributeType::StringDn
                | AttributeType::Uuid
        )
    }

    /// Whether name matching for this attribute ignores case.
    pub fn is_case_insensitive(&self) -> bool {
        matches!(self, AttributeType::StringCaseIgnore)
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::StringCaseIgnore => "string-case-ignore",
            AttributeType::StringUri => "uri",
            AttributeType::StringDn => "dn",
            AttributeType::Uuid => "uuid",
            AttributeType::Integer => "integer",
            AttributeType::Boolean => "boolean",
            AttributeType::Decimal => "decimal",
            AttributeType::Date => "date",
            AttributeType::DateTime => "datetime",
            AttributeType::DateString => "date-string",
            AttributeType::DateTimeString => "datetime-string",
            AttributeType::Secret => "secret",
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A loosely-typed attribute value.
///
/// This is the closed variant set the mapping engine dispatches over. Wire
/// models keep their own serde types; `AttributeValue` stays in memory, so
/// secrets wrapped here cannot leak through a derived serializer.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// No value. On the read path this always means "no attribute
    /// produced", never a zero value.
    Null,
    String(String),
    Integer(i64),
    Boolean(bool),
    Decimal(f64),
    DateTime(DateTime<FixedOffset>),
    Secret(SecretString),
    /// Multiple values.
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Get as a string if this is a string value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as an integer if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a boolean if this is a boolean value.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a zoned timestamp if this is a datetime value.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            AttributeValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Get as an array if this is multi-valued.
    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Describe the variant for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Null => "null",
            AttributeValue::String(_) => "string",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::Decimal(_) => "decimal",
            AttributeValue::DateTime(_) => "datetime",
            AttributeValue::Secret(_) => "secret",
            AttributeValue::Array(_) => "array",
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Decimal(value)
    }
}

impl From<DateTime<FixedOffset>> for AttributeValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        AttributeValue::DateTime(value)
    }
}

impl From<SecretString> for AttributeValue {
    fn from(value: SecretString) -> Self {
        AttributeValue::Secret(value)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        AttributeValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Formatters for the date-as-string attribute types.
///
/// `None` means the ISO defaults: calendar date (`%Y-%m-%d`) for
/// [`AttributeType::DateString`], RFC 3339 offset date-time for
/// [`AttributeType::DateTimeString`]. The same formatter is used in both
/// directions, so `parse(format(x)) == x` for representable values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFormats {
    pub date: Option<String>,
    pub datetime: Option<String>,
}

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

impl DateFormats {
    /// Override the calendar-date pattern (chrono strftime syntax).
    pub fn with_date(mut self, pattern: impl Into<String>) -> Self {
        self.date = Some(pattern.into());
        self
    }

    /// Override the date-time pattern (chrono strftime syntax).
    pub fn with_datetime(mut self, pattern: impl Into<String>) -> Self {
        self.datetime = Some(pattern.into());
        self
    }

    fn format_date(&self, value: &DateTime<FixedOffset>) -> String {
        let pattern = self.date.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
        value.format(pattern).to_string()
    }

    fn format_datetime(&self, value: &DateTime<FixedOffset>) -> String {
        match self.datetime.as_deref() {
            Some(pattern) => value.format(pattern).to_string(),
            None => value.to_rfc3339(),
        }
    }

    fn parse_date(&self, raw: &str) -> Result<DateTime<FixedOffset>, String> {
        let pattern = self.date.as_deref().unwrap_or(DEFAULT_DATE_FORMAT);
        let date = NaiveDate::parse_from_str(raw, pattern).map_err(|e| e.to_string())?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("'{raw}' has no representable midnight"))?;
        Ok(midnight.and_utc().fixed_offset())
    }

    fn parse_datetime(&self, raw: &str) -> Result<DateTime<FixedOffset>, String> {
        match self.datetime.as_deref() {
            Some(pattern) => {
                DateTime::parse_from_str(raw, pattern).map_err(|e| e.to_string())
            }
            None => DateTime::parse_from_rfc3339(raw).map_err(|e| e.to_string()),
        }
    }
}

/// Coerce an external value into the native representation a setter expects.
///
/// String-like tags extract a string from any scalar; everything else
/// requires the exact variant and fails with a bad-input error naming the
/// attribute otherwise. The date-as-string tags format the zoned timestamp
/// here, so setters only ever see the wire representation.
pub fn coerce_for_write(
    attribute: &str,
    declared: AttributeType,
    value: &AttributeValue,
    formats: &DateFormats,
) -> ConnectorResult<AttributeValue> {
    if let AttributeValue::Array(values) = value {
        let coerced = values
            .iter()
            .map(|v| coerce_for_write(attribute, declared, v, formats))
            .collect::<ConnectorResult<Vec<_>>>()?;
        return Ok(AttributeValue::Array(coerced));
    }

    let mismatch = || {
        ConnectorError::invalid_attribute_value(
            attribute,
            format!("expected {}, got {}", declared, value.kind()),
        )
    };

    match declared {
        t if t.is_string_like() => scalar_string(value)
            .map(AttributeValue::String)
            .ok_or_else(mismatch),
        AttributeType::Integer => value
            .as_integer()
            .map(AttributeValue::Integer)
            .ok_or_else(mismatch),
        AttributeType::Boolean => value
            .as_boolean()
            .map(AttributeValue::Boolean)
            .ok_or_else(mismatch),
        AttributeType::Decimal => match value {
            AttributeValue::Decimal(d) => Ok(AttributeValue::Decimal(*d)),
            _ => Err(mismatch()),
        },
        AttributeType::Date | AttributeType::DateTime => value
            .as_datetime()
            .map(|dt| AttributeValue::DateTime(*dt))
            .ok_or_else(mismatch),
        AttributeType::DateString => value
            .as_datetime()
            .map(|dt| AttributeValue::String(formats.format_date(dt)))
            .ok_or_else(mismatch),
        AttributeType::DateTimeString => value
            .as_datetime()
            .map(|dt| AttributeValue::String(formats.format_datetime(dt)))
            .ok_or_else(mismatch),
        AttributeType::Secret => match value {
            AttributeValue::Secret(s) => Ok(AttributeValue::Secret(s.clone())),
            _ => Err(mismatch()),
        },
        // String-like tags are handled by the guard arm above.
        _ => Err(mismatch()),
    }
}

/// Coerce a value read from a wire object into its external representation.
///
/// `Null` maps to "no attribute produced". The date-as-string tags parse the
/// wire string back into a zoned timestamp with the same formatter the write
/// direction used.
pub fn coerce_for_read(
    attribute: &str,
    declared: AttributeType,
    value: AttributeValue,
    formats: &DateFormats,
) -> ConnectorResult<Option<AttributeValue>> {
    match value {
        AttributeValue::Null => Ok(None),
        AttributeValue::Array(values) => {
            let mut coerced = Vec::with_capacity(values.len());
            for v in values {
                if let Some(v) = coerce_for_read(attribute, declared, v, formats)? {
                    coerced.push(v);
                }
            }
            Ok(Some(AttributeValue::Array(coerced)))
        }
        AttributeValue::String(raw) if declared == AttributeType::DateString => formats
            .parse_date(&raw)
            .map(|dt| Some(AttributeValue::DateTime(dt)))
            .map_err(|e| ConnectorError::invalid_attribute_value(attribute, e)),
        AttributeValue::String(raw) if declared == AttributeType::DateTimeString => formats
            .parse_datetime(&raw)
            .map(|dt| Some(AttributeValue::DateTime(dt)))
            .map_err(|e| ConnectorError::invalid_attribute_value(attribute, e)),
        other => Ok(Some(other)),
    }
}

fn scalar_string(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::String(s) => Some(s.clone()),
        AttributeValue::Integer(i) => Some(i.to_string()),
        AttributeValue::Boolean(b) => Some(b.to_string()),
        AttributeValue::Decimal(d) => Some(d.to_string()),
        _ => None,
    }
}
