//! Typed row representation shared by the merge and prune engines.
//!
//! Snapshots cross the platform boundary as JSON, but internally every row
//! is a [`Record`]: an ordered map of column names to [`SqlValue`] scalars.
//! Keeping the column order of the source payload (instead of a hash map)
//! makes every derived artifact - SQL column lists, serialized output,
//! statistics - deterministic, which the cross-platform conformance tests
//! rely on.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single column value, mirroring the SQLite storage classes.
///
/// JSON mapping: strings are `Text`, integral numbers are `Integer`,
/// fractional numbers are `Real`, `null` is `Null`, and blobs travel as a
/// self-describing `{"$blob": "<base64>"}` object. JSON booleans are
/// accepted on input and canonicalized to `Integer(1)` / `Integer(0)`
/// (SQLite column affinity); they are never produced on output.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Text string (UTF-8).
    Text(String),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Floating point number.
    Real(f64),
    /// Raw bytes.
    Blob(Vec<u8>),
    /// SQL NULL.
    Null,
}

impl SqlValue {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Get this value as a string slice, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float, if it is one.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            SqlValue::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Get this value as a byte slice, if it is a blob.
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            SqlValue::Blob(b) => Some(b),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        SqlValue::Real(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Integer(i64::from(b))
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(b: Vec<u8>) -> Self {
        SqlValue::Blob(b)
    }
}

impl Serialize for SqlValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Integer(n) => serializer.serialize_i64(*n),
            SqlValue::Real(f) => serializer.serialize_f64(*f),
            SqlValue::Blob(b) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("$blob", &BASE64.encode(b))?;
                map.end()
            }
            SqlValue::Null => serializer.serialize_unit(),
        }
    }
}

impl<'de> Deserialize<'de> for SqlValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SqlValueVisitor;

        impl<'de> Visitor<'de> for SqlValueVisitor {
            type Value = SqlValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number, boolean, null, or {\"$blob\": \"...\"} object")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<SqlValue, E> {
                Ok(SqlValue::Integer(i64::from(v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SqlValue, E> {
                Ok(SqlValue::Integer(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SqlValue, E> {
                i64::try_from(v)
                    .map(SqlValue::Integer)
                    .map_err(|_| de::Error::custom(format!("integer {} out of range", v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<SqlValue, E> {
                Ok(SqlValue::Real(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SqlValue, E> {
                Ok(SqlValue::Text(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<SqlValue, E> {
                Ok(SqlValue::Text(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<SqlValue, E> {
                Ok(SqlValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<SqlValue, E> {
                Ok(SqlValue::Null)
            }

            fn visit_map<A>(self, mut access: A) -> Result<SqlValue, A::Error>
            where
                A: MapAccess<'de>,
            {
                // The only object allowed in a value position is the blob
                // carrier {"$blob": "<base64>"}.
                let key: Option<String> = access.next_key()?;
                match key.as_deref() {
                    Some("$blob") => {
                        let encoded: String = access.next_value()?;
                        let bytes = BASE64.decode(encoded.as_bytes()).map_err(|e| {
                            de::Error::custom(format!("invalid base64 in $blob: {}", e))
                        })?;
                        if access.next_key::<String>()?.is_some() {
                            return Err(de::Error::custom("$blob object must have a single key"));
                        }
                        Ok(SqlValue::Blob(bytes))
                    }
                    Some(other) => Err(de::Error::custom(format!(
                        "unexpected object key '{}' in value position",
                        other
                    ))),
                    None => Err(de::Error::custom("empty object in value position")),
                }
            }
        }

        deserializer.deserialize_any(SqlValueVisitor)
    }
}

/// One table row: column names mapped to values, in source order.
///
/// Inserting an existing column replaces its value in place, so a record
/// never holds the same column twice. Deserialization rejects payloads
/// with duplicate column names for the same reason.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, SqlValue)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any existing value for that column.
    pub fn insert(&mut self, name: impl Into<String>, value: SqlValue) {
        let name = name.into();
        if let Some(entry) = self.columns.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.columns.push((name, value));
        }
    }

    /// Look up a column value by name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over (column, value) pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Column names in source order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// The row's `Id` column, if present and text.
    pub fn id(&self) -> Option<&str> {
        self.get("Id").and_then(SqlValue::as_text)
    }

    /// The row's `UpdatedAt` column parsed to a UTC timestamp, if present
    /// and parseable.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.get("UpdatedAt")
            .and_then(SqlValue::as_text)
            .and_then(parse_timestamp)
    }

    /// Whether the row carries the hard tombstone flag (`IsDeleted` set to
    /// a non-zero integer). Missing or NULL counts as not tombstoned.
    pub fn is_tombstoned(&self) -> bool {
        self.get("IsDeleted")
            .and_then(SqlValue::as_integer)
            .map(|n| n != 0)
            .unwrap_or(false)
    }

    /// Deterministic byte encoding of the full row content.
    ///
    /// Columns are sorted by name before encoding, so two records with the
    /// same columns and values compare equal regardless of column order.
    /// Used for content equality and as the total tie-break order during
    /// merge; this is an internal ordering key, not a wire format.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut columns: Vec<&(String, SqlValue)> = self.columns.iter().collect();
        columns.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Vec::new();
        for (name, value) in columns {
            out.extend_from_slice(&(name.len() as u32).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            encode_canonical_value(&mut out, value);
        }
        out
    }

    /// Canonical encoding over an explicit column set, reading columns the
    /// record does not carry as NULL. Two rows compared over the union of
    /// their column names keep a total order even when one side carries
    /// columns the other never had (schema drift between client versions);
    /// composite-identity tables pass the union without `Id`, since the
    /// surviving local row keeps its own id.
    pub fn canonical_bytes_over(&self, column_names: &[&str]) -> Vec<u8> {
        let mut names = column_names.to_vec();
        names.sort_unstable();
        names.dedup();

        let mut out = Vec::new();
        for name in names {
            out.extend_from_slice(&(name.len() as u32).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            encode_canonical_value(&mut out, self.get(name).unwrap_or(&SqlValue::Null));
        }
        out
    }
}

fn encode_canonical_value(out: &mut Vec<u8>, value: &SqlValue) {
    match value {
        SqlValue::Null => out.push(0),
        SqlValue::Integer(n) => {
            out.push(1);
            out.extend_from_slice(&n.to_be_bytes());
        }
        SqlValue::Real(f) => {
            out.push(2);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        SqlValue::Text(s) => {
            out.push(3);
            out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        SqlValue::Blob(b) => {
            out.push(4);
            out.extend_from_slice(&(b.len() as u32).to_be_bytes());
            out.extend_from_slice(b);
        }
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column names to scalar values")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Record, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut record = Record {
                    columns: Vec::with_capacity(access.size_hint().unwrap_or(0)),
                };
                while let Some((name, value)) = access.next_entry::<String, SqlValue>()? {
                    if record.get(&name).is_some() {
                        return Err(de::Error::custom(format!("duplicate column '{}'", name)));
                    }
                    record.columns.push((name, value));
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// Parse a timestamp string in the formats the platforms produce.
/// Handles both RFC3339 format (2025-12-11T06:50:10.674Z) and
/// SQLite format (2025-12-11 06:50:10.674).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Format a timestamp the way every platform stores it:
/// `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
