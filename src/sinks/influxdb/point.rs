use std::collections::BTreeMap;

use bytes::BytesMut;
use chrono::{DateTime, SecondsFormat, Utc};
use snafu::Snafu;

use super::{influx_line_protocol, Field, TimePrecision};
use crate::event::{Integer, Value};

#[derive(Debug, Snafu, PartialEq)]
pub enum PointError {
    #[snafu(display("Measurement must not be empty"))]
    EmptyMeasurement,
    #[snafu(display("Point has no fields"))]
    NoFields,
    #[snafu(display("Tag key must not be empty"))]
    EmptyTagKey,
    #[snafu(display("Field key must not be empty"))]
    EmptyFieldKey,
    #[snafu(display("{:?} contains a line break", name))]
    LineBreak { name: String },
    #[snafu(display("Field {:?} is {}, which is unsupported", field, value))]
    NonFiniteFloat { field: String, value: f64 },
    #[snafu(display("Field {:?} is {}, which does not fit a signed 64-bit integer", field, value))]
    IntegerOutOfRange { field: String, value: Integer },
    #[snafu(display("Timestamp {} is out of range for nanosecond precision", timestamp))]
    TimestampOutOfRange { timestamp: DateTime<Utc> },
}

/// One timestamped record as InfluxDB stores it.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, Field>,
    timestamp: DateTime<Utc>,
    nanos: i64,
}

impl Point {
    /// Validates and builds a point.
    ///
    /// Null values are left out; a point must end up with at least one field.
    pub fn new(
        measurement: impl Into<String>,
        tags: BTreeMap<String, String>,
        fields: BTreeMap<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, PointError> {
        let measurement = measurement.into();
        if measurement.is_empty() {
            return Err(PointError::EmptyMeasurement);
        }

        check_line_breaks(&measurement)?;

        for (key, value) in &tags {
            if key.is_empty() {
                return Err(PointError::EmptyTagKey);
            }
            check_line_breaks(key)?;
            check_line_breaks(value)?;
        }

        let mut typed = BTreeMap::new();
        for (key, value) in fields {
            if key.is_empty() {
                return Err(PointError::EmptyFieldKey);
            }
            check_line_breaks(&key)?;
            if let Some(field) = to_field(&key, value)? {
                typed.insert(key, field);
            }
        }
        if typed.is_empty() {
            return Err(PointError::NoFields);
        }

        let nanos = timestamp
            .timestamp_nanos_opt()
            .ok_or(PointError::TimestampOutOfRange { timestamp })?;

        Ok(Point {
            measurement,
            tags,
            fields: typed,
            timestamp,
            nanos,
        })
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The timestamp counted in units of `precision` since the epoch.
    pub fn timestamp_in(&self, precision: &TimePrecision) -> i64 {
        match precision {
            TimePrecision::Seconds => self.timestamp.timestamp(),
            TimePrecision::Milliseconds => self.timestamp.timestamp_millis(),
            TimePrecision::Unsupported(_) => self.nanos,
        }
    }

    /// Appends the point as one line of line protocol.
    pub fn encode(&self, precision: &TimePrecision, output: &mut BytesMut) {
        // Construction guarantees at least one field, which is all the
        // encoder checks for.
        let _ = influx_line_protocol(
            &self.measurement,
            &self.tags,
            &self.fields,
            self.timestamp_in(precision),
            output,
        );
    }
}

// Names and tag values are written unquoted, where a line break would end
// the line.
fn check_line_breaks(name: &str) -> Result<(), PointError> {
    if name.contains(['\n', '\r']) {
        return Err(PointError::LineBreak {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn to_field(key: &str, value: Value) -> Result<Option<Field>, PointError> {
    Ok(Some(match value {
        Value::String(s) => Field::String(s),
        Value::Integer(i) => match i.to_i64() {
            Some(v) => Field::Int(v),
            None => {
                return Err(PointError::IntegerOutOfRange {
                    field: key.to_owned(),
                    value: i,
                })
            }
        },
        Value::Float(f) if f.is_finite() => Field::Float(f),
        Value::Float(f) => {
            return Err(PointError::NonFiniteFloat {
                field: key.to_owned(),
                value: f,
            })
        }
        Value::Boolean(b) => Field::Bool(b),
        Value::Timestamp(ts) => Field::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        value @ (Value::Object(_) | Value::Array(_)) => Field::String(value.to_string_lossy()),
        Value::Null => return Ok(None),
    }))
}
