use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use snafu::Snafu;

mod batch;
mod value;

pub use batch::{Batch, BatchStatus, VecBatch};
pub use value::{Integer, Value};

pub const TIMESTAMP: &str = "timestamp";
pub const FIELDS: &str = "fields";

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum EventError {
    #[snafu(display("Event must be a JSON object, got {}", kind))]
    NotAnObject { kind: &'static str },
    #[snafu(display("Invalid timestamp {:?}: must be an RFC 3339 string", value))]
    InvalidTimestamp { value: String },
    #[snafu(display("The {:?} key must hold an object", FIELDS))]
    FieldsNotAnObject,
}

/// A single record flowing through the pipeline.
///
/// The pipeline owns events until a batch is acknowledged or handed back for
/// retry; the output only ever reads them.
#[derive(PartialEq, Debug, Clone)]
pub struct Event {
    timestamp: DateTime<Utc>,
    fields: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Event {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    pub fn from_parts(timestamp: DateTime<Utc>, fields: BTreeMap<String, Value>) -> Self {
        Event { timestamp, fields }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builds an event from a decoded JSON document.
    ///
    /// Two shapes are accepted: `{"timestamp": .., "fields": {..}}`, or a
    /// flat object whose `timestamp` key, if present, is lifted out of the
    /// values. Events without a timestamp are stamped with `now`.
    pub fn from_json(value: serde_json::Value, now: DateTime<Utc>) -> Result<Self, EventError> {
        let mut object = match value {
            serde_json::Value::Object(object) => object,
            other => {
                return Err(EventError::NotAnObject {
                    kind: Value::from(other).kind(),
                })
            }
        };

        let timestamp = match object.remove(TIMESTAMP) {
            None | Some(serde_json::Value::Null) => now,
            Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|_| EventError::InvalidTimestamp { value: s })?,
            Some(other) => {
                return Err(EventError::InvalidTimestamp {
                    value: other.to_string(),
                })
            }
        };

        let fields = match object.remove(FIELDS) {
            Some(serde_json::Value::Object(fields)) if object.is_empty() => fields,
            // Flat shape that happens to carry a `fields` object among other values.
            Some(serde_json::Value::Object(fields)) => {
                object.insert(FIELDS.to_owned(), serde_json::Value::Object(fields));
                object
            }
            None => object,
            Some(_) => return Err(EventError::FieldsNotAnObject),
        };

        Ok(Event::from_parts(
            timestamp,
            fields
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
        ))
    }
}
