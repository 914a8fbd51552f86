use chrono::{DateTime, Utc};

use super::{classify, Point, PointError, TagFields, TimePrecision};
use crate::event::{Event, Value};
use crate::internal_events::{
    InfluxDbEncodingError, InfluxDbTimestampOutOfRange, InfluxDbUnsupportedPrecision,
};

/// Points built from a batch, alongside the events they came from.
///
/// Both vectors keep the relative order of the input.
#[derive(Debug, Default)]
pub struct EncodedBatch<'a> {
    pub points: Vec<Point>,
    pub events: Vec<&'a Event>,
}

impl<'a> EncodedBatch<'a> {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Turns events into points for one measurement.
#[derive(Clone, Debug)]
pub struct PointEncoder {
    measurement: String,
    tag_fields: TagFields,
    timestamp_field: Option<String>,
    precision: TimePrecision,
}

impl PointEncoder {
    pub fn new(
        measurement: impl Into<String>,
        tag_fields: TagFields,
        timestamp_field: Option<String>,
        precision: TimePrecision,
    ) -> Self {
        PointEncoder {
            measurement: measurement.into(),
            tag_fields,
            timestamp_field,
            precision,
        }
    }

    /// Picks the point timestamp: the event's own, unless the configured
    /// override value holds an `i64` in a supported precision.
    pub fn timestamp(&self, event: &Event) -> DateTime<Utc> {
        let original = event.timestamp();

        let Some(field) = self.timestamp_field.as_deref() else {
            return original;
        };
        let Some(Value::Integer(integer)) = event.get(field) else {
            return original;
        };
        let Some(value) = integer.as_i64() else {
            return original;
        };

        let overridden = match self.precision {
            TimePrecision::Seconds => DateTime::from_timestamp(value, 0),
            TimePrecision::Milliseconds => DateTime::from_timestamp(
                value.div_euclid(1_000),
                (value.rem_euclid(1_000) * 1_000_000) as u32,
            ),
            TimePrecision::Unsupported(_) => {
                emit!(InfluxDbUnsupportedPrecision {
                    precision: &self.precision
                });
                return original;
            }
        };

        overridden.unwrap_or_else(|| {
            emit!(InfluxDbTimestampOutOfRange { field, value });
            original
        })
    }

    pub fn encode(&self, event: &Event) -> Result<Point, PointError> {
        let timestamp = self.timestamp(event);
        let (tags, fields) = classify(event.fields(), &self.tag_fields);
        Point::new(self.measurement.as_str(), tags, fields, timestamp)
    }

    /// Encodes every event it can. An event that fails to encode is logged
    /// and skipped; it never stops the rest of the batch.
    pub fn encode_all<'a>(&self, events: &'a [Event]) -> EncodedBatch<'a> {
        let mut encoded = EncodedBatch {
            points: Vec::with_capacity(events.len()),
            events: Vec::with_capacity(events.len()),
        };

        for event in events {
            match self.encode(event) {
                Ok(point) => {
                    encoded.points.push(point);
                    encoded.events.push(event);
                }
                Err(error) => {
                    emit!(InfluxDbEncodingError { error: &error });
                }
            }
        }

        encoded
    }
}
