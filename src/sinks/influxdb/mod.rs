//! InfluxDB output.
//!
//! Events are partitioned into tags and fields ([`classify`]), turned into
//! [`Point`]s ([`encoder`]), and written in one request per batch
//! ([`writer`]) over a [`store::Connection`]. [`InfluxDbClient`] ties these
//! together behind connect/close/publish.

pub mod classify;
pub mod client;
pub mod encoder;
pub mod point;
pub mod service;
pub mod stats;
pub mod store;
#[cfg(test)]
pub mod test_util;
pub mod writer;

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc, time::Duration};

use bytes::{BufMut, BytesMut};
use http::Uri;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub use self::classify::{classify, TagFields};
pub use self::client::{ClientError, InfluxDbClient};
pub use self::encoder::{EncodedBatch, PointEncoder};
pub use self::point::{Point, PointError};
pub use self::service::{HttpConnection, InfluxDbHttp};
pub use self::stats::{AtomicStats, MetricsStats, OutputStats, StatsSnapshot};
pub use self::store::{
    CloseError, ConnectError, Connection, ConnectionSettings, Connector, HealthcheckError,
    WriteError, WriteRequest, WriteSettings,
};
pub use self::writer::{BatchWriter, WriteFailure};

use crate::{config::SensitiveString, http::Auth};

/// A typed line-protocol field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    /// string
    String(String),
    /// float
    Float(f64),
    /// integer
    Int(i64),
    /// boolean
    Bool(bool),
}

/// The unit integer timestamp overrides are read in, and points are written in.
///
/// Only seconds and milliseconds are understood. Anything else is carried as
/// [`TimePrecision::Unsupported`]: timestamp overrides are ignored and points
/// are written with nanosecond precision.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TimePrecision {
    #[default]
    Seconds,
    Milliseconds,
    Unsupported(String),
}

impl TimePrecision {
    /// The `precision` query parameter points are encoded with.
    pub const fn write_precision(&self) -> &'static str {
        match self {
            TimePrecision::Seconds => "s",
            TimePrecision::Milliseconds => "ms",
            TimePrecision::Unsupported(_) => "ns",
        }
    }
}

impl From<String> for TimePrecision {
    fn from(precision: String) -> Self {
        match precision.as_str() {
            "s" => TimePrecision::Seconds,
            "ms" => TimePrecision::Milliseconds,
            _ => TimePrecision::Unsupported(precision),
        }
    }
}

impl From<&str> for TimePrecision {
    fn from(precision: &str) -> Self {
        TimePrecision::from(precision.to_owned())
    }
}

impl FromStr for TimePrecision {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TimePrecision::from(s))
    }
}

impl From<TimePrecision> for String {
    fn from(precision: TimePrecision) -> Self {
        precision.to_string()
    }
}

impl fmt::Display for TimePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePrecision::Seconds => f.write_str("s"),
            TimePrecision::Milliseconds => f.write_str("ms"),
            TimePrecision::Unsupported(other) => f.write_str(other),
        }
    }
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ConfigError {
    #[snafu(display("`address` must not be empty."))]
    MissingAddress,
    #[snafu(display("`database` must not be empty."))]
    MissingDatabase,
    #[snafu(display("`measurement` must not be empty."))]
    MissingMeasurement,
    #[snafu(display("`password` is set but `username` is not."))]
    PasswordWithoutUsername,
    #[snafu(display("`batch.max_events` must be greater than zero."))]
    ZeroBatchSize,
}

/// Batching of the command line reader.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// The maximum number of events in one published batch.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

const fn default_max_events() -> usize {
    500
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_events: default_max_events(),
        }
    }
}

/// Configuration for the InfluxDB output.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InfluxDbConfig {
    /// The InfluxDB server, as `host:port` or `http://host:port`.
    pub address: String,

    /// The username to authenticate with.
    #[serde(default)]
    pub username: Option<String>,

    /// The password to authenticate with.
    #[serde(default)]
    pub password: Option<SensitiveString>,

    /// The name of the database to write into.
    pub database: String,

    /// The measurement every point is written to.
    pub measurement: String,

    /// Unit of integer timestamp overrides and of written timestamps: `s` or `ms`.
    #[serde(default)]
    pub precision: TimePrecision,

    /// Event values that are written as tags rather than fields.
    #[serde(default)]
    pub tag_fields: Vec<String>,

    /// An event value holding an integer timestamp that replaces the event's own.
    #[serde(default)]
    pub timestamp_field: Option<String>,

    /// The target retention policy for writes.
    #[serde(default)]
    pub retention_policy: Option<String>,

    /// The consistency level to use for writes.
    #[serde(default)]
    pub consistency: Option<String>,

    /// Give up on a request after this many seconds.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub batch: BatchConfig,
}

impl InfluxDbConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::MissingAddress);
        }
        if self.database.is_empty() {
            return Err(ConfigError::MissingDatabase);
        }
        if self.measurement.is_empty() {
            return Err(ConfigError::MissingMeasurement);
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(ConfigError::PasswordWithoutUsername);
        }
        if self.batch.max_events == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        let auth = self.username.as_ref().map(|user| Auth::Basic {
            user: user.clone(),
            password: self
                .password
                .as_ref()
                .map(|p| p.inner().to_owned())
                .unwrap_or_default(),
        });

        ConnectionSettings {
            address: self.address.clone(),
            auth,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn write_settings(&self) -> WriteSettings {
        WriteSettings {
            database: self.database.clone(),
            retention_policy: self.retention_policy.clone(),
            consistency: self.consistency.clone(),
            precision: self.precision.clone(),
        }
    }

    pub fn encoder(&self) -> PointEncoder {
        PointEncoder::new(
            self.measurement.clone(),
            TagFields::new(&self.tag_fields),
            self.timestamp_field.clone(),
            self.precision.clone(),
        )
    }

    /// Builds a client writing over HTTP. The client still has to be connected.
    pub fn build(
        &self,
        stats: Arc<dyn OutputStats>,
    ) -> Result<InfluxDbClient<InfluxDbHttp>, ConfigError> {
        self.build_with(InfluxDbHttp, stats)
    }

    pub fn build_with<C: Connector>(
        &self,
        connector: C,
        stats: Arc<dyn OutputStats>,
    ) -> Result<InfluxDbClient<C>, ConfigError> {
        self.validate()?;

        let writer = BatchWriter::new(self.encoder(), self.write_settings(), Arc::clone(&stats));
        let span = info_span!(
            "influxdb",
            database = %self.database,
            measurement = %self.measurement,
        );

        Ok(InfluxDbClient::new(
            connector,
            self.connection_settings(),
            writer,
            stats,
            span,
        ))
    }
}

// https://docs.influxdata.com/influxdb/v1/write_protocols/line_protocol_reference/
pub(crate) fn influx_line_protocol(
    measurement: &str,
    tags: &BTreeMap<String, String>,
    fields: &BTreeMap<String, Field>,
    timestamp: i64,
    line_protocol: &mut BytesMut,
) -> Result<(), &'static str> {
    // LineProtocol should have a field
    if fields.is_empty() {
        return Err("fields must not be empty");
    }

    encode_string(measurement, line_protocol);

    // Tags are optional
    if !tags.is_empty() {
        let before = line_protocol.len();
        line_protocol.put_u8(b',');
        encode_tags(tags, line_protocol);
        // Every tag was empty.
        if line_protocol.len() == before + 1 {
            line_protocol.truncate(before);
        }
    }
    line_protocol.put_u8(b' ');

    encode_fields(fields, line_protocol);
    line_protocol.put_u8(b' ');

    line_protocol.put_slice(timestamp.to_string().as_bytes());
    line_protocol.put_u8(b'\n');
    Ok(())
}

fn encode_tags(tags: &BTreeMap<String, String>, output: &mut BytesMut) {
    let original_len = output.len();
    // `tags` is already sorted
    for (key, value) in tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        encode_string(key, output);
        output.put_u8(b'=');
        encode_string(value, output);
        output.put_u8(b',');
    }

    // remove last ','
    if output.len() > original_len {
        output.truncate(output.len() - 1);
    }
}

fn encode_fields(fields: &BTreeMap<String, Field>, output: &mut BytesMut) {
    let original_len = output.len();
    for (key, value) in fields {
        encode_string(key, output);
        output.put_u8(b'=');
        match value {
            Field::String(s) => {
                output.put_u8(b'"');
                for c in s.chars() {
                    if "\\\"".contains(c) {
                        output.put_u8(b'\\');
                    }
                    let mut c_buffer: [u8; 4] = [0; 4];
                    output.put_slice(c.encode_utf8(&mut c_buffer).as_bytes());
                }
                output.put_u8(b'"');
            }
            Field::Float(f) => output.put_slice(f.to_string().as_bytes()),
            Field::Int(i) => {
                output.put_slice(i.to_string().as_bytes());
                output.put_u8(b'i');
            }
            Field::Bool(b) => output.put_slice(b.to_string().as_bytes()),
        };
        output.put_u8(b',');
    }

    // remove last ','
    if output.len() > original_len {
        output.truncate(output.len() - 1);
    }
}

fn encode_string(key: &str, output: &mut BytesMut) {
    for c in key.chars() {
        if "\\, =".contains(c) {
            output.put_u8(b'\\');
        }
        let mut c_buffer: [u8; 4] = [0; 4];
        output.put_slice(c.encode_utf8(&mut c_buffer).as_bytes());
    }
}

pub(crate) fn encode_uri(
    endpoint: &str,
    path: &str,
    pairs: &[(&str, Option<&str>)],
) -> Result<Uri, http::uri::InvalidUri> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());

    for (key, value) in pairs {
        if let Some(v) = value {
            serializer.append_pair(key, v);
        }
    }

    let mut url = if endpoint.ends_with('/') {
        format!("{}{}?{}", endpoint, path, serializer.finish())
    } else {
        format!("{}/{}?{}", endpoint, path, serializer.finish())
    };

    if url.ends_with('?') {
        url.pop();
    }

    url.parse::<Uri>()
}
