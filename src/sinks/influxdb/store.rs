//! The seam between the output and the database client.

use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use snafu::Snafu;

use super::{Point, TimePrecision};
use crate::http::{Auth, HttpError};

/// Where and how to connect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub address: String,
    pub auth: Option<Auth>,
    pub request_timeout: Option<Duration>,
}

/// Where and how points are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteSettings {
    pub database: String,
    pub retention_policy: Option<String>,
    pub consistency: Option<String>,
    pub precision: TimePrecision,
}

/// One all-or-nothing write.
#[derive(Clone, Copy, Debug)]
pub struct WriteRequest<'a> {
    pub settings: &'a WriteSettings,
    pub points: &'a [Point],
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum ConnectError {
    #[snafu(display("Invalid address {:?}: {}", address, source))]
    InvalidAddress {
        address: String,
        source: http::uri::InvalidUri,
    },
    #[snafu(display(
        "Unsupported protocol scheme {:?}, the address must start with http:// or have no scheme",
        scheme
    ))]
    UnsupportedScheme { scheme: String },
    #[snafu(display("Address {:?} has no host", address))]
    MissingHost { address: String },
    #[snafu(display("Failed to build HTTP client: {}", source))]
    BuildClient { source: HttpError },
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum WriteError {
    #[snafu(display("Connection is closed"))]
    ConnectionClosed,
    #[snafu(display("Failed to build write URI: {}", source))]
    BuildUri { source: http::uri::InvalidUri },
    #[snafu(display("Failed to build write request: {}", source))]
    BuildRequest { source: http::Error },
    #[snafu(display("{}", source))]
    Request { source: HttpError },
    #[snafu(display("Failed to read response body: {}", source))]
    ReadBody { source: hyper::Error },
    #[snafu(display("Write rejected with status {}: {}", status, message))]
    UnexpectedStatus { status: StatusCode, message: String },
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum CloseError {
    #[snafu(display("Connection is already closed"))]
    AlreadyClosed,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum HealthcheckError {
    #[snafu(display("Connection is closed"))]
    HealthcheckConnectionClosed,
    #[snafu(display("Failed to build ping URI: {}", source))]
    PingUri { source: http::uri::InvalidUri },
    #[snafu(display("Failed to build ping request: {}", source))]
    BuildPing { source: http::Error },
    #[snafu(display("{}", source))]
    Ping { source: HttpError },
    #[snafu(display("Unexpected status: {}", status))]
    UnexpectedPingStatus { status: StatusCode },
}

/// An open connection to the database.
#[async_trait]
pub trait Connection: Send {
    /// Writes every point or none of them.
    async fn write(&mut self, request: WriteRequest<'_>) -> Result<(), WriteError>;

    /// Checks that the server is reachable.
    async fn ping(&mut self) -> Result<(), HealthcheckError>;

    /// Releases the connection. Closing twice is an error.
    fn close(&mut self) -> Result<(), CloseError>;
}

/// Opens connections.
pub trait Connector: Send + Sync {
    type Connection: Connection;

    fn connect(&self, settings: &ConnectionSettings) -> Result<Self::Connection, ConnectError>;
}
