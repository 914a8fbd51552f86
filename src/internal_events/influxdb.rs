use metrics::counter;

use super::{error_stage, error_type, InternalEvent};
use crate::event::Event;
use crate::sinks::influxdb::{ConnectError, PointError, TimePrecision, WriteError};

#[derive(Debug)]
pub struct InfluxDbConnected<'a> {
    pub address: &'a str,
}

impl<'a> InternalEvent for InfluxDbConnected<'a> {
    fn emit_logs(&self) {
        info!(message = "Client to InfluxDB created.", address = %self.address);
    }
}

#[derive(Debug)]
pub struct InfluxDbConnectError<'a> {
    pub error: &'a ConnectError,
}

impl<'a> InternalEvent for InfluxDbConnectError<'a> {
    fn emit_logs(&self) {
        error!(
            message = "Failed to create HTTP connection to InfluxDB.",
            error = %self.error,
            error_type = error_type::CONNECTION_FAILED,
            stage = error_stage::SENDING,
        );
    }

    fn emit_metrics(&self) {
        counter!(
            "component_errors_total",
            "error_type" => error_type::CONNECTION_FAILED,
            "stage" => error_stage::SENDING,
        )
        .increment(1);
    }
}

#[derive(Debug)]
pub struct InfluxDbClosed;

impl InternalEvent for InfluxDbClosed {
    fn emit_logs(&self) {
        debug!(message = "Closing connection.");
    }
}

#[derive(Debug)]
pub struct InfluxDbEncodingError<'a> {
    pub error: &'a PointError,
}

impl<'a> InternalEvent for InfluxDbEncodingError<'a> {
    fn emit_logs(&self) {
        error!(
            message = "Encoding event failed.",
            error = %self.error,
            error_type = error_type::ENCODER_FAILED,
            stage = error_stage::PROCESSING,
        );
    }

    fn emit_metrics(&self) {
        counter!(
            "component_errors_total",
            "error_type" => error_type::ENCODER_FAILED,
            "stage" => error_stage::PROCESSING,
        )
        .increment(1);
    }
}

#[derive(Debug)]
pub struct InfluxDbUnsupportedTagType<'a> {
    pub name: &'a str,
    pub kind: &'static str,
}

impl<'a> InternalEvent for InfluxDbUnsupportedTagType<'a> {
    fn emit_logs(&self) {
        warn!(
            message = "Unsupported tag type, value dropped.",
            tag = %self.name,
            kind = %self.kind,
        );
    }
}

#[derive(Debug)]
pub struct InfluxDbUnsupportedPrecision<'a> {
    pub precision: &'a TimePrecision,
}

impl<'a> InternalEvent for InfluxDbUnsupportedPrecision<'a> {
    fn emit_logs(&self) {
        warn!(
            message = "Unsupported time precision, keeping event timestamp.",
            precision = %self.precision,
        );
    }
}

#[derive(Debug)]
pub struct InfluxDbTimestampOutOfRange<'a> {
    pub field: &'a str,
    pub value: i64,
}

impl<'a> InternalEvent for InfluxDbTimestampOutOfRange<'a> {
    fn emit_logs(&self) {
        warn!(
            message = "Timestamp override out of range, keeping event timestamp.",
            field = %self.field,
            value = self.value,
        );
    }
}

#[derive(Debug)]
pub struct InfluxDbEventsDropped {
    pub count: usize,
    pub total: usize,
}

impl InternalEvent for InfluxDbEventsDropped {
    fn emit_logs(&self) {
        info!(
            message = "Dropped events that could not be encoded.",
            count = self.count,
            total = self.total,
        );
    }

    fn emit_metrics(&self) {
        counter!(
            "component_discarded_events_total",
            "intentional" => "false",
        )
        .increment(self.count as u64);
    }
}

#[derive(Debug)]
pub struct InfluxDbWriteError<'a> {
    pub error: &'a WriteError,
    pub count: usize,
}

impl<'a> InternalEvent for InfluxDbWriteError<'a> {
    fn emit_logs(&self) {
        error!(
            message = "Failed to write to InfluxDB.",
            error = %self.error,
            count = self.count,
            error_type = error_type::REQUEST_FAILED,
            stage = error_stage::SENDING,
        );
    }

    fn emit_metrics(&self) {
        counter!(
            "component_errors_total",
            "error_type" => error_type::REQUEST_FAILED,
            "stage" => error_stage::SENDING,
        )
        .increment(1);
    }
}

#[derive(Debug)]
pub struct InfluxDbEventNotWritten<'a> {
    pub event: &'a Event,
}

impl<'a> InternalEvent for InfluxDbEventNotWritten<'a> {
    fn emit_logs(&self) {
        debug!(
            message = "Event returned for retry.",
            timestamp = %self.event.timestamp(),
            fields = ?self.event.fields(),
        );
    }
}
