pub mod http_client;
mod influxdb;

pub use self::influxdb::*;

/// Something worth telling the operator about.
///
/// Logging and metrics are kept apart so each event decides which of the two
/// it feeds.
pub trait InternalEvent {
    fn emit_logs(&self) {}
    fn emit_metrics(&self) {}
}

pub fn emit(event: impl InternalEvent) {
    event.emit_logs();
    event.emit_metrics();
}

#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::internal_events::emit($event);
    };
}

pub mod error_stage {
    pub const PROCESSING: &str = "processing";
    pub const SENDING: &str = "sending";
}

pub mod error_type {
    pub const CONNECTION_FAILED: &str = "connection_failed";
    pub const ENCODER_FAILED: &str = "encoder_failed";
    pub const REQUEST_FAILED: &str = "request_failed";
}
