#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![allow(clippy::module_name_repetitions)]

//! Publishes batches of pipeline events to InfluxDB.
//!
//! Events are turned into line-protocol points by the [`sinks::influxdb`]
//! encoder and written over the InfluxDB v1 HTTP API. Events that cannot be
//! encoded are dropped; events that were encoded but could not be written are
//! handed back to the pipeline for retry.

#[macro_use]
extern crate tracing;

#[macro_use]
pub mod internal_events;

pub mod cli;
pub mod config;
pub mod event;
pub mod http;
pub mod sinks;
#[cfg(test)]
pub mod test_util;
pub mod trace;

pub use event::Event;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
