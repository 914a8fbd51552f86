use std::sync::Arc;

use snafu::Snafu;

use super::{Connection, OutputStats, PointEncoder, WriteError, WriteRequest, WriteSettings};
use crate::event::Event;
use crate::internal_events::{InfluxDbEventNotWritten, InfluxDbEventsDropped, InfluxDbWriteError};

/// A write that did not go through, with the events to deliver again.
#[derive(Debug, Snafu)]
#[snafu(display("{}", source))]
pub struct WriteFailure {
    /// Every event that was encoded, in input order.
    pub retry: Vec<Event>,
    pub source: WriteError,
}

/// Encodes a batch and writes it in a single request.
pub struct BatchWriter {
    encoder: PointEncoder,
    settings: WriteSettings,
    stats: Arc<dyn OutputStats>,
}

impl BatchWriter {
    pub fn new(encoder: PointEncoder, settings: WriteSettings, stats: Arc<dyn OutputStats>) -> Self {
        BatchWriter {
            encoder,
            settings,
            stats,
        }
    }

    /// Writes `events` and returns how many of them were stored.
    ///
    /// Events that fail to encode are counted as dropped and are never
    /// returned for retry, whatever the outcome of the write.
    pub async fn write<C>(&self, connection: &mut C, events: &[Event]) -> Result<usize, WriteFailure>
    where
        C: Connection + ?Sized,
    {
        let encoded = self.encoder.encode_all(events);

        let dropped = events.len() - encoded.len();
        if dropped > 0 {
            self.stats.dropped(dropped);
            emit!(InfluxDbEventsDropped {
                count: dropped,
                total: events.len(),
            });
        }

        if encoded.is_empty() {
            return Ok(0);
        }

        let request = WriteRequest {
            settings: &self.settings,
            points: &encoded.points,
        };
        if let Err(source) = connection.write(request).await {
            emit!(InfluxDbWriteError {
                error: &source,
                count: encoded.len(),
            });
            for &event in &encoded.events {
                emit!(InfluxDbEventNotWritten { event });
            }

            let retry = encoded.events.into_iter().cloned().collect();
            return Err(WriteFailure { retry, source });
        }

        self.stats.acked(encoded.len());
        Ok(encoded.len())
    }
}
