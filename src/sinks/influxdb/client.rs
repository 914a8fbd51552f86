use std::{mem, sync::Arc};

use snafu::{ResultExt, Snafu};
use tracing::{Instrument, Span};

use super::{
    BatchWriter, CloseError, ConnectError, Connection, ConnectionSettings, Connector,
    HealthcheckError, OutputStats, WriteError, WriteFailure,
};
use crate::event::Batch;
use crate::internal_events::{InfluxDbClosed, InfluxDbConnectError, InfluxDbConnected};

#[derive(Debug, Snafu)]
pub enum ClientError {
    #[snafu(display("Failed to connect to InfluxDB: {}", source))]
    Connect { source: ConnectError },
    #[snafu(display("Client is not connected"))]
    NotConnected,
    #[snafu(display("Client is closed"))]
    Closed,
    #[snafu(display("Failed to close connection: {}", source))]
    Close { source: CloseError },
    #[snafu(display("Failed to write batch: {}", source))]
    Write { source: WriteError },
    #[snafu(display("Healthcheck failed: {}", source))]
    Healthcheck { source: HealthcheckError },
}

enum State<T> {
    Disconnected,
    Connected(T),
    /// The connection is kept so that a repeated close reaches it.
    Closed(T),
}

/// Publishes pipeline batches to InfluxDB.
///
/// Moves from disconnected, through [`connect`](Self::connect), to connected
/// and finally to closed. Every method takes `&mut self`, so a client serves
/// one caller at a time.
pub struct InfluxDbClient<C: Connector> {
    connector: C,
    settings: ConnectionSettings,
    writer: BatchWriter,
    stats: Arc<dyn OutputStats>,
    state: State<C::Connection>,
    span: Span,
}

impl<C: Connector> InfluxDbClient<C> {
    pub fn new(
        connector: C,
        settings: ConnectionSettings,
        writer: BatchWriter,
        stats: Arc<dyn OutputStats>,
        span: Span,
    ) -> Self {
        InfluxDbClient {
            connector,
            settings,
            writer,
            stats,
            state: State::Disconnected,
            span,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, State::Connected(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed(_))
    }

    pub fn connect(&mut self) -> Result<(), ClientError> {
        let _enter = self.span.enter();

        if let State::Closed(_) = self.state {
            return Err(ClientError::Closed);
        }

        let connection = self
            .connector
            .connect(&self.settings)
            .map_err(|error| {
                emit!(InfluxDbConnectError { error: &error });
                error
            })
            .context(ConnectSnafu)?;

        emit!(InfluxDbConnected {
            address: &self.settings.address
        });
        self.state = State::Connected(connection);
        Ok(())
    }

    /// Closes the connection. Closing an already closed client is reported
    /// by the connection itself.
    pub fn close(&mut self) -> Result<(), ClientError> {
        let _enter = self.span.enter();

        match mem::replace(&mut self.state, State::Disconnected) {
            State::Disconnected => Err(ClientError::NotConnected),
            State::Connected(mut connection) => {
                emit!(InfluxDbClosed);
                let result = connection.close().context(CloseSnafu);
                self.state = State::Closed(connection);
                result
            }
            State::Closed(mut connection) => {
                let result = connection.close().context(CloseSnafu);
                self.state = State::Closed(connection);
                result
            }
        }
    }

    /// Publishes one batch.
    ///
    /// On success the batch is acknowledged. On a failed write the encoded
    /// events are handed back through [`Batch::retry_events`] and the error
    /// is returned. Events that cannot be encoded are dropped either way.
    pub async fn publish<B>(&mut self, batch: &mut B) -> Result<(), ClientError>
    where
        B: Batch + Send + ?Sized,
    {
        let span = self.span.clone();
        self.publish_batch(batch).instrument(span).await
    }

    async fn publish_batch<B>(&mut self, batch: &mut B) -> Result<(), ClientError>
    where
        B: Batch + Send + ?Sized,
    {
        let events = batch.events();
        self.stats.new_batch(events.len());

        let connection = match &mut self.state {
            State::Connected(connection) => connection,
            state => {
                let error = match state {
                    State::Closed(_) => ClientError::Closed,
                    _ => ClientError::NotConnected,
                };
                let retry = events.to_vec();
                self.stats.failed(retry.len());
                batch.retry_events(retry);
                return Err(error);
            }
        };

        match self.writer.write(connection, events).await {
            Ok(_) => {
                batch.ack();
                Ok(())
            }
            Err(WriteFailure { retry, source }) => {
                self.stats.failed(retry.len());
                batch.retry_events(retry);
                Err(ClientError::Write { source })
            }
        }
    }

    /// Pings the server over the open connection.
    pub async fn healthcheck(&mut self) -> Result<(), ClientError> {
        let span = self.span.clone();
        match &mut self.state {
            State::Connected(connection) => connection
                .ping()
                .instrument(span)
                .await
                .context(HealthcheckSnafu),
            State::Disconnected => Err(ClientError::NotConnected),
            State::Closed(_) => Err(ClientError::Closed),
        }
    }
}
