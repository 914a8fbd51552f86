use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::StatusCode;

use super::{
    service::parse_endpoint, CloseError, ConnectError, Connection, ConnectionSettings, Connector,
    HealthcheckError, Point, WriteError, WriteRequest, WriteSettings,
};

#[derive(Debug, Default)]
struct MockState {
    connects: usize,
    closes: usize,
    write_attempts: usize,
    written: Vec<(WriteSettings, Vec<Point>)>,
    fail_writes: bool,
}

/// An in-memory store. Every connection shares the state of the connector
/// that opened it.
#[derive(Clone, Debug, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn closes(&self) -> usize {
        self.state.lock().unwrap().closes
    }

    pub fn write_attempts(&self) -> usize {
        self.state.lock().unwrap().write_attempts
    }

    /// Points of every successful write, in order.
    pub fn written(&self) -> Vec<Vec<Point>> {
        let state = self.state.lock().unwrap();
        state.written.iter().map(|(_, points)| points.clone()).collect()
    }

    pub fn last_settings(&self) -> Option<WriteSettings> {
        let state = self.state.lock().unwrap();
        state.written.last().map(|(settings, _)| settings.clone())
    }
}

impl Connector for MockConnector {
    type Connection = MockConnection;

    fn connect(&self, settings: &ConnectionSettings) -> Result<MockConnection, ConnectError> {
        parse_endpoint(&settings.address)?;
        self.state.lock().unwrap().connects += 1;
        Ok(MockConnection {
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

#[derive(Debug)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

#[async_trait]
impl Connection for MockConnection {
    async fn write(&mut self, request: WriteRequest<'_>) -> Result<(), WriteError> {
        if self.closed {
            return Err(WriteError::ConnectionClosed);
        }

        let mut state = self.state.lock().unwrap();
        state.write_attempts += 1;
        if state.fail_writes {
            return Err(WriteError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "mock write failure".into(),
            });
        }
        state
            .written
            .push((request.settings.clone(), request.points.to_vec()));
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), HealthcheckError> {
        if self.closed {
            return Err(HealthcheckError::HealthcheckConnectionClosed);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), CloseError> {
        if self.closed {
            return Err(CloseError::AlreadyClosed);
        }
        self.closed = true;
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}
