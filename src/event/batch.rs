use super::Event;

/// A group of events handed to an output for one delivery attempt.
///
/// Exactly one of [`Batch::ack`] or [`Batch::retry_events`] is expected to
/// be called once the output is done with the batch.
pub trait Batch {
    fn events(&self) -> &[Event];

    /// The whole batch was delivered.
    fn ack(&mut self);

    /// Hands a subset of the batch back to the pipeline for redelivery.
    fn retry_events(&mut self, events: Vec<Event>);
}

/// The final state of a [`VecBatch`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BatchStatus {
    /// Neither acknowledged nor handed back yet (the default).
    #[default]
    Pending,
    /// All events were delivered.
    Acked,
    /// These events have to be delivered again.
    Retry(Vec<Event>),
}

/// A [`Batch`] backed by a `Vec`, recording how the output finalized it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VecBatch {
    events: Vec<Event>,
    status: BatchStatus,
}

impl VecBatch {
    pub fn new(events: Vec<Event>) -> Self {
        VecBatch {
            events,
            status: BatchStatus::Pending,
        }
    }

    pub fn status(&self) -> &BatchStatus {
        &self.status
    }

    pub fn into_status(self) -> BatchStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl From<Vec<Event>> for VecBatch {
    fn from(events: Vec<Event>) -> Self {
        VecBatch::new(events)
    }
}

impl Batch for VecBatch {
    fn events(&self) -> &[Event] {
        &self.events
    }

    fn ack(&mut self) {
        self.status = BatchStatus::Acked;
    }

    fn retry_events(&mut self, events: Vec<Event>) {
        self.status = BatchStatus::Retry(events);
    }
}
