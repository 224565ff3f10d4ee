// logsift - app/gate.rs
//
// Ingestion gate: decides whether arriving worker events reach the buffers.
//
// While the log view is hidden the gate is Inactive and drops everything, so
// the consumer does no work for output nobody is looking at. Activation
// rebuilds the view from the producer's retained lines rather than from
// whatever the buffers held before; events that arrived while hidden are
// covered by the snapshot.
//
// Producer control is best-effort: a failed enable/disable or snapshot is
// logged and the gate still moves to its new state.

use crate::app::buffer::ChannelBuffer;
use crate::core::model::{Channel, LogEvent, Snapshot};
use crate::util::error::StreamError;
use std::time::Instant;

/// The upstream side of the pipeline as seen by the gate.
///
/// Implemented by `app::producer::LogStore`; tests use a hand-written double.
pub trait LogProducer {
    /// Ask the producer to start or stop pushing live events to subscribers.
    fn set_streaming(&self, enabled: bool) -> Result<(), StreamError>;

    /// Lines currently retained by the producer, per channel, oldest first.
    fn snapshot(&self) -> Result<Snapshot, StreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Inactive,
    Active,
}

#[derive(Debug, Default)]
pub struct IngestionGate {
    state: GateState,
    buffer: ChannelBuffer,
}

impl IngestionGate {
    pub fn new(buffer: ChannelBuffer) -> Self {
        Self {
            state: GateState::Inactive,
            buffer,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == GateState::Active
    }

    /// Reset the buffers and rebuild them from the producer's retained lines.
    ///
    /// Also valid while already Active; the reset is performed again.
    pub fn activate(&mut self, producer: &dyn LogProducer) {
        self.buffer.clear();
        self.state = GateState::Active;

        if let Err(e) = producer.set_streaming(true) {
            tracing::warn!(error = %e, "Could not enable log streaming; showing retained lines only");
        }
        match producer.snapshot() {
            Ok(snapshot) => self.buffer.seed(&snapshot),
            Err(e) => tracing::warn!(error = %e, "Could not fetch retained log lines"),
        }
        self.buffer.flush();

        tracing::info!(
            agent = self.buffer.committed_len(Channel::Agent),
            gateway = self.buffer.committed_len(Channel::Gateway),
            "Log ingestion activated"
        );
    }

    /// Stop accepting events. Buffers are left as they are.
    pub fn deactivate(&mut self, producer: &dyn LogProducer) {
        self.state = GateState::Inactive;
        if let Err(e) = producer.set_streaming(false) {
            tracing::warn!(error = %e, "Could not disable log streaming");
        }
        tracing::info!("Log ingestion deactivated");
    }

    /// Hand an arriving event to the buffer. Returns `false` if it was dropped
    /// because the gate is Inactive.
    pub fn offer(&mut self, event: LogEvent, now: Instant) -> bool {
        match self.state {
            GateState::Active => {
                self.buffer.push(event, now);
                true
            }
            GateState::Inactive => false,
        }
    }

    /// Timer tick; see `ChannelBuffer::poll`.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.buffer.poll(now).is_some()
    }

    /// Commit pending events now instead of waiting for the debounce.
    pub fn flush(&mut self) -> bool {
        self.buffer.flush().committed > 0
    }

    /// Disarm any pending flush without committing it.
    pub fn cancel_flush(&mut self) {
        self.buffer.cancel_flush();
    }

    pub fn buffer(&self) -> &ChannelBuffer {
        &self.buffer
    }
}
