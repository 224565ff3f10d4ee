// logsift - app/pipeline.rs
//
// Consumer-side driver: owns the subscription receiver and the ingestion gate.
//
// Architecture:
//   - Reader threads push `LogEvent`s into the `LogStore`, which forwards
//     them over mpsc to this pipeline while streaming is enabled.
//   - The caller's loop calls `pump(now)` repeatedly and sleeps for
//     `next_wakeup(now)` between calls (same poll model as a UI frame loop).
//   - `pump` drains at most `MAX_EVENTS_PER_PUMP` events per call so a burst
//     cannot starve the caller, then gives the debounce timer a chance to fire.

use crate::app::buffer::ChannelBuffer;
use crate::app::gate::{IngestionGate, LogProducer};
use crate::core::model::LogEvent;
use crate::util::constants::{MAX_EVENTS_PER_PUMP, PUMP_IDLE_INTERVAL};
use std::sync::mpsc::{self, TryRecvError};
use std::time::{Duration, Instant};

/// What one `pump` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Events taken off the subscription.
    pub received: usize,
    /// Of those, events the gate accepted.
    pub accepted: usize,
    /// A flush committed lines during this pump.
    pub flushed: bool,
    /// Every sender is gone; no further events will arrive.
    pub disconnected: bool,
}

pub struct LogPipeline {
    gate: IngestionGate,
    events: Option<mpsc::Receiver<LogEvent>>,
}

impl LogPipeline {
    pub fn new(buffer: ChannelBuffer, events: mpsc::Receiver<LogEvent>) -> Self {
        Self {
            gate: IngestionGate::new(buffer),
            events: Some(events),
        }
    }

    /// The log view became visible.
    ///
    /// Anything still queued is already part of the producer's snapshot, so
    /// it is dropped before the gate reseeds from that snapshot.
    pub fn show(&mut self, producer: &dyn LogProducer) {
        self.discard_queued();
        self.gate.activate(producer);
    }

    /// The log view was hidden.
    pub fn hide(&mut self, producer: &dyn LogProducer) {
        self.gate.deactivate(producer);
        self.discard_queued();
    }

    fn discard_queued(&mut self) {
        let Some(rx) = &self.events else {
            return;
        };
        let mut dropped = 0usize;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Discarded queued log events");
        }
    }

    /// Move queued events into the gate and fire the flush timer if due.
    pub fn pump(&mut self, now: Instant) -> PumpReport {
        let mut report = PumpReport::default();

        if let Some(rx) = &self.events {
            while report.received < MAX_EVENTS_PER_PUMP {
                match rx.try_recv() {
                    Ok(event) => {
                        report.received += 1;
                        if self.gate.offer(event, now) {
                            report.accepted += 1;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        report.disconnected = true;
                        break;
                    }
                }
            }
        } else {
            report.disconnected = true;
        }

        report.flushed = self.gate.poll(now);

        if report.received > 0 {
            tracing::trace!(
                received = report.received,
                accepted = report.accepted,
                flushed = report.flushed,
                "Pumped log events"
            );
        }
        report
    }

    /// Drain everything still queued and commit it immediately.
    ///
    /// Used once the producers are known to be finished, so the tail of the
    /// output is not left waiting on a debounce that nobody will poll.
    pub fn drain(&mut self, now: Instant) -> usize {
        let mut received = 0;
        loop {
            let report = self.pump(now);
            received += report.received;
            if report.received < MAX_EVENTS_PER_PUMP {
                break;
            }
        }
        self.gate.flush();
        received
    }

    /// How long the caller may sleep before the next `pump`.
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        match self.gate.buffer().next_flush() {
            Some(deadline) => deadline.saturating_duration_since(now).min(PUMP_IDLE_INTERVAL),
            None => PUMP_IDLE_INTERVAL,
        }
    }

    /// Cancel the pending flush, stop ingestion and drop the subscription.
    ///
    /// Events still queued are discarded; producers prune the closed
    /// subscription on their next send.
    pub fn shutdown(&mut self, producer: &dyn LogProducer) {
        self.gate.cancel_flush();
        self.gate.deactivate(producer);
        self.events = None;
        tracing::debug!("Log pipeline shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.events.is_none()
    }

    pub fn gate(&self) -> &IngestionGate {
        &self.gate
    }

    pub fn buffer(&self) -> &ChannelBuffer {
        self.gate.buffer()
    }
}
