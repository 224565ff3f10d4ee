// logsift - app/buffer.rs
//
// Per-channel pending and committed line buffers with debounced commits.
//
// Architecture:
//   - `push` appends to the channel's pending batch and arms the flush
//     scheduler. It never blocks and never fails: overflow evicts the oldest
//     pending events.
//   - `flush` sanitizes each channel's pending batch onto its committed
//     buffer, evicting the oldest committed lines past the cap.
//   - `poll` is the timer tick: it flushes once the armed deadline passes.
//
// Ordering: both buffers are append-at-back, evict-at-front queues, so the
// committed buffer is always the most recent suffix of what was pushed for
// that channel, in arrival order. No ordering exists between channels.

use crate::app::scheduler::FlushScheduler;
use crate::core::model::{Channel, LogEvent, Snapshot};
use crate::core::sanitize::sanitize;
use crate::util::constants;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Capacity and timing limits for a `ChannelBuffer`.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    pub pending_capacity: usize,
    pub committed_capacity: usize,
    pub flush_debounce: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            pending_capacity: constants::DEFAULT_PENDING_CAPACITY,
            committed_capacity: constants::DEFAULT_COMMITTED_CAPACITY,
            flush_debounce: Duration::from_millis(constants::DEFAULT_FLUSH_DEBOUNCE_MS),
        }
    }
}

/// What a flush did, summed over both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Pending events moved to committed buffers.
    pub committed: usize,
    /// Committed lines (old or new) dropped to respect the cap.
    pub evicted: usize,
}

#[derive(Debug)]
pub struct ChannelBuffer {
    config: BufferConfig,
    pending: [VecDeque<LogEvent>; 2],
    committed: [VecDeque<LogEvent>; 2],
    /// Lines ever committed per channel. Monotonic, survives `clear`.
    committed_total: [u64; 2],
    scheduler: FlushScheduler,
}

impl ChannelBuffer {
    pub fn new(config: BufferConfig) -> Self {
        let scheduler = FlushScheduler::new(config.flush_debounce);
        Self {
            config,
            pending: [VecDeque::new(), VecDeque::new()],
            committed: [VecDeque::new(), VecDeque::new()],
            committed_total: [0, 0],
            scheduler,
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Queue an event for the next flush and arm the debounce timer.
    pub fn push(&mut self, event: LogEvent, now: Instant) {
        let channel = event.channel;
        let queue = &mut self.pending[channel.index()];
        queue.push_back(event);
        let excess = queue.len().saturating_sub(self.config.pending_capacity);
        if excess > 0 {
            queue.drain(..excess);
            tracing::trace!(%channel, dropped = excess, "Pending batch full; dropped oldest");
        }
        if self.scheduler.schedule(now) {
            tracing::trace!(%channel, "Flush scheduled");
        }
    }

    /// Move all pending events into the committed buffers.
    ///
    /// With nothing pending this only disarms the timer, which is what happens
    /// when a clear races an already armed deadline.
    pub fn flush(&mut self) -> FlushOutcome {
        self.scheduler.cancel();
        let mut outcome = FlushOutcome::default();
        let cap = self.config.committed_capacity;

        for channel in Channel::ALL {
            let i = channel.index();
            if self.pending[i].is_empty() {
                continue;
            }
            let batch = std::mem::take(&mut self.pending[i]);
            let count = batch.len();
            // Events that would be evicted by the tail of this same batch are
            // skipped rather than sanitized and dropped.
            let skip = count.saturating_sub(cap);
            let committed = &mut self.committed[i];
            committed.extend(batch.into_iter().skip(skip).map(|mut event| {
                event.text = sanitize(&event.text);
                event
            }));
            let excess = committed.len().saturating_sub(cap);
            committed.drain(..excess);

            self.committed_total[i] += count as u64;
            outcome.committed += count;
            outcome.evicted += skip + excess;

            tracing::debug!(%channel, count, evicted = skip + excess, "Flushed pending batch");
        }
        outcome
    }

    /// Flush if the debounce deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<FlushOutcome> {
        if self.scheduler.is_due(now) {
            Some(self.flush())
        } else {
            None
        }
    }

    /// Seed the committed buffers with lines retained by the producer.
    pub fn seed(&mut self, snapshot: &Snapshot) {
        let cap = self.config.committed_capacity;
        for channel in Channel::ALL {
            let events = snapshot.for_channel(channel);
            if events.is_empty() {
                continue;
            }
            let i = channel.index();
            let skip = events.len().saturating_sub(cap);
            let committed = &mut self.committed[i];
            committed.extend(
                events[skip..]
                    .iter()
                    .map(|event| LogEvent::new(event.channel, event.stream, sanitize(&event.text))),
            );
            let excess = committed.len().saturating_sub(cap);
            committed.drain(..excess);
            self.committed_total[i] += events.len() as u64;
            tracing::debug!(%channel, count = events.len(), "Seeded from snapshot");
        }
    }

    /// Empty both buffers for both channels and disarm the timer.
    pub fn clear(&mut self) {
        for i in 0..2 {
            self.pending[i].clear();
            self.committed[i].clear();
        }
        self.scheduler.cancel();
    }

    /// Committed (sanitized) events for a channel, oldest first.
    pub fn lines(&self, channel: Channel) -> impl Iterator<Item = &LogEvent> + '_ {
        self.committed[channel.index()].iter()
    }

    /// Committed lines in display form, each prefixed by its stream.
    pub fn rendered(&self, channel: Channel) -> Vec<String> {
        self.lines(channel).map(LogEvent::rendered).collect()
    }

    /// Committed events added after the caller had seen `seen_total` lines.
    ///
    /// Lines already evicted are silently skipped.
    pub fn committed_since(
        &self,
        channel: Channel,
        seen_total: u64,
    ) -> impl Iterator<Item = &LogEvent> + '_ {
        let queue = &self.committed[channel.index()];
        let fresh = self.committed_total[channel.index()].saturating_sub(seen_total);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(queue.len());
        queue.iter().skip(queue.len() - fresh)
    }

    pub fn committed_total(&self, channel: Channel) -> u64 {
        self.committed_total[channel.index()]
    }

    pub fn pending_len(&self, channel: Channel) -> usize {
        self.pending[channel.index()].len()
    }

    pub fn committed_len(&self, channel: Channel) -> usize {
        self.committed[channel.index()].len()
    }

    /// Disarm the debounce timer, leaving pending events in place.
    pub fn cancel_flush(&mut self) {
        self.scheduler.cancel();
    }

    pub fn is_flush_scheduled(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    pub fn next_flush(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }
}

impl Default for ChannelBuffer {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Stream;

    fn ev(channel: Channel, text: impl Into<String>) -> LogEvent {
        LogEvent::new(channel, Stream::Stdout, text)
    }

    fn texts(buffer: &ChannelBuffer, channel: Channel) -> Vec<String> {
        buffer.lines(channel).map(|e| e.text.clone()).collect()
    }

    fn small(pending: usize, committed: usize) -> ChannelBuffer {
        ChannelBuffer::new(BufferConfig {
            pending_capacity: pending,
            committed_capacity: committed,
            flush_debounce: Duration::from_millis(200),
        })
    }

    #[test]
    fn test_push_then_debounced_flush() {
        let t0 = Instant::now();
        let mut buffer = ChannelBuffer::default();
        buffer.push(ev(Channel::Agent, "one"), t0);
        buffer.push(ev(Channel::Agent, "two"), t0 + Duration::from_millis(100));

        assert!(buffer.poll(t0 + Duration::from_millis(199)).is_none());
        assert_eq!(buffer.committed_len(Channel::Agent), 0);

        let outcome = buffer.poll(t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(outcome.committed, 2);
        assert_eq!(texts(&buffer, Channel::Agent), vec!["one", "two"]);
        assert_eq!(buffer.pending_len(Channel::Agent), 0);
        assert!(!buffer.is_flush_scheduled());
    }

    #[test]
    fn test_burst_arms_a_single_timer() {
        let t0 = Instant::now();
        let mut buffer = ChannelBuffer::default();
        for i in 0..50 {
            buffer.push(ev(Channel::Gateway, format!("{i}")), t0 + Duration::from_millis(i));
        }
        assert_eq!(buffer.next_flush(), Some(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_pending_is_capped_drop_oldest() {
        let t0 = Instant::now();
        let mut buffer = ChannelBuffer::default();
        for i in 0..5_010 {
            buffer.push(ev(Channel::Agent, format!("{i}")), t0);
        }
        assert_eq!(buffer.pending_len(Channel::Agent), 5_000);
        buffer.flush();
        // Committed cap is 2000; the newest 2000 survive in order.
        let lines = texts(&buffer, Channel::Agent);
        assert_eq!(lines.len(), 2_000);
        assert_eq!(lines.first().map(String::as_str), Some("3010"));
        assert_eq!(lines.last().map(String::as_str), Some("5009"));
    }

    #[test]
    fn test_committed_is_suffix_of_arrival_order() {
        let t0 = Instant::now();
        let mut buffer = small(4, 6);
        let mut pushed: Vec<String> = Vec::new();
        // Irregular batch sizes, flushing in between.
        for (round, size) in [3usize, 7, 1, 5, 2].into_iter().enumerate() {
            let mut batch = Vec::new();
            for j in 0..size {
                let text = format!("r{round}-{j}");
                buffer.push(ev(Channel::Agent, text.clone()), t0);
                batch.push(text);
            }
            // Pending eviction keeps only the last 4 of each batch.
            let kept = batch.len().saturating_sub(4);
            pushed.extend(batch.into_iter().skip(kept));
            buffer.flush();

            let expected: Vec<String> =
                pushed.iter().skip(pushed.len().saturating_sub(6)).cloned().collect();
            assert_eq!(texts(&buffer, Channel::Agent), expected);
            assert!(buffer.committed_len(Channel::Agent) <= 6);
        }
    }

    #[test]
    fn test_channels_are_independent() {
        let t0 = Instant::now();
        let mut buffer = small(3, 3);
        for i in 0..10 {
            buffer.push(ev(Channel::Agent, format!("a{i}")), t0);
        }
        buffer.push(ev(Channel::Gateway, "g0"), t0);
        buffer.flush();
        assert_eq!(texts(&buffer, Channel::Agent), vec!["a7", "a8", "a9"]);
        assert_eq!(texts(&buffer, Channel::Gateway), vec!["g0"]);
    }

    #[test]
    fn test_flush_sanitizes_text() {
        let mut buffer = ChannelBuffer::default();
        buffer.push(
            LogEvent::new(Channel::Gateway, Stream::Stderr, "\x1b[31mERROR\x1b[0m: boom  "),
            Instant::now(),
        );
        buffer.flush();
        assert_eq!(buffer.rendered(Channel::Gateway), vec!["[stderr] ERROR: boom"]);
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let t0 = Instant::now();
        let mut buffer = ChannelBuffer::default();
        buffer.push(ev(Channel::Agent, "x"), t0);
        buffer.clear();
        // A timer that fires after a manual clear finds nothing to do.
        assert!(buffer.poll(t0 + Duration::from_secs(1)).is_none());
        assert_eq!(buffer.flush(), FlushOutcome::default());
        assert_eq!(buffer.committed_len(Channel::Agent), 0);
    }

    #[test]
    fn test_seed_respects_cap_and_sanitizes() {
        let mut buffer = small(10, 2);
        let snapshot = Snapshot::from_events(vec![
            ev(Channel::Agent, "old"),
            ev(Channel::Agent, "\x1b[1mmid\x1b[0m"),
            ev(Channel::Agent, "new"),
        ]);
        buffer.seed(&snapshot);
        assert_eq!(texts(&buffer, Channel::Agent), vec!["mid", "new"]);
        assert_eq!(buffer.committed_total(Channel::Agent), 3);
    }

    #[test]
    fn test_committed_since_returns_only_new_lines() {
        let t0 = Instant::now();
        let mut buffer = small(10, 3);
        buffer.push(ev(Channel::Agent, "a"), t0);
        buffer.flush();
        let seen = buffer.committed_total(Channel::Agent);
        for t in ["b", "c", "d", "e"] {
            buffer.push(ev(Channel::Agent, t), t0);
        }
        buffer.flush();
        let fresh: Vec<_> = buffer
            .committed_since(Channel::Agent, seen)
            .map(|e| e.text.as_str())
            .collect();
        // "b" was pushed after `seen` but already evicted by the cap.
        assert_eq!(fresh, vec!["c", "d", "e"]);
    }
}
