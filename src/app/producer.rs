// logsift - app/producer.rs
//
// Producer side of the pipeline: reader threads turn worker pipes into
// `LogEvent`s and hand them to a shared `LogStore`.
//
// Architecture:
//   - One `spawn_reader` thread per worker stream (agent stdout, agent stderr,
//     gateway stdout, gateway stderr). Each owns a `LineSplitter`.
//   - `LogStore` keeps the most recent events across both channels for
//     snapshots, and forwards events to mpsc subscribers only while streaming
//     is enabled. Retention happens regardless of streaming.
//   - Subscribers whose receiver was dropped are pruned on the next send.
//
// Encoding: chunks are decoded as lossy UTF-8. A multi-byte character cut in
// half by a read boundary is carried over to the next chunk instead of being
// replaced.

use crate::app::gate::LogProducer;
use crate::core::model::{Channel, LogEvent, Snapshot, Stream};
use crate::core::sanitize::truncate_preview;
use crate::util::constants::{
    DEBUG_MAX_LINE_PREVIEW, DEFAULT_MAX_PARTIAL_LINE_BYTES, DEFAULT_RETAINED_LINES,
    READ_CHUNK_BYTES, STREAM_CLOSED_MESSAGE,
};
use crate::util::error::StreamError;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

// =============================================================================
// LogStore
// =============================================================================

#[derive(Debug)]
struct StoreState {
    retained: VecDeque<LogEvent>,
    capacity: usize,
    streaming: bool,
    subscribers: Vec<mpsc::Sender<LogEvent>>,
}

/// Thread-safe store of recent worker output with a push subscription.
#[derive(Debug)]
pub struct LogStore {
    state: Mutex<StoreState>,
}

impl LogStore {
    /// Create a store retaining at most `retained_lines` events (minimum 1).
    /// Streaming starts disabled.
    pub fn new(retained_lines: usize) -> Self {
        Self {
            state: Mutex::new(StoreState {
                retained: VecDeque::new(),
                capacity: retained_lines.max(1),
                streaming: false,
                subscribers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StreamError> {
        self.state.lock().map_err(|_| StreamError::StateLock)
    }

    /// Register a new subscriber. It receives events emitted from now on while
    /// streaming is enabled.
    pub fn subscribe(&self) -> Result<mpsc::Receiver<LogEvent>, StreamError> {
        let (tx, rx) = mpsc::channel();
        self.lock()?.subscribers.push(tx);
        Ok(rx)
    }

    /// Retain an event and, while streaming, push it to every live subscriber.
    pub fn emit(&self, event: LogEvent) -> Result<(), StreamError> {
        tracing::trace!(
            channel = %event.channel,
            stream = %event.stream,
            line = %truncate_preview(&event.text, DEBUG_MAX_LINE_PREVIEW),
            "Worker output"
        );

        let mut state = self.lock()?;
        if state.streaming {
            let before = state.subscribers.len();
            state.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
            let pruned = before - state.subscribers.len();
            if pruned > 0 {
                tracing::debug!(pruned, "Dropped closed log subscribers");
            }
        }
        state.retained.push_back(event);
        while state.retained.len() > state.capacity {
            state.retained.pop_front();
        }
        Ok(())
    }

    pub fn is_streaming(&self) -> Result<bool, StreamError> {
        Ok(self.lock()?.streaming)
    }

    pub fn retained_len(&self) -> Result<usize, StreamError> {
        Ok(self.lock()?.retained.len())
    }

    pub fn subscriber_count(&self) -> Result<usize, StreamError> {
        Ok(self.lock()?.subscribers.len())
    }
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_LINES)
    }
}

impl LogProducer for LogStore {
    fn set_streaming(&self, enabled: bool) -> Result<(), StreamError> {
        self.lock()?.streaming = enabled;
        tracing::debug!(enabled, "Log streaming toggled");
        Ok(())
    }

    fn snapshot(&self) -> Result<Snapshot, StreamError> {
        let state = self.lock()?;
        Ok(Snapshot::from_events(state.retained.iter().cloned()))
    }
}

// =============================================================================
// LineSplitter
// =============================================================================

/// Reassembles lines from arbitrarily sized byte chunks.
#[derive(Debug)]
pub struct LineSplitter {
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 sequence from the last chunk.
    carry: Vec<u8>,
    max_partial: usize,
}

impl LineSplitter {
    pub fn new(max_partial: usize) -> Self {
        Self {
            pending: String::new(),
            carry: Vec::new(),
            max_partial,
        }
    }

    /// Feed one chunk and return the complete, non-blank lines it finished.
    ///
    /// `\n` and `\r` both terminate a line, so `\r\n` yields one line plus an
    /// empty one that is skipped. A fragment that grows past the partial limit
    /// without a terminator is emitted as a line of its own.
    pub fn push_chunk(&mut self, bytes: &[u8]) -> Vec<String> {
        self.decode(bytes);

        let mut lines = Vec::new();
        while let Some(at) = self.pending.find(|c: char| c == '\n' || c == '\r') {
            let line = self.pending[..at].trim_end().to_string();
            self.pending.drain(..=at);
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }

        if self.pending.len() > self.max_partial {
            let line = self.pending.trim_end().to_string();
            self.pending.clear();
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// End of stream: return whatever unterminated text is left.
    pub fn finish(&mut self) -> Option<String> {
        if !self.carry.is_empty() {
            let carry = std::mem::take(&mut self.carry);
            self.pending.push_str(&String::from_utf8_lossy(&carry));
        }
        let rest = std::mem::take(&mut self.pending);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest.trim_end().to_string())
        }
    }

    fn decode(&mut self, bytes: &[u8]) {
        let mut data = std::mem::take(&mut self.carry);
        data.extend_from_slice(bytes);
        let mut rest = data.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.pending.push_str(valid);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.pending.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the very end: hold it back.
                        None => {
                            self.carry = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PARTIAL_LINE_BYTES)
    }
}

// =============================================================================
// Reader threads
// =============================================================================

/// Read a worker pipe on a background thread until EOF, emitting each line.
///
/// When the stream ends (or a read fails) a closing notice is emitted on the
/// channel's stderr so the log view shows that the worker went away.
pub fn spawn_reader<R>(
    store: Arc<LogStore>,
    channel: Channel,
    stream: Stream,
    mut reader: R,
    max_partial: usize,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK_BYTES];
        let mut splitter = LineSplitter::new(max_partial);
        let emit = |text: String| store.emit(LogEvent::new(channel, stream, text));

        tracing::debug!(%channel, %stream, "Reader started");
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(%channel, %stream, error = %e, "Worker pipe read failed");
                    break;
                }
            };
            for line in splitter.push_chunk(&buf[..n]) {
                if let Err(e) = emit(line) {
                    tracing::warn!(%channel, %stream, error = %e, "Log store unavailable; reader stopping");
                    return;
                }
            }
        }

        let closing = splitter
            .finish()
            .map(|rest| LogEvent::new(channel, stream, rest))
            .into_iter()
            .chain(std::iter::once(LogEvent::new(
                channel,
                Stream::Stderr,
                STREAM_CLOSED_MESSAGE,
            )));
        for event in closing {
            if let Err(e) = store.emit(event) {
                tracing::warn!(%channel, %stream, error = %e, "Log store unavailable; reader stopping");
                return;
            }
        }
        tracing::debug!(%channel, %stream, "Reader finished");
    })
}
