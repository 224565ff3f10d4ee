// logsift - core/model.rs
//
// Core data model types. Pure data definitions with no I/O, no threads,
// no platform dependencies.
//
// These types are the shared vocabulary across all layers.

use serde::Serialize;
use std::fmt;

// =============================================================================
// Channel / stream
// =============================================================================

/// One of the two independent worker processes whose output is tracked
/// separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Agent,
    Gateway,
}

impl Channel {
    /// Both channels, in display order.
    pub const ALL: [Channel; 2] = [Channel::Agent, Channel::Gateway];

    /// Stable array index for per-channel storage.
    pub fn index(self) -> usize {
        match self {
            Channel::Agent => 0,
            Channel::Gateway => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Channel::Agent => "agent",
            Channel::Gateway => "gateway",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which pipe of the worker a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    pub fn label(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Log event
// =============================================================================

/// A single line of worker output.
///
/// Arrival order matters within a channel and nowhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub channel: Channel,
    pub stream: Stream,
    pub text: String,
}

impl LogEvent {
    pub fn new(channel: Channel, stream: Stream, text: impl Into<String>) -> Self {
        Self {
            channel,
            stream,
            text: text.into(),
        }
    }

    /// Display form: the text prefixed by its originating stream.
    pub fn rendered(&self) -> String {
        format!("[{}] {}", self.stream, self.text)
    }
}

// =============================================================================
// Classification output
// =============================================================================

/// The four classification outcomes for a line of assistant output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Conversational text, rendered rich.
    Main,
    /// Log lines and exception tracebacks.
    Debug,
    /// Tool-invocation traces.
    Tool,
    /// Sub-agent spawn traces.
    Subagent,
}

impl Bucket {
    pub fn label(self) -> &'static str {
        match self {
            Bucket::Main => "Main",
            Bucket::Debug => "Debug",
            Bucket::Tool => "Tool",
            Bucket::Subagent => "Subagent",
        }
    }
}

/// One bucket's share of a classified block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Routed lines joined with newlines, surrounding whitespace trimmed.
    pub text: String,
    /// Number of lines routed to this bucket.
    pub lines: usize,
}

impl Segment {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Result of one classification pass over an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedSegments {
    pub main: Segment,
    pub debug: Segment,
    pub tool: Segment,
    pub subagent: Segment,
}

impl ClassifiedSegments {
    pub fn get(&self, bucket: Bucket) -> &Segment {
        match bucket {
            Bucket::Main => &self.main,
            Bucket::Debug => &self.debug,
            Bucket::Tool => &self.tool,
            Bucket::Subagent => &self.subagent,
        }
    }

    /// Sum of all per-bucket line counts.
    pub fn total_lines(&self) -> usize {
        self.main.lines + self.debug.lines + self.tool.lines + self.subagent.lines
    }
}

// =============================================================================
// Producer snapshot
// =============================================================================

/// Lines currently retained by the producer, split per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub agent: Vec<LogEvent>,
    pub gateway: Vec<LogEvent>,
}

impl Snapshot {
    pub fn for_channel(&self, channel: Channel) -> &[LogEvent] {
        match channel {
            Channel::Agent => &self.agent,
            Channel::Gateway => &self.gateway,
        }
    }

    /// Split a mixed, arrival-ordered sequence into per-channel lists.
    pub fn from_events(events: impl IntoIterator<Item = LogEvent>) -> Self {
        let mut snapshot = Self::default();
        for event in events {
            match event.channel {
                Channel::Agent => snapshot.agent.push(event),
                Channel::Gateway => snapshot.gateway.push(event),
            }
        }
        snapshot
    }
}
