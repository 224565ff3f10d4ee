// logsift - ui/term.rs
//
// Plain-text rendering for the terminal front end.
// Pure formatting over core/app read-only state; writing is left to the
// caller except for `TailPrinter`, which takes any `io::Write`.

use crate::app::buffer::ChannelBuffer;
use crate::core::model::{Bucket, Channel, ClassifiedSegments, LogEvent};
use std::io::{self, Write};

/// Diagnostic blocks in display order, after the main text.
const DIAGNOSTIC_ORDER: [Bucket; 3] = [Bucket::Tool, Bucket::Subagent, Bucket::Debug];

/// One committed line with its channel tag: `[agent][stderr] text`.
pub fn format_event(event: &LogEvent) -> String {
    format!("[{}]{}", event.channel, event.rendered())
}

/// Heading for a diagnostic block, e.g. `--- Tool (2 lines) ---`.
pub fn block_heading(bucket: Bucket, lines: usize) -> String {
    let unit = if lines == 1 { "line" } else { "lines" };
    format!("--- {} ({lines} {unit}) ---", bucket.label())
}

/// Render a classified message: main text first, then each non-empty
/// diagnostic block under its heading.
pub fn format_segments(segments: &ClassifiedSegments) -> String {
    let mut parts: Vec<String> = Vec::new();
    if !segments.main.is_empty() {
        parts.push(segments.main.text.clone());
    }
    for bucket in DIAGNOSTIC_ORDER {
        let segment = segments.get(bucket);
        if segment.is_empty() {
            continue;
        }
        parts.push(format!("{}\n{}", block_heading(bucket, segment.lines), segment.text));
    }
    parts.join("\n\n")
}

/// Machine-readable form of a classified message.
pub fn format_segments_json(segments: &ClassifiedSegments) -> serde_json::Result<String> {
    serde_json::to_string_pretty(segments)
}

/// Prints only the lines committed since the last call, per channel.
#[derive(Debug, Default)]
pub struct TailPrinter {
    seen: [u64; 2],
}

impl TailPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write newly committed lines for both channels. Returns how many were
    /// written.
    pub fn write_new(&mut self, out: &mut impl Write, buffer: &ChannelBuffer) -> io::Result<usize> {
        let mut written = 0;
        for channel in Channel::ALL {
            let seen = &mut self.seen[channel.index()];
            for event in buffer.committed_since(channel, *seen) {
                writeln!(out, "{}", format_event(event))?;
                written += 1;
            }
            *seen = buffer.committed_total(channel);
        }
        if written > 0 {
            out.flush()?;
        }
        Ok(written)
    }
}
