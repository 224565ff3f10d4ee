// logsift - core/classify.rs
//
// Splits a block of assistant output into conversational text and three kinds
// of diagnostic noise: log lines (debug), tool invocations, sub-agent spawns.
//
// Workers write their logs to the same pipe as the reply, so a single physical
// line can hold both: "Sure! 2024-01-01 12:00:00 | INFO | ...". The earliest
// marker in the line is the split point; text before it stays in main.
//
// Per line, in order:
//   1. blank            -> debug inside a trace, else main (uncounted)
//   2. marker at > 0    -> prefix to main (uncounted), suffix routed
//   3. trace header     -> debug, enter trace
//   4. trace frame      -> debug
//   5. trace ended      -> fall through to 6 with the same line
//   6. marker at 0, or log-looking line -> routed whole; else main
//
// Routing precedence for diagnostic text: tool, then sub-agent, then debug.
//
// Core layer: pure, cannot fail.

use crate::core::model::{Bucket, ClassifiedSegments, Segment};
use crate::core::patterns::patterns;
use crate::core::sanitize::{looks_like_log_line, sanitize};
use crate::core::trace::{self, TraceState};

/// Classify one assistant message.
///
/// Every line contributes to exactly one bucket count, except blank lines
/// outside a trace, which are kept in main for paragraph breaks but not
/// counted. The conversational prefix of a split line is appended to main
/// without a count of its own; the line is counted where its diagnostic
/// suffix went.
pub fn classify(block: &str) -> ClassifiedSegments {
    let mut acc = Accumulator::default();
    let mut state = TraceState::Normal;
    for line in block.lines() {
        state = classify_line(line, state, &mut acc);
    }
    acc.finish()
}

/// Route one physical line and return the trace state for the next one.
fn classify_line(raw: &str, state: TraceState, acc: &mut Accumulator) -> TraceState {
    let p = patterns();
    // Complete colour sequences can never be content; removing them first keeps
    // a leading ESC[32m from hiding an offset-0 marker.
    let visible = p.csi.replace_all(raw, "");
    let line: &str = &visible;

    if line.trim().is_empty() {
        if state.in_trace() {
            acc.push(Bucket::Debug, String::new());
        } else {
            acc.push_uncounted(Bucket::Main, String::new());
        }
        return state;
    }

    let offset = marker_offset(line);
    if let Some(at) = offset.filter(|&at| at > 0) {
        let prefix = strip_reset_tail(line[..at].trim());
        if !prefix.is_empty() {
            acc.push_uncounted(Bucket::Main, prefix.to_string());
        }
        let diagnostic = sanitize(&line[at..]);
        acc.push(route(&diagnostic), diagnostic);
        return state;
    }

    let (step, next) = trace::step(state, line);
    if step.is_trace_line() {
        acc.push(Bucket::Debug, sanitize(line));
        return next;
    }

    let clean = sanitize(line);
    if offset == Some(0) || looks_like_log_line(&clean) {
        acc.push(route(&clean), clean);
    } else {
        acc.push(Bucket::Main, line.trim_end().to_string());
    }
    next
}

/// Earliest offset at which any diagnostic marker begins.
///
/// Markers are tried in a fixed order but the smallest offset wins, so the
/// order only matters when two start at the same byte.
fn marker_offset(line: &str) -> Option<usize> {
    let p = patterns();
    [&p.timestamp, &p.level_word, &p.logger_prefix, &p.tool, &p.subagent]
        .into_iter()
        .filter_map(|re| re.find(line).map(|m| m.start()))
        .min()
}

/// Bucket for a piece of diagnostic text.
fn route(text: &str) -> Bucket {
    let p = patterns();
    if p.tool.is_match(text) {
        Bucket::Tool
    } else if p.subagent.is_match(text) {
        Bucket::Subagent
    } else {
        Bucket::Debug
    }
}

/// Drop a colour-reset token left dangling where a line was split.
fn strip_reset_tail(prefix: &str) -> &str {
    match patterns().reset_tail.find(prefix) {
        Some(m) => prefix[..m.start()].trim_end(),
        None => prefix,
    }
}

// =============================================================================
// Bucket accumulation
// =============================================================================

#[derive(Default)]
struct Accumulator {
    main: Vec<String>,
    debug: Vec<String>,
    tool: Vec<String>,
    subagent: Vec<String>,
    counts: [usize; 4],
}

impl Accumulator {
    fn slot(bucket: Bucket) -> usize {
        match bucket {
            Bucket::Main => 0,
            Bucket::Debug => 1,
            Bucket::Tool => 2,
            Bucket::Subagent => 3,
        }
    }

    fn lines_mut(&mut self, bucket: Bucket) -> &mut Vec<String> {
        match bucket {
            Bucket::Main => &mut self.main,
            Bucket::Debug => &mut self.debug,
            Bucket::Tool => &mut self.tool,
            Bucket::Subagent => &mut self.subagent,
        }
    }

    fn push(&mut self, bucket: Bucket, line: String) {
        self.counts[Self::slot(bucket)] += 1;
        self.push_uncounted(bucket, line);
    }

    fn push_uncounted(&mut self, bucket: Bucket, line: String) {
        self.lines_mut(bucket).push(line);
    }

    fn finish(self) -> ClassifiedSegments {
        let segment = |lines: Vec<String>, count: usize| Segment {
            text: lines.join("\n").trim().to_string(),
            lines: count,
        };
        ClassifiedSegments {
            main: segment(self.main, self.counts[0]),
            debug: segment(self.debug, self.counts[1]),
            tool: segment(self.tool, self.counts[2]),
            subagent: segment(self.subagent, self.counts[3]),
        }
    }
}
