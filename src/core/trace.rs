// logsift - core/trace.rs
//
// Groups multi-line Python exception reports so that every frame line lands
// in the debug bucket alongside its header.
//
// The state is a plain value threaded through the classifier's line loop.
// It never outlives one `classify` call.

use crate::core::patterns::patterns;

/// Whether the previous line left us inside an exception report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceState {
    #[default]
    Normal,
    InTrace,
}

impl TraceState {
    pub fn in_trace(self) -> bool {
        self == TraceState::InTrace
    }
}

/// What a non-blank line means for the trace currently being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStep {
    /// The line opens a new report (also when one is already open).
    Header,
    /// The line is a frame, source excerpt or caret underline of the open report.
    Continuation,
    /// The open report ended before this line; the line itself is ordinary.
    Ended,
    /// No report is open and the line does not start one.
    Outside,
}

impl TraceStep {
    /// True when the line belongs to the report and goes to the debug bucket.
    pub fn is_trace_line(self) -> bool {
        matches!(self, TraceStep::Header | TraceStep::Continuation)
    }
}

/// Advance the trace state machine by one non-blank line.
///
/// Returns the interpretation of `line` and the state for the next line.
pub fn step(state: TraceState, line: &str) -> (TraceStep, TraceState) {
    let p = patterns();
    if p.trace_header.is_match(line) {
        return (TraceStep::Header, TraceState::InTrace);
    }
    match state {
        TraceState::InTrace if p.trace_continuation.is_match(line) => {
            (TraceStep::Continuation, TraceState::InTrace)
        }
        TraceState::InTrace => (TraceStep::Ended, TraceState::Normal),
        TraceState::Normal => (TraceStep::Outside, TraceState::Normal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(lines: &[&str]) -> Vec<TraceStep> {
        let mut state = TraceState::default();
        lines
            .iter()
            .map(|line| {
                let (s, next) = step(state, line);
                state = next;
                s
            })
            .collect()
    }

    #[test]
    fn test_full_python_traceback() {
        let steps = run(&[
            "Traceback (most recent call last):",
            "  File \"/app/main.py\", line 3, in <module>",
            "    run()",
            "    ^^^^^",
            "ValueError: bad value",
            "Back to normal",
        ]);
        assert_eq!(
            steps,
            vec![
                TraceStep::Header,
                TraceStep::Continuation,
                TraceStep::Continuation,
                TraceStep::Continuation,
                TraceStep::Header,
                TraceStep::Ended,
            ]
        );
    }

    #[test]
    fn test_indented_line_outside_trace_is_ordinary() {
        assert_eq!(run(&["    code sample"]), vec![TraceStep::Outside]);
    }

    #[test]
    fn test_unindented_file_line_continues() {
        let steps = run(&["Exception ignored in: <socket>", "File \"x.py\", line 9"]);
        assert_eq!(steps, vec![TraceStep::Header, TraceStep::Continuation]);
    }

    #[test]
    fn test_state_resets_after_end() {
        let (_, state) = step(TraceState::InTrace, "plain");
        assert_eq!(state, TraceState::Normal);
        assert!(!state.in_trace());
    }
}
