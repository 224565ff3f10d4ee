// logsift - core/sanitize.rs
//
// Removes terminal colour codes and their debris from worker output lines.
//
// Two passes with different risk profiles:
//   1. Complete CSI sequences (ESC [ ... m) are always removed; they can never
//      be legitimate text.
//   2. Orphaned `32m`-style fragments, left behind when the ESC byte was lost
//      upstream, are only removed from lines that already look machine
//      generated. Applied to prose the same rule would eat "32m" in
//      "he ran 32m".
//
// Core layer: pure functions, no I/O.

use crate::core::patterns::patterns;
use regex::Regex;
use std::borrow::Cow;

/// Clean a single line for display.
///
/// Idempotent: `sanitize(&sanitize(x)) == sanitize(x)`.
pub fn sanitize(line: &str) -> String {
    let p = patterns();
    let mut text = replace_until_stable(&p.csi, line, "");
    if looks_like_log_line(&text) {
        text = strip_orphan_fragments(&text);
    }
    text.truncate(text.trim_end().len());
    text
}

/// Heuristic test for machine-generated log output.
///
/// True for a leading `LEVEL:` marker, a `| LEVEL |` field, any literal pipe,
/// or a dotted logger location such as `pkg.module:func:12`.
pub fn looks_like_log_line(line: &str) -> bool {
    let p = patterns();
    p.level_line.is_match(line) || line.contains('|') || p.logger_prefix.is_match(line)
}

/// Remove every escape sequence from `input`.
///
/// CSI sequences (`ESC [`) run to the first final byte in `@`..=`~`, OSC
/// sequences (`ESC ]`) to BEL or `ESC \`, and any other escape covers ESC and
/// the one character after it. Unlike [`sanitize`] this also drops cursor
/// movement and erase sequences.
pub fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\u{1b}' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('[') => {
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            Some(']') => {
                while let Some(next) = chars.next() {
                    if next == '\u{7}' {
                        break;
                    }
                    if next == '\u{1b}' {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// Truncate to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Remove `[32m` and `32m` debris until neither pattern matches.
fn strip_orphan_fragments(text: &str) -> String {
    let p = patterns();
    let mut current = text.to_string();
    loop {
        let next = replace_until_stable(&p.bracket_fragment, &current, "${1}");
        let next = replace_until_stable(&p.orphan_fragment, &next, "${1}${2}");
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Apply `re` repeatedly until nothing matches.
///
/// A single `replace_all` is not enough: removing one sequence can join its
/// neighbours into a new match (`ESC[ESC[1mm`), and a match consumes the
/// delimiter the next candidate needs. Every round strictly shortens the
/// text, so this terminates.
fn replace_until_stable(re: &Regex, text: &str, rep: &str) -> String {
    let mut current = match re.replace_all(text, rep) {
        Cow::Borrowed(_) => return text.to_string(),
        Cow::Owned(s) => s,
    };
    loop {
        let next = match re.replace_all(&current, rep) {
            Cow::Owned(next) => next,
            Cow::Borrowed(_) => return current,
        };
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_csi_codes() {
        assert_eq!(
            sanitize("\x1b[32mINFO\x1b[0m: \x1b[1;31mready\x1b[0m"),
            "INFO: ready"
        );
    }

    #[test]
    fn test_strips_fragment_before_date_when_piped() {
        assert_eq!(
            sanitize("32m2024-01-01 12:00:00 | INFO | message"),
            "2024-01-01 12:00:00 | INFO | message"
        );
    }

    #[test]
    fn test_prose_fragment_untouched() {
        assert_eq!(sanitize("he said 32m times"), "he said 32m times");
        assert_eq!(sanitize("ran 5mi today"), "ran 5mi today");
    }

    #[test]
    fn test_strips_chained_and_bracketed_fragments() {
        assert_eq!(sanitize("[1m[32mINFO[0m| started"), "INFO| started");
        // Only debris followed by a date, pipe or letter is removed.
        assert_eq!(sanitize("[32mINFO[0m | started"), "INFO[0m | started");
        assert_eq!(
            sanitize("0;36mnanobot.agent.loop:run:12 - 0mhello"),
            "nanobot.agent.loop:run:12 - hello"
        );
    }

    #[test]
    fn test_fragment_consuming_delimiter_needs_second_round() {
        // The first match eats the pipe the second fragment is anchored on.
        assert_eq!(sanitize("32m|32mINFO"), "|INFO");
    }

    #[test]
    fn test_trims_trailing_whitespace_only() {
        assert_eq!(sanitize("   indented  \t "), "   indented");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "plain text",
            "he said 32m times",
            "32m2024-01-01 12:00:00 | INFO | message",
            "\x1b[\x1b[31mm|x",
            "32m|32mINFO",
            "[0m[33mWARNING[0m: 1m2m3mdone   ",
            "ERROR: 5m",
            "a.b:c:1 12mfoo 7m|bar",
            "| \x1b[1m\x1b",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_heuristic() {
        assert!(looks_like_log_line("INFO: x"));
        assert!(looks_like_log_line("a | b"));
        assert!(looks_like_log_line("nanobot.cli.commands:main:40 - go"));
        assert!(!looks_like_log_line("Hello world."));
    }

    #[test]
    fn test_strip_ansi_removes_all_sequences() {
        assert_eq!(strip_ansi("\x1b[2K\x1b[1Gdone \x1b[32mok\x1b[0m"), "done ok");
        assert_eq!(strip_ansi("no escapes"), "no escapes");
        assert_eq!(strip_ansi("\x1b]0;title\x07after"), "after");
    }

    #[test]
    fn test_truncate_preview_is_char_safe() {
        assert_eq!(truncate_preview("héllo", 10), "héllo");
        assert_eq!(truncate_preview("héllo", 2), "hé...");
    }
}
