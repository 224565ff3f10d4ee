// logsift - tests/e2e_pipeline.rs
//
// End-to-end tests for the ingestion pipeline, the classifier and the CLI.
//
// These tests exercise real reader threads over in-memory pipes, the real
// mpsc subscription, real config files in a temp directory, and the built
// binary itself. No mocks.

use logsift::app::buffer::{BufferConfig, ChannelBuffer};
use logsift::app::gate::LogProducer;
use logsift::app::pipeline::LogPipeline;
use logsift::app::producer::{spawn_reader, LogStore};
use logsift::core::classify::classify;
use logsift::core::model::{Channel, Stream};
use logsift::platform::config::load_config;
use logsift::util::constants;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to an on-disk fixture file.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Run readers for the given (channel, stream, bytes) inputs to completion.
fn feed(store: &Arc<LogStore>, inputs: Vec<(Channel, Stream, Vec<u8>)>) {
    let handles: Vec<_> = inputs
        .into_iter()
        .map(|(channel, stream, bytes)| {
            spawn_reader(
                Arc::clone(store),
                channel,
                stream,
                Cursor::new(bytes),
                constants::DEFAULT_MAX_PARTIAL_LINE_BYTES,
            )
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

// =============================================================================
// Pipeline E2E
// =============================================================================

/// Output produced while the view is visible streams through the debounce
/// and lands sanitized, in order, per channel.
#[test]
fn e2e_visible_pipeline_streams_sanitized_lines() {
    let store = Arc::new(LogStore::default());
    let mut pipeline = LogPipeline::new(ChannelBuffer::default(), store.subscribe().unwrap());
    pipeline.show(store.as_ref());

    feed(
        &store,
        vec![
            (
                Channel::Agent,
                Stream::Stdout,
                b"\x1b[32m2024-05-01 09:00:00\x1b[0m | INFO | booting\r\nready\n".to_vec(),
            ),
            (Channel::Gateway, Stream::Stderr, b"listening on :18790\n".to_vec()),
        ],
    );

    let t0 = Instant::now();
    let report = pipeline.pump(t0);
    assert_eq!(report.received, 5, "{report:?}");
    assert!(!report.flushed, "flush must wait for the debounce");

    let report = pipeline.pump(t0 + Duration::from_millis(constants::DEFAULT_FLUSH_DEBOUNCE_MS));
    assert!(report.flushed);

    assert_eq!(
        pipeline.buffer().rendered(Channel::Agent),
        vec![
            "[stdout] 2024-05-01 09:00:00 | INFO | booting",
            "[stdout] ready",
            "[stderr] Process exited or stream closed",
        ]
    );
    assert_eq!(
        pipeline.buffer().rendered(Channel::Gateway),
        vec![
            "[stderr] listening on :18790",
            "[stderr] Process exited or stream closed",
        ]
    );
}

/// Output produced while hidden is not streamed, but shows up from the
/// producer's retained lines as soon as the view is shown.
#[test]
fn e2e_hidden_output_is_recovered_on_show() {
    let store = Arc::new(LogStore::default());
    let mut pipeline = LogPipeline::new(ChannelBuffer::default(), store.subscribe().unwrap());

    feed(&store, vec![(Channel::Agent, Stream::Stdout, b"one\ntwo\n".to_vec())]);
    assert_eq!(pipeline.pump(Instant::now()).received, 0);
    assert!(!store.is_streaming().unwrap());

    pipeline.show(store.as_ref());
    assert!(store.is_streaming().unwrap());
    assert_eq!(
        pipeline.buffer().rendered(Channel::Agent),
        vec![
            "[stdout] one",
            "[stdout] two",
            "[stderr] Process exited or stream closed",
        ]
    );

    pipeline.hide(store.as_ref());
    assert!(!store.is_streaming().unwrap());
    // Stale lines survive until the next show.
    assert_eq!(pipeline.buffer().committed_len(Channel::Agent), 3);
}

/// A flood larger than every cap keeps only the newest lines.
#[test]
fn e2e_flood_respects_caps() {
    let store = Arc::new(LogStore::new(50));
    let buffer = ChannelBuffer::new(BufferConfig {
        pending_capacity: 30,
        committed_capacity: 10,
        flush_debounce: Duration::from_millis(200),
    });
    let mut pipeline = LogPipeline::new(buffer, store.subscribe().unwrap());
    pipeline.show(store.as_ref());

    let text: String = (0..500).map(|i| format!("line {i}\n")).collect();
    feed(&store, vec![(Channel::Gateway, Stream::Stdout, text.into_bytes())]);

    pipeline.drain(Instant::now());
    let lines = pipeline.buffer().rendered(Channel::Gateway);
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "[stdout] line 491");
    assert_eq!(lines[8], "[stdout] line 499");
    assert_eq!(lines[9], "[stderr] Process exited or stream closed");
    assert_eq!(store.retained_len().unwrap(), 50);

    let snapshot = store.snapshot().unwrap();
    assert_eq!(snapshot.gateway.len(), 50);
}

// =============================================================================
// Classifier E2E
// =============================================================================

/// A realistic agent reply with interleaved logs, a tool call, a sub-agent
/// spawn and a traceback.
#[test]
fn e2e_classifies_agent_reply_fixture() {
    let block = fs::read_to_string(fixture("agent_reply.txt")).unwrap();
    let out = classify(&block);

    assert_eq!(
        out.main.text,
        "Here is what I found about the weather in Paris.\n\
         Let me look that up.\n\
         \n  - Today: 21°C, light wind\n  - Tomorrow: showers\n\
         \nAnything else you would like to know?"
    );
    assert_eq!(out.main.lines, 4);

    assert_eq!(out.tool.lines, 1);
    assert!(out.tool.text.starts_with("2024-05-01 09:00:01.004 | INFO"));
    assert!(out.tool.text.ends_with("Tool call: web_search({\"query\": \"paris weather\"})"));

    assert_eq!(out.subagent.lines, 1);
    assert!(out.subagent.text.contains("Spawned subagent [a1b2c3]"));

    assert_eq!(out.debug.lines, 7);
    assert!(out.debug.text.starts_with(
        "2024-05-01 09:00:00.123 | INFO     | nanobot.agent.loop:_process_message:180 - Processing message from cli:user\n\
         Traceback (most recent call last):"
    ));
    assert!(out.debug.text.ends_with("ValueError: queue closed"));
    assert!(!out.debug.text.contains('\x1b'));

    assert_eq!(out.total_lines(), 13);
}

// =============================================================================
// Config E2E
// =============================================================================

#[test]
fn e2e_config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(constants::CONFIG_FILE_NAME);

    // Missing file: defaults, no warnings.
    let (config, warnings) = load_config(&path);
    assert!(warnings.is_empty());
    assert_eq!(config.committed_capacity, constants::DEFAULT_COMMITTED_CAPACITY);

    fs::write(
        &path,
        "[buffer]\ncommitted_capacity = 500\npending_capacity = 999999\n\n[workers]\nagent = [\"nanobot\", \"agent\"]\n",
    )
    .unwrap();
    let (config, warnings) = load_config(&path);
    assert_eq!(config.committed_capacity, 500);
    assert_eq!(config.pending_capacity, constants::DEFAULT_PENDING_CAPACITY);
    assert_eq!(config.agent_command, vec!["nanobot", "agent"]);
    assert_eq!(warnings.len(), 1, "{warnings:?}");

    fs::write(&path, "[buffer\nbroken").unwrap();
    let (config, warnings) = load_config(&path);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("parse error"), "{}", warnings[0]);
    assert_eq!(config.pending_capacity, constants::DEFAULT_PENDING_CAPACITY);
}

// =============================================================================
// CLI E2E
// =============================================================================

fn cli(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_logsift"));
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn e2e_cli_classify_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(&dir)
        .arg("classify")
        .arg(fixture("agent_reply.txt"))
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["main"]["lines"], 4);
    assert_eq!(value["tool"]["lines"], 1);
    assert_eq!(value["subagent"]["lines"], 1);
    assert_eq!(value["debug"]["lines"], 7);
}

#[test]
fn e2e_cli_sanitize_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.log");
    fs::write(&input, "\x1b[31mERROR\x1b[0m: boom   \n32m2024-01-01 | INFO | ok\n").unwrap();

    let output = cli(&dir).arg("sanitize").arg(&input).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "ERROR: boom\n2024-01-01 | INFO | ok\n"
    );
}

#[test]
fn e2e_cli_watch_without_commands_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli(&dir).arg("watch").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--agent"));
}

#[cfg(unix)]
#[test]
fn e2e_cli_watch_streams_worker_output() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("agent.sh");
    fs::write(&script, "echo hello\necho oops 1>&2\n").unwrap();

    let output = cli(&dir)
        .arg("watch")
        .arg("--agent")
        .arg("sh")
        .arg(&script)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[agent][stdout] hello\n"), "{stdout}");
    assert!(stdout.contains("[agent][stderr] oops\n"), "{stdout}");
    assert_eq!(stdout.matches("[agent][stderr] Process exited or stream closed").count(), 2);
    assert!(!stdout.contains("[gateway]"));
}
