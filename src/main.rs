// logsift - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation (debug mode support)
// 3. Dispatch to the classify / sanitize / watch subcommands

use clap::{Parser, Subcommand};
use logsift::app::buffer::{BufferConfig, ChannelBuffer};
use logsift::app::pipeline::LogPipeline;
use logsift::app::producer::{spawn_reader, LogStore};
use logsift::core::classify::classify;
use logsift::core::model::{Channel, Stream};
use logsift::core::sanitize::{sanitize, strip_ansi};
use logsift::platform::config::{load_config, AppConfig, PlatformPaths};
use logsift::platform::fs::read_input;
use logsift::ui::term::{format_segments, format_segments_json, TailPrinter};
use logsift::util::constants;
use logsift::util::error::{LogSiftError, Result, WorkerError};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "logsift", version, about)]
struct Cli {
    /// Path to config.toml (default: platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split an assistant message into conversation and diagnostic blocks.
    Classify {
        /// Input file (default: stdin).
        file: Option<PathBuf>,

        /// Print the segments as JSON.
        #[arg(long)]
        json: bool,

        /// Keep non-colour escape sequences in the input.
        #[arg(long)]
        raw: bool,
    },

    /// Strip colour codes and their debris from each input line.
    Sanitize {
        /// Input file (default: stdin).
        file: Option<PathBuf>,
    },

    /// Run the worker processes and stream their output.
    Watch {
        /// Agent command and arguments (overrides [workers] agent).
        #[arg(long, num_args = 1..)]
        agent: Vec<String>,

        /// Gateway command and arguments (overrides [workers] gateway).
        #[arg(long, num_args = 1..)]
        gateway: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (config, warnings) = load_config(&config_path);

    logsift::util::logging::init(
        cli.debug,
        config.log_level.as_deref(),
        config.log_file.as_deref(),
    );
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "logsift starting"
    );

    let result = match cli.command {
        Command::Classify { file, json, raw } => run_classify(file, json, raw),
        Command::Sanitize { file } => run_sanitize(file),
        Command::Watch { agent, gateway } => run_watch(&config, agent, gateway),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

// =============================================================================
// One-shot subcommands
// =============================================================================

fn run_classify(file: Option<PathBuf>, json: bool, raw: bool) -> Result<()> {
    let input = read_input(file.as_deref())?;
    let block = if raw { input } else { strip_ansi(&input) };
    let segments = classify(&block);

    tracing::debug!(
        main = segments.main.lines,
        debug = segments.debug.lines,
        tool = segments.tool.lines,
        subagent = segments.subagent.lines,
        "Classified message"
    );

    let rendered = if json {
        format_segments_json(&segments)?
    } else {
        format_segments(&segments)
    };
    let mut out = io::stdout().lock();
    writeln!(out, "{rendered}").map_err(stdout_error)
}

fn run_sanitize(file: Option<PathBuf>) -> Result<()> {
    let input = read_input(file.as_deref())?;
    let mut out = io::stdout().lock();
    for line in input.lines() {
        writeln!(out, "{}", sanitize(line)).map_err(stdout_error)?;
    }
    Ok(())
}

fn stdout_error(source: io::Error) -> LogSiftError {
    LogSiftError::Io {
        path: PathBuf::from("<stdout>"),
        operation: "write output",
        source,
    }
}

// =============================================================================
// watch
// =============================================================================

struct Worker {
    channel: Channel,
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

fn buffer_config(config: &AppConfig) -> BufferConfig {
    BufferConfig {
        pending_capacity: config.pending_capacity,
        committed_capacity: config.committed_capacity,
        flush_debounce: Duration::from_millis(config.flush_debounce_ms),
    }
}

fn spawn_worker(
    channel: Channel,
    command: &[String],
    store: &Arc<LogStore>,
    max_partial: usize,
) -> Result<Worker> {
    let (program, args) = command
        .split_first()
        .ok_or(WorkerError::EmptyCommand { channel })?;

    let mut child = ProcessCommand::new(program)
        .args(args)
        .envs(constants::WORKER_ENV)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| WorkerError::Spawn {
            channel,
            program: program.clone(),
            source,
        })?;

    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(Arc::clone(store), channel, Stream::Stdout, stdout, max_partial));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(Arc::clone(store), channel, Stream::Stderr, stderr, max_partial));
    }

    tracing::info!(%channel, program = %program, pid = child.id(), "Worker started");
    Ok(Worker {
        channel,
        child,
        readers,
    })
}

/// A command given on the CLI wins over the configured one.
fn pick_command(cli: Vec<String>, configured: &[String]) -> Vec<String> {
    if cli.is_empty() {
        configured.to_vec()
    } else {
        cli
    }
}

fn run_watch(config: &AppConfig, agent: Vec<String>, gateway: Vec<String>) -> Result<()> {
    let commands = [
        (Channel::Agent, pick_command(agent, &config.agent_command)),
        (Channel::Gateway, pick_command(gateway, &config.gateway_command)),
    ];
    if commands.iter().all(|(_, cmd)| cmd.is_empty()) {
        return Err(WorkerError::EmptyCommand {
            channel: Channel::Agent,
        }
        .into());
    }

    let store = Arc::new(LogStore::new(config.retained_lines));
    let mut pipeline = LogPipeline::new(ChannelBuffer::new(buffer_config(config)), store.subscribe()?);
    pipeline.show(store.as_ref());

    let mut workers = Vec::new();
    for (channel, command) in &commands {
        if command.is_empty() {
            tracing::info!(%channel, "No command configured; channel stays idle");
            continue;
        }
        match spawn_worker(*channel, command, &store, config.max_partial_line_bytes) {
            Ok(worker) => workers.push(worker),
            Err(e) => {
                stop_workers(&mut workers);
                return Err(e);
            }
        }
    }

    let result = watch_loop(&mut pipeline, &mut workers);
    if result.is_err() {
        stop_workers(&mut workers);
    }
    pipeline.shutdown(store.as_ref());
    result
}

/// Pump and print until every worker has exited and its pipes are drained.
fn watch_loop(pipeline: &mut LogPipeline, workers: &mut Vec<Worker>) -> Result<()> {
    let mut out = io::stdout().lock();
    let mut printer = TailPrinter::new();
    let mut finished: Vec<JoinHandle<()>> = Vec::new();

    while !workers.is_empty() {
        pipeline.pump(Instant::now());
        printer
            .write_new(&mut out, pipeline.buffer())
            .map_err(stdout_error)?;

        workers.retain_mut(|worker| match worker.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::info!(channel = %worker.channel, %status, "Worker exited");
                finished.append(&mut worker.readers);
                false
            }
            Err(e) => {
                tracing::warn!(channel = %worker.channel, error = %e, "Could not poll worker");
                finished.append(&mut worker.readers);
                false
            }
        });

        std::thread::sleep(pipeline.next_wakeup(Instant::now()));
    }

    // Readers emit the last fragment and the closing notice after the child
    // exits; wait for them before the final flush.
    for reader in finished {
        if reader.join().is_err() {
            tracing::warn!("Reader thread panicked");
        }
    }
    pipeline.drain(Instant::now());
    printer
        .write_new(&mut out, pipeline.buffer())
        .map_err(stdout_error)?;
    Ok(())
}

fn stop_workers(workers: &mut Vec<Worker>) {
    for worker in workers.iter_mut() {
        if let Err(e) = worker.child.kill() {
            tracing::warn!(channel = %worker.channel, error = %e, "Could not stop worker");
        }
        if let Err(e) = worker.child.wait() {
            tracing::warn!(channel = %worker.channel, error = %e, "Could not reap worker");
        }
    }
    workers.clear();
}
