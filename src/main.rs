use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use biomonitor_console::data::duration::format_duration;
use biomonitor_console::events::drain;
use biomonitor_console::{
    Console, ConsoleConfig, HttpClient, LoadOutcome, MetricKind, NavigationIntent,
    NavigationReceiver, ResourceClient,
};
use biomonitor_types::{HistoryParams, NewAnnotation, NewSession, SessionCommand};

/// Bar glyphs for sparkline levels 0..=7.
const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Parser, Debug)]
#[command(name = "biomonitor-console")]
#[command(about = "Session and streaming console for a biomonitoring device server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server base URL (overrides the configuration)
    #[arg(short, long, global = true)]
    endpoint: Option<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query device connectivity
    Status,
    /// List recorded sessions
    Sessions,
    /// Show one session with its annotations
    Show { id: String },
    /// Create a session
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a session and print the remaining ones
    Delete { id: String },
    /// Annotate a session at a point in time
    Annotate {
        session: String,
        #[arg(long)]
        time: f64,
        #[arg(long)]
        text: String,
        /// Attach the annotation to one physical channel
        #[arg(long)]
        channel: Option<u32>,
    },
    /// Delete an annotation
    Unannotate { id: String },
    /// Start or stop data collection for a session
    Command { session: String, action: Action },
    /// Print the archived data of a session
    History {
        session: String,
        #[arg(long)]
        min: Option<f64>,
        #[arg(long)]
        max: Option<f64>,
        /// Restrict to a physical channel (repeatable)
        #[arg(long = "channel")]
        channels: Vec<u32>,
    },
    /// Follow the live stream of a session until Ctrl-C
    Watch {
        session: String,
        /// Seconds of data per stream request (defaults to polling.window_span)
        #[arg(long)]
        span: Option<f64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Action {
    Start,
    Stop,
}

impl From<Action> for SessionCommand {
    fn from(action: Action) -> Self {
        match action {
            Action::Start => SessionCommand::StartCollection,
            Action::Stop => SessionCommand::StopCollection,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = ConsoleConfig::load(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        config.server.endpoint = endpoint;
    }

    let client = HttpClient::builder()
        .endpoint(config.server.endpoint.clone())
        .timeout(config.server.timeout()?)
        .build()
        .context("failed to build HTTP client")?;
    info!(source = %client.description(), "using biomonitor server");

    let (console, mut intents) = Console::new(Arc::new(client), config.channels.clone());
    let result = run(&console, &config, &mut intents, args.command).await;
    log_intents(&mut intents);
    result
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(
    console: &Console,
    config: &ConsoleConfig,
    intents: &mut NavigationReceiver,
    command: Command,
) -> Result<()> {
    match command {
        Command::Status => print_json(&console.monitor.check_status().await),
        Command::Sessions => print_json(&applied(console.sessions.list_sessions().await?)?),
        Command::Show { id } => print_json(&applied(console.sessions.get_session(&id).await?)?),
        Command::Create { name, description } => {
            let payload = NewSession {
                name,
                description,
                channels: config.channels.clone(),
            };
            print_json(&applied(console.sessions.create_session(payload).await?)?)
        }
        Command::Delete { id } => print_json(&applied(console.sessions.delete_session(&id).await?)?),
        Command::Annotate {
            session,
            time,
            text,
            channel,
        } => {
            let payload = NewAnnotation {
                owner_id: session,
                time,
                text,
                physical_channel: channel,
            };
            print_json(&console.sessions.create_annotation(payload).await?)
        }
        Command::Unannotate { id } => {
            console.sessions.delete_annotation(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::Command { session, action } => {
            applied(console.sessions.get_session(&session).await?)?;
            let command = SessionCommand::from(action);
            console.sessions.session_command(&session, command).await?;
            print_json(&serde_json::json!({ "id": session, "command": command }))
        }
        Command::History {
            session,
            min,
            max,
            channels,
        } => {
            let params = HistoryParams {
                min_time: min,
                max_time: max,
                channels,
            };
            print_json(&applied(console.history.get_history(&session, &params).await?)?)
        }
        Command::Watch { session, span } => {
            let span = span.unwrap_or(config.polling.window_span);
            if !(span.is_finite() && span > 0.0) {
                bail!("--span must be a positive number of seconds");
            }
            watch(console, config, intents, &session, span).await
        }
    }
}

/// Poll status and advance the stream until Ctrl-C.
async fn watch(
    console: &Console,
    config: &ConsoleConfig,
    intents: &mut NavigationReceiver,
    session: &str,
    span: f64,
) -> Result<()> {
    applied(console.sessions.get_session(session).await?)?;
    let status_every = config.polling.status_interval()?;
    let stream_every = config.polling.stream_interval()?;
    info!(
        session = %session,
        span,
        status_every = %format_duration(status_every),
        stream_every = %format_duration(stream_every),
        "watching session, Ctrl-C to stop"
    );

    let mut status_tick = interval(status_every);
    status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stream_tick = interval(stream_every);
    stream_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = status_tick.tick() => {
                let status = console.monitor.check_status().await;
                debug!(connected = status.is_connected, "status polled");
            }
            _ = stream_tick.tick() => {
                match console.stream.advance(session, span).await {
                    Ok(LoadOutcome::Current(report)) if report.appended > 0 => {
                        print_sparklines(console);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "stream update failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping");
                return Ok(());
            }
        }

        for intent in drain(intents) {
            if intent == NavigationIntent::Root {
                warn!("device disconnected, waiting for it to come back");
            } else {
                debug!(route = %intent, "navigation intent");
            }
        }
    }
}

fn print_sparklines(console: &Console) {
    let state = console.state().lock();
    let metrics = state.metrics();
    for channel in metrics.catalog() {
        let ch = channel.physical_channel;
        let Some(latest) = metrics.latest(MetricKind::Bpm, ch) else {
            continue;
        };
        let bars: String = metrics
            .sparkline(MetricKind::Bpm, ch)
            .into_iter()
            .map(|level| BARS[usize::from(level).min(BARS.len() - 1)])
            .collect();
        println!(
            "{:<12} t={:>8.2} {}={:>6.1} {}",
            channel.description,
            latest.t,
            MetricKind::Bpm.label(),
            latest.value,
            bars
        );
    }
}

fn log_intents(intents: &mut NavigationReceiver) {
    for intent in drain(intents) {
        debug!(route = %intent, "navigation intent");
    }
}

fn applied<T>(outcome: LoadOutcome<T>) -> Result<T> {
    match outcome {
        LoadOutcome::Current(value) => Ok(value),
        LoadOutcome::Stale => bail!("response was superseded by a newer request"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
