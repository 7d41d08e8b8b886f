//! SoundSight headless host.
//!
//! Runs a session against the simulated camera and recognizer and prints
//! every session event to stdout, either as readable lines or as JSON lines
//! for a frontend process. While a demo runs, line commands on stdin drive
//! the session (`help` lists them).

mod commands;
mod console;
mod render;
mod settings;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use soundsight_core::{
    RecognizerHandle, SimulatedDetectionSource, SimulatedRecognizer, SourceHandle,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use render::{OutputMode, Presenter};
use settings::{default_settings_path, load_settings, save_settings, AppSettings};
use state::AppState;

#[derive(Parser)]
#[command(name = "soundsight", version, about)]
struct Cli {
    /// Settings file (defaults to the per-user data directory)
    #[arg(long, env = "SOUNDSIGHT_SETTINGS")]
    settings: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a live session: camera, guidance and voice
    Demo {
        /// Stop after this many seconds (Ctrl-C also stops)
        #[arg(short, long, default_value = "30")]
        seconds: u64,
        /// Quick destination to navigate to
        #[arg(short, long, default_value = "Nearest Exit")]
        destination: String,
        /// Typed command to send at start; repeatable
        #[arg(long)]
        ask: Vec<String>,
        /// Open one listening window at start
        #[arg(long)]
        listen: bool,
        /// Seed the simulated camera and recognizer
        #[arg(long)]
        seed: Option<u64>,
        /// Emit `{"channel","payload"}` JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the recognised voice commands
    Commands,
    /// List the quick destinations
    Destinations,
    /// Print the effective settings
    Settings {
        /// Overwrite the settings file with defaults first
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "soundsight=info,soundsight_core=info",
        1 => "soundsight=debug,soundsight_core=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = cli.settings.unwrap_or_else(default_settings_path);

    match cli.command {
        Some(Command::Commands) => {
            for command in commands::list_voice_commands() {
                println!("{:<34} {}", command.command, command.description);
            }
            Ok(())
        }
        Some(Command::Destinations) => {
            for destination in commands::list_destinations() {
                println!("{:<18} {}", destination.name, destination.eta);
            }
            Ok(())
        }
        Some(Command::Settings { reset }) => {
            let settings = if reset {
                let defaults = AppSettings::default();
                save_settings(&settings_path, &defaults)
                    .with_context(|| format!("writing {}", settings_path.display()))?;
                defaults
            } else {
                load_settings(&settings_path)
            };
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
        Some(Command::Demo {
            seconds,
            destination,
            ask,
            listen,
            seed,
            json,
        }) => {
            let options = DemoOptions {
                duration: Duration::from_secs(seconds),
                destination,
                asks: ask,
                listen,
                seed,
                mode: if json { OutputMode::Json } else { OutputMode::Text },
            };
            run_demo(settings_path, options).await
        }
        None => run_demo(settings_path, DemoOptions::default()).await,
    }
}

struct DemoOptions {
    duration: Duration,
    destination: String,
    asks: Vec<String>,
    listen: bool,
    seed: Option<u64>,
    mode: OutputMode,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(30),
            destination: "Nearest Exit".to_string(),
            asks: Vec::new(),
            listen: false,
            seed: None,
            mode: OutputMode::Text,
        }
    }
}

async fn run_demo(settings_path: PathBuf, options: DemoOptions) -> anyhow::Result<()> {
    let app_settings = load_settings(&settings_path);
    info!(
        settings_path = ?settings_path,
        confidence_threshold = app_settings.detection.confidence_threshold,
        hold_on_hazard = app_settings.hold_on_hazard,
        "settings loaded"
    );

    let (source, recognizer) = match options.seed {
        Some(seed) => (
            SourceHandle::new(SimulatedDetectionSource::with_seed(seed)),
            RecognizerHandle::new(SimulatedRecognizer::with_seed(seed)),
        ),
        None => (
            SourceHandle::new(SimulatedDetectionSource::new()),
            RecognizerHandle::new(SimulatedRecognizer::new()),
        ),
    };
    let state = AppState::new(app_settings, settings_path, source, recognizer);
    let presenter = Arc::new(Presenter::new(options.mode, Arc::clone(&state.settings)));
    let forwarders = render::spawn_forwarders(&state, presenter);

    if let Err(e) = commands::start_camera(&state) {
        tracing::warn!("camera not started: {e}");
    }
    commands::start_navigation(&state, &options.destination).map_err(anyhow::Error::msg)?;
    for utterance in &options.asks {
        if let Err(e) = commands::send_voice_command(&state, utterance) {
            tracing::warn!("skipping command: {e}");
        }
    }
    if options.listen {
        commands::toggle_listening(&state).map_err(anyhow::Error::msg)?;
    }

    let deadline = tokio::time::sleep(options.duration);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(deadline, ctrl_c);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("demo time elapsed");
                break;
            }
            res = &mut ctrl_c => {
                res.context("installing Ctrl-C handler")?;
                info!("interrupted");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    match console::parse(&line).and_then(|cmd| console::execute(&state, cmd)) {
                        Ok(console::Reply::Print(text)) => println!("{text}"),
                        Ok(console::Reply::Silent) => {}
                        Ok(console::Reply::Quit) => break,
                        Err(e) => eprintln!("{e}"),
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("stdin closed: {e}");
                    stdin_open = false;
                }
            },
        }
    }

    state.session.shutdown();
    // Let the forwarders drain the shutdown events.
    tokio::time::sleep(Duration::from_millis(50)).await;
    for task in forwarders {
        task.abort();
    }

    let perf = commands::get_diagnostics(&state);
    info!(
        frames_in = perf.session.frames_in,
        cues_emitted = perf.session.cues_emitted,
        nav_ticks = perf.session.nav_ticks,
        voice_dispatches = perf.session.voice_dispatches,
        scene_render_p95_ms = perf.scene_render_ms.p95_ms,
        "session finished"
    );
    Ok(())
}
