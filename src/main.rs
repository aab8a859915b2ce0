use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use furhat_dialogue::config::{self, AppConfig};
use furhat_dialogue::logging::{self, LogLevel};
use furhat_dialogue::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Turn-taking dialogue controller for a Furhat robot.
#[derive(Debug, Parser)]
#[command(name = "furhat-dialogue", version, about)]
struct Cli {
    /// Configuration file; defaults to the standard search paths
    #[arg(long, global = true, env = "FURHAT_DIALOGUE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Greet, converse until goodbye, then say farewell
    Run(RunArgs),
    /// Perform one tagged string on the robot
    Say {
        /// Text with inline markers, e.g. "[Smile] Hello!"
        text: String,
        #[command(flatten)]
        robot: RobotArgs,
    },
    /// Print the actions a tagged string turns into
    Parse {
        /// Text with inline markers
        text: String,
    },
    /// Print where configuration files are looked up
    ConfigPaths,
}

#[derive(Debug, Args)]
struct RobotArgs {
    /// Robot host name or IP address
    #[arg(long, env = "FURHAT_HOST")]
    host: Option<String>,

    /// Remote API port
    #[arg(long)]
    port: Option<u16>,

    /// Realtime API port; listen through the event socket
    #[arg(long, env = "FURHAT_REALTIME_PORT")]
    realtime_port: Option<u16>,

    /// Use the terminal instead of a robot
    #[arg(long)]
    console: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    robot: RobotArgs,

    /// Answer with a canned reply instead of calling a language model
    #[arg(long)]
    mock: bool,

    /// Seconds of silence before going idle
    #[arg(long)]
    idle_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before the tracing subscriber exists, so report on stderr.
    let dotenv = config::load_dotenv();
    if let Err(e) = &dotenv {
        eprintln!("[furhat-dialogue] .env not loaded: {} (using process environment)", e);
    }

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::from_path(path)?,
        None => config::load()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let _guard = logging::init(&config.logging)?;
    if let Ok(Some(path)) = &dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    match cli.command {
        Command::Run(args) => run(config, args).await,
        Command::Say { text, robot } => say(config, &robot, &text).await,
        Command::Parse { text } => parse(&config, &text),
        Command::ConfigPaths => {
            for path in config::search_paths() {
                let marker = if path.exists() { "found".green() } else { "missing".dimmed() };
                println!("{} {}", marker, path.display());
            }
            Ok(())
        }
    }
}

async fn run(mut config: AppConfig, args: RunArgs) -> Result<()> {
    if args.mock {
        config.model.provider = ProviderKind::Mock;
    }
    if let Some(secs) = args.idle_timeout {
        config.session.idle_timeout_secs = secs;
    }

    let dialogue = DialogueSession::from_config(&config.model)
        .context("could not set up the language model; try --mock")?;
    let actuator = connect(&mut config, &args.robot).await?;
    let gestures = gesture_map(&config);

    let mut controller = Controller::new(config.session, gestures, actuator, dialogue)?;
    controller.run().await;
    Ok(())
}

async fn say(mut config: AppConfig, robot: &RobotArgs, text: &str) -> Result<()> {
    let actuator = connect(&mut config, robot).await?;
    let parser = TagParser::new(gesture_map(&config), actuator)?;

    let summary = parser.perform(text).await;
    println!(
        "{} spoken, {} gestures, {} unmapped, {} failed",
        summary.spoken, summary.gestures, summary.unmapped, summary.failed
    );
    Ok(())
}

fn parse(config: &AppConfig, text: &str) -> Result<()> {
    let parser = TagParser::new(gesture_map(config), Arc::new(RecordingActuator::new()))?;

    for segment in parser.parse(text) {
        match segment {
            ActionSegment::Speak(text) => println!("{} {}", "speak  ".cyan(), text),
            ActionSegment::Perform(tag) => match parser.gestures().gesture_for(tag) {
                Ok(gesture) => println!("{} {} -> {}", "perform".green(), tag, gesture),
                Err(_) => println!("{} {} (unmapped)", "perform".yellow(), tag),
            },
        }
    }
    Ok(())
}

/// Builds the actuator, applying CLI overrides and the robot persona.
async fn connect(config: &mut AppConfig, args: &RobotArgs) -> Result<Arc<dyn Actuator>> {
    if args.console {
        let eof_phrase = config
            .session
            .goodbye_triggers
            .iter()
            .find(|t| !t.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| "goodbye".to_string());
        return Ok(Arc::new(ConsoleActuator::new().with_eof_phrase(eof_phrase)));
    }

    if let Some(host) = &args.host {
        config.robot.host = host.clone();
    }
    if let Some(port) = args.port {
        config.robot.port = port;
    }
    if let Some(port) = args.realtime_port {
        config.robot.realtime_port = Some(port);
    }

    let client = FurhatClient::new(&config.robot)
        .with_context(|| format!("could not create a client for {}", config.robot.base_url()))?;
    client.apply_persona(&config.robot).await;
    Ok(Arc::new(client))
}

fn gesture_map(config: &AppConfig) -> GestureMap {
    let (gestures, problems) = config.gesture_map();
    for problem in problems {
        warn!(error = %problem, "ignoring gesture table entry");
    }
    gestures
}
