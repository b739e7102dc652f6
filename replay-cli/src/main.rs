//! replay - interactive terminal sessions on a one-shot execution backend
//! Command-line interface for running programs through the replay console

mod language;
mod render;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use colored::*;
use replay_core::{
    Console, ConsoleConfig, ConsoleSnapshot, Dispatch, Phase, PistonClient, Program, Revealer,
    Termination,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use render::Renderer;

#[derive(Parser)]
#[command(name = "replay")]
#[command(author = "Replay Contributors")]
#[command(version = "2026.10.1")]
#[command(about = "Run programs on a Piston backend as interactive terminal sessions", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, env = "REPLAY_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log backend round trips to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a source file interactively
    Run {
        /// Source file to execute
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Backend language name (inferred from the extension when omitted)
        #[arg(short, long)]
        language: Option<String>,

        /// Language version; "*" picks the newest installed one
        #[arg(short = 'r', long = "runtime-version", default_value = "*")]
        runtime_version: String,

        /// Execute endpoint, overriding the configuration
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Run timeout in milliseconds, overriding the configuration
        #[arg(long, value_name = "MS")]
        run_timeout: Option<u64>,
    },

    /// Show how a saved output blob would be revealed
    Reveal {
        /// File holding the full program output
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Number of prompts already answered
        #[arg(short, long, default_value_t = 0)]
        answered: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Run {
                file,
                language,
                runtime_version,
                endpoint,
                run_timeout,
            } => {
                let mut config = config;
                if let Some(endpoint) = endpoint {
                    config.endpoint = endpoint;
                }
                if let Some(ms) = run_timeout {
                    config.limits.run_timeout_ms = ms;
                }
                run_command(&config, &file, language, runtime_version).await
            }
            Commands::Reveal { output, answered } => reveal_command(&config, &output, answered),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "replay_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ConsoleConfig> {
    let config = match path {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    Ok(config.with_env()?)
}

// ============================================================================
// Commands
// ============================================================================

async fn run_command(
    config: &ConsoleConfig,
    file: &Path,
    language: Option<String>,
    version: String,
) -> anyhow::Result<i32> {
    let source = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let language = match language {
        Some(language) => language,
        None => match language::infer(file) {
            Some(language) => language.to_string(),
            None => bail!(
                "cannot infer the language of {}; pass --language",
                file.display()
            ),
        },
    };

    println!(
        "{} {} ({} {}) on {}",
        "Running".green().bold(),
        file.display().to_string().cyan(),
        language,
        version,
        config.endpoint.dimmed()
    );

    tracing::debug!(file = %file.display(), %language, %version, "starting session");
    let console = Console::with_config(PistonClient::from_config(config), config);
    let mut renderer = Renderer::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let mut dispatch = console
        .start_session(Program::new(language, version, source))
        .await;

    loop {
        let snapshot = match dispatch {
            Dispatch::Applied(snapshot) => snapshot,
            Dispatch::Superseded => bail!("session was superseded"),
            Dispatch::Ignored(reason) => bail!("input rejected: {}", reason),
        };
        renderer.render(&snapshot);

        if !snapshot.waiting {
            return Ok(finish(&snapshot));
        }

        print!("{} ", ">".green());
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else {
            println!();
            println!("{}", "stdin closed while the program was waiting".yellow());
            return Ok(1);
        };
        tracing::debug!(generation = snapshot.generation, "sending input line");
        dispatch = console.submit_input(line).await;
    }
}

fn finish(snapshot: &ConsoleSnapshot) -> i32 {
    match snapshot.phase {
        Phase::Terminal(Termination::Completed) => {
            println!("{}", "Program finished".green().bold());
            0
        }
        Phase::Terminal(Termination::RuntimeError) => {
            println!("{}", "Program reported an error".red().bold());
            1
        }
        Phase::Terminal(Termination::CompileError) => {
            println!("{}", "Compilation failed".red().bold());
            1
        }
        Phase::Terminal(Termination::TransportError) => 1,
        Phase::Idle | Phase::Running | Phase::WaitingForInput => 1,
    }
}

fn reveal_command(config: &ConsoleConfig, output: &Path, answered: usize) -> anyhow::Result<i32> {
    let blob = std::fs::read_to_string(output)
        .with_context(|| format!("failed to read {}", output.display()))?;
    let decision = Revealer::new(config.markers.clone()).reveal(&blob, answered);

    for line in &decision.lines {
        println!("{}", line);
    }
    println!();

    let status = if decision.failed {
        "failed".red().bold()
    } else if decision.now_waiting {
        "waiting for input".yellow().bold()
    } else {
        "finished".green().bold()
    };
    println!(
        "{} {} line(s) shown, {}",
        "Reveal:".bold(),
        decision.lines.len(),
        status
    );
    Ok(0)
}
