//! Flow CLI
//!
//! Command-line front end for the flow engine with the built-in condition and
//! consumer types: validate flow documents, run them against JSON payloads and
//! rewrite them in canonical form.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use flow_engine::{
    builtins, FlowEngine, FlowFormat, FlowSettings, Outcome, Statement,
};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Flow CLI - Check, run and format declarative flow documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine settings file (toml, yaml or json)
    #[arg(long, global = true, env = "FLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a flow and print its statistics
    Check {
        /// Flow document (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Run a flow against a JSON payload and print the result
    Run {
        /// Flow document (.json, .yaml or .yml)
        file: PathBuf,

        /// JSON payload file, or `-` for stdin
        #[arg(long, short)]
        input: String,

        /// Also print every branch decision
        #[arg(long)]
        trace: bool,
    },

    /// Re-emit a flow in canonical form
    Fmt {
        /// Flow document (.json, .yaml or .yml)
        file: PathBuf,

        /// Output format; defaults to the configured default format
        #[arg(long)]
        to: Option<FlowFormat>,
    },

    /// List the statements of the flow grammar
    Statements,

    /// List the registered condition and consumer types
    Types,
}

fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = FlowSettings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    debug!(?settings, "settings loaded");

    let engine = FlowEngine::builder()
        .with_conditions(builtins::condition_registry()?)
        .with_consumers(builtins::consumer_registry()?)
        .with_settings(settings)
        .build()?;

    match cli.command {
        Commands::Check { file } => check(&engine, &file),
        Commands::Run { file, input, trace } => run(&engine, &file, &input, trace),
        Commands::Fmt { file, to } => format(&engine, &file, to),
        Commands::Statements => {
            statements();
            Ok(())
        }
        Commands::Types => {
            types(&engine);
            Ok(())
        }
    }
}

fn load(engine: &FlowEngine<Value>, file: &Path) -> Result<flow_engine::Flow<Value>> {
    engine
        .load(file)
        .with_context(|| format!("failed to load {}", file.display()))
}

fn check(engine: &FlowEngine<Value>, file: &Path) -> Result<()> {
    let flow = load(engine, file)?;
    let stats = flow.statistics();

    println!("{} {}", "✓".green().bold(), file.display());
    println!("  branches:   {}", stats.branches);
    println!("  groups:     {}", stats.groups);
    println!("  predicates: {}", stats.predicates);
    println!("  consumers:  {}", stats.consumers);
    println!("  max depth:  {}", stats.max_depth);
    Ok(())
}

fn run(engine: &FlowEngine<Value>, file: &Path, input: &str, trace: bool) -> Result<()> {
    let flow = load(engine, file)?;
    let mut payload = read_payload(input)?;

    if trace {
        let record = flow.run_traced(&mut payload)?;
        info!(trace_id = %record.id, decisions = record.decisions.len(), "flow finished");
        eprintln!("{} {}", "trace".cyan().bold(), record.id);
        for decision in &record.decisions {
            let outcome = match decision.outcome {
                Outcome::Then => "then".green(),
                Outcome::Else => "else".yellow(),
                Outcome::Skipped => "skipped".dimmed(),
            };
            eprintln!(
                "  {:<40} condition={:<5} → {}",
                decision.path, decision.condition, outcome
            );
        }
        eprintln!("  consumers invoked: {}", record.consumers_invoked);
    } else {
        flow.run(&mut payload)?;
    }

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn read_payload(input: &str) -> Result<Value> {
    let text = if input == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read payload from stdin")?;
        text
    } else {
        std::fs::read_to_string(input).with_context(|| format!("failed to read payload {}", input))?
    };
    serde_json::from_str(&text).context("payload is not valid JSON")
}

fn format(engine: &FlowEngine<Value>, file: &Path, to: Option<FlowFormat>) -> Result<()> {
    let flow = load(engine, file)?;
    let format = to.unwrap_or(engine.settings().default_format);
    print!("{}", engine.render(&flow, format)?);
    Ok(())
}

fn statements() {
    println!("{}", "Statements".bold());
    for statement in Statement::ALL {
        println!("  {:<10} {}", statement.name().cyan(), statement.summary());
    }
}

fn types(engine: &FlowEngine<Value>) {
    println!("{} (discriminator field: {})", "Conditions".bold(), engine.settings().discriminator);
    for kind in engine.conditions().kinds() {
        println!("  {}", kind.cyan());
    }
    println!("{}", "Consumers".bold());
    for kind in engine.consumers().kinds() {
        println!("  {}", kind.cyan());
    }
}
