//! CLI definition and command dispatch for Deskmate.
//!
//! ## Configuration Precedence
//!
//! 1. CLI flags (e.g., `--config`, `--verbose`)
//! 2. Environment variables (`DESKMATE_CONFIG`, `DESKMATE_VERBOSE`)
//! 3. Config file (`deskmate.yaml` or path from `--config`)
//! 4. Built-in defaults

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use owo_colors::OwoColorize;

use deskmate_core::{load_config, Pipeline, QueryOptions, StreamEvent};

// ============================================================================
// CLI Definition
// ============================================================================

/// Deskmate – FAQ copilot over a hybrid retrieval pipeline
#[derive(Parser, Debug)]
#[command(name = "deskmate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, env = "DESKMATE_VERBOSE")]
    pub verbose: bool,

    /// Path to configuration file (default: ./deskmate.yaml)
    #[arg(long, global = true, env = "DESKMATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Ask a question and stream the generated answer
    #[command(after_help = r#"EXAMPLES:
    # Ask with the default configuration
    deskmate ask "how do I reset my password?"
"#)]
    Ask {
        /// The question to answer
        question: String,
    },

    /// Retrieval only: print the fused results without generation
    #[command(after_help = r#"EXAMPLES:
    # Top 6 fused results
    deskmate search "vpn not connecting"

    # Pure lexical ranking, top 3
    deskmate search "vpn not connecting" --top-k 3 --alpha 0.0
"#)]
    Search {
        /// The query to search for
        query: String,

        /// Number of fused results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Fusion weight for the vector list (0 = lexical, 1 = vector)
        #[arg(long)]
        alpha: Option<f32>,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show readiness and corpus statistics
    Status {
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Entry Point
// ============================================================================

/// Parse arguments, assemble the pipeline, and dispatch the command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    let filter = format!("deskmate_core={},deskmate_cli={}", log_level, log_level);
    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    match config.validate() {
        Ok(warnings) => {
            for warning in warnings {
                eprintln!("{} {}", "warning:".yellow().bold(), warning);
            }
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{} failed to start async runtime: {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(async {
        match cli.command {
            Command::Ask { question } => handle_ask(&pipeline, &question).await,
            Command::Search {
                query,
                top_k,
                alpha,
                json,
            } => handle_search(&pipeline, &query, top_k, alpha, json).await,
            Command::Status { json } => handle_status(&pipeline, json),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command Handlers
// ============================================================================

async fn handle_ask(pipeline: &Pipeline, question: &str) -> anyhow::Result<()> {
    let mut events = std::pin::pin!(pipeline.answer(question));
    let mut streamed_tokens = false;

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Token(token) => {
                streamed_tokens = true;
                print!("{}", token);
                std::io::stdout().flush()?;
            }
            StreamEvent::Answer(answer) => {
                if streamed_tokens {
                    println!();
                } else {
                    // Refusal path: no tokens were streamed.
                    println!("{}", answer);
                }
            }
            StreamEvent::Chunks(chunks) => {
                if !chunks.is_empty() {
                    println!();
                    println!("{}", "Sources:".dimmed());
                    for chunk in chunks {
                        println!(
                            "  {} {}",
                            format!("[{:.4}]", chunk.score).dimmed(),
                            chunk.question
                        );
                    }
                }
            }
        }
    }

    Ok(())
}

async fn handle_search(
    pipeline: &Pipeline,
    query: &str,
    top_k: Option<usize>,
    alpha: Option<f32>,
    json: bool,
) -> anyhow::Result<()> {
    let mut opts = QueryOptions::new();
    if let Some(top_k) = top_k {
        opts = opts.with_top_k(top_k);
    }
    if let Some(alpha) = alpha {
        opts = opts.with_alpha(alpha);
    }

    let results = pipeline.retrieve(query, &opts).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No matches.".dimmed());
        return Ok(());
    }

    for result in results {
        println!(
            "{} {}",
            format!("[{:.4}]", result.score).cyan(),
            result.question.bold()
        );
        println!("         {}", result.answer);
    }

    Ok(())
}

fn handle_status(pipeline: &Pipeline, json: bool) -> anyhow::Result<()> {
    let report = pipeline.readiness();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let state = if report.ready {
        "ready".green().to_string()
    } else {
        "not ready".red().to_string()
    };
    println!("status:    {}", state);
    println!("documents: {}", pipeline.store().len());
    println!("model:     {}", pipeline.store().model());

    Ok(())
}
