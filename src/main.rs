use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marsrag_lib::{application::AskRequest, build_environment, init_tracing};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "marsrag", version, about = "Mars rover imagery ingestion and Q&A")]
struct Cli {
    /// Print responses as JSON instead of plain text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the catalog, describe new images and store them.
    Ingest,

    /// Answer a question from the stored image descriptions.
    Ask {
        /// Free-text question, e.g. "What craters were photographed?"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Summarise the raw catalog response with the chat model.
    Analyze,

    /// Print the effective configuration (API key omitted).
    Config,
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[marsrag] {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let handles = build_environment().context("failed to bootstrap environment")?;
    let service = handles.service;

    match cli.command {
        Command::Ingest => {
            let response = service.ingest()?;
            emit(cli.json, &response, &response.status)
        }
        Command::Ask { question } => {
            let response = service.ask(AskRequest {
                question: question.join(" "),
            })?;
            emit(cli.json, &response, &response.answer)
        }
        Command::Analyze => {
            let result = service.analyze()?;
            emit(cli.json, &result, &result.gpt_analysis)
        }
        Command::Config => {
            let config = handles.config.effective();
            println!("# {}", handles.config.path().display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{text}");
    }
    Ok(())
}
