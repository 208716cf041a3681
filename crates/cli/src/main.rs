//! HBNB console - line-oriented administration of the listing store.

use std::io::{IsTerminal, Write};

use anyhow::Result;
use clap::Parser;
use hbnb_console::{Console, Flow};
use hbnb_storage::{open_storage, StorageConfig};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hbnb")]
#[command(about = "HBNB command interpreter", long_about = None)]
struct Cli {
    /// Run a single command and exit
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = StorageConfig::from_env()?;
    let mut console = Console::new(open_storage(&config).await?);

    if !cli.command.is_empty() {
        run_line(&mut console, &cli.command.join(" ")).await;
    } else if std::io::stdin().is_terminal() {
        interactive(&mut console).await?;
    } else {
        piped(&mut console).await?;
    }

    console.close().await?;
    Ok(())
}

/// Run one line, logging failures. Returns whether to keep reading.
async fn run_line(console: &mut Console, line: &str) -> Flow {
    let mut stdout = std::io::stdout();
    let flow = match console.onecmd(line, &mut stdout).await {
        Ok(flow) => flow,
        Err(e) => {
            error!("{line}: {e}");
            Flow::Continue
        }
    };
    stdout.flush().ok();
    flow
}

async fn interactive(console: &mut Console) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    loop {
        let line = match editor.readline(Console::PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => "EOF".to_string(),
            Err(e) => return Err(e.into()),
        };
        if !line.trim().is_empty() {
            editor.add_history_entry(line.as_str()).ok();
        }
        if run_line(console, &line).await == Flow::Exit {
            return Ok(());
        }
    }
}

async fn piped(console: &mut Console) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if run_line(console, &line).await == Flow::Exit {
            break;
        }
    }
    Ok(())
}
