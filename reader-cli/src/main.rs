//! Trace Reader CLI
//!
//! Steps interactively through a recorded interpreter opcode trace.

use anyhow::{Context, Result};
use clap::Parser;
use reader_cli::{ReaderConfig, Session};
use std::io;
use std::path::PathBuf;
use trace_reader::TraceReader;

/// Step through a recorded opcode trace
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Trace file to load [default: out_primary.log]
    trace: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Prompt template (%i = IP, %o = opcode)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Template printed after each step, continue or finish
    #[arg(short, long)]
    info: Option<String>,

    /// Default count for dis, raw and hex
    #[arg(short = 'n', long)]
    count: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<ReaderConfig> {
        let mut config = match &self.config {
            Some(path) => ReaderConfig::from_file(path)?,
            None => ReaderConfig::default(),
        };

        if let Some(trace) = self.trace {
            config.trace_path = trace;
        }
        if let Some(prompt) = self.prompt {
            config.prompt = prompt;
        }
        if let Some(info) = self.info {
            config.info = info;
        }
        if let Some(count) = self.count {
            config.default_count = count;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let config = Args::parse().into_config()?;

    let reader = TraceReader::load(&config.trace_path)
        .with_context(|| format!("Can't load trace {}", config.trace_path.display()))?;
    tracing::info!("Trace has {} bytes", reader.len());

    let mut session = Session::new(reader, &config);
    let stdin = io::stdin();
    session
        .run(stdin.lock(), &mut io::stdout().lock(), &mut io::stderr().lock())
        .context("Session I/O failed")?;

    Ok(())
}
