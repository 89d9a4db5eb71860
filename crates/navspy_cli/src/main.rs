//! navspy CLI
//!
//! Replay scroll scripts against a virtual page and report which section the
//! navigation bar would highlight.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod check;
mod page;
mod simulate;

use page::PageFile;
use simulate::Record;

#[derive(Parser)]
#[command(name = "navspy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Active-section tracking for scrolling pages", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a page file's scroll script and print active-section changes
    Simulate {
        /// Page file (TOML)
        page: PathBuf,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Validate a page file
    Check {
        /// Page file (TOML)
        page: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate { page, json } => cmd_simulate(&page, json),
        Commands::Check { page } => cmd_check(&page),
    }
}

fn cmd_simulate(path: &Path, json: bool) -> Result<()> {
    let page = PageFile::load(path)?;
    info!(
        "Simulating {} ({} sections, {} steps)",
        path.display(),
        page.sections.len(),
        page.steps.len()
    );

    let sim = simulate::run(&page)?;

    if json {
        for transition in &sim.transitions {
            println!("{}", serde_json::to_string(&Record::Transition(transition))?);
        }
        println!("{}", serde_json::to_string(&Record::Summary(&sim.summary))?);
        return Ok(());
    }

    for transition in &sim.transitions {
        println!("{}", transition);
    }

    let summary = &sim.summary;
    info!(
        "{} transitions, {} proximity evaluations, {} visibility batches, {} scroll events coalesced",
        summary.transitions,
        summary.proximity_evaluations,
        summary.visibility_batches,
        summary.coalesced_scrolls
    );
    if !summary.unresolved.is_empty() {
        info!(
            "Never resolved after {} attempts: {}",
            summary.resolution_attempts,
            summary.unresolved.join(", ")
        );
    }

    Ok(())
}

fn cmd_check(path: &Path) -> Result<()> {
    let page = PageFile::load(path)?;
    let results = check::check_page(&page);
    check::print_results(&path.display().to_string(), &results);

    if check::has_errors(&results) {
        anyhow::bail!("{} has errors", path.display());
    }
    Ok(())
}
