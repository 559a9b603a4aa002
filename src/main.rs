use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use instant::Duration;
use log::info;

use crossword_csp::{find_fill, render_grid, FillFailure, FillOptions, GridConfig};

/// Fill a crossword structure with words from a word list.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Structure template: `#` for blocks, `_` or `.` for open cells.
    structure: PathBuf,

    /// Word list with one word per line.
    words: PathBuf,

    /// Also write the filled grid to this file.
    output: Option<PathBuf>,

    /// Give up after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip AC-3 and go straight to backtracking.
    #[arg(long)]
    no_arc_consistency: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let grid_config = GridConfig::from_files(&cli.structure, &cli.words)
        .context("Failed to load the puzzle")?;
    info!(
        "Loaded {} slots and {} words",
        grid_config.slot_count(),
        grid_config.word_list.len()
    );

    let mut options = FillOptions::default();
    if let Some(timeout_ms) = cli.timeout_ms {
        options = options.with_timeout(Duration::from_millis(timeout_ms));
    }
    if cli.no_arc_consistency {
        options = options.without_arc_consistency();
    }

    let result = match find_fill(&grid_config, &options) {
        Ok(result) => result,
        Err(FillFailure::HardFailure) => {
            println!("{}", FillFailure::HardFailure);
            return Ok(());
        }
        Err(failure) => return Err(failure.into()),
    };

    let display_grid = render_grid(&grid_config, &result.assignment);

    info!("{:?}", result.statistics);
    println!("{}", display_grid);

    if let Some(output) = &cli.output {
        fs::write(output, format!("{}\n", display_grid))
            .with_context(|| format!("Unable to write {}", output.display()))?;
        info!("Written grid to {}", output.display());
    }

    Ok(())
}
