use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pgn_merge::chess::{CompressionMode, MergeError, RunConfig, RunMode, log, process_file};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pgn-merge")]
#[command(
    version,
    about = "Merge PGN games into one move tree, or clean them one by one",
    long_about = None
)]
struct Cli {
    /// PGN file to read (`.zst` files are decompressed on the fly)
    input: PathBuf,

    /// Merge every game into one tree, or re-export each valid game
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Keep or strip comments and NAGs (clean mode only)
    #[arg(long, value_enum)]
    comments: Option<CommentsArg>,

    /// Input compression; detected from the file extension when omitted
    #[arg(long, value_parser = CompressionMode::parse)]
    compression: Option<CompressionMode>,

    /// Output path instead of `<stem>_merged.pgn` / `<stem>_cleaned.pgn`
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    /// One game with all mainlines as variations
    Merge,
    /// Each valid game on its own
    Clean,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CommentsArg {
    Keep,
    Strip,
}

impl Cli {
    fn resolve_config(&self) -> Result<RunConfig> {
        let merge = match self.mode {
            Some(ModeArg::Merge) => true,
            Some(ModeArg::Clean) => false,
            None => ask_yes_no("Do you want to merge the games into one tree? (y/n): ")?,
        };

        let mode = if merge {
            RunMode::Merge
        } else {
            let keep_comments = match self.comments {
                Some(CommentsArg::Keep) => true,
                Some(CommentsArg::Strip) => false,
                None => ask_yes_no("Do you want to keep comments and annotations? (y/n): ")?,
            };
            RunMode::Clean { keep_comments }
        };

        let mut config = RunConfig::new(&self.input, mode);
        if let Some(compression) = self.compression {
            config.compression = compression;
        }
        config.output = self.output.clone();
        Ok(config)
    }
}

/// Only `y` counts as yes; end of input is a no.
fn ask_yes_no(question: &str) -> Result<bool> {
    print!("{question}");
    io::stdout().flush().context("failed to write prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read answer")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_banner(config: &RunConfig) {
    println!("Processing: {}", config.input.display());
    println!("Mode: {}", config.mode.label());
    match config.mode {
        RunMode::Merge => println!("Keep Comments: false (always removed when merging)"),
        RunMode::Clean { keep_comments } => println!("Keep Comments: {keep_comments}"),
    }
}

fn main() -> ExitCode {
    log::init();
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("An error occurred: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    print_banner(&config);

    match process_file(&config) {
        Ok(report) => {
            println!("\nSuccess! {} games processed.", report.summary.accepted);
            let shown = std::path::absolute(&report.output).unwrap_or(report.output);
            println!("File saved to: {}", shown.display());
            ExitCode::SUCCESS
        }
        Err(MergeError::InputNotFound(path)) => {
            eprintln!("Error: File '{}' not found.", path.display());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("An error occurred: {e}");
            ExitCode::FAILURE
        }
    }
}
