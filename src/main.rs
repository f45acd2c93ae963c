// Clippy allows
#![allow(clippy::too_many_arguments)]

//! pxstream: streaming PX data section decoder
//!
//! Usage: pxstream <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use pxstream::commands::{parse_index_list, GenerateCommand, LocateCommand, ReadCommand};
use pxstream::config::ReaderConfig;
use pxstream::error::Result;

#[derive(Parser)]
#[command(name = "pxstream")]
#[command(version)]
#[command(about = "Streaming decoder for the data section of PX statistical files")]
#[command(long_about = None)]
struct Cli {
    /// Log progress and diagnostics to stderr (honours RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Chunk size in bytes for reading input
    #[arg(long, global = true)]
    buffer_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the byte offset just after KEYWORD=
    Locate {
        /// Input PX file
        #[arg(short, long)]
        input: PathBuf,

        /// Keyword to search for
        #[arg(short, long, default_value = "DATA")]
        keyword: String,
    },

    /// Print selected cells of the data section
    Read {
        /// Input PX file
        #[arg(short, long)]
        input: PathBuf,

        /// Row indices, e.g. 0,2,5-9
        #[arg(short, long)]
        rows: String,

        /// Column indices, e.g. 0-3
        #[arg(short, long)]
        cols: String,

        /// Memory-map the input file
        #[arg(long)]
        mmap: bool,

        /// Decode exact decimals instead of doubles
        #[arg(long)]
        decimal: bool,

        /// Use smaller buffers
        #[arg(long)]
        low_memory: bool,

        /// Print read statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Write a synthetic PX data section to stdout
    Generate {
        /// Number of rows
        #[arg(long)]
        rows: usize,

        /// Number of columns
        #[arg(long)]
        cols: usize,

        /// Probability that a cell is a missing-value token
        #[arg(long, default_value = "0.0")]
        missing_rate: f64,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Print generation statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Locate { input, keyword } => run_locate(input, keyword, cli.buffer_size),

        Commands::Read {
            input,
            rows,
            cols,
            mmap,
            decimal,
            low_memory,
            stats,
        } => run_read(
            input,
            rows,
            cols,
            mmap,
            decimal,
            low_memory,
            stats,
            cli.buffer_size,
        ),

        Commands::Generate {
            rows,
            cols,
            missing_rate,
            seed,
            stats,
        } => run_generate(rows, cols, missing_rate, seed, stats),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run_locate(input: PathBuf, keyword: String, buffer_size: Option<usize>) -> Result<()> {
    let mut cmd = LocateCommand::new().with_keyword(keyword);
    if let Some(size) = buffer_size {
        cmd = cmd.with_buffer_size(size);
    }
    let offset = cmd.run(input)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", offset)?;
    Ok(())
}

fn run_read(
    input: PathBuf,
    rows: String,
    cols: String,
    mmap: bool,
    decimal: bool,
    low_memory: bool,
    stats: bool,
    buffer_size: Option<usize>,
) -> Result<()> {
    let rows = parse_index_list(&rows)?;
    let cols = parse_index_list(&cols)?;

    let mut cmd = ReadCommand::new(rows, cols)
        .with_mmap(mmap)
        .with_decimal(decimal)
        .with_low_memory(low_memory);
    if let Some(size) = buffer_size {
        cmd = cmd.with_config(ReaderConfig::new().with_buffer_size(size));
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let read_stats = cmd.run(input, &mut handle)?;

    if stats {
        eprintln!("{}", read_stats);
    }
    Ok(())
}

fn run_generate(
    rows: usize,
    cols: usize,
    missing_rate: f64,
    seed: u64,
    stats: bool,
) -> Result<()> {
    let cmd = GenerateCommand::new(rows, cols)
        .with_missing_rate(missing_rate)
        .with_seed(seed);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let gen_stats = cmd.run(&mut handle)?;

    if stats {
        eprintln!("{}", gen_stats);
    }
    Ok(())
}
