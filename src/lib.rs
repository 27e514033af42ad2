use std::{
    fs::File,
    io::{BufRead, BufReader, IsTerminal},
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use clap::{Args, Parser};
use tracing::Level;

pub mod lab;
pub mod sim;

pub use lab::{Laboratory, LaboratoryBuilder, Position};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Expect {0} columns in this row, given {1}.")]
    InconsistentRow(usize, usize),
    #[error("Found multiple guards({0}, {1}) in given laboratory, expect one only.")]
    MultipleGuards(Position, Position),
    #[error("Invalid character({0}) in text of laboratory layout.")]
    InvalidChar(char),
    #[error("There's no guard in given laboratory, but expect one.")]
    NoGuard,
    #[error("Position{0} is outside of laboratory({1} rows x {2} columns).")]
    OutOfRange(Position, usize, usize),
}

#[derive(Debug, Args)]
pub struct CommonArgs {
    pub input_path: PathBuf,
    /// Log more details to stderr, repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Parser)]
pub struct CLIArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Parser)]
pub struct SweepCLIArgs {
    #[command(flatten)]
    pub common: CommonArgs,
    /// Test candidate obstacles on all cores, each on its own copy of the laboratory.
    #[arg(long)]
    pub parallel: bool,
    /// Log sweep progress every N candidates, 0 to disable.
    #[arg(long, default_value_t = 100)]
    pub progress_every: usize,
}

pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}

impl FromStr for Laboratory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_lab(s)
    }
}

pub fn parse_lab(text: &str) -> Result<Laboratory> {
    let mut builder = LaboratoryBuilder::new();
    for (ind, line) in text.lines().enumerate() {
        builder.add_row(line).with_context(|| {
            format!("Failed to add one row(line {}) to laboratory.", ind + 1)
        })?;
    }

    Ok(builder.build()?)
}

pub fn read_lab<P: AsRef<Path>>(path: P) -> Result<Laboratory> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open given file({}).", path.as_ref().display()))?;
    let reader = BufReader::new(file);
    let mut builder = LaboratoryBuilder::new();
    for (ind, line) in reader.lines().enumerate() {
        let line = line.with_context(|| {
            format!(
                "Failed to read line {} from given file({}).",
                ind + 1,
                path.as_ref().display()
            )
        })?;
        builder.add_row(&line).with_context(|| {
            format!("Failed to add one row(line {}) to laboratory.", ind + 1)
        })?;
    }

    let lab = builder.build()?;
    let start = lab.locate_start()?;
    tracing::info!(
        rows = lab.row_n(),
        cols = lab.col_n(),
        %start,
        path = %path.as_ref().display(),
        "Laboratory loaded"
    );

    Ok(lab)
}
