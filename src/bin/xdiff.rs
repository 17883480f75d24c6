//! Numerical line-by-line diff of two vector files.
//!
//! Each line of both files must hold one number. Pairs whose absolute
//! difference exceeds the threshold are printed with their line number.
//! Exits with 1 when any pair differs or the files cannot be compared.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "xdiff", version, about = "Find numerical differences between two files")]
struct Cli {
    /// Threshold below which differences are ignored
    #[arg(short = 'e', default_value_t = 1e-10)]
    epsilon: f64,

    file1: PathBuf,
    file2: PathBuf,
}

fn lines(path: &Path) -> Result<impl Iterator<Item = std::io::Result<String>>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(BufReader::new(file).lines())
}

fn parse(path: &Path, lineno: usize, text: &str) -> Result<f64> {
    text.trim().parse().with_context(|| {
        format!(
            "xdiff is strictly for numerical comparisons but {}:{} contains {:?}",
            path.display(),
            lineno,
            text
        )
    })
}

/// Returns the number of differing lines.
fn compare(cli: &Cli) -> Result<usize> {
    let mut diffs = 0;
    let mut left = lines(&cli.file1)?;
    let mut right = lines(&cli.file2)?;
    let mut lineno = 0;
    loop {
        lineno += 1;
        let (a, b) = match (left.next(), right.next()) {
            (Some(a), Some(b)) => (a?, b?),
            (None, None) => break,
            _ => bail!("files differ in length at line {lineno}"),
        };
        let x = parse(&cli.file1, lineno, &a)?;
        let y = parse(&cli.file2, lineno, &b)?;
        let delta = (x - y).abs();
        if delta > cli.epsilon || delta.is_nan() {
            println!("{lineno}: {x} != {y} (|diff| = {delta:e})");
            diffs += 1;
        }
    }
    Ok(diffs)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match compare(&cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(n) => {
            println!("{n} differences above {:e}", cli.epsilon);
            ExitCode::from(1)
        }
        Err(e) => {
            println!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}
