//! Text formats for matrices and vectors.
//!
//! Both formats are whitespace-separated tokens; anything after a `#` on a
//! line is ignored.
//!
//! - matrix: `n nnz`, then `n + 1` offsets, `nnz` column indices, `nnz` weights
//! - vector: `n`, then `n` values
//!
//! [`write_vector`] emits the vector format with one value per line, using
//! the shortest representation that reads back to the same `f64`.

use crate::error::JError;
use crate::matrix::CsrMatrix;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

struct Tokens<'a> {
    path: &'a Path,
    items: Vec<(usize, &'a str)>,
    pos: usize,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(path: &'a Path, text: &'a str) -> Self {
        let items: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .flat_map(|(i, line)| {
                let content = line.split('#').next().unwrap_or("");
                content.split_whitespace().map(move |tok| (i + 1, tok))
            })
            .collect();
        let last_line = text.lines().count().max(1);
        Self { path, items, pos: 0, last_line }
    }

    fn error(&self, line: usize, reason: String) -> JError {
        JError::Parse { path: self.path.to_path_buf(), line, reason }
    }

    fn next<T: FromStr>(&mut self, what: &str) -> Result<T, JError> {
        let Some(&(line, tok)) = self.items.get(self.pos) else {
            return Err(self.error(self.last_line, format!("unexpected end of input, expected {what}")));
        };
        self.pos += 1;
        tok.parse()
            .map_err(|_| self.error(line, format!("expected {what}, found {tok:?}")))
    }

    /// Line of the most recently consumed token.
    fn line(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.items.get(i))
            .map_or(1, |&(line, _)| line)
    }

    fn many<T: FromStr>(&mut self, count: usize, what: &str) -> Result<Vec<T>, JError> {
        (0..count).map(|_| self.next(what)).collect()
    }

    fn finish(&self) -> Result<(), JError> {
        match self.items.get(self.pos) {
            Some(&(line, tok)) => Err(self.error(line, format!("unexpected trailing token {tok:?}"))),
            None => Ok(()),
        }
    }
}

fn read(path: &Path) -> Result<String, JError> {
    std::fs::read_to_string(path).map_err(|source| JError::Io { path: path.to_path_buf(), source })
}

/// Parse a CSR matrix; `path` is only used in error messages.
pub fn parse_matrix(path: &Path, text: &str) -> Result<CsrMatrix, JError> {
    let mut tokens = Tokens::new(path, text);
    let n: usize = tokens.next("row count")?;
    let boundaries = n
        .checked_add(1)
        .ok_or_else(|| tokens.error(tokens.line(), format!("row count {n} is too large")))?;
    let nnz: usize = tokens.next("entry count")?;
    let offsets = tokens.many(boundaries, "row offset")?;
    let columns = tokens.many(nnz, "column index")?;
    let weights = tokens.many(nnz, "weight")?;
    tokens.finish()?;
    CsrMatrix::try_new(n, offsets, columns, weights)
}

/// Parse a dense vector; `path` is only used in error messages.
pub fn parse_vector(path: &Path, text: &str) -> Result<Vec<f64>, JError> {
    let mut tokens = Tokens::new(path, text);
    let n: usize = tokens.next("vector length")?;
    let values = tokens.many(n, "value")?;
    tokens.finish()?;
    Ok(values)
}

pub fn load_matrix(path: &Path) -> Result<CsrMatrix, JError> {
    parse_matrix(path, &read(path)?)
}

pub fn load_vector(path: &Path) -> Result<Vec<f64>, JError> {
    parse_vector(path, &read(path)?)
}

pub fn write_vector(path: &Path, values: &[f64]) -> Result<(), JError> {
    let io_err = |source| JError::Io { path: PathBuf::from(path), source };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", values.len()).map_err(io_err)?;
    for v in values {
        writeln!(out, "{v}").map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}
