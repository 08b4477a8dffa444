//! Reader for recorded signal files.
//!
//! A recording holds one reading per line as two whitespace-separated numbers,
//! `<x> <y>`. Trackers write integer pixel coordinates, but real values are
//! accepted too. Lines are parsed lazily, so arbitrarily long recordings can be
//! replayed through the detector without loading them first.

use crate::source::types::Sample;
use std::io::{BufRead, BufReader, Read};
use thiserror::Error;

/// Errors raised while reading samples.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: expected `<x> <y>`, found {content:?}")]
    Malformed { line: usize, content: String },
}

/// Lazily parses `<x> <y>` lines from a buffered reader.
pub struct SignalReader<R> {
    reader: R,
    line_number: usize,
    buffer: String,
    done: bool,
}

impl<R: BufRead> SignalReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buffer: String::new(),
            done: false,
        }
    }

    /// Number of lines consumed so far (including blank ones).
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: Read> SignalReader<BufReader<R>> {
    /// Wrap an unbuffered reader such as a file or stdin handle.
    pub fn from_reader(reader: R) -> Self {
        Self::new(BufReader::new(reader))
    }
}

impl<R: BufRead> Iterator for SignalReader<R> {
    type Item = Result<Sample, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {
                    self.line_number += 1;
                    let trimmed = self.buffer.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(parse_line(trimmed, self.line_number));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(SourceError::Io(e)));
                }
            }
        }
    }
}

/// Parse a single `<x> <y>` line.
pub fn parse_line(line: &str, line_number: usize) -> Result<Sample, SourceError> {
    let malformed = || SourceError::Malformed {
        line: line_number,
        content: line.to_string(),
    };

    let mut fields = line.split_whitespace();
    let x = fields.next().ok_or_else(malformed)?;
    let y = fields.next().ok_or_else(malformed)?;
    if fields.next().is_some() {
        return Err(malformed());
    }

    let x: f64 = x.parse().map_err(|_| malformed())?;
    let y: f64 = y.parse().map_err(|_| malformed())?;
    Ok(Sample::new(x, y))
}
