//! Line-oriented, tab-delimited text input shared by the genotype and
//! reference readers.
//!
//! Lines are read into a growable buffer capped at an explicit maximum
//! length. A line longer than the cap is rejected with
//! [`LineError::TooLong`]; it is never truncated.

use std::{
    io::{self, BufRead, Read},
    marker::PhantomData,
    str::FromStr,
};

use thiserror::Error;

/// Default cap on the length of a single input line, excluding its terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum LineError {
    #[error("I/O error")]
    Io(#[from] io::Error),
    #[error("line exceeds the maximum length of {limit} bytes")]
    TooLong { limit: usize },
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// Reads one line at a time, enforcing a maximum line length.
pub struct BoundedLines<R> {
    inner: R,
    max_line_length: usize,
    line: u64,
    buf: Vec<u8>,
}

impl<R> BoundedLines<R>
where
    R: BufRead,
{
    pub fn new(inner: R, max_line_length: usize) -> Self {
        Self {
            inner,
            max_line_length,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Number of lines consumed so far (1-based number of the last line read).
    pub fn line_number(&self) -> u64 {
        self.line
    }

    /// Returns the next line without its `\n` or `\r\n` terminator, paired
    /// with its line number, or `None` at end of stream.
    pub fn next_line(&mut self) -> Result<Option<(u64, &str)>, LineError> {
        self.buf.clear();

        // Room for the longest accepted line plus a CRLF terminator.
        let limit = self.max_line_length as u64 + 2;
        let n = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;

        let mut end = self.buf.len();
        if self.buf[..end].ends_with(b"\n") {
            end -= 1;
            if self.buf[..end].ends_with(b"\r") {
                end -= 1;
            }
        }

        if end > self.max_line_length {
            return Err(LineError::TooLong {
                limit: self.max_line_length,
            });
        }

        let line = std::str::from_utf8(&self.buf[..end]).map_err(|_| LineError::InvalidUtf8)?;
        Ok(Some((self.line, line)))
    }
}

/// An error raised while reading or decoding one input record.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: u64,
    pub raw: String,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Line(#[from] LineError),
    #[error("expected {expected} tab-delimited fields, found {found}")]
    MalformedRecord { expected: usize, found: usize },
    #[error("empty {0} field")]
    EmptyField(&'static str),
    #[error("invalid position '{0}'")]
    InvalidPosition(String),
    #[error("unrecognized genotype call '{0}'")]
    UnrecognizedCall(String),
    #[error("invalid reference allele '{0}'")]
    InvalidAllele(String),
}

/// Splits a line into exactly `N` tab-delimited fields.
pub(crate) fn split_fields<const N: usize>(line: &str) -> Result<[&str; N], ParseErrorKind> {
    let fields: Vec<&str> = line.split('\t').collect();
    let found = fields.len();
    <[&str; N]>::try_from(fields).map_err(|_| ParseErrorKind::MalformedRecord { expected: N, found })
}

/// Parses an unsigned base-10 position. Signs are rejected.
pub(crate) fn parse_position(raw: &str) -> Result<u64, ParseErrorKind> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseErrorKind::InvalidPosition(raw.to_string()));
    }
    raw.parse()
        .map_err(|_| ParseErrorKind::InvalidPosition(raw.to_string()))
}

/// Iterator over the records of a line-oriented text file.
///
/// Lines starting with `#` are skipped. An empty line or the end of the
/// stream ends iteration. The iterator is fused after the first read error.
pub struct RecordReader<R, T> {
    lines: BoundedLines<R>,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<R, T> RecordReader<R, T>
where
    R: BufRead,
{
    pub fn new(inner: R) -> Self {
        Self::with_max_line_length(inner, DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(inner: R, max_line_length: usize) -> Self {
        Self {
            lines: BoundedLines::new(inner, max_line_length),
            done: false,
            _record: PhantomData,
        }
    }

    /// Line number of the most recently read line.
    pub fn line_number(&self) -> u64 {
        self.lines.line_number()
    }
}

impl<R, T> Iterator for RecordReader<R, T>
where
    R: BufRead,
    T: FromStr<Err = ParseErrorKind>,
{
    type Item = Result<T, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.lines.next_line() {
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Ok(Some((_, line))) if line.is_empty() => {
                    self.done = true;
                    return None;
                }
                Ok(Some((_, line))) if line.starts_with('#') => continue,
                Ok(Some((number, line))) => {
                    return Some(line.parse().map_err(|kind| ParseError {
                        line: number,
                        raw: line.to_string(),
                        kind,
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ParseError {
                        line: self.lines.line_number(),
                        raw: String::new(),
                        kind: e.into(),
                    }));
                }
            }
        }
    }
}
