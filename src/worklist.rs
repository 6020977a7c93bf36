//! Work list reader: a lazy, single-pass sequence of work items from a text file
//!
//! Each non-blank line yields one [`WorkItem`] whose identifier is everything
//! before the last delimiter. Lines without a delimiter yield
//! [`Error::MalformedLine`] so the caller can report them and keep going.

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::InputConfig;
use crate::error::{Error, Result};
use crate::types::WorkItem;

/// Reads work items from a line-delimited input file
pub struct WorkListReader {
    path: PathBuf,
    reader: BufReader<File>,
    encoding: &'static Encoding,
    delimiter: char,
    line: u64,
    buf: Vec<u8>,
    finished: bool,
}

impl WorkListReader {
    /// Open `path`, decoding lines with the encoding named by `charset`
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the charset label is unknown or not ASCII-compatible
    /// - [`Error::InputUnavailable`] if the file cannot be opened
    pub async fn open(path: &Path, charset: &str, delimiter: char) -> Result<Self> {
        let encoding = resolve_encoding(charset)?;
        let file = File::open(path)
            .await
            .map_err(|source| Error::InputUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            path = %path.display(),
            encoding = encoding.name(),
            "Opened work list"
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            encoding,
            delimiter,
            line: 0,
            buf: Vec::with_capacity(256),
            finished: false,
        })
    }

    /// Open the input described by an [`InputConfig`]
    pub async fn from_config(input: &InputConfig) -> Result<Self> {
        Self::open(&input.file, &input.charset, input.delimiter).await
    }

    /// Number of raw lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    /// Read the next work item, or `None` at end of input
    ///
    /// Blank lines are skipped. A read error is returned once and ends the sequence.
    pub async fn next_item(&mut self) -> Option<Result<WorkItem>> {
        while !self.finished {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(0) => self.finished = true,
                Ok(_) => {
                    self.line += 1;
                    let mut raw = trim_line_ending(&self.buf);
                    if self.line == 1 {
                        raw = strip_bom(raw, self.encoding);
                    }
                    let (text, had_errors) = self.encoding.decode_without_bom_handling(raw);
                    if had_errors {
                        tracing::debug!(
                            line = self.line,
                            encoding = self.encoding.name(),
                            "Replaced undecodable bytes"
                        );
                    }
                    if text.trim().is_empty() {
                        continue;
                    }
                    return Some(WorkItem::parse(&text, self.line, self.delimiter));
                }
                Err(e) => {
                    self.finished = true;
                    tracing::error!(
                        path = %self.path.display(),
                        line = self.line + 1,
                        error = %e,
                        "Failed to read work list"
                    );
                    return Some(Err(Error::Io(e)));
                }
            }
        }
        None
    }

    /// Turn the reader into a stream of work items
    pub fn into_stream(self) -> impl Stream<Item = Result<WorkItem>> + Send {
        futures::stream::unfold(self, |mut reader| async move {
            reader.next_item().await.map(|item| (item, reader))
        })
    }
}

/// Resolve a charset label (WHATWG names and aliases, case-insensitive)
///
/// Only ASCII-compatible encodings are accepted, since lines are split on `\n`
/// before decoding.
pub fn resolve_encoding(charset: &str) -> Result<&'static Encoding> {
    let encoding = Encoding::for_label(charset.as_bytes())
        .ok_or_else(|| Error::config(format!("unknown charset '{}'", charset), "charset"))?;
    if !encoding.is_ascii_compatible() {
        return Err(Error::config(
            format!("charset '{}' is not supported for line input", charset),
            "charset",
        ));
    }
    Ok(encoding)
}

/// Drop a leading byte order mark, but only one that belongs to `encoding`.
/// Any other BOM bytes are ordinary text in the configured charset.
fn strip_bom<'a>(raw: &'a [u8], encoding: &'static Encoding) -> &'a [u8] {
    match Encoding::for_bom(raw) {
        Some((bom_encoding, len)) if bom_encoding == encoding => &raw[len..],
        _ => raw,
    }
}

fn trim_line_ending(mut raw: &[u8]) -> &[u8] {
    if let [rest @ .., b'\n'] = raw {
        raw = rest;
    }
    if let [rest @ .., b'\r'] = raw {
        raw = rest;
    }
    raw
}
