//! Line-at-a-time reader over an explicit file handle.
//!
//! The scan never holds more than one line of a file in memory: bytes are
//! pulled through a small [`BufReader`] until the next newline.

use std::io::{BufRead, BufReader, Read};

use crate::util::constants::READ_BUFFER_BYTES;
use crate::util::error::Result;

/// An open (or closed) file handle that yields newline-terminated chunks.
///
/// There is no rewind; reading a file again means opening it again.
#[derive(Debug)]
pub struct LineStream<R> {
    inner: Option<BufReader<R>>,
    scratch: Vec<u8>,
}

impl<R: Read> LineStream<R> {
    /// Wrap a freshly opened reader.
    pub fn open(reader: R) -> Self {
        Self {
            inner: Some(BufReader::with_capacity(READ_BUFFER_BYTES, reader)),
            scratch: Vec::new(),
        }
    }

    /// A stream with no file behind it.
    pub fn closed() -> Self {
        Self {
            inner: None,
            scratch: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether at least one more byte can be read.
    pub fn has_more(&mut self) -> Result<bool> {
        match self.inner.as_mut() {
            Some(reader) => Ok(!reader.fill_buf()?.is_empty()),
            None => Ok(false),
        }
    }

    /// Read up to and including the next `\n`, or to end-of-file.
    ///
    /// Returns the empty string when no file is open or nothing is left.
    /// Invalid UTF-8 is replaced rather than failing the line.
    pub fn read_line(&mut self) -> Result<String> {
        let Some(reader) = self.inner.as_mut() else {
            return Ok(String::new());
        };

        self.scratch.clear();
        reader.read_until(b'\n', &mut self.scratch)?;
        let line = String::from_utf8_lossy(&self.scratch).into_owned();
        self.scratch.clear();
        Ok(line)
    }

    /// Release the handle. Later reads return the empty string.
    pub fn close(&mut self) {
        self.inner = None;
        self.scratch = Vec::new();
    }
}
