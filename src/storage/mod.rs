//! Storage abstraction for the removable medium.
//!
//! Peripheral bring-up and block I/O live behind [`Storage`]; the logger and
//! the retrieval walk only ever see flat file names relative to the mount.

pub mod dir;

use std::io::{Read, Write};

use crate::util::error::Result;

pub use dir::DirStorage;

/// How a file is opened for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or truncate.
    Truncate,
    /// Create or append.
    Append,
}

/// Flat file store. Every call blocks until the medium responds.
pub trait Storage {
    type Reader: Read;
    type Writer: Write;

    /// Whether `name` exists. Errors are reported as "absent".
    fn exists(&self, name: &str) -> bool;

    /// Open `name` for sequential reading.
    fn open_read(&self, name: &str) -> Result<Self::Reader>;

    /// Open `name` for writing in `mode`.
    fn open_write(&self, name: &str, mode: WriteMode) -> Result<Self::Writer>;

    /// Names of all regular files at the mount root.
    fn list(&self) -> Result<Vec<String>>;
}

impl<S: Storage + ?Sized> Storage for &S {
    type Reader = S::Reader;
    type Writer = S::Writer;

    fn exists(&self, name: &str) -> bool {
        (**self).exists(name)
    }

    fn open_read(&self, name: &str) -> Result<Self::Reader> {
        (**self).open_read(name)
    }

    fn open_write(&self, name: &str, mode: WriteMode) -> Result<Self::Writer> {
        (**self).open_write(name, mode)
    }

    fn list(&self) -> Result<Vec<String>> {
        (**self).list()
    }
}
