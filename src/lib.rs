//! fieldlog library crate.
//!
//! Day-partitioned data logging for a field node: the line codec, the
//! daily file layout, the append writer and time-range retrieval that
//! publishes stored lines in size-bounded pages. The binary entry point is
//! in `main.rs`.

pub mod core;
pub mod publish;
pub mod storage;
pub mod util;
