//! Core domain modules for fieldlog.
//!
//! Contains the record codec, daily file naming, the append logger, the
//! line reader, entry filtering, page accumulation and range retrieval.

pub mod agent;
pub mod filter;
pub mod line_reader;
pub mod logger;
pub mod naming;
pub mod page;
pub mod record;
pub mod request;
pub mod retrieval;
