//! The logging agent: storage, daily logger and retrieval behind one value.
//!
//! If the storage cannot be mounted the agent still starts, in a degraded
//! mode where logging and retrieval are logged no-ops. The node keeps
//! running (and keeps its transport alive) without a card.

use crate::core::logger::DataLogger;
use crate::core::naming::DailyFileKey;
use crate::core::record::LineCodec;
use crate::core::request::RetrievalRequest;
use crate::core::retrieval::{RetrievalSettings, Retriever, ScanReport};
use crate::publish::Publisher;
use crate::storage::DirStorage;
use crate::util::config::AgentConfig;
use crate::util::error::Result;
use crate::util::time::Timestamp;

pub struct Agent<P> {
    storage: Option<DirStorage>,
    publisher: P,
    config: AgentConfig,
    codec: LineCodec,
    settings: RetrievalSettings,
}

impl<P: Publisher> Agent<P> {
    /// Validate `config` and mount its storage root.
    ///
    /// An invalid configuration is an error; an unmountable root is not.
    pub fn start(config: AgentConfig, publisher: P) -> Result<Self> {
        config.validate()?;
        let settings = RetrievalSettings::from_config(&config)?;
        let storage = match DirStorage::mount(&config.storage_root) {
            Ok(storage) => Some(storage),
            Err(e) => {
                tracing::error!("Storage unavailable, logging and retrieval disabled: {}", e);
                None
            }
        };
        Ok(Self {
            storage,
            publisher,
            codec: settings.codec,
            config,
            settings,
        })
    }

    pub fn is_degraded(&self) -> bool {
        self.storage.is_none()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    /// Logger for the daily file `ts` falls on. `None` when degraded.
    pub fn logger_for(&self, ts: Timestamp) -> Option<DataLogger<&DirStorage>> {
        let storage = self.storage.as_ref()?;
        Some(DataLogger::daily(
            storage,
            &self.config.file_prefix,
            ts.date(),
            &self.config.filetype,
            self.codec,
        ))
    }

    /// Log a message stamped with the current time.
    pub fn log(&self, topic: &str, message: &str) -> Result<()> {
        self.log_at(Timestamp::now(), topic, message)
    }

    /// Log a message into the daily file for `ts`.
    pub fn log_at(&self, ts: Timestamp, topic: &str, message: &str) -> Result<()> {
        match self.logger_for(ts) {
            Some(logger) => logger.log_absolute(ts, topic, message),
            None => {
                tracing::warn!("Storage unavailable, dropping message on '{}'", topic);
                Ok(())
            }
        }
    }

    /// Log with a relative stamp `<base>+<offset_secs>` into the daily file of
    /// the resolved time.
    pub fn log_relative_at(&self, base: Timestamp, offset_secs: i64, topic: &str, message: &str) -> Result<()> {
        let resolved = base.checked_add_secs(offset_secs).unwrap_or(base);
        match self.logger_for(resolved) {
            Some(logger) => logger.log_relative(base, offset_secs, topic, message),
            None => {
                tracing::warn!("Storage unavailable, dropping message on '{}'", topic);
                Ok(())
            }
        }
    }

    /// Write `fields` as the header of the daily file for `ts` unless that
    /// file already exists. Returns whether a header was written.
    pub fn ensure_header<T: AsRef<str>>(&self, ts: Timestamp, fields: &[T]) -> Result<bool> {
        match self.logger_for(ts) {
            Some(logger) => logger.write_header_if_absent(fields),
            None => Ok(false),
        }
    }

    /// Run a retrieval request. Degraded agents report an empty scan.
    pub fn retrieve(&mut self, request: &RetrievalRequest) -> Result<ScanReport> {
        let Some(storage) = self.storage.as_ref() else {
            tracing::warn!("Storage unavailable, ignoring retrieval request");
            return Ok(ScanReport::default());
        };
        let mut retriever = Retriever::new(storage, &mut self.publisher, self.settings.clone());
        retriever.handle_request(request)
    }

    /// Parse and run an inbound JSON command.
    pub fn handle_command(&mut self, payload: &str) -> Result<ScanReport> {
        let request = RetrievalRequest::from_json(payload)?;
        self.retrieve(&request)
    }

    /// Daily files present on storage, oldest first.
    pub fn list_daily_files(&self) -> Result<Vec<DailyFileKey>> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(Vec::new());
        };
        Retriever::new(storage, NullPublisher, self.settings.clone()).list_daily_files()
    }
}

/// Publisher for read-only uses of [`Retriever`].
struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&mut self, _topic: &str, _payload: &str, _retain: bool) -> Result<()> {
        Ok(())
    }
}
