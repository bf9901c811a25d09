//! Agent configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file (or
//! none at all) is valid. Command-line flags override individual fields
//! after loading.

use std::path::{Path, PathBuf};

use crate::core::retrieval::DayWalk;
use crate::publish::{time_range_topic, RetryPolicy};
use crate::util::constants::*;
use crate::util::error::{FieldLogError, Result};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Mount point of the removable storage.
    pub storage_root: PathBuf,
    /// Daily file prefix (`<prefix>_<m>-<d>-<y>.<filetype>`).
    pub file_prefix: String,
    /// Daily file extension; a leading dot is accepted and ignored.
    pub filetype: String,
    /// Field separator inside log lines.
    pub separator: char,
    /// Application prefix of published topics.
    pub topic_prefix: String,
    /// Device identifier appended to published topics.
    pub device_id: String,
    /// Lines per page when a request does not say.
    pub page_length: usize,
    /// Hard upper bound on a published payload.
    pub max_payload_bytes: usize,
    pub day_walk: DayWalk,
    pub retry: RetryPolicy,
    /// Directory for the persistent log file. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            filetype: DEFAULT_FILETYPE.to_string(),
            separator: DEFAULT_SEPARATOR,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            device_id: DEFAULT_DEVICE_ID.to_string(),
            page_length: DEFAULT_PAGE_LENGTH,
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            day_walk: DayWalk::default(),
            retry: RetryPolicy::default(),
            log_dir: None,
        }
    }
}

impl AgentConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FieldLogError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            FieldLogError::Config(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given; otherwise load the default file name from the
    /// working directory when present, or fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject settings the rest of the agent cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.page_length == 0 {
            return Err(FieldLogError::Config("page_length must be at least 1".into()));
        }
        if self.file_prefix.is_empty() || self.file_prefix.contains(['/', '\\']) {
            return Err(FieldLogError::Config(format!(
                "file_prefix {:?} must be a non-empty flat name",
                self.file_prefix
            )));
        }
        if crate::core::naming::normalize_filetype(&self.filetype).is_empty() {
            return Err(FieldLogError::Config("filetype must not be empty".into()));
        }
        crate::core::record::LineCodec::new(self.separator)?;
        if self.max_payload_bytes < 64 {
            return Err(FieldLogError::Config(format!(
                "max_payload_bytes {} is too small for any page",
                self.max_payload_bytes
            )));
        }
        Ok(())
    }

    /// Topic pages are published on.
    pub fn time_range_topic(&self) -> String {
        time_range_topic(&self.topic_prefix, &self.device_id)
    }
}
