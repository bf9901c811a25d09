//! Inbound time-range retrieval command.
//!
//! Payload shape:
//!
//! ```json
//! {"epoch": 1672531199, "terminus": "2023-12-12T12:00:00", "topics": ["kkm"], "page_length": 120}
//! ```
//!
//! `epoch` and `terminus` take epoch seconds or any timestamp text.
//! `topics` defaults to `[""]` (everything); the remaining fields fall back
//! to the agent configuration.

use crate::core::filter::TopicFilter;
use crate::util::error::{FieldLogError, Result};
use crate::util::time::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetrievalRequest {
    pub epoch: Timestamp,
    pub terminus: Timestamp,
    #[serde(default)]
    pub topics: TopicFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filetype: Option<String>,
}

impl RetrievalRequest {
    pub fn new(epoch: Timestamp, terminus: Timestamp, topics: TopicFilter) -> Self {
        Self {
            epoch,
            terminus,
            topics,
            page_length: None,
            prefix: None,
            filetype: None,
        }
    }

    pub fn with_page_length(mut self, page_length: usize) -> Self {
        self.page_length = Some(page_length);
        self
    }

    /// Parse a command payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|e| FieldLogError::Config(format!("invalid retrieval request: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_timestamp_forms() {
        let req = RetrievalRequest::from_json(
            r#"{"epoch": 1672531199, "terminus": "2023-12-12T12:00:00", "topics": ["kkm"], "page_length": 120}"#,
        )
        .unwrap();
        assert_eq!(req.epoch.epoch_seconds(), 1_672_531_199);
        assert_eq!(req.terminus.to_string(), "2023-12-12T12:00:00");
        assert_eq!(req.topics, TopicFilter::new(["kkm"]));
        assert_eq!(req.page_length, Some(120));
        assert!(req.prefix.is_none());
    }

    #[test]
    fn test_topics_default_to_match_all() {
        let req = RetrievalRequest::from_json(r#"{"epoch": 0, "terminus": 86400}"#).unwrap();
        assert!(req.topics.is_match_all());
        assert!(req.page_length.is_none());
    }

    #[test]
    fn test_rejects_bad_payloads() {
        assert!(RetrievalRequest::from_json("{}").is_err());
        assert!(RetrievalRequest::from_json(r#"{"epoch": "soon", "terminus": 0}"#).is_err());
        assert!(RetrievalRequest::from_json("not json").is_err());
    }

    #[test]
    fn test_serialises_back_to_text_timestamps() {
        let start = Timestamp::from_ymd_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let end = Timestamp::from_ymd_hms(2023, 6, 2, 0, 0, 0).unwrap();
        let req = RetrievalRequest::new(start, end, TopicFilter::new(["kkm"])).with_page_length(5);
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"epoch":"2023-06-01T00:00:00","terminus":"2023-06-02T00:00:00","topics":["kkm"],"page_length":5}"#
        );
        assert_eq!(RetrievalRequest::from_json(&json).unwrap(), req);
    }
}
