//! Entry filtering for range retrieval.
//!
//! [`EntryFilter`] holds the requested window and topic list. Lines are
//! classified without decoding the message, with checks ordered
//! cheapest-first for short-circuit efficiency.

use crate::core::record::LineCodec;
use crate::util::time::Timestamp;

/// Topic substring filter.
///
/// A list holding exactly one empty string matches every topic. Otherwise
/// each non-empty entry is tested as a substring of the candidate topic, and
/// any hit accepts it. An empty list matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TopicFilter {
    topics: Vec<String>,
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::match_all()
    }
}

impl TopicFilter {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// The `[""]` sentinel.
    pub fn match_all() -> Self {
        Self {
            topics: vec![String::new()],
        }
    }

    /// Parse a comma-separated list as typed on the command line.
    ///
    /// Entries are trimmed and empty ones dropped. An input with no
    /// non-empty entry (`""`, `","`) gives [`TopicFilter::match_all`].
    pub fn parse_list(input: &str) -> Self {
        let topics: Vec<&str> = input
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if topics.is_empty() {
            return Self::match_all();
        }
        Self::new(topics)
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn is_match_all(&self) -> bool {
        self.topics.len() == 1 && self.topics[0].is_empty()
    }

    /// Test one candidate topic.
    pub fn matches(&self, topic: &str) -> bool {
        if self.is_match_all() {
            return true;
        }
        self.topics
            .iter()
            .any(|f| !f.is_empty() && topic.contains(f.as_str()))
    }
}

/// Why a line was or was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineVerdict {
    /// No timestamp marker or fewer than two separators.
    Malformed,
    /// Well-formed, but the timestamp field does not parse.
    BadTimestamp,
    /// Outside `[start, end]`.
    OutOfRange,
    /// In range, topic not selected.
    TopicMismatch,
    /// Goes into the page.
    Accepted,
}

/// Time window plus topic selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFilter {
    /// Inclusive lower bound.
    pub start: Timestamp,
    /// Inclusive upper bound.
    pub end: Timestamp,
    pub topics: TopicFilter,
}

impl EntryFilter {
    pub fn new(start: Timestamp, end: Timestamp, topics: TopicFilter) -> Self {
        Self { start, end, topics }
    }

    /// `start <= ts <= end`.
    pub fn in_range(&self, ts: Timestamp) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// Test an already-parsed timestamp and topic.
    pub fn matches(&self, ts: Timestamp, topic: &str) -> bool {
        self.in_range(ts) && self.topics.matches(topic)
    }

    /// Classify one raw line.
    ///
    /// Order:
    /// 1. Timestamp marker probe (substring scan)
    /// 2. Field split (two separator scans)
    /// 3. Timestamp parse and range comparison
    /// 4. Topic substring match
    pub fn classify(&self, codec: &LineCodec, line: &str) -> LineVerdict {
        if !codec.probe(line) {
            return LineVerdict::Malformed;
        }
        let Some(fields) = codec.split(line) else {
            return LineVerdict::Malformed;
        };
        let Ok(ts) = Timestamp::parse(fields.timestamp) else {
            return LineVerdict::BadTimestamp;
        };
        if !self.in_range(ts) {
            return LineVerdict::OutOfRange;
        }
        if !self.topics.matches(fields.topic) {
            return LineVerdict::TopicMismatch;
        }
        LineVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32) -> Timestamp {
        Timestamp::from_ymd_hms(2023, 6, 1, h, 0, 0).unwrap()
    }

    fn day_filter(topics: TopicFilter) -> EntryFilter {
        EntryFilter::new(at(0), at(23), topics)
    }

    #[test]
    fn test_sentinel_matches_everything() {
        let f = TopicFilter::match_all();
        assert!(f.matches("sensors/kkm/temp"));
        assert!(f.matches(""));
    }

    #[test]
    fn test_substring_match() {
        let f = TopicFilter::new(["kkm"]);
        assert!(f.matches("sensors/kkm/temp"));
        assert!(!f.matches("sensors/other/temp"));
    }

    #[test]
    fn test_empty_entries_ignored_in_multi_list() {
        let f = TopicFilter::new(["", "kkm"]);
        assert!(!f.is_match_all());
        assert!(f.matches("kkm"));
        assert!(!f.matches("other"));
    }

    #[test]
    fn test_empty_list_matches_nothing() {
        let f = TopicFilter::new(Vec::<String>::new());
        assert!(!f.matches("kkm"));
    }

    #[test]
    fn test_parse_list() {
        assert!(TopicFilter::parse_list("").is_match_all());
        assert_eq!(TopicFilter::parse_list(" kkm , temp ").topics(), ["kkm", "temp"]);
        assert_eq!(TopicFilter::parse_list("kkm,,").topics(), ["kkm"]);
    }

    #[test]
    fn test_parse_list_of_only_commas_matches_all() {
        for input in [",", " , ", ",,,"] {
            let filter = TopicFilter::parse_list(input);
            assert!(filter.is_match_all(), "{input:?}");
            assert!(filter.matches("sensors/other/temp"));
        }
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let f = EntryFilter::new(at(10), at(12), TopicFilter::match_all());
        assert!(f.in_range(at(10)));
        assert!(f.in_range(at(12)));
        assert!(!f.in_range(at(9)));
        assert!(!f.in_range(at(13)));
    }

    #[test]
    fn test_classify() {
        let codec = LineCodec::default();
        let f = day_filter(TopicFilter::new(["kkm"]));
        assert_eq!(f.classify(&codec, "garbage-no-separators"), LineVerdict::Malformed);
        assert_eq!(f.classify(&codec, "12:00;nope\n"), LineVerdict::Malformed);
        assert_eq!(f.classify(&codec, "12:00;kkm;1;\n"), LineVerdict::BadTimestamp);
        assert_eq!(
            f.classify(&codec, "2023-06-02T10:00:00;kkm;1;\n"),
            LineVerdict::OutOfRange
        );
        assert_eq!(
            f.classify(&codec, "2023-06-01T10:00:00;other;1;\n"),
            LineVerdict::TopicMismatch
        );
        assert_eq!(
            f.classify(&codec, "2023-06-01T10:00:00;kkm;1;\n"),
            LineVerdict::Accepted
        );
    }

    #[test]
    fn test_serde_transparent() {
        let f: TopicFilter = serde_json::from_str(r#"["kkm"]"#).unwrap();
        assert_eq!(f, TopicFilter::new(["kkm"]));
        assert_eq!(serde_json::to_string(&TopicFilter::match_all()).unwrap(), r#"[""]"#);
    }
}
