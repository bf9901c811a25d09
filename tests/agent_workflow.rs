//! End-to-end tests: log through the agent, then retrieve what was logged.

use fieldlog::core::agent::Agent;
use fieldlog::core::filter::TopicFilter;
use fieldlog::core::logger::DataLogger;
use fieldlog::core::record::LineCodec;
use fieldlog::core::request::RetrievalRequest;
use fieldlog::core::retrieval::ScanReport;
use fieldlog::publish::{
    spawn_transport_thread, transport_channel, JsonLinesPublisher, MemoryPublisher,
};
use fieldlog::storage::DirStorage;
use fieldlog::util::config::AgentConfig;
use fieldlog::util::time::Timestamp;

fn at(d: u32, h: u32) -> Timestamp {
    Timestamp::from_ymd_hms(2023, 6, d, h, 0, 0).unwrap()
}

fn config_for(root: &std::path::Path) -> AgentConfig {
    AgentConfig {
        storage_root: root.to_path_buf(),
        device_id: "AA:BB:CC:DD:EE:FF".into(),
        ..AgentConfig::default()
    }
}

#[test]
fn logged_messages_come_back_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = Agent::start(config_for(dir.path()), MemoryPublisher::new()).unwrap();

    agent.ensure_header(at(1, 0), &["time", "topic", "message"]).unwrap();
    agent.log_at(at(1, 9), "sensors/kkm/temp", "21.0").unwrap();
    agent.log_at(at(1, 23), "sensors/kkm/temp", "{\"t\": 20.5; \"ok\": true}").unwrap();
    agent.log_at(at(2, 1), "sensors/other/temp", "19.0").unwrap();
    agent.log_at(at(2, 2), "sensors/kkm/temp", "18.5").unwrap();

    let request = RetrievalRequest::new(at(1, 0), at(2, 23), TopicFilter::new(["kkm"]));
    let report = agent.retrieve(&request).unwrap();
    assert_eq!(report.records_published, 3);
    assert_eq!(report.pages_published, 2);

    let codec = LineCodec::default();
    let publisher = agent.into_publisher();
    let messages: Vec<String> = publisher
        .payloads_json()
        .iter()
        .flat_map(|p| p["data"].as_array().cloned().unwrap_or_default())
        .filter_map(|v| codec.decode(v.as_str()?))
        .map(|r| r.message)
        .collect();
    assert_eq!(messages, ["21.0", "{\"t\": 20.5; \"ok\": true}", "18.5"]);
    assert_eq!(
        publisher.messages()[0].topic,
        "datagator/data/time_range/AA:BB:CC:DD:EE:FF"
    );
}

#[test]
fn header_line_is_not_published() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = Agent::start(config_for(dir.path()), MemoryPublisher::new()).unwrap();
    agent.ensure_header(at(1, 0), &["time", "topic", "message"]).unwrap();
    agent.log_at(at(1, 8), "kkm", "1").unwrap();

    let report = agent
        .handle_command(r#"{"epoch": "2023-06-01", "terminus": "2023-06-01T23:59:59"}"#)
        .unwrap();
    assert_eq!(report.records_published, 1);
    assert!(report.lines_skipped >= 1);
}

#[test]
fn relative_stamps_are_retrieved_at_resolved_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = Agent::start(config_for(dir.path()), MemoryPublisher::new()).unwrap();
    agent.log_relative_at(at(1, 10), 7200, "kkm", "late").unwrap();

    let early = RetrievalRequest::new(at(1, 10), at(1, 11), TopicFilter::match_all());
    assert_eq!(agent.retrieve(&early).unwrap().records_published, 0);
    let late = RetrievalRequest::new(at(1, 12), at(1, 12), TopicFilter::match_all());
    assert_eq!(agent.retrieve(&late).unwrap().records_published, 1);
}

#[test]
fn logger_and_agent_share_the_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let storage = DirStorage::mount(dir.path()).unwrap();
    let logger = DataLogger::daily(&storage, "log", at(3, 0).date(), ".csv", LineCodec::default());
    logger.log_absolute(at(3, 5), "kkm", "1").unwrap();

    let agent = Agent::start(config_for(dir.path()), MemoryPublisher::new()).unwrap();
    let files: Vec<String> = agent
        .list_daily_files()
        .unwrap()
        .iter()
        .map(|k| k.file_name())
        .collect();
    assert_eq!(files, ["log_6-3-2023.csv"]);
}

#[test]
fn degraded_agent_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut agent = Agent::start(
        config_for(&dir.path().join("unmounted")),
        MemoryPublisher::new(),
    )
    .unwrap();
    assert!(agent.is_degraded());

    agent.log("kkm", "1").unwrap();
    let request = RetrievalRequest::new(at(1, 0), at(2, 0), TopicFilter::match_all());
    assert_eq!(agent.retrieve(&request).unwrap(), ScanReport::default());
    assert_eq!(agent.publisher().attempts(), 0);
}

#[test]
fn transport_thread_forwards_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let (publisher, receiver) = transport_channel(1);
    let transport = spawn_transport_thread(receiver, JsonLinesPublisher::new(std::io::sink())).unwrap();

    let mut agent = Agent::start(config_for(dir.path()), publisher).unwrap();
    for h in 0..10 {
        agent.log_at(at(1, h), "kkm", &h.to_string()).unwrap();
    }
    let request =
        RetrievalRequest::new(at(1, 0), at(1, 23), TopicFilter::match_all()).with_page_length(3);
    let report = agent.retrieve(&request).unwrap();
    drop(agent);

    let summary = transport.join().unwrap();
    assert_eq!(report.pages_published, 4);
    assert_eq!(summary.forwarded, 4);
    assert_eq!(summary.failed, 0);
}
