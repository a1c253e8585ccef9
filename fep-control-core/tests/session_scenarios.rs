//! End-to-end console sessions against the simulated fleet.
//!
//! Each test drives a `Session` line by line, the way the terminal and the
//! websocket gateway do, and checks the exact output.

use fep_control_core::fleet::{FleetConfig, SimParticipantConfig, SimSystemConfig};
use fep_control_core::monitor::{LogEvent, LogSeverity};
use fep_control_core::{
    BufferSink, EXIT_BAD_ARITY, EXIT_UNKNOWN_COMMAND, OutputFormatter, Session, SimulatedFleet,
    SystemState,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::Arc;

fn fleet() -> Arc<SimulatedFleet> {
    Arc::new(SimulatedFleet::new(&FleetConfig {
        systems: vec![
            SimSystemConfig::new(
                "demo",
                vec![
                    SimParticipantConfig::new("part_a"),
                    SimParticipantConfig::new("part_b"),
                ],
            ),
            SimSystemConfig::new("other", vec![SimParticipantConfig::new("solo")]),
        ],
    }))
}

fn session(fleet: &Arc<SimulatedFleet>, structured: bool, auto_discovery: bool) -> (Session, BufferSink) {
    let sink = BufferSink::new();
    let out = Arc::new(OutputFormatter::new(sink.clone(), structured));
    (Session::new(fleet.clone(), out, auto_discovery), sink)
}

fn records(text: &str) -> Vec<Value> {
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn plain_lifecycle_workflow() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, false);

    let script = [
        "discoverSystem demo",
        "loadSystem demo",
        "initializeSystem demo",
        "startSystem demo",
        "getSystemState demo",
        "stopSystem demo",
        "getParticipantState demo part_a",
    ];
    for line in script {
        assert_eq!(s.execute_line(line), Some(0), "{line}");
    }
    assert_eq!(
        sink.contents(),
        "demo : part_a, part_b\n\
         demo loaded\n\
         demo initialized\n\
         demo started\n\
         6 : running : homogeneous\n\
         demo stopped\n\
         4 : initialized\n"
    );
    assert_eq!(
        fleet.participant_state("demo", "part_b"),
        Some(SystemState::Initialized)
    );
}

#[test]
fn unknown_system_without_auto_discovery() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, false);
    assert_eq!(s.execute_line("loadSystem demo"), Some(1));
    assert_eq!(sink.contents(), "system \"demo\" is not connected\n");
}

#[test]
fn auto_discovery_connects_on_first_use() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, true);
    assert_eq!(s.execute_line("loadSystem other"), Some(0));
    assert_eq!(sink.contents(), "other loaded\n");
    assert!(s.state().known_systems.contains_key("other"));
}

#[test]
fn dispatcher_rejects_bad_input() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, true, false);
    assert_eq!(s.execute_line("launchRocket"), Some(EXIT_UNKNOWN_COMMAND));
    assert_eq!(s.execute_line("loadSystem"), Some(EXIT_BAD_ARITY));
    assert_eq!(s.execute_line("   "), None);

    let out = records(&sink.contents());
    assert_eq!(out.len(), 2);
    for record in &out {
        assert_eq!(record["action"], "processCommandline");
        assert_eq!(record["status"], 2);
    }
}

#[test]
fn structured_session_emits_one_record_per_result() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, true);
    assert_eq!(s.execute_line("enableJson"), Some(0));
    for line in [
        "setSystemState demo running",
        "setInitPriority demo part_a 7",
        "getInitPriority demo part_a",
        "getParticipantProperty demo part_b clock/step_size",
        "stopParticipant demo nobody",
    ] {
        s.execute_line(line);
    }

    let out = records(&sink.contents());
    assert_eq!(out.len(), 6);
    assert_eq!(out[0]["action"], "enableJson");
    assert_eq!(out[1]["stateName"], "running");
    assert_eq!(out[1]["homogeneous"], "homogeneous");
    assert_eq!(out[3]["priority"], "7");
    assert_eq!(out[4]["name"], "step_size");
    assert_eq!(out[4]["value"], "100000000");
    assert_eq!(out[5]["status"], 4);
    assert_eq!(
        out[5]["error"],
        "participant 'nobody' is not in system 'demo'"
    );
}

#[test]
fn property_round_trip_updates_the_fleet() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, true);
    assert_eq!(
        s.execute_line("setParticipantProperty demo part_a clock/time_factor 2.5"),
        Some(0)
    );
    assert_eq!(
        s.execute_line("getParticipantProperty demo part_a clock/time_factor"),
        Some(0)
    );
    assert_eq!(sink.contents(), "property set\ntime_factor : 2.5\n\n");

    // A second session sees the same fleet.
    let (mut other, other_sink) = session(&fleet, false, true);
    other.execute_line("getParticipantProperty demo part_a clock/time_factor");
    assert_eq!(other_sink.contents(), "time_factor : 2.5\n\n");
}

#[test]
fn monitoring_follows_json_mode() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, true);
    s.execute_line("startMonitoringSystem demo");
    s.execute_line("enableJson");
    sink.take();

    let delivered = fleet.emit_log(
        "demo",
        &LogEvent {
            severity: LogSeverity::Warning,
            participant_name: "part_b".into(),
            logger_name: "clock".into(),
            message: "late step".into(),
        },
    );
    assert_eq!(delivered, 1);
    let record: Value = serde_json::from_str(sink.take().trim()).unwrap();
    assert_eq!(record["log_type"], "message");
    assert_eq!(record["participant_name"], "part_b");
    assert_eq!(record["logger_name"], "clock");
    assert_eq!(record["message"], "late step");
}

#[test]
fn quit_releases_systems_and_monitors() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, true);
    s.execute_line("startMonitoringSystem demo");
    assert_eq!(fleet.monitor_count("demo"), 1);

    assert_eq!(s.execute_line("quit"), Some(0));
    assert!(s.exit_requested());
    assert!(s.state().known_systems.is_empty());
    assert_eq!(fleet.monitor_count("demo"), 0);

    assert!(s.out().goodbye());
    assert!(!s.out().goodbye());
    assert!(sink.contents().ends_with("bye\n"));
}

#[test]
fn shutdown_hides_system_from_discovery() {
    let fleet = fleet();
    let (mut s, sink) = session(&fleet, false, false);
    s.execute_line("discoverAllSystems");
    s.execute_line("shutdownSystem other");
    sink.take();
    assert_eq!(s.execute_line("discoverAllSystems"), Some(0));
    assert_eq!(sink.contents(), "demo : part_a, part_b\n");
}

#[test]
fn sessions_do_not_share_state() {
    let fleet = fleet();
    let (mut first, _) = session(&fleet, false, false);
    let (second, _) = session(&fleet, false, false);
    first.execute_line("discoverSystem demo");
    first.execute_line("enableJson");
    assert_eq!(first.state().known_systems.len(), 1);
    assert!(second.state().known_systems.is_empty());
    assert!(first.is_structured());
    assert!(!second.is_structured());
}
