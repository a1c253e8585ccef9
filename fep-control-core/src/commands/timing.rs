//! Timing configuration of a system.

use crate::fleet::{FleetResult, SystemHandle};
use crate::output::CmdStatus;
use crate::session::Session;

/// Sync cycle used for the system time configuration.
const SYNC_CYCLE_TIME: &str = "100";

fn configure(
    session: &mut Session,
    tokens: &[String],
    success: &str,
    apply: impl FnOnce(&mut dyn SystemHandle) -> FleetResult<()>,
) -> bool {
    let out = session.out().clone();
    let (action, name) = (&tokens[0], &tokens[1]);
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    match apply(&mut **system) {
        Ok(()) => {
            out.note(action, success);
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot set timing for '{name}'"),
                CmdStatus::SystemtimingError,
                &e,
            );
            false
        }
    }
}

pub fn configure_system_time(session: &mut Session, tokens: &[String]) -> bool {
    let master = &tokens[2];
    configure(
        session,
        tokens,
        "successfully set SystemTimingSystemTime",
        |system| system.configure_timing_system_time(master, SYNC_CYCLE_TIME),
    )
}

pub fn configure_discrete_time(session: &mut Session, tokens: &[String]) -> bool {
    let (master, factor, step_size) = (&tokens[2], &tokens[3], &tokens[4]);
    configure(
        session,
        tokens,
        "successfully set SystemTimingDiscrete",
        |system| system.configure_timing_discrete(master, step_size, factor),
    )
}

pub fn configure_no_sync(session: &mut Session, tokens: &[String]) -> bool {
    configure(session, tokens, "successfully set SystemTimeNoSync", |system| {
        system.configure_timing_no_master()
    })
}

pub fn get_current_timing_master(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, name) = (&tokens[0], &tokens[1]);
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    match system.current_timing_masters() {
        Ok(masters) => {
            out.attribute(action, "timing masters", &masters.join(","));
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot get timing master for '{name}'"),
                CmdStatus::SystemtimingError,
                &e,
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{FleetConfig, SimParticipantConfig, SimSystemConfig, SimulatedFleet};
    use crate::output::{BufferSink, OutputFormatter};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn session() -> (Session, BufferSink) {
        let fleet = SimulatedFleet::new(&FleetConfig {
            systems: vec![SimSystemConfig::new(
                "demo",
                vec![
                    SimParticipantConfig::new("master"),
                    SimParticipantConfig::new("follower"),
                ],
            )],
        });
        let sink = BufferSink::new();
        let out = Arc::new(OutputFormatter::new(sink.clone(), false));
        (Session::new(Arc::new(fleet), out, true), sink)
    }

    #[test]
    fn test_discrete_then_query_master() {
        let (mut s, sink) = session();
        assert_eq!(
            s.execute_line("configureTiming3DiscreteTime demo master 0.0 100000000"),
            Some(0)
        );
        assert_eq!(s.execute_line("getCurrentTimingMaster demo"), Some(0));
        assert_eq!(
            sink.contents(),
            "successfully set SystemTimingDiscrete\ntiming masters : master\n"
        );
    }

    #[test]
    fn test_system_time_and_reset() {
        let (mut s, sink) = session();
        s.execute_line("configureTiming3SystemTime demo master");
        s.execute_line("configureTiming3NoSync demo");
        s.execute_line("getCurrentTimingMaster demo");
        assert_eq!(
            sink.contents(),
            "successfully set SystemTimingSystemTime\nsuccessfully set SystemTimeNoSync\ntiming masters : \n"
        );
    }

    #[test]
    fn test_bad_step_size() {
        let (mut s, sink) = session();
        assert_eq!(
            s.execute_line("configureTiming3DiscreteTime demo master 1.0 fast"),
            Some(1)
        );
        assert!(sink.contents().starts_with("cannot set timing for 'demo', exception: "));
    }

    #[test]
    fn test_unknown_master_is_timing_error() {
        let (mut s, sink) = session();
        s.set_json_mode(true);
        s.execute_line("configureTiming3SystemTime demo ghost");
        let record: serde_json::Value = serde_json::from_str(sink.contents().trim()).unwrap();
        assert_eq!(record["status"], 6);
    }
}
