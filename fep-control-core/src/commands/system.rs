//! System-wide lifecycle, state and monitoring commands.

use super::general::report_participants;
use crate::fleet::Transition;
use crate::monitor::EventMonitor;
use crate::output::CmdStatus;
use crate::session::Session;
use crate::state::SystemState;
use std::sync::Arc;

/// Apply one transition to a whole system. A successful shutdown also
/// forgets the system.
pub(crate) fn change_system_state(
    session: &mut Session,
    action: &str,
    name: &str,
    transition: Transition,
) -> bool {
    let out = session.out().clone();
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    if let Err(e) = system.transition(transition) {
        out.exception(
            action,
            &format!("cannot {} system '{name}'", transition.verb()),
            CmdStatus::GenericError,
            &e,
        );
        return false;
    }
    if transition == Transition::Shutdown {
        session.forget_system(name);
    }
    out.note(action, &format!("{name} {}", transition.past()));
    true
}

fn report_system_state(session: &mut Session, action: &str, name: &str) -> bool {
    let out = session.out().clone();
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    match system.system_state() {
        Ok(aggregated) => {
            let homogeneity = if aggregated.homogeneous {
                "homogeneous"
            } else {
                "inhomogeneous"
            };
            out.notes(
                action,
                &[
                    ("stateID", aggregated.state.id().to_string()),
                    ("stateName", aggregated.state.name().to_string()),
                    ("homogeneous", homogeneity.to_string()),
                ],
            );
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot get system state for '{name}'"),
                CmdStatus::GenericError,
                &e,
            );
            false
        }
    }
}

pub fn load_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Load)
}

pub fn unload_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Unload)
}

pub fn initialize_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Initialize)
}

pub fn deinitialize_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Deinitialize)
}

pub fn start_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Start)
}

pub fn stop_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Stop)
}

pub fn pause_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Pause)
}

pub fn shutdown_system(session: &mut Session, tokens: &[String]) -> bool {
    change_system_state(session, &tokens[0], &tokens[1], Transition::Shutdown)
}

pub fn start_monitoring_system(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let monitor: Arc<dyn EventMonitor> = session.monitor().clone();
    let (action, name) = (&tokens[0], &tokens[1]);
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    // a second registration of the same monitor would duplicate every line
    if let Err(e) = system.unregister_monitoring(&monitor) {
        tracing::trace!(system = %name, error = %e, "no earlier monitor registration");
    }
    match system.register_monitoring(monitor) {
        Ok(()) => {
            out.note(action, "monitoring: enabled");
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot monitor system '{name}'"),
                CmdStatus::GenericError,
                &e,
            );
            false
        }
    }
}

pub fn stop_monitoring_system(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let monitor: Arc<dyn EventMonitor> = session.monitor().clone();
    let (action, name) = (&tokens[0], &tokens[1]);
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    if let Err(e) = system.unregister_monitoring(&monitor) {
        tracing::trace!(system = %name, error = %e, "monitor was not registered");
    }
    out.note(action, "monitoring: disabled");
    true
}

pub fn get_system_state(session: &mut Session, tokens: &[String]) -> bool {
    report_system_state(session, &tokens[0], &tokens[1])
}

/// `shutdowned` is handled as "set unloaded, then shut down".
pub fn set_system_state(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, name, state_text) = (&tokens[0], &tokens[1], &tokens[2]);
    let Some(system) = session.resolve_system(name) else {
        return false;
    };
    let target = SystemState::from_user_text(state_text);
    let result = if target == SystemState::Unreachable {
        system.set_system_state(SystemState::Unloaded)
    } else {
        system.set_system_state(target)
    };
    if let Err(e) = result {
        out.exception(
            action,
            &format!("cannot set system state '{state_text}' for '{name}'"),
            CmdStatus::GenericError,
            &e,
        );
        return false;
    }
    if target == SystemState::Unreachable {
        change_system_state(session, action, name, Transition::Shutdown)
    } else {
        report_system_state(session, action, name)
    }
}

pub fn get_participants(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let Some(system) = session.resolve_system(&tokens[1]) else {
        return false;
    };
    report_participants(&out, &tokens[0], system.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{FleetConfig, SimParticipantConfig, SimSystemConfig, SimulatedFleet};
    use crate::monitor::{LogEvent, LogSeverity};
    use crate::output::{BufferSink, OutputFormatter};
    use pretty_assertions::assert_eq;

    fn session() -> (Session, BufferSink, SimulatedFleet) {
        let fleet = SimulatedFleet::new(&FleetConfig {
            systems: vec![SimSystemConfig::new(
                "demo",
                vec![
                    SimParticipantConfig::new("part_a"),
                    SimParticipantConfig::new("part_b"),
                ],
            )],
        });
        let sink = BufferSink::new();
        let out = Arc::new(OutputFormatter::new(sink.clone(), false));
        (
            Session::new(Arc::new(fleet.clone()), out, true),
            sink,
            fleet,
        )
    }

    #[test]
    fn test_lifecycle_notes() {
        let (mut s, sink, _) = session();
        assert_eq!(s.execute_line("loadSystem demo"), Some(0));
        assert_eq!(s.execute_line("initializeSystem demo"), Some(0));
        assert_eq!(s.execute_line("startSystem demo"), Some(0));
        assert_eq!(s.execute_line("getSystemState demo"), Some(0));
        assert_eq!(
            sink.contents(),
            "demo loaded\ndemo initialized\ndemo started\n6 : running : homogeneous\n"
        );
    }

    #[test]
    fn test_invalid_transition_reports_exception() {
        let (mut s, sink, _) = session();
        assert_eq!(s.execute_line("startSystem demo"), Some(1));
        assert!(sink.contents().starts_with("cannot start system 'demo', exception: "));
    }

    #[test]
    fn test_shutdown_forgets_system() {
        let (mut s, sink, _) = session();
        assert_eq!(s.execute_line("shutdownSystem demo"), Some(0));
        assert!(s.state().known_systems.is_empty());
        s.set_auto_discovery(false);
        assert_eq!(s.execute_line("getSystemState demo"), Some(1));
        assert_eq!(
            sink.contents(),
            "demo shutdowned\nsystem \"demo\" is not connected\n"
        );
    }

    #[test]
    fn test_set_system_state_reports_new_state() {
        let (mut s, sink, _) = session();
        assert_eq!(s.execute_line("setSystemState demo initialized"), Some(0));
        assert_eq!(sink.contents(), "4 : initialized : homogeneous\n");
    }

    #[test]
    fn test_set_system_state_shutdowned_is_unload_then_shutdown() {
        let (mut s, sink, fleet) = session();
        s.execute_line("setSystemState demo running");
        sink.take();
        assert_eq!(s.execute_line("setSystemState demo shutdowned"), Some(0));
        assert_eq!(sink.contents(), "demo shutdowned\n");
        assert!(!s.state().known_systems.contains_key("demo"));
        assert_eq!(
            fleet.participant_state("demo", "part_a"),
            Some(SystemState::Unreachable)
        );
    }

    #[test]
    fn test_set_system_state_unknown_text() {
        let (mut s, sink, _) = session();
        assert_eq!(s.execute_line("setSystemState demo sleeping"), Some(1));
        assert!(
            sink.contents()
                .starts_with("cannot set system state 'sleeping' for 'demo', exception: ")
        );
    }

    #[test]
    fn test_get_participants() {
        let (mut s, sink, _) = session();
        s.execute_line("getParticipants demo");
        assert_eq!(sink.contents(), "demo : part_a, part_b\n");
    }

    #[test]
    fn test_monitoring_delivers_logs_once() {
        let (mut s, sink, fleet) = session();
        s.execute_line("startMonitoringSystem demo");
        s.execute_line("startMonitoringSystem demo");
        assert_eq!(fleet.monitor_count("demo"), 1);
        sink.take();
        fleet.emit_log(
            "demo",
            &LogEvent {
                severity: LogSeverity::Info,
                participant_name: "part_a".into(),
                logger_name: "sched".into(),
                message: "tick".into(),
            },
        );
        assert_eq!(sink.take(), "    LOG [Info] sched@part_a :tick\nfep> ");
        s.execute_line("stopMonitoringSystem demo");
        assert_eq!(fleet.monitor_count("demo"), 0);
        assert_eq!(sink.take(), "monitoring: disabled\n");
    }
}
