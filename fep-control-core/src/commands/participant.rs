//! Participant priorities and per-participant lifecycle.

use super::{Lookup, not_in_system, participant_of};
use crate::fleet::Transition;
use crate::output::CmdStatus;
use crate::session::Session;
use crate::state::SystemState;

#[derive(Debug, Clone, Copy)]
enum Priority {
    Init,
    Start,
}

fn set_priority(session: &mut Session, tokens: &[String], kind: Priority) -> bool {
    let out = session.out().clone();
    let (action, system_name, name, value) = (&tokens[0], &tokens[1], &tokens[2], &tokens[3]);
    let Some(system) = session.resolve_system(system_name) else {
        return false;
    };
    let failure = format!("cannot set priority for '{name}@{system_name}'");
    let participant = match participant_of(system.as_ref(), name) {
        Ok(participant) => participant,
        Err(Lookup::Missing) => {
            out.error(
                action,
                &not_in_system(name, system_name),
                CmdStatus::ParticipantError,
                "",
            );
            return false;
        }
        Err(Lookup::Failed(e)) => {
            out.exception(action, &failure, CmdStatus::GenericError, &e);
            return false;
        }
    };
    let priority: i32 = match value.parse() {
        Ok(priority) => priority,
        Err(e) => {
            out.exception(action, &failure, CmdStatus::GenericError, &e);
            return false;
        }
    };
    let result = match kind {
        Priority::Init => participant.set_init_priority(priority),
        Priority::Start => participant.set_start_priority(priority),
    };
    match result {
        Ok(()) => {
            out.note(action, &format!("priority for '{name}' set"));
            true
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::GenericError, &e);
            false
        }
    }
}

fn get_priority(session: &mut Session, tokens: &[String], kind: Priority) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let Some(system) = session.resolve_system(system_name) else {
        return false;
    };
    let failure = format!("cannot get priority for '{name}@{system_name}'");
    let participant = match participant_of(system.as_ref(), name) {
        Ok(participant) => participant,
        Err(Lookup::Missing) => {
            out.error(
                action,
                &not_in_system(name, system_name),
                CmdStatus::ParticipantError,
                "",
            );
            return false;
        }
        Err(Lookup::Failed(e)) => {
            out.exception(action, &failure, CmdStatus::GenericError, &e);
            return false;
        }
    };
    let result = match kind {
        Priority::Init => participant.init_priority(),
        Priority::Start => participant.start_priority(),
    };
    match result {
        Ok(priority) => {
            out.attribute(action, "priority", &priority.to_string());
            true
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::GenericError, &e);
            false
        }
    }
}

pub fn set_init_priority(session: &mut Session, tokens: &[String]) -> bool {
    set_priority(session, tokens, Priority::Init)
}

pub fn get_init_priority(session: &mut Session, tokens: &[String]) -> bool {
    get_priority(session, tokens, Priority::Init)
}

pub fn set_start_priority(session: &mut Session, tokens: &[String]) -> bool {
    set_priority(session, tokens, Priority::Start)
}

pub fn get_start_priority(session: &mut Session, tokens: &[String]) -> bool {
    get_priority(session, tokens, Priority::Start)
}

/// Drive one participant through `transition` via its lifecycle object.
fn change_participant_state(session: &mut Session, tokens: &[String], transition: Transition) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let Some(system) = session.resolve_system(system_name) else {
        return false;
    };
    let failure = format!("cannot {} participant '{name}@{system_name}'", transition.verb());
    let participant = match participant_of(system.as_ref(), name) {
        Ok(participant) => participant,
        Err(Lookup::Missing) => {
            out.error(
                action,
                &not_in_system(name, system_name),
                CmdStatus::StatechangeError,
                "",
            );
            return false;
        }
        Err(Lookup::Failed(e)) => {
            out.exception(action, &failure, CmdStatus::StatechangeError, &e);
            return false;
        }
    };
    let Some(state_machine) = participant.state_machine() else {
        out.error(
            action,
            &format!("participant '{name}@{system_name}' has no state machine"),
            CmdStatus::StatechangeError,
            "",
        );
        return false;
    };
    if let Err(e) = state_machine.transition(transition) {
        out.exception(action, &failure, CmdStatus::StatechangeError, &e);
        return false;
    }
    out.note(action, &format!("{name}@{system_name} {}", transition.past()));
    true
}

pub fn load_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Load)
}

pub fn unload_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Unload)
}

pub fn initialize_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Initialize)
}

pub fn deinitialize_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Deinitialize)
}

pub fn start_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Start)
}

pub fn stop_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Stop)
}

pub fn pause_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Pause)
}

pub fn shutdown_participant(session: &mut Session, tokens: &[String]) -> bool {
    change_participant_state(session, tokens, Transition::Shutdown)
}

fn report_state(session: &Session, action: &str, state: SystemState) {
    session.out().notes(
        action,
        &[
            ("stateID", state.id().to_string()),
            ("stateName", state.name().to_string()),
        ],
    );
}

pub fn get_participant_state(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let Some(system) = session.resolve_system(system_name) else {
        return false;
    };
    let failure = format!("cannot get participant state for participant '{name}@{system_name}'");
    let participant = match participant_of(system.as_ref(), name) {
        Ok(participant) => participant,
        Err(Lookup::Missing) => {
            out.error(
                action,
                &not_in_system(name, system_name),
                CmdStatus::ParticipantError,
                "",
            );
            return false;
        }
        Err(Lookup::Failed(e)) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            return false;
        }
    };
    let Some(state_machine) = participant.state_machine() else {
        out.error(
            action,
            &format!("participant '{name}@{system_name}' has no state machine"),
            CmdStatus::ParticipantError,
            "",
        );
        return false;
    };
    match state_machine.state() {
        Ok(state) => {
            report_state(session, action, state);
            true
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            false
        }
    }
}

/// Sets the state through a temporary system holding only this participant,
/// so the usual multi-step path is taken.
pub fn set_participant_state(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let fleet = session.fleet().clone();
    let (action, system_name, name, state_text) = (&tokens[0], &tokens[1], &tokens[2], &tokens[3]);
    let Some(system) = session.resolve_system(system_name) else {
        return false;
    };
    let failure =
        format!("cannot set participant state '{state_text}' for participant '{name}@{system_name}'");
    let real_name = system.name();
    match participant_of(system.as_ref(), name) {
        Ok(_) => {}
        Err(Lookup::Missing) => {
            out.error(
                action,
                &not_in_system(name, system_name),
                CmdStatus::ParticipantError,
                "",
            );
            return false;
        }
        Err(Lookup::Failed(e)) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            return false;
        }
    }

    let target = SystemState::from_user_text(state_text);
    let result = fleet
        .connect_system(&real_name, std::slice::from_ref(name))
        .and_then(|mut temporary| {
            if target == SystemState::Unreachable {
                temporary.set_system_state(SystemState::Unloaded)?;
                temporary.transition(Transition::Shutdown)
            } else {
                temporary.set_system_state(target)
            }
        });
    match result {
        Ok(()) => {
            report_state(session, action, target);
            true
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            false
        }
    }
}
