//! Session-level commands: discovery, working directory, help, mode toggles.

use crate::fleet::SystemHandle;
use crate::output::{CmdStatus, OutputFormatter};
use crate::registry::registry;
use crate::session::{Session, display_system_name};
use std::io::ErrorKind;

/// One `{system name, participants}` record for a system.
pub(crate) fn report_participants(out: &OutputFormatter, action: &str, system: &dyn SystemHandle) -> bool {
    let system_name = display_system_name(&system.name());
    match system.participants() {
        Ok(names) => {
            out.notes(
                action,
                &[("system name", system_name), ("participants", names.join(", "))],
            );
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot get participants of system '{system_name}'"),
                CmdStatus::GenericError,
                &e,
            );
            false
        }
    }
}

pub fn quit(session: &mut Session, _tokens: &[String]) -> bool {
    session.request_exit();
    true
}

pub fn discover_all_systems(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let action = &tokens[0];
    let systems = match session.fleet().discover_all_systems() {
        Ok(systems) => systems,
        Err(e) => {
            out.exception(action, "cannot discover systems", CmdStatus::GenericError, &e);
            return false;
        }
    };
    tracing::debug!(count = systems.len(), "discovered systems");
    let mut ok = true;
    for system in systems {
        ok &= report_participants(&out, action, system.as_ref());
        session.remember_system(system);
    }
    ok
}

pub fn discover_system(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, name) = (&tokens[0], &tokens[1]);
    match session.discover_by_name(name) {
        Ok(key) => match session.state().known_systems.get(&key) {
            Some(system) => report_participants(&out, action, system.as_ref()),
            None => false,
        },
        Err(e) => {
            out.exception(
                action,
                &format!("cannot discover system '{name}'"),
                CmdStatus::GenericError,
                &e,
            );
            false
        }
    }
}

/// Error code reported for a failed directory change.
fn filesystem_error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NotFound | ErrorKind::InvalidInput => "INVALID_PATH",
        ErrorKind::PermissionDenied => "ACCESS_DENIED",
        _ => "IO_ERROR",
    }
}

pub fn set_current_working_directory(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out();
    let (action, dir) = (&tokens[0], &tokens[1]);
    let changed = std::fs::canonicalize(dir)
        .and_then(|path| std::env::set_current_dir(&path).map(|()| path));
    match changed {
        Ok(path) => {
            out.attribute(action, "working directory", &path.display().to_string());
            true
        }
        Err(e) => {
            out.error(
                action,
                &format!("cannot set working directory to '{dir}'"),
                CmdStatus::FilesystemError,
                filesystem_error_code(e.kind()),
            );
            false
        }
    }
}

pub fn get_current_working_directory(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out();
    match std::env::current_dir() {
        Ok(path) => {
            out.attribute(&tokens[0], "working directory", &path.display().to_string());
            true
        }
        Err(e) => {
            out.error(
                &tokens[0],
                "cannot get working directory",
                CmdStatus::FilesystemError,
                filesystem_error_code(e.kind()),
            );
            false
        }
    }
}

pub fn help(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out();
    let Some(name) = tokens.get(1) else {
        out.write(&registry().help_text());
        return true;
    };
    match registry().lookup(name) {
        Some(command) => {
            out.write(&format!("{}\n", command.usage_line()));
            true
        }
        None => {
            out.error(
                &tokens[0],
                &format!("no such command as \"{name}\""),
                CmdStatus::InputError,
                "",
            );
            false
        }
    }
}

pub fn enable_auto_discovery(session: &mut Session, tokens: &[String]) -> bool {
    session.set_auto_discovery(true);
    session.out().note(&tokens[0], "auto_discovery: enabled");
    true
}

pub fn disable_auto_discovery(session: &mut Session, tokens: &[String]) -> bool {
    session.set_auto_discovery(false);
    session.out().note(&tokens[0], "auto_discovery: disabled");
    true
}

pub fn enable_json(session: &mut Session, tokens: &[String]) -> bool {
    session.set_json_mode(true);
    session.out().note(&tokens[0], "json_mode: enabled");
    true
}

pub fn disable_json(session: &mut Session, tokens: &[String]) -> bool {
    session.set_json_mode(false);
    session.out().note(&tokens[0], "json_mode: disabled");
    true
}
