//! Command handlers, grouped by what they act on.
//!
//! Every handler receives the full token list (command name first, arity
//! already checked), reports its outcome through the session's formatter and
//! returns `false` on failure. No collaborator error escapes a handler.

pub mod general;
pub mod participant;
pub mod properties;
pub mod rpc;
pub mod system;
pub mod timing;

use crate::error::FleetError;
use crate::fleet::{ParticipantHandle, SystemHandle};

/// Why a participant could not be obtained from a system.
pub(crate) enum Lookup {
    Missing,
    Failed(FleetError),
}

pub(crate) fn participant_of(
    system: &dyn SystemHandle,
    name: &str,
) -> Result<Box<dyn ParticipantHandle>, Lookup> {
    match system.participant(name) {
        Ok(Some(participant)) => Ok(participant),
        Ok(None) => Err(Lookup::Missing),
        Err(e) => Err(Lookup::Failed(e)),
    }
}

pub(crate) fn not_in_system(participant: &str, system: &str) -> String {
    format!("participant '{participant}' is not in system '{system}'")
}
