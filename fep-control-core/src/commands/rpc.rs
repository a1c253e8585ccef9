//! RPC object introspection and raw JSON-RPC calls.

use super::{Lookup, not_in_system, participant_of};
use crate::fleet::{ParticipantHandle, ParticipantInfo};
use crate::output::{CmdStatus, OutputFormatter};
use crate::session::Session;
use serde_json::{Map, Value};

const FAILURE_STATUS: CmdStatus = CmdStatus::RpcobjectError;

/// Participant and its RPC info object, or `None` after reporting.
fn info_of(session: &mut Session, tokens: &[String]) -> Option<(Box<dyn ParticipantHandle>, Box<dyn ParticipantInfo>)> {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let participant = find(session, tokens)?;
    match participant.participant_info() {
        Some(info) => Some((participant, info)),
        None => {
            no_info(&out, action, name, system_name);
            None
        }
    }
}

fn find(session: &mut Session, tokens: &[String]) -> Option<Box<dyn ParticipantHandle>> {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let system = session.resolve_system(system_name)?;
    match participant_of(system.as_ref(), name) {
        Ok(participant) => Some(participant),
        Err(Lookup::Missing) => {
            out.error(action, &not_in_system(name, system_name), FAILURE_STATUS, "");
            None
        }
        Err(Lookup::Failed(e)) => {
            out.exception(
                action,
                &format!("cannot get participant state for participant '{name}@{system_name}'"),
                FAILURE_STATUS,
                &e,
            );
            None
        }
    }
}

fn no_info(out: &OutputFormatter, action: &str, name: &str, system_name: &str) {
    out.error(
        action,
        &format!("participant '{name}@{system_name}' has no RPC Info"),
        FAILURE_STATUS,
        "",
    );
}

pub fn get_participant_rpc_objects(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let Some((_, info)) = info_of(session, tokens) else {
        return false;
    };
    match info.object_names() {
        Ok(names) => {
            out.attribute(action, "names", &names.join(", "));
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot get participant state for participant '{name}@{system_name}'"),
                FAILURE_STATUS,
                &e,
            );
            false
        }
    }
}

pub fn get_participant_rpc_object_iids(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name, object) = (&tokens[0], &tokens[1], &tokens[2], &tokens[3]);
    let Some((_, info)) = info_of(session, tokens) else {
        return false;
    };
    match info.object_iids(object) {
        Ok(iids) => {
            out.attribute(action, "identifiers", &iids.join(", "));
            true
        }
        Err(e) => {
            tracing::debug!(object = %object, error = %e, "iid lookup failed");
            out.error(
                action,
                &format!("participant '{name}@{system_name}' IID info can not be retrieved"),
                FAILURE_STATUS,
                "",
            );
            false
        }
    }
}

pub fn get_participant_rpc_object_iid_definition(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let (object, iid) = (&tokens[3], &tokens[4]);
    let Some((_, info)) = info_of(session, tokens) else {
        return false;
    };
    match info.iid_definition(object, iid) {
        Ok(definition) => {
            out.attribute(action, "definition", &definition);
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("participant '{name}@{system_name}' IID info can not be retrieved"),
                FAILURE_STATUS,
                &e,
            );
            false
        }
    }
}

/// JSON-RPC 2.0 request text; `params` is left out when not given.
pub fn build_rpc_request(method: &str, params: Option<Value>) -> String {
    let mut request = Map::new();
    request.insert("jsonrpc".into(), Value::String("2.0".into()));
    request.insert("method".into(), Value::String(method.to_string()));
    if let Some(params) = params {
        request.insert("params".into(), params);
    }
    request.insert("id".into(), Value::from(1));
    Value::Object(request).to_string()
}

pub fn call_rpc(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let (object, iid, method) = (&tokens[3], &tokens[4], &tokens[5]);

    let params = match tokens.get(6).map(|text| serde_json::from_str::<Value>(text)) {
        None => None,
        Some(Ok(params)) => Some(params),
        Some(Err(e)) => {
            out.error(
                action,
                &format!("invalid json parameters for RPC '{method}'"),
                FAILURE_STATUS,
                &format!("Syntaxerror: {e}"),
            );
            return false;
        }
    };

    let Some(participant) = find(session, tokens) else {
        return false;
    };
    let request = build_rpc_request(method, params);
    tracing::debug!(participant = %name, object = %object, request = %request, "calling rpc");
    match participant.call_rpc(object, iid, &request) {
        Ok(response) => {
            if out.is_structured() {
                let mut record = out.record(action, CmdStatus::NoError);
                let parsed = serde_json::from_str(&response).unwrap_or(Value::String(response));
                record.insert("response".into(), parsed);
                out.write_record(record);
            } else {
                out.write(&format!("{response}\n"));
            }
            true
        }
        Err(e) => {
            out.exception(
                action,
                &format!("cannot call RPC '{method}' for participant '{name}@{system_name}'"),
                FAILURE_STATUS,
                &e,
            );
            false
        }
    }
}
