//! Participant configuration properties.
//!
//! A property tree is walked once into a flat, pre-ordered list of
//! [`PropertyEntry`] values; plain and structured rendering are two
//! consumers of that list.

use super::{Lookup, not_in_system, participant_of};
use crate::fleet::{Configuration, FleetResult, ParticipantHandle};
use crate::error::FleetError;
use crate::output::{CmdStatus, OutputFormatter};
use crate::session::Session;
use serde_json::{Map, Value};

/// One visited property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyEntry {
    pub name: String,
    pub value: String,
    pub type_name: String,
    pub depth: usize,
}

/// Split `a/b/c` into node `a/b` and leaf `c`. Without a `/` the node is
/// empty and the whole path is the leaf.
pub fn split_property_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

fn join_node(node: &str, leaf: &str) -> String {
    if node.is_empty() || node.ends_with('/') || leaf.is_empty() {
        format!("{node}{leaf}")
    } else {
        format!("{node}/{leaf}")
    }
}

/// Depth-first, pre-order walk starting at `node`/`leaf`.
///
/// The start itself is reported (at depth 0) only when `leaf` is set; its
/// children follow at increasing depth.
pub fn walk_properties(conf: &dyn Configuration, node: &str, leaf: &str) -> FleetResult<Vec<PropertyEntry>> {
    let mut entries = Vec::new();
    if !leaf.is_empty() {
        let parent = conf.node(node)?.ok_or_else(|| FleetError::PropertyNotFound {
            path: node.to_string(),
        })?;
        let type_name = parent.type_name(leaf)?;
        if type_name.is_empty() {
            return Err(FleetError::PropertyNotFound {
                path: join_node(node, leaf),
            });
        }
        entries.push(PropertyEntry {
            name: leaf.to_string(),
            value: parent.value(leaf)?,
            type_name,
            depth: 0,
        });
    }
    walk_children(conf, &join_node(node, leaf), 1, &mut entries)?;
    Ok(entries)
}

fn walk_children(
    conf: &dyn Configuration,
    path: &str,
    depth: usize,
    entries: &mut Vec<PropertyEntry>,
) -> FleetResult<()> {
    let Some(node) = conf.node(path)? else {
        return Ok(());
    };
    for child in node.child_names()? {
        entries.push(PropertyEntry {
            value: node.value(&child)?,
            type_name: node.type_name(&child)?,
            name: child.clone(),
            depth,
        });
        walk_children(conf, &join_node(path, &child), depth + 1, entries)?;
    }
    Ok(())
}

/// `<2*depth spaces><name> : <value>` per entry.
pub fn render_plain(entries: &[PropertyEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}{} : {}\n", "  ".repeat(e.depth), e.name, e.value))
        .collect()
}

fn render_names_plain(entries: &[PropertyEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}{}\n", "  ".repeat(e.depth), e.name))
        .collect()
}

/// Nest the entries at `depth` (and below) into JSON objects with
/// `sub_properties` children.
pub fn nest_json(entries: &[PropertyEntry], depth: usize, with_value: bool) -> Vec<Value> {
    let mut index = 0;
    nest_from(entries, &mut index, depth, with_value)
}

fn nest_from(entries: &[PropertyEntry], index: &mut usize, depth: usize, with_value: bool) -> Vec<Value> {
    let mut items = Vec::new();
    while let Some(entry) = entries.get(*index) {
        if entry.depth != depth {
            break;
        }
        *index += 1;
        let mut object = Map::new();
        object.insert("name".into(), Value::String(entry.name.clone()));
        if with_value {
            object.insert("value".into(), Value::String(entry.value.clone()));
        }
        object.insert("type".into(), Value::String(entry.type_name.clone()));
        let children = nest_from(entries, index, depth + 1, with_value);
        if !children.is_empty() {
            object.insert("sub_properties".into(), Value::Array(children));
        }
        items.push(Value::Object(object));
    }
    items
}

/// The participant, or `None` after reporting why it is unavailable.
fn find(
    session: &mut Session,
    tokens: &[String],
    failure: &str,
) -> Option<Box<dyn ParticipantHandle>> {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let system = session.resolve_system(system_name)?;
    match participant_of(system.as_ref(), name) {
        Ok(participant) => Some(participant),
        Err(Lookup::Missing) => {
            out.error(
                action,
                &not_in_system(name, system_name),
                CmdStatus::ParticipantError,
                "",
            );
            None
        }
        Err(Lookup::Failed(e)) => {
            out.exception(action, failure, CmdStatus::ParticipantError, &e);
            None
        }
    }
}

fn no_configuration(out: &OutputFormatter, action: &str, name: &str, system_name: &str) {
    out.error(
        action,
        &format!("participant '{name}@{system_name}' has no RPC configuration"),
        CmdStatus::ParticipantError,
        "",
    );
}

pub fn get_participant_property_names(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let failure = format!("cannot get property names for participant '{name}@{system_name}'");
    let Some(participant) = find(session, tokens, &failure) else {
        return false;
    };
    let Some(conf) = participant.configuration() else {
        no_configuration(&out, action, name, system_name);
        return false;
    };
    match walk_properties(conf.as_ref(), "", "") {
        Ok(entries) => {
            if out.is_structured() {
                let mut record = out.record(action, CmdStatus::NoError);
                record.insert(
                    "sub_properties".into(),
                    Value::Array(nest_json(&entries, 1, false)),
                );
                out.write_record(record);
            } else {
                out.write(&format!("property names :\n{}\n", render_names_plain(&entries)));
            }
            true
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            false
        }
    }
}

pub fn get_participant_properties(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name) = (&tokens[0], &tokens[1], &tokens[2]);
    let failure = format!("cannot get properties for participant '{name}@{system_name}'");
    let Some(participant) = find(session, tokens, &failure) else {
        return false;
    };
    let Some(conf) = participant.configuration() else {
        out.error(
            action,
            &format!("participant '{name}@{system_name}' has no RPC Info"),
            CmdStatus::RpcobjectError,
            "",
        );
        return false;
    };
    match walk_properties(conf.as_ref(), "", "") {
        Ok(entries) => {
            if out.is_structured() {
                let mut record = out.record(action, CmdStatus::NoError);
                record.insert("participant".into(), Value::String(name.clone()));
                record.insert(
                    "participant_properties".into(),
                    Value::Array(nest_json(&entries, 1, true)),
                );
                out.write_record(record);
            } else {
                out.write(&format!("{name} : \n{}\n", render_plain(&entries)));
            }
            true
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            false
        }
    }
}

pub fn get_participant_property(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name, path) = (&tokens[0], &tokens[1], &tokens[2], &tokens[3]);
    let failure = format!("cannot get property {path} for participant '{name}@{system_name}'");
    let Some(participant) = find(session, tokens, &failure) else {
        return false;
    };
    let Some(conf) = participant.configuration() else {
        no_configuration(&out, action, name, system_name);
        return false;
    };
    let (node, leaf) = split_property_path(path);
    let entries = match walk_properties(conf.as_ref(), node, leaf) {
        Ok(entries) => entries,
        Err(e) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            return false;
        }
    };
    if out.is_structured() {
        let mut record = out.record(action, CmdStatus::NoError);
        let (name, value, type_name) = match entries.first().filter(|e| e.depth == 0) {
            Some(top) => (
                Value::String(top.name.clone()),
                Value::String(top.value.clone()),
                Value::String(top.type_name.clone()),
            ),
            None => (Value::Null, Value::Null, Value::Null),
        };
        record.insert("name".into(), name);
        record.insert("value".into(), value);
        record.insert("type".into(), type_name);
        out.write_record(record);
    } else {
        out.write(&format!("{}\n", render_plain(&entries)));
    }
    session.record_used_property(name, path);
    true
}

pub fn set_participant_property(session: &mut Session, tokens: &[String]) -> bool {
    let out = session.out().clone();
    let (action, system_name, name, path, value) =
        (&tokens[0], &tokens[1], &tokens[2], &tokens[3], &tokens[4]);
    let failure = format!("cannot set property {path} for participant '{name}@{system_name}'");
    let Some(participant) = find(session, tokens, &failure) else {
        return false;
    };
    let Some(conf) = participant.configuration() else {
        no_configuration(&out, action, name, system_name);
        return false;
    };
    let (node, leaf) = split_property_path(path);
    let result = conf.node(node).and_then(|found| {
        let Some(properties) = found else {
            return Ok(false);
        };
        let type_name = properties.type_name(leaf)?;
        properties.set(leaf, value, &type_name)?;
        Ok(true)
    });
    match result {
        Ok(true) => {
            session.record_used_property(name, path);
            out.note(action, "property set");
            true
        }
        Ok(false) => {
            out.error(
                action,
                &format!("participant '{name}@{system_name}' has no property{node}"),
                CmdStatus::ParticipantError,
                "",
            );
            false
        }
        Err(e) => {
            out.exception(action, &failure, CmdStatus::ParticipantError, &e);
            false
        }
    }
}
