//! Tab completion for the interactive terminal.

use crate::registry::{CompletionTag, registry};
use crate::session::Session;
use crate::state::SETTABLE_STATE_NAMES;
use crate::tokenizer::{quote_if_necessary, tokenize};

fn starting_with<'a>(items: impl IntoIterator<Item = &'a str>, prefix: &str) -> Vec<String> {
    items
        .into_iter()
        .filter(|item| item.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

impl Session {
    /// Candidates for one argument position.
    pub fn candidates(&self, tag: CompletionTag, prefix: &str) -> Vec<String> {
        let state = self.state();
        match tag {
            CompletionTag::None => Vec::new(),
            CompletionTag::CommandNames => starting_with(registry().completions(prefix), prefix),
            CompletionTag::ConnectedSystems => {
                starting_with(state.known_systems.keys().map(String::as_str), prefix)
            }
            CompletionTag::ConnectedParticipants => {
                let Some(system) = state.known_systems.get(&state.last_system_name) else {
                    return Vec::new();
                };
                match system.participants() {
                    Ok(names) => starting_with(names.iter().map(String::as_str), prefix),
                    Err(e) => {
                        tracing::debug!(error = %e, "participant completion unavailable");
                        Vec::new()
                    }
                }
            }
            CompletionTag::UsedProperties => {
                starting_with(state.used_properties.iter().map(String::as_str), prefix)
            }
            CompletionTag::SystemStates => starting_with(SETTABLE_STATE_NAMES.iter().copied(), prefix),
            CompletionTag::LocalFiles => local_files(prefix),
        }
    }

    /// Complete the last word of `input`; every candidate is the whole new line.
    pub fn complete(&self, input: &str) -> Vec<String> {
        let mut tokens = tokenize(input);
        if input.is_empty() || input.ends_with(char::is_whitespace) {
            tokens.push(String::new());
        }
        let Some((word, previous)) = tokens.split_last() else {
            return Vec::new();
        };
        if previous.is_empty() {
            return self.candidates(CompletionTag::CommandNames, word);
        }

        let Some(command) = registry().lookup(&previous[0]) else {
            return Vec::new();
        };
        let Some(argument) = command.arguments.get(previous.len() - 1) else {
            return Vec::new();
        };
        let head = previous
            .iter()
            .map(|t| quote_if_necessary(t))
            .collect::<Vec<_>>()
            .join(" ");
        self.candidates(argument.completion, word)
            .into_iter()
            .map(|candidate| format!("{head} {candidate}"))
            .collect()
    }
}

/// Entries of the current directory, quoted for re-tokenizing.
fn local_files(prefix: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(".") else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix))
        .map(|name| quote_if_necessary(&name))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{FleetConfig, SimParticipantConfig, SimSystemConfig, SimulatedFleet};
    use crate::output::{BufferSink, OutputFormatter};
    use std::sync::Arc;

    fn session() -> Session {
        let fleet = SimulatedFleet::new(&FleetConfig {
            systems: vec![
                SimSystemConfig::new(
                    "demo",
                    vec![
                        SimParticipantConfig::new("part_a"),
                        SimParticipantConfig::new("part_b"),
                    ],
                ),
                SimSystemConfig::new("delta", vec![SimParticipantConfig::new("x")]),
            ],
        });
        let out = Arc::new(OutputFormatter::new(BufferSink::new(), false));
        Session::new(Arc::new(fleet), out, false)
    }

    #[test]
    fn test_command_name_completion() {
        let s = session();
        assert_eq!(s.complete("getParticipantS"), vec!["getParticipantState"]);
        assert!(s.complete("").contains(&"help".to_string()));
    }

    #[test]
    fn test_system_name_completion() {
        let mut s = session();
        s.execute_line("discoverAllSystems");
        assert_eq!(s.complete("loadSystem de"), vec!["loadSystem delta", "loadSystem demo"]);
        assert_eq!(s.complete("loadSystem dem"), vec!["loadSystem demo"]);
    }

    #[test]
    fn test_participant_completion_uses_last_system() {
        let mut s = session();
        s.execute_line("discoverSystem demo");
        assert_eq!(
            s.complete("getParticipantState demo "),
            vec!["getParticipantState demo part_a", "getParticipantState demo part_b"]
        );
    }

    #[test]
    fn test_state_completion() {
        let s = session();
        assert_eq!(s.complete("setSystemState demo ru"), vec!["setSystemState demo running"]);
        assert_eq!(s.complete("setSystemState demo s"), vec!["setSystemState demo shutdowned"]);
    }

    #[test]
    fn test_used_property_completion() {
        let s = session();
        assert_eq!(
            s.complete("getParticipantProperty demo part_a clock/s"),
            vec!["getParticipantProperty demo part_a clock/step_size"]
        );
    }

    #[test]
    fn test_no_completion_past_last_argument() {
        let s = session();
        assert!(s.complete("quit ").is_empty());
        assert!(s.complete("unknownCmd x").is_empty());
        assert!(s.complete("setInitPriority demo part_a ").is_empty());
    }
}
