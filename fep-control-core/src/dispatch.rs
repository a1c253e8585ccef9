//! Command dispatch: lookup, arity check, handler call.

use crate::output::CmdStatus;
use crate::registry::registry;
use crate::session::Session;
use crate::tokenizer::tokenize;

/// Exit code for an unknown command.
pub const EXIT_UNKNOWN_COMMAND: i32 = -2;
/// Exit code for a wrong number of arguments.
pub const EXIT_BAD_ARITY: i32 = -3;

const DISPATCH_ACTION: &str = "processCommandline";

impl Session {
    /// Run one tokenized command line and return its exit code: `0` on
    /// success, `1` when the handler reported a failure, negative for
    /// structural errors caught before the handler runs.
    pub fn execute(&mut self, tokens: &[String]) -> i32 {
        let Some(name) = tokens.first() else {
            return 0;
        };
        let Some(command) = registry().lookup(name) else {
            self.out().error(
                DISPATCH_ACTION,
                &format!("Invalid command '{name}', use 'help' for valid commands"),
                CmdStatus::InputError,
                "",
            );
            return EXIT_UNKNOWN_COMMAND;
        };

        let given = tokens.len() - 1;
        if given < command.min_args() || given > command.max_args() {
            self.out().error(
                DISPATCH_ACTION,
                &format!(
                    "Invalid number of arguments for '{name}' ({given} instead of {}), use 'help' for more information",
                    command.expected_args()
                ),
                CmdStatus::InputError,
                "",
            );
            return EXIT_BAD_ARITY;
        }

        tracing::debug!(command = command.name, args = given, "dispatching");
        if (command.handler)(self, tokens) { 0 } else { 1 }
    }

    /// Tokenize and run one input line. Blank lines yield `None`.
    pub fn execute_line(&mut self, line: &str) -> Option<i32> {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return None;
        }
        Some(self.execute(&tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{FleetConfig, SimulatedFleet};
    use crate::output::{BufferSink, OutputFormatter};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn session(structured: bool) -> (Session, BufferSink) {
        let sink = BufferSink::new();
        let out = Arc::new(OutputFormatter::new(sink.clone(), structured));
        let fleet = Arc::new(SimulatedFleet::new(&FleetConfig::default()));
        (Session::new(fleet, out, false), sink)
    }

    #[test]
    fn test_unknown_command() {
        let (mut s, sink) = session(false);
        assert_eq!(s.execute_line("frobnicate now"), Some(EXIT_UNKNOWN_COMMAND));
        assert_eq!(
            sink.contents(),
            "Invalid command 'frobnicate', use 'help' for valid commands\n"
        );
    }

    #[test]
    fn test_unknown_command_structured() {
        let (mut s, sink) = session(true);
        s.execute_line("frobnicate");
        assert_eq!(
            sink.contents(),
            "{\"action\":\"processCommandline\",\"status\":2,\"error\":\"Invalid command 'frobnicate', use 'help' for valid commands\"}\n"
        );
    }

    #[test]
    fn test_too_many_arguments() {
        let (mut s, sink) = session(false);
        assert_eq!(
            s.execute_line("getCurrentWorkingDirectory extra_arg"),
            Some(EXIT_BAD_ARITY)
        );
        assert_eq!(
            sink.contents(),
            "Invalid number of arguments for 'getCurrentWorkingDirectory' (1 instead of 0), use 'help' for more information\n"
        );
    }

    #[test]
    fn test_range_in_arity_error() {
        let (mut s, sink) = session(false);
        assert_eq!(s.execute_line("help a b"), Some(EXIT_BAD_ARITY));
        assert!(sink.contents().contains("(2 instead of 0..1)"));
    }

    #[test]
    fn test_arity_error_runs_no_handler() {
        let (mut s, _) = session(false);
        s.execute_line("enableAutoDiscovery now");
        assert!(!s.auto_discovery());
    }

    #[test]
    fn test_blank_line_is_skipped() {
        let (mut s, sink) = session(false);
        assert_eq!(s.execute_line("   "), None);
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_handler_failure_is_one() {
        let (mut s, _) = session(false);
        assert_eq!(s.execute_line("loadSystem nowhere"), Some(1));
        assert_eq!(s.execute_line("enableAutoDiscovery"), Some(0));
    }
}
