//! Command registry.
//!
//! Static metadata for every console command: its handler, the positional
//! arguments it takes (with the completion source for each), and how many
//! trailing arguments may be left out. Built once and shared read-only by
//! every session.

use crate::commands::{general, participant, properties, rpc, system, timing};
use crate::session::Session;
use std::sync::LazyLock;

/// Handler invoked with the full token list (command name first).
/// Returns `false` after reporting its own failure.
pub type CommandHandler = fn(&mut Session, &[String]) -> bool;

/// Source of completion candidates for one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionTag {
    None,
    CommandNames,
    ConnectedSystems,
    /// Participants of the last system referenced in this session.
    ConnectedParticipants,
    UsedProperties,
    SystemStates,
    LocalFiles,
}

/// One positional argument of a command.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentSpec {
    pub label: &'static str,
    pub completion: CompletionTag,
}

const fn arg(label: &'static str, completion: CompletionTag) -> ArgumentSpec {
    ArgumentSpec { label, completion }
}

const SYSTEM: ArgumentSpec = arg("system name", CompletionTag::ConnectedSystems);
const PARTICIPANT: ArgumentSpec = arg("participant name", CompletionTag::ConnectedParticipants);

const NO_ARGS: &[ArgumentSpec] = &[];
const SYSTEM_ARGS: &[ArgumentSpec] = &[SYSTEM];
const PARTICIPANT_ARGS: &[ArgumentSpec] = &[SYSTEM, PARTICIPANT];
const PRIORITY_ARGS: &[ArgumentSpec] = &[
    SYSTEM,
    PARTICIPANT,
    arg("priority value", CompletionTag::None),
];

/// Metadata describing a console command.
#[derive(Clone)]
pub struct CommandInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub handler: CommandHandler,
    pub arguments: &'static [ArgumentSpec],
    /// Number of trailing arguments that may be omitted.
    pub optional_trailing: usize,
    /// Left out of the `help` listing.
    pub hidden: bool,
}

impl std::fmt::Debug for CommandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandInfo")
            .field("name", &self.name)
            .field("arguments", &self.arguments.len())
            .field("optional_trailing", &self.optional_trailing)
            .field("hidden", &self.hidden)
            .finish()
    }
}

impl CommandInfo {
    /// Smallest accepted argument count (command name excluded).
    pub fn min_args(&self) -> usize {
        self.arguments.len() - self.optional_trailing
    }

    pub fn max_args(&self) -> usize {
        self.arguments.len()
    }

    /// `name <arg1> <arg2> ... : description`
    pub fn usage_line(&self) -> String {
        let mut line = self.name.to_string();
        for argument in self.arguments {
            line.push_str(&format!(" <{}>", argument.label));
        }
        format!("{line} : {}", self.description)
    }

    /// Text used in arity errors: the exact count or `min..max`.
    pub fn expected_args(&self) -> String {
        if self.optional_trailing == 0 {
            self.max_args().to_string()
        } else {
            format!("{}..{}", self.min_args(), self.max_args())
        }
    }
}

/// Ordered table of all commands.
pub struct CommandRegistry {
    commands: Vec<CommandInfo>,
}

static DEFAULT_REGISTRY: LazyLock<CommandRegistry> = LazyLock::new(CommandRegistry::with_defaults);

/// The process-wide command table.
pub fn registry() -> &'static CommandRegistry {
    &DEFAULT_REGISTRY
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Registry pre-populated with all built-in commands.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    pub fn register(&mut self, info: CommandInfo) {
        self.commands.push(info);
    }

    fn add(
        &mut self,
        name: &'static str,
        description: &'static str,
        handler: CommandHandler,
        arguments: &'static [ArgumentSpec],
    ) {
        self.register(CommandInfo {
            name,
            description,
            handler,
            arguments,
            optional_trailing: 0,
            hidden: false,
        });
    }

    pub fn register_defaults(&mut self) {
        self.add("exit", "quits this program", general::quit, NO_ARGS);
        self.add("quit", "quits this program", general::quit, NO_ARGS);
        self.add(
            "discoverAllSystems",
            "discovers all systems and registers logging monitor for them",
            general::discover_all_systems,
            NO_ARGS,
        );
        self.add(
            "discoverSystem",
            "discover one system with the given name and register the logging monitor for them",
            general::discover_system,
            const { &[arg("system name", CompletionTag::None)] },
        );
        self.add(
            "setCurrentWorkingDirectory",
            "changes the current working dir of this fep_control instance",
            general::set_current_working_directory,
            const { &[arg("directory name", CompletionTag::LocalFiles)] },
        );
        self.add(
            "getCurrentWorkingDirectory",
            "prints the current working dir of this fep_control instance",
            general::get_current_working_directory,
            NO_ARGS,
        );
        self.register(CommandInfo {
            name: "help",
            description: "prints out the description of the commands",
            handler: general::help,
            arguments: const { &[arg("command name", CompletionTag::CommandNames)] },
            optional_trailing: 1,
            hidden: false,
        });

        self.add("loadSystem", "loads the given system", system::load_system, SYSTEM_ARGS);
        self.add(
            "unloadSystem",
            "unloads the given system",
            system::unload_system,
            SYSTEM_ARGS,
        );
        self.add(
            "setInitPriority",
            "sets init priority of a participant",
            participant::set_init_priority,
            PRIORITY_ARGS,
        );
        self.add(
            "getInitPriority",
            "gets init priority of a participant",
            participant::get_init_priority,
            PARTICIPANT_ARGS,
        );
        self.add(
            "setStartPriority",
            "sets start priority of a participant",
            participant::set_start_priority,
            PRIORITY_ARGS,
        );
        self.add(
            "getStartPriority",
            "gets start priority of a participant",
            participant::get_start_priority,
            PARTICIPANT_ARGS,
        );
        self.add(
            "initializeSystem",
            "initializes the given system",
            system::initialize_system,
            SYSTEM_ARGS,
        );
        self.add(
            "deinitializeSystem",
            "deinitializes the given system",
            system::deinitialize_system,
            SYSTEM_ARGS,
        );
        self.add("startSystem", "starts the given system", system::start_system, SYSTEM_ARGS);
        self.add("stopSystem", "stops the given system", system::stop_system, SYSTEM_ARGS);
        self.add("pauseSystem", "pauses the given system", system::pause_system, SYSTEM_ARGS);
        self.add(
            "shutdownSystem",
            "shutdown the given system",
            system::shutdown_system,
            SYSTEM_ARGS,
        );
        self.add(
            "startMonitoringSystem",
            "monitor logging messages of the given system",
            system::start_monitoring_system,
            SYSTEM_ARGS,
        );
        self.add(
            "stopMonitoringSystem",
            "stop monitoring logging messages of the given system",
            system::stop_monitoring_system,
            SYSTEM_ARGS,
        );

        self.add(
            "loadParticipant",
            "loads the given participant",
            participant::load_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "unloadParticipant",
            "unloads the given participant",
            participant::unload_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "initializeParticipant",
            "initializes the given participant",
            participant::initialize_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "deinitializeParticipant",
            "deinitializes the given participant",
            participant::deinitialize_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "startParticipant",
            "starts the given participant",
            participant::start_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "stopParticipant",
            "stops the given participant",
            participant::stop_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "pauseParticipant",
            "pauses the given participant",
            participant::pause_participant,
            PARTICIPANT_ARGS,
        );

        self.add(
            "getParticipantPropertyNames",
            "display all property names of a participant",
            properties::get_participant_property_names,
            PARTICIPANT_ARGS,
        );
        self.add(
            "getParticipantProperties",
            "display all properties and values of a participant",
            properties::get_participant_properties,
            PARTICIPANT_ARGS,
        );
        self.add(
            "getParticipantProperty",
            "get value of a property of a participant",
            properties::get_participant_property,
            const { &[
                SYSTEM,
                PARTICIPANT,
                arg("property_name", CompletionTag::UsedProperties),
            ] },
        );
        self.add(
            "setParticipantProperty",
            "set value of a property of a participant",
            properties::set_participant_property,
            const { &[
                SYSTEM,
                PARTICIPANT,
                arg("property_name", CompletionTag::UsedProperties),
                arg("property_value", CompletionTag::None),
            ] },
        );

        self.add(
            "getParticipantRPCObjects",
            "retrieve the RPC Objects of the given participant",
            rpc::get_participant_rpc_objects,
            PARTICIPANT_ARGS,
        );
        self.add(
            "getParticipantRPCObjectIIDs",
            "retrieve the RPC IIDs of a concrete RPC Objects of the given participant",
            rpc::get_participant_rpc_object_iids,
            const { &[SYSTEM, PARTICIPANT, arg("object name", CompletionTag::None)] },
        );
        self.add(
            "getParticipantRPCObjectIIDDefinition",
            "retrieve the RPC Definition of an IID of a concrete RPC Objects of the given participant",
            rpc::get_participant_rpc_object_iid_definition,
            const { &[
                SYSTEM,
                PARTICIPANT,
                arg("object name", CompletionTag::None),
                arg("interface id", CompletionTag::None),
            ] },
        );
        self.register(CommandInfo {
            name: "callRPC",
            description: "calls a method of a concrete RPC Object of the given participant",
            handler: rpc::call_rpc,
            arguments: const { &[
                SYSTEM,
                PARTICIPANT,
                arg("object name", CompletionTag::None),
                arg("interface id", CompletionTag::None),
                arg("method name", CompletionTag::None),
                arg("json parameters", CompletionTag::None),
            ] },
            optional_trailing: 1,
            hidden: false,
        });

        self.add(
            "shutdownParticipant",
            "shutdown the given participant",
            participant::shutdown_participant,
            PARTICIPANT_ARGS,
        );
        self.add(
            "getSystemState",
            "retrieves the given system",
            system::get_system_state,
            SYSTEM_ARGS,
        );
        self.add(
            "setSystemState",
            "sets the given system state",
            system::set_system_state,
            const { &[SYSTEM, arg("system state", CompletionTag::SystemStates)] },
        );
        self.add(
            "getParticipantState",
            "retrieves the given participants state",
            participant::get_participant_state,
            PARTICIPANT_ARGS,
        );
        self.add(
            "setParticipantState",
            "sets the given participants system state",
            participant::set_participant_state,
            const { &[
                SYSTEM,
                PARTICIPANT,
                arg("participant state", CompletionTag::SystemStates),
            ] },
        );
        self.add(
            "getParticipants",
            "lists the participants of the given system",
            system::get_participants,
            SYSTEM_ARGS,
        );

        self.add(
            "configureTiming3SystemTime",
            "configures the given system for timing System Time (Sync only to the master)",
            timing::configure_system_time,
            const { &[
                SYSTEM,
                arg("master participant name", CompletionTag::ConnectedParticipants),
            ] },
        );
        self.add(
            "configureTiming3DiscreteTime",
            "configures the given system for timing Discrete Time (for AFAP use 0.0 as factor)",
            timing::configure_discrete_time,
            const { &[
                SYSTEM,
                arg("master participant name", CompletionTag::ConnectedParticipants),
                arg("factor", CompletionTag::None),
                arg("step size (in ns)", CompletionTag::None),
            ] },
        );
        self.add(
            "configureTiming3NoSync",
            "resets the timing configuration",
            timing::configure_no_sync,
            SYSTEM_ARGS,
        );
        self.add(
            "getCurrentTimingMaster",
            "retrieves the timing master from the systems participants",
            timing::get_current_timing_master,
            SYSTEM_ARGS,
        );

        self.add(
            "enableAutoDiscovery",
            "enable the auto discovery for commands on systems",
            general::enable_auto_discovery,
            NO_ARGS,
        );
        self.add(
            "disableAutoDiscovery",
            "disable the auto discovery for commands on systems",
            general::disable_auto_discovery,
            NO_ARGS,
        );
        self.register(CommandInfo {
            name: "enableJson",
            description: "enable json mode (hidden function)",
            handler: general::enable_json,
            arguments: NO_ARGS,
            optional_trailing: 0,
            hidden: true,
        });
        self.register(CommandInfo {
            name: "disableJson",
            description: "disable json mode (hidden function)",
            handler: general::disable_json,
            arguments: NO_ARGS,
            optional_trailing: 0,
            hidden: true,
        });
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&CommandInfo> {
        self.commands.iter().find(|cmd| cmd.name == name)
    }

    /// `name : description` for every visible command.
    pub fn help_text(&self) -> String {
        self.commands
            .iter()
            .filter(|cmd| !cmd.hidden)
            .map(|cmd| format!("{} : {}\n", cmd.name, cmd.description))
            .collect()
    }

    /// Command names starting with `prefix`, in table order.
    pub fn completions(&self, prefix: &str) -> Vec<&'static str> {
        self.commands
            .iter()
            .filter(|cmd| cmd.name.starts_with(prefix))
            .map(|cmd| cmd.name)
            .collect()
    }

    pub fn all(&self) -> &[CommandInfo] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
