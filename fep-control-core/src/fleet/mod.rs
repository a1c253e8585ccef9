//! # Fleet
//!
//! The collaborator boundary: discovery of systems, lifecycle transitions,
//! remote property access and RPC invocation. Every call is blocking and
//! returns a [`FleetError`] instead of panicking; command handlers decide
//! how a failure is reported.
//!
//! [`SimulatedFleet`] is an in-memory implementation driven by configuration.

pub mod sim;

pub use sim::{
    FleetConfig, SimParticipantConfig, SimPropertyConfig, SimRpcInterfaceConfig,
    SimRpcObjectConfig, SimSystemConfig, SimulatedFleet,
};

use crate::error::FleetError;
use crate::monitor::EventMonitor;
use crate::state::{AggregatedState, SystemState};
use std::sync::Arc;

pub type FleetResult<T> = std::result::Result<T, FleetError>;

/// A lifecycle transition applied to a system or a single participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Load,
    Unload,
    Initialize,
    Deinitialize,
    Start,
    Stop,
    Pause,
    Shutdown,
}

impl Transition {
    /// Infinitive used in failure messages ("cannot load system ...").
    pub fn verb(self) -> &'static str {
        match self {
            Transition::Load => "load",
            Transition::Unload => "unload",
            Transition::Initialize => "initialize",
            Transition::Deinitialize => "deinitialize",
            Transition::Start => "start",
            Transition::Stop => "stop",
            Transition::Pause => "pause",
            Transition::Shutdown => "shutdown",
        }
    }

    /// Past form used in success notes ("demo loaded").
    pub fn past(self) -> &'static str {
        match self {
            Transition::Load => "loaded",
            Transition::Unload => "unloaded",
            Transition::Initialize => "initialized",
            Transition::Deinitialize => "deinitialized",
            Transition::Start => "started",
            Transition::Stop => "stopped",
            Transition::Pause => "paused",
            Transition::Shutdown => "shutdowned",
        }
    }
}

/// Entry point for discovering systems.
pub trait FleetService: Send + Sync {
    /// Every reachable system.
    fn discover_all_systems(&self) -> FleetResult<Vec<Box<dyn SystemHandle>>>;

    /// The system with this exact name (empty string for the unnamed system).
    fn discover_system(&self, name: &str) -> FleetResult<Box<dyn SystemHandle>>;

    /// A handle on `name` restricted to the given participants.
    fn connect_system(&self, name: &str, participants: &[String])
    -> FleetResult<Box<dyn SystemHandle>>;
}

/// A connected system.
pub trait SystemHandle: Send {
    fn name(&self) -> String;
    fn participants(&self) -> FleetResult<Vec<String>>;
    fn participant(&self, name: &str) -> FleetResult<Option<Box<dyn ParticipantHandle>>>;

    fn transition(&mut self, transition: Transition) -> FleetResult<()>;
    fn system_state(&self) -> FleetResult<AggregatedState>;
    fn set_system_state(&mut self, state: SystemState) -> FleetResult<()>;

    fn register_monitoring(&mut self, monitor: Arc<dyn EventMonitor>) -> FleetResult<()>;
    fn unregister_monitoring(&mut self, monitor: &Arc<dyn EventMonitor>) -> FleetResult<()>;

    fn configure_timing_system_time(&mut self, master: &str, sync_cycle: &str) -> FleetResult<()>;
    fn configure_timing_discrete(
        &mut self,
        master: &str,
        step_size: &str,
        factor: &str,
    ) -> FleetResult<()>;
    fn configure_timing_no_master(&mut self) -> FleetResult<()>;
    fn current_timing_masters(&self) -> FleetResult<Vec<String>>;
}

/// A participant inside a system.
pub trait ParticipantHandle: Send {
    fn name(&self) -> String;

    fn init_priority(&self) -> FleetResult<i32>;
    fn set_init_priority(&self, priority: i32) -> FleetResult<()>;
    fn start_priority(&self) -> FleetResult<i32>;
    fn set_start_priority(&self, priority: i32) -> FleetResult<()>;

    /// Lifecycle remote object, if the participant exposes one.
    fn state_machine(&self) -> Option<Box<dyn ParticipantStateMachine>>;
    /// Configuration remote object, if the participant exposes one.
    fn configuration(&self) -> Option<Box<dyn Configuration>>;
    /// RPC introspection object, if the participant exposes one.
    fn participant_info(&self) -> Option<Box<dyn ParticipantInfo>>;

    /// Send a raw JSON-RPC request to `object` / `iid` and return the raw response.
    fn call_rpc(&self, object: &str, iid: &str, request: &str) -> FleetResult<String>;
}

pub trait ParticipantStateMachine: Send {
    fn transition(&self, transition: Transition) -> FleetResult<()>;
    fn state(&self) -> FleetResult<SystemState>;
}

/// Access to a participant's property tree.
pub trait Configuration: Send {
    /// The node at `path` (`""` is the root), `None` if it does not exist.
    fn node(&self, path: &str) -> FleetResult<Option<Box<dyn PropertyNode>>>;
}

/// One node of a property tree.
pub trait PropertyNode: Send {
    fn child_names(&self) -> FleetResult<Vec<String>>;
    fn value(&self, name: &str) -> FleetResult<String>;
    fn type_name(&self, name: &str) -> FleetResult<String>;
    fn set(&self, name: &str, value: &str, type_name: &str) -> FleetResult<()>;
}

pub trait ParticipantInfo: Send {
    fn object_names(&self) -> FleetResult<Vec<String>>;
    fn object_iids(&self, object: &str) -> FleetResult<Vec<String>>;
    fn iid_definition(&self, object: &str, iid: &str) -> FleetResult<String>;
}
