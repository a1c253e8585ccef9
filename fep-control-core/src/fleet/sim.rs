//! In-memory fleet built from configuration.
//!
//! Systems, participants, property trees and RPC objects live in one shared
//! table; handles are thin views onto it. Lifecycle transitions follow the
//! usual participant state machine (unloaded, loaded, initialized,
//! paused/running) and a shut down system disappears from discovery.

use super::{
    Configuration, FleetResult, FleetService, ParticipantHandle, ParticipantInfo,
    ParticipantStateMachine, PropertyNode, SystemHandle, Transition,
};
use crate::error::FleetError;
use crate::monitor::{EventMonitor, LogEvent};
use crate::state::{AggregatedState, SystemState};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Description of the simulated fleet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub systems: Vec<SimSystemConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSystemConfig {
    pub name: String,
    pub participants: Vec<SimParticipantConfig>,
}

impl SimSystemConfig {
    pub fn new(name: &str, participants: Vec<SimParticipantConfig>) -> Self {
        Self {
            name: name.to_string(),
            participants,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParticipantConfig {
    pub name: String,
    pub init_priority: i32,
    pub start_priority: i32,
    /// Expose the lifecycle remote object.
    pub state_machine: bool,
    /// Expose the configuration remote object.
    pub configuration: bool,
    /// Expose the RPC introspection object.
    pub participant_info: bool,
    pub properties: Vec<SimPropertyConfig>,
    pub rpc_objects: Vec<SimRpcObjectConfig>,
}

impl Default for SimParticipantConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            init_priority: 0,
            start_priority: 0,
            state_machine: true,
            configuration: true,
            participant_info: true,
            properties: default_properties(),
            rpc_objects: default_rpc_objects(),
        }
    }
}

impl SimParticipantConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, path: &str, value: &str, type_name: &str) -> Self {
        self.properties.push(SimPropertyConfig {
            path: path.to_string(),
            value: value.to_string(),
            type_name: type_name.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimPropertyConfig {
    pub path: String,
    pub value: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimRpcObjectConfig {
    pub name: String,
    pub interfaces: Vec<SimRpcInterfaceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimRpcInterfaceConfig {
    pub iid: String,
    pub definition: String,
}

fn default_properties() -> Vec<SimPropertyConfig> {
    [
        ("clock/main_clock", "local_system_realtime", "string"),
        ("clock/step_size", "100000000", "int64"),
        ("clock/time_factor", "1.0", "double"),
        ("scheduling/scheduler", "clock_based_scheduler", "string"),
    ]
    .into_iter()
    .map(|(path, value, type_name)| SimPropertyConfig {
        path: path.into(),
        value: value.into(),
        type_name: type_name.into(),
    })
    .collect()
}

fn rpc_object(name: &str, methods: &[&str]) -> SimRpcObjectConfig {
    let definition = json!(
        methods
            .iter()
            .map(|m| json!({ "name": m }))
            .collect::<Vec<_>>()
    )
    .to_string();
    SimRpcObjectConfig {
        name: name.to_string(),
        interfaces: vec![SimRpcInterfaceConfig {
            iid: format!("{name}.arya.fep3.iid"),
            definition,
        }],
    }
}

fn default_rpc_objects() -> Vec<SimRpcObjectConfig> {
    vec![
        rpc_object(
            "participant_info",
            &["getName", "getRPCServices", "getRPCServiceIIDs"],
        ),
        rpc_object("participant_statemachine", &["getCurrentStateName"]),
        rpc_object("configuration", &["getProperties"]),
        rpc_object("clock_service", &["getTime"]),
    ]
}

#[derive(Debug, Clone)]
struct SimProperty {
    path: String,
    value: String,
    type_name: String,
}

#[derive(Debug, Clone)]
struct SimParticipant {
    name: String,
    state: SystemState,
    init_priority: i32,
    start_priority: i32,
    has_state_machine: bool,
    has_configuration: bool,
    has_participant_info: bool,
    properties: Vec<SimProperty>,
    rpc_objects: Vec<SimRpcObjectConfig>,
}

impl SimParticipant {
    fn from_config(config: &SimParticipantConfig) -> Self {
        Self {
            name: config.name.clone(),
            state: SystemState::Unloaded,
            init_priority: config.init_priority,
            start_priority: config.start_priority,
            has_state_machine: config.state_machine,
            has_configuration: config.configuration,
            has_participant_info: config.participant_info,
            properties: config
                .properties
                .iter()
                .map(|p| SimProperty {
                    path: p.path.trim_matches('/').to_string(),
                    value: p.value.clone(),
                    type_name: p.type_name.clone(),
                })
                .collect(),
            rpc_objects: config.rpc_objects.clone(),
        }
    }

    fn rpc_object(&self, name: &str) -> Option<&SimRpcObjectConfig> {
        self.rpc_objects.iter().find(|o| o.name == name)
    }
}

struct SimSystem {
    name: String,
    participants: Vec<SimParticipant>,
    monitors: Vec<(u64, Arc<dyn EventMonitor>)>,
    timing_masters: Vec<String>,
}

impl SimSystem {
    fn is_reachable(&self) -> bool {
        self.participants
            .iter()
            .any(|p| p.state != SystemState::Unreachable)
    }

    fn participant_mut(&mut self, name: &str) -> FleetResult<&mut SimParticipant> {
        self.participants
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| FleetError::UnknownParticipant {
                name: name.to_string(),
            })
    }
}

#[derive(Default)]
struct FleetTable {
    systems: Vec<SimSystem>,
    next_registration: u64,
}

impl FleetTable {
    fn system(&self, name: &str) -> FleetResult<&SimSystem> {
        self.systems
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| FleetError::Unreachable {
                name: name.to_string(),
            })
    }

    fn system_mut(&mut self, name: &str) -> FleetResult<&mut SimSystem> {
        self.systems
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| FleetError::Unreachable {
                name: name.to_string(),
            })
    }
}

type Shared = Arc<Mutex<FleetTable>>;

fn lock(shared: &Shared) -> MutexGuard<'_, FleetTable> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Target state of a single transition and the states it may start from.
fn transition_rule(transition: Transition) -> (SystemState, &'static [SystemState]) {
    use SystemState::*;
    match transition {
        Transition::Load => (Loaded, &[Unloaded]),
        Transition::Unload => (Unloaded, &[Loaded]),
        Transition::Initialize => (Initialized, &[Loaded]),
        Transition::Deinitialize => (Loaded, &[Initialized]),
        Transition::Start => (Running, &[Initialized, Paused]),
        Transition::Stop => (Initialized, &[Running, Paused]),
        Transition::Pause => (Paused, &[Initialized, Running]),
        Transition::Shutdown => (Unreachable, &[Unloaded]),
    }
}

fn apply_transition(participant: &mut SimParticipant, transition: Transition) -> FleetResult<()> {
    let (target, allowed_from) = transition_rule(transition);
    if participant.state == target {
        return Ok(());
    }
    if participant.state == SystemState::Unreachable {
        return Err(FleetError::Unreachable {
            name: participant.name.clone(),
        });
    }
    if !allowed_from.contains(&participant.state) {
        return Err(FleetError::Transition {
            transition: transition.verb().to_string(),
            state: participant.state.name().to_string(),
        });
    }
    participant.state = target;
    Ok(())
}

/// Next transition on the way from `current` to `target`.
fn next_step(current: SystemState, target: SystemState) -> Option<Transition> {
    use SystemState::*;
    match (current, target) {
        (c, t) if c == t => None,
        (Unloaded, _) => Some(Transition::Load),
        (Loaded, Unloaded) => Some(Transition::Unload),
        (Loaded, _) => Some(Transition::Initialize),
        (Initialized, Unloaded | Loaded) => Some(Transition::Deinitialize),
        (Initialized, Running) => Some(Transition::Start),
        (Initialized, Paused) => Some(Transition::Pause),
        (Running, Paused) => Some(Transition::Pause),
        (Running, _) => Some(Transition::Stop),
        (Paused, Running) => Some(Transition::Start),
        (Paused, _) => Some(Transition::Stop),
        _ => None,
    }
}

fn drive_to_state(participant: &mut SimParticipant, target: SystemState) -> FleetResult<()> {
    if matches!(target, SystemState::Undefined | SystemState::Unreachable) {
        return Err(FleetError::InvalidArgument {
            message: format!("state '{}' cannot be set", target.name()),
        });
    }
    while participant.state != target {
        let step = next_step(participant.state, target).ok_or_else(|| FleetError::Unreachable {
            name: participant.name.clone(),
        })?;
        apply_transition(participant, step)?;
    }
    Ok(())
}

/// Simulated fleet shared by every session of the process.
#[derive(Clone, Default)]
pub struct SimulatedFleet {
    shared: Shared,
}

impl std::fmt::Debug for SimulatedFleet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedFleet")
            .field("systems", &lock(&self.shared).systems.len())
            .finish()
    }
}

impl SimulatedFleet {
    pub fn new(config: &FleetConfig) -> Self {
        let systems = config
            .systems
            .iter()
            .map(|s| SimSystem {
                name: s.name.clone(),
                participants: s.participants.iter().map(SimParticipant::from_config).collect(),
                monitors: Vec::new(),
                timing_masters: Vec::new(),
            })
            .collect();
        Self {
            shared: Arc::new(Mutex::new(FleetTable {
                systems,
                next_registration: 1,
            })),
        }
    }

    /// Deliver a log event to every monitor registered on `system`.
    /// Returns the number of monitors reached.
    pub fn emit_log(&self, system: &str, event: &LogEvent) -> usize {
        let monitors: Vec<Arc<dyn EventMonitor>> = {
            let table = lock(&self.shared);
            match table.system(system) {
                Ok(s) => s.monitors.iter().map(|(_, m)| m.clone()).collect(),
                Err(_) => return 0,
            }
        };
        for monitor in &monitors {
            monitor.on_log(event);
        }
        monitors.len()
    }

    /// Number of live monitor registrations on `system`.
    pub fn monitor_count(&self, system: &str) -> usize {
        lock(&self.shared)
            .system(system)
            .map(|s| s.monitors.len())
            .unwrap_or(0)
    }

    /// Current state of one participant, for inspection.
    pub fn participant_state(&self, system: &str, participant: &str) -> Option<SystemState> {
        let table = lock(&self.shared);
        let sys = table.system(system).ok()?;
        sys.participants
            .iter()
            .find(|p| p.name == participant)
            .map(|p| p.state)
    }

    fn handle(&self, name: &str, scope: Option<Vec<String>>) -> Box<dyn SystemHandle> {
        Box::new(SimSystemHandle {
            shared: self.shared.clone(),
            system: name.to_string(),
            scope,
            registrations: Vec::new(),
        })
    }
}

impl FleetService for SimulatedFleet {
    fn discover_all_systems(&self) -> FleetResult<Vec<Box<dyn SystemHandle>>> {
        let names: Vec<String> = lock(&self.shared)
            .systems
            .iter()
            .filter(|s| s.is_reachable())
            .map(|s| s.name.clone())
            .collect();
        Ok(names.iter().map(|n| self.handle(n, None)).collect())
    }

    fn discover_system(&self, name: &str) -> FleetResult<Box<dyn SystemHandle>> {
        let reachable = lock(&self.shared).system(name)?.is_reachable();
        if !reachable {
            return Err(FleetError::Unreachable {
                name: name.to_string(),
            });
        }
        Ok(self.handle(name, None))
    }

    fn connect_system(
        &self,
        name: &str,
        participants: &[String],
    ) -> FleetResult<Box<dyn SystemHandle>> {
        {
            let table = lock(&self.shared);
            let system = table.system(name)?;
            for wanted in participants {
                if !system.participants.iter().any(|p| &p.name == wanted) {
                    return Err(FleetError::UnknownParticipant {
                        name: wanted.clone(),
                    });
                }
            }
        }
        Ok(self.handle(name, Some(participants.to_vec())))
    }
}

/// View onto one simulated system, optionally restricted to some participants.
struct SimSystemHandle {
    shared: Shared,
    system: String,
    scope: Option<Vec<String>>,
    registrations: Vec<u64>,
}

impl SimSystemHandle {
    fn in_scope(&self, participant: &str) -> bool {
        self.scope
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == participant))
    }

    fn with_system<T>(&self, f: impl FnOnce(&mut SimSystem) -> FleetResult<T>) -> FleetResult<T> {
        let mut table = lock(&self.shared);
        f(table.system_mut(&self.system)?)
    }
}

impl Drop for SimSystemHandle {
    fn drop(&mut self) {
        if self.registrations.is_empty() {
            return;
        }
        let mut table = lock(&self.shared);
        if let Ok(system) = table.system_mut(&self.system) {
            system
                .monitors
                .retain(|(id, _)| !self.registrations.contains(id));
        }
    }
}

impl SystemHandle for SimSystemHandle {
    fn name(&self) -> String {
        self.system.clone()
    }

    fn participants(&self) -> FleetResult<Vec<String>> {
        self.with_system(|s| {
            Ok(s.participants
                .iter()
                .map(|p| p.name.clone())
                .filter(|n| self.in_scope(n))
                .collect())
        })
    }

    fn participant(&self, name: &str) -> FleetResult<Option<Box<dyn ParticipantHandle>>> {
        if !self.in_scope(name) {
            return Ok(None);
        }
        self.with_system(|s| {
            Ok(s.participants.iter().any(|p| p.name == name).then(|| {
                Box::new(SimParticipantHandle {
                    shared: self.shared.clone(),
                    system: self.system.clone(),
                    participant: name.to_string(),
                }) as Box<dyn ParticipantHandle>
            }))
        })
    }

    fn transition(&mut self, transition: Transition) -> FleetResult<()> {
        let scope = self.scope.clone();
        self.with_system(|s| {
            // validate on a copy first so a failing participant leaves all untouched
            let mut staged = s.participants.clone();
            for p in staged.iter_mut() {
                if scope.as_ref().is_none_or(|names| names.contains(&p.name)) {
                    apply_transition(p, transition)?;
                }
            }
            s.participants = staged;
            Ok(())
        })
    }

    fn system_state(&self) -> FleetResult<AggregatedState> {
        self.with_system(|s| {
            let states: Vec<SystemState> = s
                .participants
                .iter()
                .filter(|p| self.in_scope(&p.name))
                .map(|p| p.state)
                .collect();
            let Some(lowest) = states.iter().min().copied() else {
                return Ok(AggregatedState {
                    state: SystemState::Unreachable,
                    homogeneous: true,
                });
            };
            Ok(AggregatedState {
                state: lowest,
                homogeneous: states.iter().all(|st| *st == lowest),
            })
        })
    }

    fn set_system_state(&mut self, state: SystemState) -> FleetResult<()> {
        let scope = self.scope.clone();
        self.with_system(|s| {
            let mut staged = s.participants.clone();
            for p in staged.iter_mut() {
                if scope.as_ref().is_none_or(|names| names.contains(&p.name)) {
                    drive_to_state(p, state)?;
                }
            }
            s.participants = staged;
            Ok(())
        })
    }

    fn register_monitoring(&mut self, monitor: Arc<dyn EventMonitor>) -> FleetResult<()> {
        let mut table = lock(&self.shared);
        let id = table.next_registration;
        table.next_registration += 1;
        table.system_mut(&self.system)?.monitors.push((id, monitor));
        self.registrations.push(id);
        Ok(())
    }

    fn unregister_monitoring(&mut self, monitor: &Arc<dyn EventMonitor>) -> FleetResult<()> {
        let target = Arc::as_ptr(monitor) as *const ();
        let mut removed = Vec::new();
        self.with_system(|s| {
            s.monitors.retain(|(id, m)| {
                let same = Arc::as_ptr(m) as *const () == target;
                if same {
                    removed.push(*id);
                }
                !same
            });
            Ok(())
        })?;
        self.registrations.retain(|id| !removed.contains(id));
        if removed.is_empty() {
            return Err(FleetError::Other("monitor is not registered".into()));
        }
        Ok(())
    }

    fn configure_timing_system_time(&mut self, master: &str, sync_cycle: &str) -> FleetResult<()> {
        let cycle: u64 = sync_cycle.parse().map_err(|_| FleetError::Timing {
            message: format!("invalid sync cycle time '{sync_cycle}'"),
        })?;
        self.with_system(|s| {
            if !s.participants.iter().any(|p| p.name == master) {
                return Err(FleetError::Timing {
                    message: format!("master '{master}' is not part of the system"),
                });
            }
            for p in s.participants.iter_mut() {
                let clock = if p.name == master {
                    "local_system_realtime"
                } else {
                    "slave_master_on_demand"
                };
                set_property(p, "clock/main_clock", clock, "string");
                set_property(p, "clock_synchronization/sync_cycle_time", &cycle.to_string(), "int64");
            }
            s.timing_masters = vec![master.to_string()];
            Ok(())
        })
    }

    fn configure_timing_discrete(
        &mut self,
        master: &str,
        step_size: &str,
        factor: &str,
    ) -> FleetResult<()> {
        let step: u64 = step_size.parse().map_err(|_| FleetError::Timing {
            message: format!("invalid step size '{step_size}'"),
        })?;
        let factor_value: f64 = factor.parse().map_err(|_| FleetError::Timing {
            message: format!("invalid time factor '{factor}'"),
        })?;
        self.with_system(|s| {
            if !s.participants.iter().any(|p| p.name == master) {
                return Err(FleetError::Timing {
                    message: format!("master '{master}' is not part of the system"),
                });
            }
            for p in s.participants.iter_mut() {
                let clock = if p.name == master {
                    "local_system_simtime"
                } else {
                    "slave_master_on_demand_discrete"
                };
                set_property(p, "clock/main_clock", clock, "string");
                set_property(p, "clock/step_size", &step.to_string(), "int64");
                set_property(p, "clock/time_factor", &factor_value.to_string(), "double");
            }
            s.timing_masters = vec![master.to_string()];
            Ok(())
        })
    }

    fn configure_timing_no_master(&mut self) -> FleetResult<()> {
        self.with_system(|s| {
            for p in s.participants.iter_mut() {
                set_property(p, "clock/main_clock", "local_system_realtime", "string");
            }
            s.timing_masters.clear();
            Ok(())
        })
    }

    fn current_timing_masters(&self) -> FleetResult<Vec<String>> {
        self.with_system(|s| Ok(s.timing_masters.clone()))
    }
}

fn set_property(participant: &mut SimParticipant, path: &str, value: &str, type_name: &str) {
    match participant.properties.iter_mut().find(|p| p.path == path) {
        Some(prop) => prop.value = value.to_string(),
        None => participant.properties.push(SimProperty {
            path: path.to_string(),
            value: value.to_string(),
            type_name: type_name.to_string(),
        }),
    }
}

fn join_path(node: &str, name: &str) -> String {
    if node.is_empty() {
        name.to_string()
    } else {
        format!("{node}/{name}")
    }
}

/// Handle on one participant; every call looks the participant up again.
struct SimParticipantHandle {
    shared: Shared,
    system: String,
    participant: String,
}

impl SimParticipantHandle {
    fn with<T>(&self, f: impl FnOnce(&mut SimParticipant) -> FleetResult<T>) -> FleetResult<T> {
        let mut table = lock(&self.shared);
        let system = table.system_mut(&self.system)?;
        f(system.participant_mut(&self.participant)?)
    }

    fn reachable<T>(
        &self,
        f: impl FnOnce(&mut SimParticipant) -> FleetResult<T>,
    ) -> FleetResult<T> {
        self.with(|p| {
            if p.state == SystemState::Unreachable {
                return Err(FleetError::Unreachable {
                    name: p.name.clone(),
                });
            }
            f(p)
        })
    }

    fn sibling(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            system: self.system.clone(),
            participant: self.participant.clone(),
        }
    }

    fn answer_rpc(p: &SimParticipant, request: &Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let params = request.get("params");

        let result = match method {
            "getName" => Ok(Value::String(p.name.clone())),
            "getRPCServices" => Ok(Value::String(
                p.rpc_objects
                    .iter()
                    .map(|o| o.name.as_str())
                    .collect::<Vec<_>>()
                    .join(";"),
            )),
            "getRPCServiceIIDs" => {
                let service = params
                    .and_then(|v| v.get("rpc_service_name"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                match p.rpc_object(service) {
                    Some(obj) => Ok(Value::String(
                        obj.interfaces
                            .iter()
                            .map(|i| i.iid.as_str())
                            .collect::<Vec<_>>()
                            .join(";"),
                    )),
                    None => Err((-32602, format!("unknown rpc service '{service}'"))),
                }
            }
            _ => Err((-32601, "Method not found".to_string())),
        };

        match result {
            Ok(value) => json!({ "id": id, "jsonrpc": "2.0", "result": value }),
            Err((code, message)) => json!({
                "error": { "code": code, "message": message },
                "id": id,
                "jsonrpc": "2.0",
            }),
        }
    }
}

impl ParticipantHandle for SimParticipantHandle {
    fn name(&self) -> String {
        self.participant.clone()
    }

    fn init_priority(&self) -> FleetResult<i32> {
        self.reachable(|p| Ok(p.init_priority))
    }

    fn set_init_priority(&self, priority: i32) -> FleetResult<()> {
        self.reachable(|p| {
            p.init_priority = priority;
            Ok(())
        })
    }

    fn start_priority(&self) -> FleetResult<i32> {
        self.reachable(|p| Ok(p.start_priority))
    }

    fn set_start_priority(&self, priority: i32) -> FleetResult<()> {
        self.reachable(|p| {
            p.start_priority = priority;
            Ok(())
        })
    }

    fn state_machine(&self) -> Option<Box<dyn ParticipantStateMachine>> {
        let present = self.with(|p| Ok(p.has_state_machine)).unwrap_or(false);
        present.then(|| Box::new(self.sibling()) as Box<dyn ParticipantStateMachine>)
    }

    fn configuration(&self) -> Option<Box<dyn Configuration>> {
        let present = self.with(|p| Ok(p.has_configuration)).unwrap_or(false);
        present.then(|| Box::new(self.sibling()) as Box<dyn Configuration>)
    }

    fn participant_info(&self) -> Option<Box<dyn ParticipantInfo>> {
        let present = self.with(|p| Ok(p.has_participant_info)).unwrap_or(false);
        present.then(|| Box::new(self.sibling()) as Box<dyn ParticipantInfo>)
    }

    fn call_rpc(&self, object: &str, iid: &str, request: &str) -> FleetResult<String> {
        self.reachable(|p| {
            let known = p
                .rpc_object(object)
                .is_some_and(|o| o.interfaces.iter().any(|i| i.iid == iid));
            if !known {
                return Err(FleetError::Rpc {
                    message: format!("no RPC object '{object}' with interface '{iid}'"),
                });
            }
            let request: Value = serde_json::from_str(request).map_err(|e| FleetError::Rpc {
                message: format!("malformed request: {e}"),
            })?;
            Ok(Self::answer_rpc(p, &request).to_string())
        })
    }
}

impl ParticipantStateMachine for SimParticipantHandle {
    fn transition(&self, transition: Transition) -> FleetResult<()> {
        self.with(|p| apply_transition(p, transition))
    }

    fn state(&self) -> FleetResult<SystemState> {
        self.with(|p| Ok(p.state))
    }
}

impl Configuration for SimParticipantHandle {
    fn node(&self, path: &str) -> FleetResult<Option<Box<dyn PropertyNode>>> {
        let node = path.trim_matches('/').to_string();
        let exists = self.reachable(|p| {
            Ok(node.is_empty()
                || p.properties.iter().any(|prop| {
                    prop.path == node || prop.path.starts_with(&format!("{node}/"))
                }))
        })?;
        Ok(exists.then(|| {
            Box::new(SimPropertyNode {
                owner: self.sibling(),
                node,
            }) as Box<dyn PropertyNode>
        }))
    }
}

impl ParticipantInfo for SimParticipantHandle {
    fn object_names(&self) -> FleetResult<Vec<String>> {
        self.reachable(|p| Ok(p.rpc_objects.iter().map(|o| o.name.clone()).collect()))
    }

    fn object_iids(&self, object: &str) -> FleetResult<Vec<String>> {
        self.reachable(|p| {
            p.rpc_object(object)
                .map(|o| o.interfaces.iter().map(|i| i.iid.clone()).collect())
                .ok_or_else(|| FleetError::Rpc {
                    message: format!("no RPC object '{object}'"),
                })
        })
    }

    fn iid_definition(&self, object: &str, iid: &str) -> FleetResult<String> {
        self.reachable(|p| {
            p.rpc_object(object)
                .and_then(|o| o.interfaces.iter().find(|i| i.iid == iid))
                .map(|i| i.definition.clone())
                .ok_or_else(|| FleetError::Rpc {
                    message: format!("no interface '{iid}' on RPC object '{object}'"),
                })
        })
    }
}

struct SimPropertyNode {
    owner: SimParticipantHandle,
    node: String,
}

impl PropertyNode for SimPropertyNode {
    fn child_names(&self) -> FleetResult<Vec<String>> {
        let prefix = if self.node.is_empty() {
            String::new()
        } else {
            format!("{}/", self.node)
        };
        self.owner.reachable(|p| {
            let mut names: Vec<String> = Vec::new();
            for prop in &p.properties {
                if let Some(rest) = prop.path.strip_prefix(&prefix) {
                    let child = rest.split('/').next().unwrap_or(rest);
                    if !child.is_empty() && !names.iter().any(|n| n == child) {
                        names.push(child.to_string());
                    }
                }
            }
            Ok(names)
        })
    }

    fn value(&self, name: &str) -> FleetResult<String> {
        let path = join_path(&self.node, name);
        self.owner.reachable(|p| {
            Ok(p.properties
                .iter()
                .find(|prop| prop.path == path)
                .map(|prop| prop.value.clone())
                .unwrap_or_default())
        })
    }

    fn type_name(&self, name: &str) -> FleetResult<String> {
        let path = join_path(&self.node, name);
        let prefix = format!("{path}/");
        self.owner.reachable(|p| {
            if let Some(prop) = p.properties.iter().find(|prop| prop.path == path) {
                return Ok(prop.type_name.clone());
            }
            let is_node = p.properties.iter().any(|prop| prop.path.starts_with(&prefix));
            Ok(if is_node { "node".to_string() } else { String::new() })
        })
    }

    fn set(&self, name: &str, value: &str, type_name: &str) -> FleetResult<()> {
        if name.is_empty() {
            return Err(FleetError::PropertyNotFound {
                path: self.node.clone(),
            });
        }
        let path = join_path(&self.node, name);
        let type_name = if type_name.is_empty() { "string" } else { type_name };
        self.owner.reachable(|p| {
            set_property(p, &path, value, type_name);
            Ok(())
        })
    }
}
