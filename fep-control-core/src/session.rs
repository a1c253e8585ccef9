//! Per-connection session state and system resolution.

use crate::fleet::{FleetResult, FleetService, SystemHandle};
use crate::monitor::LogMonitor;
use crate::output::OutputFormatter;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name used on the console for the system whose real name is empty.
pub const EMPTY_SYSTEM_NAME: &str = "-";

/// Property paths offered for completion before any has been used.
pub const DEFAULT_USED_PROPERTIES: &[&str] =
    &["clock/main_clock", "clock/step_size", "clock/time_factor"];

/// Console name for a real system name.
pub fn display_system_name(real: &str) -> String {
    if real.is_empty() {
        EMPTY_SYSTEM_NAME.to_string()
    } else {
        real.to_string()
    }
}

/// Real system name for a console name.
pub fn real_system_name(display: &str) -> &str {
    if display == EMPTY_SYSTEM_NAME {
        ""
    } else {
        display
    }
}

/// Mutable state owned by one session.
pub struct SessionState {
    /// Keyed by console name (`-` for the unnamed system).
    pub known_systems: BTreeMap<String, Box<dyn SystemHandle>>,
    /// Seeds participant completion.
    pub last_system_name: String,
    pub auto_discovery: bool,
    pub used_properties: Vec<String>,
}

impl SessionState {
    pub fn new(auto_discovery: bool) -> Self {
        Self {
            known_systems: BTreeMap::new(),
            last_system_name: String::new(),
            auto_discovery,
            used_properties: DEFAULT_USED_PROPERTIES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("known_systems", &self.known_systems.keys().collect::<Vec<_>>())
            .field("last_system_name", &self.last_system_name)
            .field("auto_discovery", &self.auto_discovery)
            .field("used_properties", &self.used_properties)
            .finish()
    }
}

/// One console session: state, output and the fleet it talks to.
///
/// A session is driven by exactly one task at a time; it is moved, never
/// shared.
pub struct Session {
    fleet: Arc<dyn FleetService>,
    out: Arc<OutputFormatter>,
    monitor: Arc<LogMonitor>,
    state: SessionState,
    exit_requested: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("structured", &self.out.is_structured())
            .field("exit_requested", &self.exit_requested)
            .finish()
    }
}

impl Session {
    pub fn new(fleet: Arc<dyn FleetService>, out: Arc<OutputFormatter>, auto_discovery: bool) -> Self {
        let monitor = Arc::new(LogMonitor::new(out.clone(), out.is_structured()));
        Self {
            fleet,
            out,
            monitor,
            state: SessionState::new(auto_discovery),
            exit_requested: false,
        }
    }

    pub fn out(&self) -> &Arc<OutputFormatter> {
        &self.out
    }

    pub fn fleet(&self) -> &Arc<dyn FleetService> {
        &self.fleet
    }

    pub fn monitor(&self) -> &Arc<LogMonitor> {
        &self.monitor
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn is_structured(&self) -> bool {
        self.out.is_structured()
    }

    /// Switch the output mode of replies and of log delivery together.
    pub fn set_json_mode(&mut self, enabled: bool) {
        self.out.set_structured(enabled);
        self.monitor.set_structured(enabled);
    }

    pub fn auto_discovery(&self) -> bool {
        self.state.auto_discovery
    }

    pub fn set_auto_discovery(&mut self, enabled: bool) {
        self.state.auto_discovery = enabled;
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Drop every system handle and mark the session as finished.
    pub fn request_exit(&mut self) {
        self.state.known_systems.clear();
        self.exit_requested = true;
    }

    /// Discover `name` and remember it. Returns the key it was stored under.
    pub fn discover_by_name(&mut self, name: &str) -> FleetResult<String> {
        self.state.last_system_name = name.to_string();
        let handle = self.fleet.discover_system(real_system_name(name))?;
        let key = display_system_name(&handle.name());
        self.state.known_systems.insert(key.clone(), handle);
        Ok(key)
    }

    /// Remember an already discovered system.
    pub fn remember_system(&mut self, handle: Box<dyn SystemHandle>) -> String {
        let key = display_system_name(&handle.name());
        self.state.known_systems.insert(key.clone(), handle);
        self.state.last_system_name = key.clone();
        key
    }

    pub fn forget_system(&mut self, name: &str) -> Option<Box<dyn SystemHandle>> {
        self.state.known_systems.remove(name)
    }

    /// Look up a known system, discovering it first when auto discovery is
    /// on. Reports `system "<name>" is not connected` when it cannot be found.
    pub fn resolve_system(&mut self, name: &str) -> Option<&mut Box<dyn SystemHandle>> {
        if !self.state.known_systems.contains_key(name) && self.state.auto_discovery {
            if let Err(e) = self.discover_by_name(name) {
                tracing::debug!(system = name, error = %e, "auto discovery failed");
            }
        }
        if self.state.known_systems.contains_key(name) {
            self.state.last_system_name = name.to_string();
            return self.state.known_systems.get_mut(name);
        }
        self.out.write(&format!("system \"{name}\" is not connected\n"));
        None
    }

    /// Remember a property path for completion.
    ///
    /// A path is only added when the participant name itself already
    /// appears in the list, so in practice the list keeps its defaults.
    pub fn record_used_property(&mut self, participant: &str, path: &str) {
        if self.state.used_properties.iter().any(|p| p == participant) {
            self.state.used_properties.push(path.to_string());
        }
    }
}
