//! Configuration system for FEP Control.
//!
//! Uses `figment` for layered configuration: defaults -> config files ->
//! environment -> command line flags. Files are read from the platform config
//! dir (`config.toml`) and from `.fep_control/config.toml` in the workspace.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fleet::FleetConfig;
use crate::gateway::GatewayConfig;

/// Directory holding the workspace configuration file.
pub const WORKSPACE_CONFIG_DIR: &str = ".fep_control";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub session: SessionConfig,
    pub gateway: GatewayConfig,
    pub fleet: FleetConfig,
}

/// Initial mode of every new session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Discover unknown systems on first use.
    pub auto_discovery: bool,
    /// Start in structured (JSON) output mode.
    pub json: bool,
}

/// Values set on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_discovery: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "fep", "fep_control")
}

/// `config.toml` in the platform config dir, if the platform has one.
pub fn user_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Directory for the rolling diagnostic log files.
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("logs"))
}

fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_CONFIG_DIR).join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (command line flags)
/// 2. Environment variables (prefixed with `FEP_CONTROL_`)
/// 3. Workspace-local config (`.fep_control/config.toml`)
/// 4. User config (`config.toml` in the platform config dir)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SessionOverrides>,
) -> Result<ControlConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(ControlConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // FEP_CONTROL_GATEWAY__PORT, FEP_CONTROL_SESSION__JSON, ...
    figment = figment.merge(Env::prefixed("FEP_CONTROL_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::default("session", overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Check whether a user-level or workspace-level configuration file exists.
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|path| path.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControlConfig::default();
        assert!(!config.session.auto_discovery);
        assert!(!config.session.json);
        assert_eq!(config.gateway.port, 9003);
        assert!(config.fleet.systems.is_empty());
    }

    #[test]
    fn test_load_config_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = SessionOverrides {
            auto_discovery: Some(true),
            json: None,
        };
        let config = load_config(Some(dir.path()), Some(&overrides)).unwrap();
        assert!(config.session.auto_discovery);
        assert!(!config.session.json);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[session]
json = true

[gateway]
port = 9100

[[fleet.systems]]
name = "demo"

[[fleet.systems.participants]]
name = "part_a"
init_priority = 3

[[fleet.systems.participants.properties]]
path = "clock/main_clock"
value = "local_system_simtime"
type = "string"
"#,
        )
        .unwrap();

        assert!(config_exists(Some(dir.path())));
        let config = load_config(Some(dir.path()), None).unwrap();
        assert!(config.session.json);
        assert_eq!(config.gateway.port, 9100);
        assert_eq!(config.gateway.host, "0.0.0.0");
        let participant = &config.fleet.systems[0].participants[0];
        assert_eq!(participant.name, "part_a");
        assert_eq!(participant.init_priority, 3);
        assert!(participant.state_machine);
        assert_eq!(participant.properties.len(), 1);
        assert_eq!(participant.properties[0].type_name, "string");
    }

    #[test]
    fn test_override_beats_workspace_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[session]\njson = true\n").unwrap();

        let overrides = SessionOverrides {
            auto_discovery: None,
            json: Some(false),
        };
        let config = load_config(Some(dir.path()), Some(&overrides)).unwrap();
        assert!(!config.session.json);
    }

    #[test]
    fn test_invalid_workspace_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(WORKSPACE_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[gateway]\nport = \"high\"\n").unwrap();
        assert!(load_config(Some(dir.path()), None).is_err());
    }
}
