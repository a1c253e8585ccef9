//! # FEP Control Core
//!
//! Core library for the FEP Control console.
//! Provides the command line tokenizer, command registry and dispatcher, the
//! plain/structured output formatter, per-connection sessions, the fleet
//! collaborator boundary with a simulated fleet, configuration, and the
//! websocket gateway.

pub mod commands;
pub mod completion;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fleet;
pub mod gateway;
pub mod monitor;
pub mod output;
pub mod registry;
pub mod session;
pub mod shutdown;
pub mod state;
pub mod tokenizer;

// Re-export commonly used types at the crate root.
pub use config::{ControlConfig, SessionConfig, SessionOverrides, load_config};
pub use dispatch::{EXIT_BAD_ARITY, EXIT_UNKNOWN_COMMAND};
pub use error::{ControlError, FleetError, Result};
pub use fleet::{FleetConfig, FleetService, SimulatedFleet};
pub use gateway::{GatewayConfig, GatewayState, SharedGateway};
pub use monitor::{EventMonitor, LogEvent, LogMonitor, LogSeverity};
pub use output::{BufferSink, ChannelSink, CmdStatus, OutputFormatter, OutputSink, StdoutSink};
pub use registry::{CommandInfo, CommandRegistry, CompletionTag, registry};
pub use session::Session;
pub use state::{AggregatedState, SystemState};
pub use tokenizer::{quote_if_necessary, tokenize};
