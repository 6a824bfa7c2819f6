//! Effekt Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Skript-Parser, Sequencer, Verbindungs- und Status-Logik als Pure Functions
//! und State Machines, Hardware nur über Traits.

#![no_std]

pub mod buffer;
pub mod config;
pub mod connectivity;
pub mod device;
pub mod logic;
pub mod manager;
pub mod parser;
pub mod script;
pub mod sequencer;
pub mod status;
pub mod storage;
pub mod traits;
pub mod types;

// Re-exports für einfachen Zugriff
pub use buffer::{PixelBuffer, RangeError};
pub use config::{ConfigError, DeviceConfig, RawConfig, StripPin};
pub use connectivity::{
    ConnectionAction, ConnectionState, ConnectivityController, KeepAlive, LinkFault,
    TriggerFilter, subscription_filter,
};
pub use device::{DISPATCH_BATCH, DeviceContext, DispatchError, DispatchOutcome};
pub use logic::{blend, parse_color, scale_color};
pub use manager::{BootScript, EventScript, LoadOutcome, RestoreOutcome, ScriptManager};
pub use parser::parse;
pub use script::{Command, CoverageMismatch, Script, ScriptSyntaxError, Segment, SyntaxErrorKind};
pub use sequencer::{LoopPolicy, Sequencer, SequencerState};
pub use status::{AlertMode, AlertStep, StatusCode, StatusFrame, StatusIndicator};
pub use storage::StoreError;
pub use traits::{LedError, ScriptStore, SmartLedWriter};
pub use types::{ControlTopic, InboundMessage};
