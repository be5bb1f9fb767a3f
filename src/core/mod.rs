pub mod config;
pub mod error;

pub use config::{AgentConfig, BridgeConfig, InterpreterConfig, SynthesisConfig};
pub use error::{BridgeError, Result};
