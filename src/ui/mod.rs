//! Session state read by the presentation layer

pub mod state;

pub use state::{LogCategory, LogEntry, Session, StagedCode};
