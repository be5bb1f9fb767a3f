//! Hero Bridge - voice commands to drone flight scripts

pub mod agent;
pub mod command;
pub mod core;
pub mod llm;
pub mod ui;
