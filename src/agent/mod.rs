//! Execution agent - spawns flight scripts and generated code
//!
//! Runs as its own process (`companion` binary) on a local port. The
//! interpreter side talks to it through [`AgentClient`].

pub mod client;
pub mod runner;
pub mod server;

pub use client::AgentClient;
pub use runner::{DetachedRun, ScriptRunner};
pub use server::{build_router, AgentServer};
