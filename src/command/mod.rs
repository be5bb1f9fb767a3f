//! Command pipeline
//!
//! Turns speech transcripts into agent requests:
//! transcript -> Interpreter -> Grammar -> Intent -> Dispatch -> CommandBridge -> ActionSink

pub mod executor;
pub mod grammar;
pub mod interpreter;
pub mod request;

pub use executor::{ActionSink, CommandBridge, SpeechResult, Step};
pub use grammar::{Grammar, Intent};
pub use interpreter::{Dispatch, Interpretation, Interpreter};
pub use request::{ActionRequest, AgentReply, CodePayload};
