//! Transcript interpretation - wake phrase gate and dispatch building
//!
//! transcript -> wake gate -> command body -> Grammar -> Intent -> Dispatch

use crate::command::grammar::{Grammar, Intent};
use crate::command::request::ActionRequest;
use crate::core::config::{BridgeConfig, InterpreterConfig};
use crate::core::error::Result;
use crate::llm::client::SynthesisRequest;

/// What to do with a recognized command
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Send directly to the execution agent
    Action(ActionRequest),
    /// Ask the completion provider for code first
    Synthesis(SynthesisRequest),
}

/// Result of interpreting one transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub intent: Intent,
    pub dispatch: Dispatch,
    /// Confirmation shown to the user
    pub message: String,
}

/// Provisional message while code is being synthesized
pub const GENERATING_MESSAGE: &str = "Generating code…";

/// Turns transcripts into dispatches
pub struct Interpreter {
    grammar: Grammar,
    config: InterpreterConfig,
    max_tokens: u32,
    temperature: f32,
}

impl Interpreter {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        Ok(Self {
            grammar: Grammar::new()?,
            config: config.interpreter.clone(),
            max_tokens: config.synthesis.max_tokens,
            temperature: config.synthesis.temperature,
        })
    }

    pub fn wake_phrase(&self) -> &str {
        &self.config.wake_phrase
    }

    /// Strip the wake phrase, returning the trimmed command body
    ///
    /// Returns `None` when the transcript does not start with the wake
    /// phrase (compared case-insensitively).
    pub fn command_body<'t>(&self, transcript: &'t str) -> Option<&'t str> {
        let rest = strip_prefix_ignore_case(transcript.trim(), &self.config.wake_phrase)?;
        Some(rest.trim())
    }

    /// Interpret a final transcript
    ///
    /// `Ok(None)` means the transcript was not addressed to us.
    pub fn interpret(&self, transcript: &str) -> Result<Option<Interpretation>> {
        let Some(body) = self.command_body(transcript) else {
            tracing::debug!("ignoring transcript without wake phrase");
            return Ok(None);
        };

        let intent = self.grammar.parse(body)?;
        tracing::debug!(rule = intent.rule_name(), "matched command");
        let (dispatch, message) = self.dispatch_for(&intent);

        Ok(Some(Interpretation {
            intent,
            dispatch,
            message,
        }))
    }

    /// Build the dispatch and confirmation message for an intent
    pub fn dispatch_for(&self, intent: &Intent) -> (Dispatch, String) {
        match intent {
            Intent::Hover {
                drones,
                duration,
                height,
            } => {
                let mut args = self.demo_args("hover");
                if let Some(duration) = duration {
                    args.push("--hover_duration".into());
                    args.push(duration.clone());
                }
                if let Some(height) = height {
                    args.push("--takeoff_height".into());
                    args.push(height.clone());
                }
                (run_main(args), format!("Hover: {}", drones))
            }
            Intent::Circle => (run_main(self.demo_args("circle")), "Circle demo".into()),
            Intent::VFormation { leader } => (
                run_main(self.led_demo_args("v", leader)),
                format!("V formation around drone {}", leader),
            ),
            Intent::Surround { target } => (
                run_main(self.led_demo_args("surround", target)),
                format!("Surround drone {}", target),
            ),
            Intent::ResetAll => (
                Dispatch::Action(ActionRequest::reset_all(self.config.drone_config.clone())),
                "Reset executed".into(),
            ),
            Intent::ResetOne { drone } => {
                let uri = format!("{}{}", self.config.uri_prefix, self.tag(drone));
                (
                    Dispatch::Action(ActionRequest::reset_one(uri)),
                    "Reset executed".into(),
                )
            }
            Intent::Unrecognized { body } => (
                Dispatch::Synthesis(SynthesisRequest {
                    prompt: format!("Implement: \"{}\" in {}", body, self.config.namespace),
                    max_tokens: Some(self.max_tokens),
                    temperature: Some(self.temperature),
                }),
                GENERATING_MESSAGE.into(),
            ),
        }
    }

    /// Drone number with the configured letter tag ("7" -> "E7")
    pub fn tag(&self, id: &str) -> String {
        format!("{}{}", self.config.leader_prefix, id)
    }

    fn demo_args(&self, demo: &str) -> Vec<String> {
        vec![
            "--config".into(),
            self.config.drone_config.clone(),
            "--demo".into(),
            demo.into(),
        ]
    }

    fn led_demo_args(&self, demo: &str, leader: &str) -> Vec<String> {
        let mut args = self.demo_args(demo);
        args.push("--leader".into());
        args.push(self.tag(leader));
        args
    }
}

fn run_main(args: Vec<String>) -> Dispatch {
    Dispatch::Action(ActionRequest::RunMain { args })
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let offset = chars.next().map(|(i, _)| i).unwrap_or(text.len());
    Some(&text[offset..])
}
