//! Command bridge - drives a session from speech results to agent requests

use crate::command::interpreter::{Dispatch, Interpreter};
use crate::command::request::ActionRequest;
use crate::core::error::{BridgeError, Result};
use crate::llm::client::{CodeSynthesizer, SynthesisRequest};
use crate::ui::state::Session;
use std::future::Future;

pub const CODE_READY_MESSAGE: &str = "Code ready. Run?";
pub const CODE_EXECUTED_MESSAGE: &str = "Code executed.";
pub const NOTHING_STAGED_MESSAGE: &str = "No code staged.";

/// Destination for action requests (the execution agent)
pub trait ActionSink {
    fn send(&self, request: &ActionRequest) -> impl Future<Output = Result<()>> + Send;
}

/// One speech recognition result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechResult {
    pub text: String,
    pub is_final: bool,
}

impl SpeechResult {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_result(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

/// What happened to a speech result
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Interim result, or final result without the wake phrase
    Ignored,
    /// Action sent to the agent
    Dispatched(ActionRequest),
    /// Code must be synthesized; report back with `finish_synthesis(seq, ..)`
    Synthesize { seq: u64, request: SynthesisRequest },
}

/// Connects interpreter, session and execution agent
pub struct CommandBridge<A> {
    interpreter: Interpreter,
    sink: A,
    session: Session,
}

impl<A: ActionSink> CommandBridge<A> {
    pub fn new(interpreter: Interpreter, sink: A) -> Self {
        Self {
            interpreter,
            sink,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    /// Handle one speech result
    ///
    /// Errors are also written to the session as the user-facing response.
    pub async fn on_speech(&mut self, speech: SpeechResult) -> Result<Step> {
        self.session.hear(&speech.text);
        if !speech.is_final {
            return Ok(Step::Ignored);
        }
        if self.interpreter.command_body(&speech.text).is_none() {
            return Ok(Step::Ignored);
        }

        let seq = self.session.begin_command(&speech.text);
        let interpretation = match self.interpreter.interpret(&speech.text) {
            Ok(Some(interpretation)) => interpretation,
            Ok(None) => return Ok(Step::Ignored),
            Err(e) => return Err(self.report(e)),
        };

        match interpretation.dispatch {
            Dispatch::Action(request) => {
                if let Err(e) = self.sink.send(&request).await {
                    return Err(self.report(e));
                }
                tracing::info!(action = request.action_name(), "dispatched {}", interpretation.message);
                self.session.respond(interpretation.message);
                Ok(Step::Dispatched(request))
            }
            Dispatch::Synthesis(request) => {
                self.session.respond(interpretation.message);
                Ok(Step::Synthesize { seq, request })
            }
        }
    }

    /// Deliver a synthesis outcome for command `seq`
    ///
    /// Returns true when code was staged. Results for superseded commands
    /// are dropped.
    pub fn finish_synthesis(&mut self, seq: u64, outcome: Result<String>) -> bool {
        if !self.session.is_current(seq) {
            tracing::debug!(seq, "dropping synthesis result for superseded command");
            return false;
        }
        match outcome {
            Ok(code) => {
                self.session.stage_code(seq, code);
                self.session.respond(CODE_READY_MESSAGE);
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Execute the staged code after user confirmation
    ///
    /// Returns false when nothing was staged. On agent failure the code
    /// stays staged so the user can retry.
    pub async fn run_staged(&mut self) -> Result<bool> {
        let Some(code) = self.session.pending_code().map(str::to_string) else {
            self.session.respond(NOTHING_STAGED_MESSAGE);
            return Ok(false);
        };

        if let Err(e) = self.sink.send(&ActionRequest::ExecuteCode { code }).await {
            return Err(self.report(e));
        }
        self.session.clear_staged();
        self.session.respond(CODE_EXECUTED_MESSAGE);
        Ok(true)
    }

    /// Handle a speech result end to end, awaiting synthesis inline
    pub async fn process<S: CodeSynthesizer>(
        &mut self,
        speech: SpeechResult,
        synthesizer: &S,
    ) -> Result<Step> {
        let step = self.on_speech(speech).await?;
        if let Step::Synthesize { seq, request } = &step {
            let outcome = synthesizer.synthesize_code(request).await;
            self.finish_synthesis(*seq, outcome);
        }
        Ok(step)
    }

    fn report(&mut self, error: BridgeError) -> BridgeError {
        tracing::warn!("command failed: {}", error);
        self.session.fail(format!("Command failed: {}", error));
        error
    }
}
