//! Session state shared between the command bridge and the presentation layer

use std::collections::VecDeque;

/// Maximum activity log entries to keep
const MAX_LOG_ENTRIES: usize = 50;

/// Generated code waiting for the user to confirm it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCode {
    pub code: String,
    pub awaiting_confirmation: bool,
}

/// Per-session state
///
/// Holds at most one staged code block. Starting a new command discards
/// any unconfirmed one.
#[derive(Debug, Default)]
pub struct Session {
    /// Last transcript heard (interim or final)
    transcript: String,
    /// Last message shown to the user
    response: String,
    staged: Option<StagedCode>,
    /// Sequence number of the current command
    command_seq: u64,
    activity_log: VecDeque<LogEntry>,
}

/// An entry in the activity log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub seq: u64,
    pub message: String,
    pub category: LogCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Transcript,
    Response,
    Error,
}

impl Session {
    pub fn new() -> Self {
        Self {
            activity_log: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            ..Self::default()
        }
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn staged(&self) -> Option<&StagedCode> {
        self.staged.as_ref()
    }

    pub fn command_seq(&self) -> u64 {
        self.command_seq
    }

    pub fn activity_log(&self) -> impl Iterator<Item = &LogEntry> {
        self.activity_log.iter()
    }

    /// Record the latest speech text
    pub fn hear(&mut self, text: &str) {
        self.transcript = text.to_string();
    }

    /// Start a new command, discarding any unconfirmed staged code
    ///
    /// Returns the new command's sequence number.
    pub fn begin_command(&mut self, transcript: &str) -> u64 {
        self.command_seq += 1;
        self.staged = None;
        self.response.clear();
        self.log(transcript.to_string(), LogCategory::Transcript);
        self.command_seq
    }

    /// Whether `seq` still identifies the current command
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.command_seq
    }

    /// Show a message to the user
    pub fn respond(&mut self, message: impl Into<String>) {
        self.response = message.into();
        self.log(self.response.clone(), LogCategory::Response);
    }

    /// Show an error to the user
    pub fn fail(&mut self, message: impl Into<String>) {
        self.response = message.into();
        self.log(self.response.clone(), LogCategory::Error);
    }

    /// Stage generated code for command `seq`
    ///
    /// Returns false, leaving the session untouched, when a newer command
    /// has started since `seq`.
    pub fn stage_code(&mut self, seq: u64, code: String) -> bool {
        if !self.is_current(seq) {
            return false;
        }
        self.staged = Some(StagedCode {
            code,
            awaiting_confirmation: true,
        });
        true
    }

    /// Code awaiting confirmation, if any
    pub fn pending_code(&self) -> Option<&str> {
        self.staged
            .as_ref()
            .filter(|s| s.awaiting_confirmation)
            .map(|s| s.code.as_str())
    }

    /// Drop the staged code after it was executed
    pub fn clear_staged(&mut self) -> Option<StagedCode> {
        self.staged.take()
    }

    fn log(&mut self, message: String, category: LogCategory) {
        if self.activity_log.len() >= MAX_LOG_ENTRIES {
            self.activity_log.pop_front();
        }
        self.activity_log.push_back(LogEntry {
            seq: self.command_seq,
            message,
            category,
        });
    }
}
