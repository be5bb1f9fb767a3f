use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Synthesis unavailable ({status}): {message}")]
    SynthesisUnavailable { status: u16, message: String },

    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Agent unavailable ({status}): {message}")]
    AgentUnavailable { status: u16, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Grammar error: {0}")]
    Grammar(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl BridgeError {
    /// HTTP-style status reported by the execution agent for this error
    pub fn status_code(&self) -> u16 {
        match self {
            BridgeError::MalformedCommand(_) | BridgeError::InvalidRequest(_) => 400,
            BridgeError::SynthesisUnavailable { status, .. }
            | BridgeError::AgentUnavailable { status, .. } => *status,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(BridgeError::InvalidRequest("x".into()).status_code(), 400);
        assert_eq!(BridgeError::SpawnFailed("x".into()).status_code(), 500);
        let err = BridgeError::SynthesisUnavailable {
            status: 429,
            message: "slow down".into(),
        };
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.to_string(), "Synthesis unavailable (429): slow down");
    }
}
