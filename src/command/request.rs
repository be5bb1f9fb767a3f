//! Wire-level messages exchanged with the execution agent
//!
//! `ActionRequest` is serialized as `{"action": "<name>", ...payload}`.
//! Each variant carries only the payload its action reads, so a request
//! can never hold two payload shapes at once.

use serde::{Deserialize, Serialize};

/// A structured action for the execution agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ActionRequest {
    /// Run the flight entry script with an ordered argument list
    RunMain { args: Vec<String> },
    /// Run an arbitrary script path
    ExecuteScript { script: String },
    /// Write code to a temp file and run it
    ExecuteCode { code: String },
    /// Run the reset script against a drone config or a single drone URI
    Reset {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
    },
}

impl ActionRequest {
    pub fn reset_all(config: impl Into<String>) -> Self {
        Self::Reset {
            config: Some(config.into()),
            uri: None,
        }
    }

    pub fn reset_one(uri: impl Into<String>) -> Self {
        Self::Reset {
            config: None,
            uri: Some(uri.into()),
        }
    }

    /// Wire name of the action
    pub fn action_name(&self) -> &'static str {
        match self {
            Self::RunMain { .. } => "runMain",
            Self::ExecuteScript { .. } => "executeScript",
            Self::ExecuteCode { .. } => "executeCode",
            Self::Reset { .. } => "reset",
        }
    }

    /// Agent endpoint this request is posted to
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::ExecuteCode { .. } => "executeCode",
            _ => "droneCommand",
        }
    }

    /// Arguments of a `runMain` request, empty for other actions
    pub fn args(&self) -> &[String] {
        match self {
            Self::RunMain { args } => args,
            _ => &[],
        }
    }
}

/// Body accepted by the dedicated `/executeCode` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePayload {
    pub code: String,
}

/// Coarse agent reply: `{"status": "ok"}` or `{"status": "error", "message": ...}`
///
/// Exit codes and process output are never reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AgentReply {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_main_wire_shape() {
        let request = ActionRequest::RunMain {
            args: vec!["--demo".into(), "circle".into()],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"action": "runMain", "args": ["--demo", "circle"]}));
    }

    #[test]
    fn test_reset_omits_unused_target() {
        let value = serde_json::to_value(ActionRequest::reset_all("drones.json")).unwrap();
        assert_eq!(value, json!({"action": "reset", "config": "drones.json"}));

        let value = serde_json::to_value(ActionRequest::reset_one("radio://E2")).unwrap();
        assert_eq!(value, json!({"action": "reset", "uri": "radio://E2"}));
    }

    #[test]
    fn test_parse_incoming_requests() {
        let request: ActionRequest =
            serde_json::from_str(r#"{"action": "executeScript", "script": "demo.py"}"#).unwrap();
        assert_eq!(
            request,
            ActionRequest::ExecuteScript {
                script: "demo.py".into()
            }
        );

        let request: ActionRequest = serde_json::from_str(r#"{"action": "reset"}"#).unwrap();
        assert_eq!(
            request,
            ActionRequest::Reset {
                config: None,
                uri: None
            }
        );
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = serde_json::from_str::<ActionRequest>(r#"{"action": "selfDestruct"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoints() {
        let code = ActionRequest::ExecuteCode {
            code: "print(1)".into(),
        };
        assert_eq!(code.endpoint(), "executeCode");
        assert_eq!(code.action_name(), "executeCode");
        assert_eq!(ActionRequest::reset_all("x").endpoint(), "droneCommand");
    }

    #[test]
    fn test_agent_reply_shapes() {
        assert_eq!(
            serde_json::to_value(AgentReply::ok()).unwrap(),
            json!({"status": "ok"})
        );
        let reply: AgentReply =
            serde_json::from_str(r#"{"status": "error", "message": "boom"}"#).unwrap();
        assert!(!reply.is_ok());
        assert_eq!(reply.message.as_deref(), Some("boom"));
    }
}
