//! Interpreter-side client for the execution agent

use crate::command::executor::ActionSink;
use crate::command::request::{ActionRequest, AgentReply};
use crate::core::error::{BridgeError, Result};
use reqwest::Client;

/// Status reported when the agent could not be reached at all
const UNREACHABLE_STATUS: u16 = 503;

/// Posts action requests to a running execution agent
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one action request; `Ok` only for an `ok` reply
    pub async fn send(&self, request: &ActionRequest) -> Result<()> {
        let url = format!("{}/{}", self.base_url, request.endpoint());
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::AgentUnavailable {
                status: e.status().map(|s| s.as_u16()).unwrap_or(UNREACHABLE_STATUS),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let reply = serde_json::from_str::<AgentReply>(&body).ok();

        match reply {
            Some(reply) if status.is_success() && reply.is_ok() => Ok(()),
            reply => {
                let message = reply
                    .and_then(|r| r.message)
                    .unwrap_or_else(|| if body.is_empty() { status.to_string() } else { body });
                Err(BridgeError::AgentUnavailable {
                    status: if status.is_success() { 500 } else { status.as_u16() },
                    message,
                })
            }
        }
    }
}

impl ActionSink for AgentClient {
    async fn send(&self, request: &ActionRequest) -> Result<()> {
        AgentClient::send(self, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = AgentClient::new("http://127.0.0.1:3031/");
        assert_eq!(client.base_url(), "http://127.0.0.1:3031");
    }

    #[tokio::test]
    async fn test_unreachable_agent() {
        // Port 9 (discard) is not expected to run an HTTP server locally
        let client = AgentClient::new("http://127.0.0.1:9");
        let result = client
            .send(&ActionRequest::reset_all("drones.json"))
            .await;
        assert!(matches!(
            result,
            Err(BridgeError::AgentUnavailable { status: 503, .. })
        ));
    }
}
