//! Blocking `Transport` backed by ureq.

use std::time::Duration;

use tracing::debug;

use crate::error::RpcError;
use crate::http::{decode_body, HttpRequest, HttpResponse, Transport};

/// Settings for `UreqTransport`.
#[derive(Debug, Clone, Default)]
pub struct TransportConfig {
    /// Overall request timeout. `None` leaves ureq's defaults in place.
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    /// Largest response body accepted. `None` reads bodies of any size.
    pub max_body_bytes: Option<u64>,
}

/// Executes requests with a shared ureq agent.
///
/// Status-code-as-error is disabled so 4xx/5xx responses come back as data
/// and the client decides what they mean.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: Option<String>,
    max_body_bytes: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_config(&TransportConfig::default())
    }

    pub fn with_config(config: &TransportConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes.unwrap_or(u64::MAX),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, RpcError> {
        debug!(url = %request.url, bytes = request.body.len(), "POST");
        let mut call = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            call = call.header(name.as_str(), value.as_str());
        }
        if let Some(agent) = &self.user_agent {
            call = call.header("user-agent", agent.as_str());
        }
        let mut response = call
            .send(request.body.as_bytes())
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(limit) => RpcError::MalformedResponse(format!(
                    "response body exceeds {limit} bytes"
                )),
                other => RpcError::Transport(other.to_string()),
            })?;
        let body = decode_body(bytes, content_type.as_deref())?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
