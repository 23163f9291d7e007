//! Error types for the Odoo XML-RPC client.
//!
//! # Design
//! Callers need to tell "wrong credentials" apart from "server unreachable",
//! so every failure mode of an RPC round-trip gets its own variant. Session
//! bootstrap failures live in the same enum because the login flow surfaces
//! them through the same `Result`.

use thiserror::Error;

/// Errors returned by `OdooClient` and the session bootstrap.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The request never produced an HTTP response (DNS, TLS, connection reset).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP error: {status}")]
    HttpStatus { status: u16, body: String },

    /// The server answered with an XML-RPC `<fault>`.
    #[error("Odoo fault {code}: {message}")]
    RemoteFault { code: String, message: String },

    /// The body was not XML, or not shaped like a `methodResponse`.
    #[error("malformed XML-RPC response: {0}")]
    MalformedResponse(String),

    /// `authenticate` returned a falsy uid.
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("unknown access code: {0}")]
    UnknownAccessCode(String),

    #[error("client {0} is disabled")]
    InactiveClient(String),

    #[error("user {0} could not be read back from the server")]
    UserNotFound(i64),

    #[error("user has no companies assigned")]
    NoCompanies,

    #[error("no company matching '{0}' on the server")]
    CompanyNotFound(String),
}

impl RpcError {
    /// True for failures where the server could not be reached or answered
    /// with an HTTP error, as opposed to a well-formed rejection.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::HttpStatus { .. })
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RpcError::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_message_carries_code_and_string() {
        let err = RpcError::RemoteFault {
            code: "2".to_string(),
            message: "Bad login".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains('2'));
        assert!(msg.contains("Bad login"));
    }

    #[test]
    fn http_status_is_transport() {
        let err = RpcError::HttpStatus {
            status: 502,
            body: String::new(),
        };
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "HTTP error: 502");
        assert!(!RpcError::AuthenticationFailed.is_transport());
        assert!(RpcError::AuthenticationFailed.is_auth_failure());
    }
}
