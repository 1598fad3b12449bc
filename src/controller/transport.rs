//! Transport seam between the engine and the controller.
//!
//! Everything above this trait is agnostic to how calls reach the
//! controller; the REST client and the test fakes both implement it.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// HTTP method of a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Read.
    Get,
    /// Create or trigger.
    Post,
    /// Update.
    Put,
    /// Remove.
    Delete,
}

/// A call to the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path, prefix included.
    pub path: String,
    /// JSON body.
    pub body: Option<Value>,
}

/// The controller's answer to a call.
///
/// Non-success status codes are answers too; only failures to get an
/// answer at all are errors.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerResponse {
    /// HTTP method of the call.
    pub method: HttpMethod,
    /// Request path of the call.
    pub path: String,
    /// HTTP status code.
    pub return_code: u16,
    /// Status text or controller message.
    pub message: String,
    /// Decoded body.
    pub data: Value,
}

/// Sends calls to a fabric controller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControllerTransport: Send + Sync {
    /// Sends one call and returns the controller's answer.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer could be obtained (network failure,
    /// authentication failure).
    async fn send(&self, request: ControllerRequest) -> Result<ControllerResponse>;
}

impl HttpMethod {
    /// Returns true for methods that change controller state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }

    /// Returns the method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ControllerRequest {
    /// Creates a `GET` call.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Creates a call with a JSON body.
    #[must_use]
    pub fn with_body(method: HttpMethod, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            body: Some(body),
        }
    }

    /// Creates a `DELETE` call without a body.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            body: None,
        }
    }
}

impl ControllerResponse {
    /// Returns true for 2xx answers.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.return_code >= 200 && self.return_code < 300
    }

    /// Returns the best human-readable reason the controller gave.
    #[must_use]
    pub fn reason(&self) -> String {
        ["message", "error", "MESSAGE"]
            .iter()
            .find_map(|key| self.data.get(*key).and_then(Value::as_str))
            .map_or_else(|| self.message.clone(), String::from)
    }
}
