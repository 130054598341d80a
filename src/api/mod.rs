//! Everything that talks to the BudgetZen REST service.
//!
//! The layering, from the bottom:
//! - `Backend` performs one raw HTTP exchange. `HttpBackend` uses reqwest, `TestBackend` is an
//!   in-memory implementation of the service used by tests and by the test mode of the CLI.
//! - `Transport` attaches the credential and content type, then normalizes the response into a
//!   JSON payload or an `ApiError`.
//! - `wire` maps server records to domain entities and back.
//! - `Client` offers the typed endpoints on top of the transport and the mappers.

mod client;
mod http;
mod test_backend;
mod transport;
pub mod wire;

use crate::error::ApiError;
use crate::{Config, Result};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::sync::{Arc, RwLock};

pub use client::{AuthGrant, Client};
pub use http::HttpBackend;
pub use test_backend::{Fault, TestBackend, TestState, DEMO_EMAIL, DEMO_PASSWORD};
pub use transport::{decode_body, decode_response, Transport};
pub use wire::Resource;

/// When this environment variable is set and non-empty, the CLI runs against `TestBackend`
/// instead of a real server.
pub const TEST_MODE_ENV: &str = "BUDGETZEN_IN_TEST_MODE";

/// A request, fully prepared by the `Transport`, ready to be exchanged by a `Backend`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API root, e.g. `/expenses/3`.
    pub path: String,
    pub headers: HeaderMap,
    /// Serialized JSON body, if any.
    pub body: Option<String>,
}

/// The status and the unparsed text of a response.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub text: String,
}

impl RawResponse {
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            text: text.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP exchange. An `Err` means the exchange could not be completed at all; any
/// answer from the server, whatever its status, is an `Ok`.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn exchange(&self, request: ApiRequest) -> std::result::Result<RawResponse, ApiError>;
}

/// The bearer credential of the current session.
///
/// The session gate is the only writer. The transport reads it on every request, so a new token
/// (or its removal) is seen by the very next call.
#[derive(Debug, Clone, Default)]
pub struct TokenCell(Arc<RwLock<Option<String>>>);

impl TokenCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn set(&self, token: Option<String>) {
        match self.0.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

/// Selects which `Backend` the application talks to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum Mode {
    /// A real server over HTTP.
    #[default]
    Http,
    /// The in-memory `TestBackend`, with its state kept in the home directory.
    Test,
}

impl Mode {
    /// Returns `Mode::Test` when `BUDGETZEN_IN_TEST_MODE` is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the `Backend` for `mode`.
pub async fn backend(config: &Config, mode: Mode) -> Result<Arc<dyn Backend>> {
    match mode {
        Mode::Http => Ok(Arc::new(HttpBackend::new(config.api_url())?)),
        Mode::Test => Ok(Arc::new(
            TestBackend::persistent(config.test_state_path()).await?,
        )),
    }
}
