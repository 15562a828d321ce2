//! HTTP-shape-agnostic endpoint handlers.
//!
//! Each handler takes an already-parsed [`ParsedBody`] (or, for `./authorize`, its query-string
//! equivalent) plus whatever headers it needs, and returns a small outcome type describing the
//! status, body, and headers a caller should render. No handler here knows about any particular
//! web framework; translating the outcome into an actual HTTP response is left to the binary
//! embedding this crate.
mod authorization;
mod device_authorization;
mod introspection;
mod pushed_authorization_request;
mod resource;
mod revocation;
mod server_metadata;
mod token;

pub use authorization::{authorize, AuthorizeOutcome};
pub use device_authorization::{device_authorization, DeviceAuthorizationResponse};
pub use introspection::introspect;
pub use pushed_authorization_request::{pushed_authorization_request, PushedAuthorizationResponse};
pub use resource::check_authorization;
pub use revocation::revoke;
pub use server_metadata::server_metadata;
pub use token::{token, TokenResponse};

use serde_json::Value;

use crate::error::ErrorResponse;

/// A JSON response body with an explicit status, as every endpoint but `./authorize` and
/// `./token/revoke` produces on success.
#[derive(Clone, Debug)]
pub struct JsonResponse {
    pub status: u16,
    pub body: Value,
    /// Set for endpoints that must forbid caching of their response (PAR, per RFC 9126 §2.3).
    pub cache_control: Option<&'static str>,
}

impl JsonResponse {
    pub fn new(status: u16, body: Value) -> Self {
        JsonResponse { status, body, cache_control: None }
    }

    pub fn with_cache_control(mut self, value: &'static str) -> Self {
        self.cache_control = Some(value);
        self
    }
}

impl From<&ErrorResponse> for JsonResponse {
    fn from(error: &ErrorResponse) -> Self {
        JsonResponse::new(error.code.http_status(), error.to_json())
    }
}
