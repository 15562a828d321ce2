//! The fixed vocabulary of OAuth error codes, and the two response shapes they're rendered
//! into: a bearer/JSON error body and an authorization-redirect error.
use std::borrow::Cow;

use serde::Serialize;
use thiserror::Error;

/// The complete set of OAuth error codes this server ever emits.
///
/// Every code carries a fixed HTTP status, computed by [`OAuthErrorCode::http_status`], and a
/// fixed wire identifier, computed by [`OAuthErrorCode::as_str`].
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OAuthErrorCode {
    #[error("invalid_request")]
    InvalidRequest,
    #[error("invalid_client")]
    InvalidClient,
    #[error("invalid_grant")]
    InvalidGrant,
    #[error("invalid_scope")]
    InvalidScope,
    #[error("unauthorized_client")]
    UnauthorizedClient,
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    #[error("unsupported_response_type")]
    UnsupportedResponseType,
    #[error("access_denied")]
    AccessDenied,
    #[error("server_error")]
    ServerError,
    #[error("temporarily_unavailable")]
    TemporarilyUnavailable,
    #[error("slow_down")]
    SlowDown,
    #[error("authorization_pending")]
    AuthorizationPending,
    #[error("expired_token")]
    ExpiredToken,
}

impl OAuthErrorCode {
    /// The wire identifier used in both JSON bodies and redirect query parameters.
    pub fn as_str(self) -> &'static str {
        use OAuthErrorCode::*;
        match self {
            InvalidRequest => "invalid_request",
            InvalidClient => "invalid_client",
            InvalidGrant => "invalid_grant",
            InvalidScope => "invalid_scope",
            UnauthorizedClient => "unauthorized_client",
            UnsupportedGrantType => "unsupported_grant_type",
            UnsupportedResponseType => "unsupported_response_type",
            AccessDenied => "access_denied",
            ServerError => "server_error",
            TemporarilyUnavailable => "temporarily_unavailable",
            SlowDown => "slow_down",
            AuthorizationPending => "authorization_pending",
            ExpiredToken => "expired_token",
        }
    }

    /// The HTTP status this code is always rendered with.
    pub fn http_status(self) -> u16 {
        use OAuthErrorCode::*;
        match self {
            InvalidClient => 401,
            InvalidGrant | UnauthorizedClient | AccessDenied => 403,
            TemporarilyUnavailable => 502,
            ServerError => 500,
            InvalidRequest
            | InvalidScope
            | UnsupportedGrantType
            | UnsupportedResponseType
            | SlowDown
            | AuthorizationPending
            | ExpiredToken => 400,
        }
    }
}

/// A bearer/JSON error, the shape emitted by the token, introspection, and PAR endpoints.
#[derive(Clone, Debug)]
pub struct ErrorResponse {
    pub code: OAuthErrorCode,
    pub description: Option<Cow<'static, str>>,
    pub uri: Option<Cow<'static, str>>,
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {}", self.code, description),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for ErrorResponse {}

impl ErrorResponse {
    /// Construct a bare error with no explanatory text.
    pub fn new(code: OAuthErrorCode) -> Self {
        ErrorResponse { code, description: None, uri: None }
    }

    /// Attach a short human-readable explanation.
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The JSON body `{error, error_description?, error_uri?}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(ErrorBody {
            error: self.code.as_str(),
            error_description: self.description.as_deref(),
            error_uri: self.uri.as_deref(),
        })
        .expect("error body is always representable as JSON")
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_uri: Option<&'a str>,
}

/// An authorization-redirect error, emitted from `./authorize` once the client and
/// `redirect_uri` have already been validated.
///
/// Never constructed for failures that precede redirect validation — those are shown to the
/// user agent directly instead, to prevent open-redirect misuse.
#[derive(Clone, Debug)]
pub struct ErrorRedirect {
    pub redirect_uri: String,
    pub code: OAuthErrorCode,
    pub description: Option<Cow<'static, str>>,
    pub uri: Option<Cow<'static, str>>,
    pub state: Option<String>,
    pub issuer: String,
}

impl ErrorRedirect {
    /// Render the `Location` header value: `redirect_uri` with `error`, `error_description?`,
    /// `error_uri?`, `iss`, and `state` (exactly as received) appended as query parameters.
    pub fn location(&self) -> String {
        let mut url = url::Url::parse(&self.redirect_uri)
            .unwrap_or_else(|_| url::Url::parse("about:blank").expect("valid fallback URL"));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("error", self.code.as_str());
            if let Some(description) = &self.description {
                query.append_pair("error_description", description);
            }
            if let Some(uri) = &self.uri {
                query.append_pair("error_uri", uri);
            }
            query.append_pair("iss", &self.issuer);
            if let Some(state) = &self.state {
                query.append_pair("state", state);
            }
        }
        url.into()
    }
}

/// A parameter path that failed schema validation, used to refine a generic validation failure
/// into the most precise OAuth error code.
pub enum ValidationIssue<'a> {
    /// The named parameter was entirely absent. Always refines to `invalid_request`, regardless
    /// of which field is missing.
    Missing(&'a str),
    /// The named parameter was present but malformed or disallowed.
    Invalid(&'a str),
}

/// Map a validation issue to the OAuth error code the spec calls for: `invalid_client` for
/// `client_id`/`client_secret`, `invalid_scope` for `scope`, `invalid_request` otherwise.
/// Missing-parameter issues are always `invalid_request`.
pub fn refine_validation_error(issue: ValidationIssue<'_>) -> OAuthErrorCode {
    match issue {
        ValidationIssue::Missing(_) => OAuthErrorCode::InvalidRequest,
        ValidationIssue::Invalid("client_id") | ValidationIssue::Invalid("client_secret") => {
            OAuthErrorCode::InvalidClient
        }
        ValidationIssue::Invalid("scope") => OAuthErrorCode::InvalidScope,
        ValidationIssue::Invalid(_) => OAuthErrorCode::InvalidRequest,
    }
}
