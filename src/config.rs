//! Typed server configuration. Every grant family is enabled by supplying its options struct;
//! a grant with no entry in `ServerConfig` is simply not registered by the orchestrator.
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Top-level server configuration, applied once at construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Absolute HTTPS URL identifying this server; also the `iss` claim on tokens and redirect
    /// errors.
    pub issuer: String,

    /// Root for derived endpoint paths. Defaults to `<issuer>/oauth/`.
    #[serde(default)]
    pub base_uri: Option<String>,

    /// Access-token lifetime in seconds. Default 3600.
    #[serde(default = "defaults::access_token_ttl")]
    pub access_token_ttl: i64,

    /// Refresh-token lifetime in seconds. Default 604800 (7 days).
    #[serde(default = "defaults::refresh_token_ttl")]
    pub refresh_token_ttl: i64,

    /// ID-token lifetime in seconds. Defaults to `access_token_ttl` when unset.
    #[serde(default)]
    pub id_token_ttl: Option<i64>,

    #[serde(default)]
    pub authorization_code: Option<AuthorizationCodeConfig>,
    #[serde(default)]
    pub refresh_token: Option<RefreshTokenConfig>,
    #[serde(default)]
    pub client_credentials: Option<ClientCredentialsConfig>,
    #[serde(default)]
    pub device_code: Option<DeviceCodeConfig>,
    #[serde(default)]
    pub pushed_authorization_requests: Option<PushedAuthorizationRequestConfig>,

    /// Whether `./token/revoke` is registered.
    #[serde(default)]
    pub token_revocation: bool,
    /// Whether `./tokeninfo` is registered.
    #[serde(default)]
    pub token_introspection: bool,
    /// Whether `./.well-known/oauth-authorization-server` is registered.
    #[serde(default)]
    pub server_metadata: bool,

    #[serde(default)]
    pub token: TokenEndpointConfig,
}

impl ServerConfig {
    /// Root for derived endpoint paths: `base_uri` if set, otherwise `<issuer>/oauth/`.
    pub fn resolved_base_uri(&self) -> String {
        self.base_uri.clone().unwrap_or_else(|| format!("{}/oauth/", self.issuer.trim_end_matches('/')))
    }

    pub fn token_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "token")
    }

    pub fn authorize_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "authorize")
    }

    pub fn device_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "device")
    }

    pub fn par_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "par")
    }

    pub fn revocation_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "token/revoke")
    }

    pub fn introspection_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "tokeninfo")
    }

    pub fn jwks_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "jwks")
    }

    pub fn registration_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "register")
    }

    pub fn userinfo_endpoint(&self) -> String {
        join(&self.resolved_base_uri(), "userinfo")
    }

    pub fn access_token_duration(&self) -> Duration {
        Duration::seconds(self.access_token_ttl)
    }

    pub fn refresh_token_duration(&self) -> Duration {
        Duration::seconds(self.refresh_token_ttl)
    }

    pub fn id_token_ttl_seconds(&self) -> i64 {
        self.id_token_ttl.unwrap_or(self.access_token_ttl)
    }
}

fn join(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

/// Options for the authorization code (+ PKCE, + PAR) grant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationCodeConfig {
    #[serde(default = "defaults::code_challenge_methods")]
    pub code_challenge_methods_supported: Vec<String>,
    #[serde(default = "defaults::response_types")]
    pub response_types_supported: Vec<String>,
    #[serde(default = "defaults::response_modes")]
    pub response_modes_supported: Vec<String>,
    /// Authorization-code TTL in seconds. Default 300 (5 minutes).
    #[serde(default = "defaults::authorization_code_ttl")]
    pub ttl: i64,
}

impl Default for AuthorizationCodeConfig {
    fn default() -> Self {
        AuthorizationCodeConfig {
            code_challenge_methods_supported: defaults::code_challenge_methods(),
            response_types_supported: defaults::response_types(),
            response_modes_supported: defaults::response_modes(),
            ttl: defaults::authorization_code_ttl(),
        }
    }
}

/// Options for the refresh-token grant.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct RefreshTokenConfig {}

/// Options for the client-credentials grant.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ClientCredentialsConfig {
    /// Whether a refresh token is issued alongside the access token. Off per spec by default.
    #[serde(default)]
    pub issue_refresh_token: bool,
}

impl Default for ClientCredentialsConfig {
    fn default() -> Self {
        ClientCredentialsConfig { issue_refresh_token: false }
    }
}

/// Options for the device-authorization grant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceCodeConfig {
    /// Device-code TTL in seconds. Default 900 (15 minutes).
    #[serde(default = "defaults::device_code_ttl")]
    pub ttl: i64,
    /// Minimum seconds between polls of the same device code. Default 5.
    #[serde(default = "defaults::device_polling_interval")]
    pub polling_interval: i64,
}

impl Default for DeviceCodeConfig {
    fn default() -> Self {
        DeviceCodeConfig { ttl: defaults::device_code_ttl(), polling_interval: defaults::device_polling_interval() }
    }
}

/// Options for pushed authorization requests (RFC 9126).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushedAuthorizationRequestConfig {
    /// Request TTL in seconds. Default 60.
    #[serde(default = "defaults::par_ttl")]
    pub ttl: i64,
    /// Whether `./authorize` must be called with a `request_uri` (PAR mandatory).
    #[serde(default)]
    pub required: bool,
}

impl Default for PushedAuthorizationRequestConfig {
    fn default() -> Self {
        PushedAuthorizationRequestConfig { ttl: defaults::par_ttl(), required: false }
    }
}

/// Options describing the token endpoint itself, surfaced in server metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenEndpointConfig {
    #[serde(default = "defaults::auth_methods")]
    pub auth_methods_supported: Vec<String>,
    #[serde(default = "defaults::auth_signing_algs")]
    pub auth_signing_alg_values_supported: Vec<String>,
}

impl Default for TokenEndpointConfig {
    fn default() -> Self {
        TokenEndpointConfig {
            auth_methods_supported: defaults::auth_methods(),
            auth_signing_alg_values_supported: defaults::auth_signing_algs(),
        }
    }
}

mod defaults {
    pub fn access_token_ttl() -> i64 {
        3600
    }
    pub fn refresh_token_ttl() -> i64 {
        604_800
    }
    pub fn authorization_code_ttl() -> i64 {
        300
    }
    pub fn device_code_ttl() -> i64 {
        900
    }
    pub fn device_polling_interval() -> i64 {
        5
    }
    pub fn par_ttl() -> i64 {
        60
    }
    pub fn code_challenge_methods() -> Vec<String> {
        vec!["S256".into()]
    }
    pub fn response_types() -> Vec<String> {
        vec!["code".into()]
    }
    pub fn response_modes() -> Vec<String> {
        vec!["query".into()]
    }
    pub fn auth_methods() -> Vec<String> {
        vec!["client_secret_post".into()]
    }
    pub fn auth_signing_algs() -> Vec<String> {
        vec!["RS256".into()]
    }
}
