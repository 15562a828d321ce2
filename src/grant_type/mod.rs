//! The grant-type framework: a capability trait implemented independently by each of the four
//! built-in grants, dispatched by the token endpoint on the request's `grant_type` field.
//!
//! Each grant is a value type satisfying [`GrantType`], not a subclass of some common base —
//! there is no shared state or inheritance between them, only the shared [`GrantContext`] they
//! are handed per request.
mod authorization_code;
mod client_credentials;
mod device_code;
mod refresh_token;

pub use authorization_code::AuthorizationCodeGrant;
pub use client_credentials::ClientCredentialsGrant;
pub use device_code::DeviceCodeGrant;
pub use refresh_token::RefreshTokenGrant;

use crate::config::ServerConfig;
use crate::error::ErrorResponse;
use crate::primitives::authorizer::Authorizer;
use crate::primitives::device::DeviceChallengeStore;
use crate::primitives::grant::Grant;
use crate::primitives::issuer::Issuer;
use crate::primitives::par::PushedRequestStore;
use crate::primitives::registrar::{Client, Registrar};
use crate::primitives::scope::Scope;
use crate::request::ParsedBody;

/// The mutable persistence handles a grant needs during `validate`/`handle`. Borrowed once per
/// request; the core itself never retains anything across calls.
pub struct GrantContext<'a> {
    pub registrar: &'a dyn Registrar,
    pub authorizer: &'a mut dyn Authorizer,
    pub devices: &'a mut dyn DeviceChallengeStore,
    pub par: &'a mut dyn PushedRequestStore,
    pub config: &'a ServerConfig,
}

/// The outcome of `validate`: everything `handle` needs to compute an issuance descriptor,
/// without redoing any persistence lookups.
pub struct ValidatedRequest {
    pub client: Client,
    pub subject: Option<String>,
    pub scope: Scope,
    pub extra: ValidatedExtra,
}

/// Grant-specific data carried from `validate` into `handle`.
pub enum ValidatedExtra {
    AuthorizationCode { id_token_claims: Option<serde_json::Value> },
    ClientCredentials,
    RefreshToken { old_refresh_token: String },
    DeviceCode,
}

/// What the token endpoint must do to complete issuance, computed by `handle`. The token
/// endpoint is the only place that calls into the [`Issuer`]; grants never mint tokens
/// themselves, they only describe what to issue.
pub struct IssuanceRequest {
    pub grant: Grant,
    /// Set for refresh-token rotations: the old refresh token the issuer must revoke atomically
    /// with minting the new bundle.
    pub refresh_exchange: Option<String>,
}

/// A grant type: its wire identifier plus the two-step `validate`/`handle` contract.
pub trait GrantType: Send + Sync {
    /// The canonical `grant_type` identifier, e.g. `authorization_code` or
    /// `urn:ietf:params:oauth:grant-type:device_code`.
    fn grant_type_id(&self) -> &'static str;

    /// Stateful checks: token/code lookups, PKCE verification, expiry, client eligibility.
    fn validate(
        &self, ctx: &mut GrantContext<'_>, body: &ParsedBody, issuer: &dyn Issuer,
    ) -> Result<ValidatedRequest, ErrorResponse>;

    /// Compute the issuance descriptor from an already-validated request.
    fn handle(&self, ctx: &GrantContext<'_>, validated: ValidatedRequest) -> Result<IssuanceRequest, ErrorResponse>;
}
