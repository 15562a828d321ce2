//! Shared value types threaded between grant validation, issuance, and persistence.
use super::Time;
use super::scope::Scope;

/// The proof-key challenge bound to an authorization code, per RFC 7636.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PkceChallenge {
    /// `S256` or `plain`.
    pub method: PkceMethod,
    /// The challenge as submitted at the authorization endpoint.
    pub challenge: String,
}

/// The two PKCE transformation methods this server accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceMethod {
    /// The verifier is compared to the challenge as-is. Weaker, optional to support.
    Plain,
    /// The challenge is `base64url(SHA-256(verifier))` without padding.
    S256,
}

impl PkceMethod {
    /// Parse the `code_challenge_method` request parameter.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plain" => Some(PkceMethod::Plain),
            "S256" => Some(PkceMethod::S256),
            _ => None,
        }
    }

    /// The wire representation of this method.
    pub fn as_str(self) -> &'static str {
        match self {
            PkceMethod::Plain => "plain",
            PkceMethod::S256 => "S256",
        }
    }
}

/// A fully negotiated grant, threaded from a grant's `validate` step into issuance.
///
/// This can be stored in a database without worrying about lifetimes or thread boundaries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grant {
    /// The registered client the grant was issued to.
    pub client_id: String,

    /// Identifies the resource owner the grant was issued on behalf of. Absent for grants that
    /// have no associated end user (client credentials).
    pub subject: Option<String>,

    /// The scope actually granted, always a subset of the client's allowed scopes.
    pub scope: Scope,

    /// Expiration timestamp of the resulting access token (Utc).
    pub until: Time,

    /// OpenID Connect claims to embed in an ID token. Only consulted when `scope` contains
    /// `openid` and `subject` is set.
    pub id_token_claims: Option<serde_json::Value>,
}

impl Grant {
    /// Whether this grant entitles the holder to a refresh token: there must be a subject and
    /// the `offline_access` scope must have been granted. The caller still has to confirm that
    /// the refresh-token grant is registered before actually issuing one.
    pub fn wants_refresh_token(&self) -> bool {
        self.subject.is_some() && self.scope.contains("offline_access")
    }

    /// Whether this grant entitles the holder to an ID token: there must be a subject and the
    /// `openid` scope must have been granted.
    pub fn wants_id_token(&self) -> bool {
        self.subject.is_some() && self.scope.contains("openid")
    }
}
