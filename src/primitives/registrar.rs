//! Registrars administer the set of known clients.
//!
//! A registrar governs a client's allowed redirect URIs, allowed scopes, and allowed grant
//! types. When a request turns up, it is the registrar's duty to verify these against the
//! registered configuration; the core never mutates a client, it only ever reads one.
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::scope::Scope;

/// Clients are registered users of authorization tokens.
///
/// There are two kinds of clients: public clients, which hold no secret and can only
/// participate in redirect-based flows, and confidential clients, which authenticate with a
/// secret and may additionally use the client-credentials grant.
#[derive(Clone, Debug)]
pub struct Client {
    /// The identifier presented as `client_id` in requests.
    pub client_id: String,

    /// The SHA-256 digest of the client secret, or `None` for a public client.
    secret_hash: Option<[u8; 32]>,

    /// Whether the client may currently be used at all.
    pub active: bool,

    /// Whether the client has been permanently revoked. Distinct from `active` so a registrar
    /// can distinguish "temporarily suspended" from "permanently gone" in its own bookkeeping;
    /// the core treats both identically as `invalid_client`.
    pub revoked: bool,

    /// The `grant_type` identifiers this client may use.
    pub allowed_grant_types: HashSet<String>,

    /// The scopes this client may ever be granted.
    pub allowed_scopes: Scope,

    /// Registered redirect URIs. `None` for confidential, non-redirect clients (client
    /// credentials only); `Some` (possibly empty, though that would make the client unusable
    /// for any redirect-based grant) otherwise.
    pub redirect_uris: Option<Vec<String>>,

    /// Human-readable display name. Never consulted by protocol logic.
    pub name: Option<String>,
}

impl Client {
    /// Construct a public client with no secret.
    pub fn public(client_id: impl Into<String>, redirect_uris: Vec<String>, scopes: Scope) -> Self {
        Client {
            client_id: client_id.into(),
            secret_hash: None,
            active: true,
            revoked: false,
            allowed_grant_types: HashSet::new(),
            allowed_scopes: scopes,
            redirect_uris: Some(redirect_uris),
            name: None,
        }
    }

    /// Construct a confidential client with a secret, hashed immediately.
    pub fn confidential(
        client_id: impl Into<String>, secret: &[u8], redirect_uris: Option<Vec<String>>, scopes: Scope,
    ) -> Self {
        Client {
            client_id: client_id.into(),
            secret_hash: Some(hash_secret(secret)),
            active: true,
            revoked: false,
            allowed_grant_types: HashSet::new(),
            allowed_scopes: scopes,
            redirect_uris,
            name: None,
        }
    }

    /// Register the grant types this client may use. Consumes and returns `self` for easy
    /// construction chaining.
    pub fn allowing_grant_types<I: IntoIterator<Item = S>, S: Into<String>>(mut self, grants: I) -> Self {
        self.allowed_grant_types = grants.into_iter().map(Into::into).collect();
        self
    }

    /// True if the client holds a secret (i.e. is confidential).
    pub fn is_confidential(&self) -> bool {
        self.secret_hash.is_some()
    }

    /// Eligible for the client-credentials grant: must be confidential and must not be a
    /// redirect-based client.
    ///
    /// See `DESIGN.md` for why this is a conjunction, not a disjunction.
    pub fn eligible_for_client_credentials(&self) -> bool {
        self.is_confidential() && self.redirect_uris.as_ref().map_or(true, |u| u.is_empty())
    }

    /// Verify a presented secret in constant time against the stored hash.
    pub fn verify_secret(&self, presented: &[u8]) -> bool {
        match &self.secret_hash {
            None => false,
            Some(stored) => {
                let candidate = hash_secret(presented);
                stored.ct_eq(&candidate).into()
            }
        }
    }

    /// Match a `redirect_uri` against the registered set exactly, per `spec.md` §3's
    /// "must match exactly one of the client's registered URIs".
    pub fn matches_redirect_uri(&self, candidate: &str) -> bool {
        match &self.redirect_uris {
            None => false,
            Some(uris) => uris.iter().any(|uri| uri.as_str() == candidate),
        }
    }

    /// Whether `grant_type` is registered for this client.
    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        self.allowed_grant_types.contains(grant_type)
    }
}

fn hash_secret(secret: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.finalize().into()
}

/// Outcome of looking a client up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrarError {
    /// No such client, or the client is inactive/revoked. Deliberately coarse: do not let
    /// callers distinguish "unknown" from "revoked" since both map to `invalid_client`.
    NotFound,
    /// Something went wrong in the registrar itself, unrelated to the request.
    Backend,
}

/// Registrars provide read access to registered clients.
///
/// Implementations must never mutate state in response to a lookup; registration of new
/// clients is an out-of-band administrative action not covered by this trait.
pub trait Registrar {
    /// Look up a client by id. Must fail with `RegistrarError::NotFound` when the client does
    /// not exist, is inactive, or has been revoked — the three cases are indistinguishable to
    /// the caller by design.
    fn client(&self, client_id: &str) -> Result<Client, RegistrarError>;
}

/// A simple, in-memory `Registrar` backed by a hash map. Intended for tests and prototyping;
/// production deployments back this trait with their user/client database instead.
#[derive(Default)]
pub struct ClientMap {
    clients: RwLock<HashMap<String, Client>>,
}

impl ClientMap {
    /// Create an empty map with no registered clients.
    pub fn new() -> Self {
        ClientMap::default()
    }

    /// Insert or replace a client record.
    pub fn register_client(&self, client: Client) {
        self.clients
            .write()
            .expect("client map lock poisoned")
            .insert(client.client_id.clone(), client);
    }
}

impl Registrar for ClientMap {
    fn client(&self, client_id: &str) -> Result<Client, RegistrarError> {
        let clients = self.clients.read().map_err(|_| RegistrarError::Backend)?;
        match clients.get(client_id) {
            Some(client) if client.active && !client.revoked => Ok(client.clone()),
            _ => Err(RegistrarError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes() -> Scope {
        "read write offline_access openid".parse().unwrap()
    }

    #[test]
    fn public_client_has_no_secret() {
        let client = Client::public("app", vec!["https://app.example/cb".into()], scopes());
        assert!(!client.is_confidential());
        assert!(!client.verify_secret(b"anything"));
    }

    #[test]
    fn confidential_secret_roundtrips() {
        let client = Client::confidential("app", b"s3cr3t", None, scopes());
        assert!(client.verify_secret(b"s3cr3t"));
        assert!(!client.verify_secret(b"wrong"));
    }

    #[test]
    fn client_credentials_eligibility() {
        let cc_client = Client::confidential("svc", b"pw", None, scopes());
        assert!(cc_client.eligible_for_client_credentials());

        let redirect_confidential =
            Client::confidential("app", b"pw", Some(vec!["https://app.example/cb".into()]), scopes());
        assert!(!redirect_confidential.eligible_for_client_credentials());

        let public = Client::public("app", vec!["https://app.example/cb".into()], scopes());
        assert!(!public.eligible_for_client_credentials());
    }

    #[test]
    fn redirect_uri_matches_exactly() {
        let client = Client::public("app", vec!["https://app.example/cb".into()], scopes());
        assert!(client.matches_redirect_uri("https://app.example/cb"));
        assert!(!client.matches_redirect_uri("https://app.example/cb/"));
        assert!(!client.matches_redirect_uri("https://evil.example/cb"));
    }

    #[test]
    fn inactive_and_revoked_clients_are_not_found() {
        let registrar = ClientMap::new();
        let mut inactive = Client::public("a", vec![], scopes());
        inactive.active = false;
        registrar.register_client(inactive);

        let mut revoked = Client::public("b", vec![], scopes());
        revoked.revoked = true;
        registrar.register_client(revoked);

        registrar.register_client(Client::public("c", vec![], scopes()));

        assert_eq!(registrar.client("a").unwrap_err(), RegistrarError::NotFound);
        assert_eq!(registrar.client("b").unwrap_err(), RegistrarError::NotFound);
        assert!(registrar.client("c").is_ok());
        assert_eq!(registrar.client("missing").unwrap_err(), RegistrarError::NotFound);
    }
}
