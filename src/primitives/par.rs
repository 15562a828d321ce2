//! Stores pushed authorization requests (RFC 9126).
//!
//! A pushed authorization request lets a client post its authorization parameters out-of-band
//! and later reference them by an opaque `request_uri`, instead of placing them directly on the
//! `./authorize` redirect. The stored request is bound to the client that pushed it and is
//! consumed exactly once.
use std::collections::HashMap;
use std::sync::RwLock;

use rand::Rng;

use super::grant::PkceChallenge;
use super::scope::Scope;
use super::Time;

/// The canonical URN prefix for a pushed-request identifier, per RFC 9126 §2.2.
pub const REQUEST_URI_PREFIX: &str = "urn:ietf:params:oauth:request_uri:";

/// The authorization parameters bound to a pushed request, awaiting a subsequent
/// `./authorize` call.
#[derive(Clone, Debug)]
pub struct PushedAuthorizationRequest {
    pub request_uri: String,
    pub client_id: String,
    pub pkce: Option<PkceChallenge>,
    pub response_type: String,
    pub redirect_uri: String,
    pub scope: Scope,
    pub state: Option<String>,
    pub created_at: Time,
    pub expires_at: Time,
    pub used_at: Option<Time>,
}

impl PushedAuthorizationRequest {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now()
    }
}

/// Stores pushed authorization requests.
pub trait PushedRequestStore {
    /// Persist a new pushed request, returning the full record including its generated
    /// `request_uri`.
    #[allow(clippy::too_many_arguments)]
    fn create(
        &mut self, client_id: String, pkce: Option<PkceChallenge>, response_type: String,
        redirect_uri: String, scope: Scope, state: Option<String>, expires_at: Time,
    ) -> PushedAuthorizationRequest;

    /// Consume a pushed request by its `request_uri`, bound to `client_id`. Fails (returns
    /// `None`) when unknown, expired, already used, or bound to a different client — the
    /// authorization endpoint folds all of these into a single `invalid_request`.
    fn consume(&mut self, request_uri: &str, client_id: &str) -> Option<PushedAuthorizationRequest>;
}

/// An in-memory `PushedRequestStore` backed by a hash map.
#[derive(Default)]
pub struct PushedRequestMap {
    requests: RwLock<HashMap<String, PushedAuthorizationRequest>>,
}

impl PushedRequestMap {
    pub fn new() -> Self {
        PushedRequestMap::default()
    }
}

impl PushedRequestStore for PushedRequestMap {
    fn create(
        &mut self, client_id: String, pkce: Option<PkceChallenge>, response_type: String,
        redirect_uri: String, scope: Scope, state: Option<String>, expires_at: Time,
    ) -> PushedAuthorizationRequest {
        let opaque = {
            let mut rng = rand::thread_rng();
            let mut bytes = [0u8; 32];
            rng.fill(&mut bytes);
            base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
        };
        let request_uri = format!("{}{}", REQUEST_URI_PREFIX, opaque);

        let request = PushedAuthorizationRequest {
            request_uri: request_uri.clone(),
            client_id,
            pkce,
            response_type,
            redirect_uri,
            scope,
            state,
            created_at: chrono::Utc::now(),
            expires_at,
            used_at: None,
        };

        self.requests
            .write()
            .expect("pushed request map lock poisoned")
            .insert(request_uri, request.clone());
        request
    }

    fn consume(&mut self, request_uri: &str, client_id: &str) -> Option<PushedAuthorizationRequest> {
        let mut requests = self.requests.write().expect("pushed request map lock poisoned");
        let request = requests.get_mut(request_uri)?;

        if request.used_at.is_some() || request.is_expired() || request.client_id != client_id {
            return None;
        }

        request.used_at = Some(chrono::Utc::now());
        Some(request.clone())
    }
}
