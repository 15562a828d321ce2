//! Async counterparts of the primitive traits, for deployments whose backing store is a
//! network database rather than the in-memory maps in [`crate::primitives`].
//!
//! The core of this crate ([`crate::grant_type`], [`crate::endpoint`]) is synchronous: a single
//! token-endpoint call borrows its primitives for the duration of one `validate`/`handle` pair
//! and returns. That is the right shape for in-memory stores and for callers who already run
//! inside a blocking worker thread. A caller whose store is genuinely async (a connection pool,
//! a remote KV service) implements the traits below instead, and bridges into the synchronous
//! core by running each call to completion on its executor before handing the resolved value to
//! [`crate::endpoint`] — the same relationship `oxide-auth-async` has to its synchronous sibling.
//!
//! Every trait here is a one-to-one async mirror of a `crate::primitives` trait, and the blanket
//! `impl<T: primitives::Trait>` lets any synchronous implementation (including the in-memory
//! maps) satisfy the async trait for free, so test code never needs two implementations of the
//! same store.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::primitives::authorizer::{AuthorizationCode, Authorizer};
use crate::primitives::device::{DeviceChallenge, DeviceChallengeStore, PollOutcome};
use crate::primitives::grant::{Grant, PkceChallenge};
use crate::primitives::issuer::{AccessToken, IssuedToken, Issuer, RefreshToken};
use crate::primitives::par::{PushedAuthorizationRequest, PushedRequestStore};
use crate::primitives::registrar::{Client, Registrar, RegistrarError};
use crate::primitives::scope::Scope;

type Time = DateTime<Utc>;

/// Async counterpart of [`Registrar`].
#[async_trait]
pub trait AsyncRegistrar: Send + Sync {
    async fn client(&self, client_id: &str) -> Result<Client, RegistrarError>;
}

#[async_trait]
impl<T: Registrar + Send + Sync> AsyncRegistrar for T {
    async fn client(&self, client_id: &str) -> Result<Client, RegistrarError> {
        Registrar::client(self, client_id)
    }
}

/// Async counterpart of [`Authorizer`].
#[async_trait]
pub trait AsyncAuthorizer: Send + Sync {
    async fn authorize(
        &mut self, grant: Grant, redirect_uri: String, pkce: Option<PkceChallenge>,
    ) -> Result<String, ()>;

    async fn extract(&mut self, code: &str) -> Result<Option<AuthorizationCode>, ()>;
}

#[async_trait]
impl<T: Authorizer + Send + Sync> AsyncAuthorizer for T {
    async fn authorize(
        &mut self, grant: Grant, redirect_uri: String, pkce: Option<PkceChallenge>,
    ) -> Result<String, ()> {
        Authorizer::authorize(self, grant, redirect_uri, pkce)
    }

    async fn extract(&mut self, code: &str) -> Result<Option<AuthorizationCode>, ()> {
        Authorizer::extract(self, code)
    }
}

/// Async counterpart of [`Issuer`].
#[async_trait]
pub trait AsyncIssuer: Send + Sync {
    async fn issue(&mut self, grant: Grant, issuer: &str) -> Result<IssuedToken, ()>;
    async fn refresh(&mut self, old_refresh_token: &str, grant: Grant, issuer: &str) -> Result<IssuedToken, ()>;
    async fn recover_token(&self, token: &str) -> Result<Option<AccessToken>, ()>;
    async fn recover_refresh(&self, token: &str) -> Result<Option<RefreshToken>, ()>;
    async fn revoke_access_token(&mut self, token: &str) -> Result<(), ()>;
    async fn revoke_refresh_token(&mut self, token: &str) -> Result<(), ()>;
}

#[async_trait]
impl<T: Issuer + Send + Sync> AsyncIssuer for T {
    async fn issue(&mut self, grant: Grant, issuer: &str) -> Result<IssuedToken, ()> {
        Issuer::issue(self, grant, issuer)
    }

    async fn refresh(&mut self, old_refresh_token: &str, grant: Grant, issuer: &str) -> Result<IssuedToken, ()> {
        Issuer::refresh(self, old_refresh_token, grant, issuer)
    }

    async fn recover_token(&self, token: &str) -> Result<Option<AccessToken>, ()> {
        Issuer::recover_token(self, token)
    }

    async fn recover_refresh(&self, token: &str) -> Result<Option<RefreshToken>, ()> {
        Issuer::recover_refresh(self, token)
    }

    async fn revoke_access_token(&mut self, token: &str) -> Result<(), ()> {
        Issuer::revoke_access_token(self, token)
    }

    async fn revoke_refresh_token(&mut self, token: &str) -> Result<(), ()> {
        Issuer::revoke_refresh_token(self, token)
    }
}

/// Async counterpart of [`DeviceChallengeStore`].
#[async_trait]
pub trait AsyncDeviceChallengeStore: Send + Sync {
    async fn create(&mut self, client_id: String, scope: Scope, expires_at: Time) -> DeviceChallenge;
    async fn poll(&mut self, device_code: &str, interval: chrono::Duration) -> Option<PollOutcome>;
    async fn exchange(&mut self, device_code: &str) -> Result<(String, Scope), ()>;
    async fn set_approval(&mut self, user_code: &str, approved: bool) -> Result<(), ()>;
}

#[async_trait]
impl<T: DeviceChallengeStore + Send + Sync> AsyncDeviceChallengeStore for T {
    async fn create(&mut self, client_id: String, scope: Scope, expires_at: Time) -> DeviceChallenge {
        DeviceChallengeStore::create(self, client_id, scope, expires_at)
    }

    async fn poll(&mut self, device_code: &str, interval: chrono::Duration) -> Option<PollOutcome> {
        DeviceChallengeStore::poll(self, device_code, interval)
    }

    async fn exchange(&mut self, device_code: &str) -> Result<(String, Scope), ()> {
        DeviceChallengeStore::exchange(self, device_code)
    }

    async fn set_approval(&mut self, user_code: &str, approved: bool) -> Result<(), ()> {
        DeviceChallengeStore::set_approval(self, user_code, approved)
    }
}

/// Async counterpart of [`PushedRequestStore`].
#[async_trait]
pub trait AsyncPushedRequestStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create(
        &mut self, client_id: String, pkce: Option<PkceChallenge>, response_type: String,
        redirect_uri: String, scope: Scope, state: Option<String>, expires_at: Time,
    ) -> PushedAuthorizationRequest;

    async fn consume(&mut self, request_uri: &str, client_id: &str) -> Option<PushedAuthorizationRequest>;
}

#[async_trait]
impl<T: PushedRequestStore + Send + Sync> AsyncPushedRequestStore for T {
    async fn create(
        &mut self, client_id: String, pkce: Option<PkceChallenge>, response_type: String,
        redirect_uri: String, scope: Scope, state: Option<String>, expires_at: Time,
    ) -> PushedAuthorizationRequest {
        PushedRequestStore::create(self, client_id, pkce, response_type, redirect_uri, scope, state, expires_at)
    }

    async fn consume(&mut self, request_uri: &str, client_id: &str) -> Option<PushedAuthorizationRequest> {
        PushedRequestStore::consume(self, request_uri, client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::generator::RandGenerator;
    use crate::primitives::issuer::TokenMap;

    #[tokio::test]
    async fn sync_issuer_satisfies_async_issuer_via_blanket_impl() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let grant = Grant {
            client_id: "app".into(),
            subject: Some("alice".into()),
            scope: "read".parse().unwrap(),
            until: chrono::Utc::now() + chrono::Duration::hours(1),
            id_token_claims: None,
        };

        let issued = AsyncIssuer::issue(&mut issuer, grant, "https://as.example").await.unwrap();
        let recovered = AsyncIssuer::recover_token(&issuer, &issued.access_token).await.unwrap();
        assert!(recovered.is_some());
    }
}
