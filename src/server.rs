//! The `AuthorizationServer` orchestrator: owns configuration, persistence, and the grant
//! dispatch table for the lifetime of the process.
use std::collections::HashMap;

use log::info;

use crate::config::ServerConfig;
use crate::grant_type::{
    AuthorizationCodeGrant, ClientCredentialsGrant, DeviceCodeGrant, GrantType, RefreshTokenGrant,
};
use crate::primitives::authorizer::Authorizer;
use crate::primitives::device::DeviceChallengeStore;
use crate::primitives::issuer::Issuer;
use crate::primitives::par::PushedRequestStore;
use crate::primitives::registrar::Registrar;

/// Everything the token/authorize/device/par/revocation/introspection endpoints need, assembled
/// once and reused for the lifetime of the process.
///
/// Construction is the only place that decides which grants are enabled: a grant family with no
/// corresponding `Some(..Config)` on `ServerConfig` is simply absent from `grants`, and the token
/// endpoint reports `unsupported_grant_type` for it exactly as if it had never been compiled in.
pub struct AuthorizationServer {
    pub(crate) config: ServerConfig,
    pub(crate) registrar: Box<dyn Registrar + Send + Sync>,
    pub(crate) authorizer: Box<dyn Authorizer + Send + Sync>,
    pub(crate) issuer: Box<dyn Issuer + Send + Sync>,
    pub(crate) devices: Box<dyn DeviceChallengeStore + Send + Sync>,
    pub(crate) par: Box<dyn PushedRequestStore + Send + Sync>,
    pub(crate) grants: HashMap<&'static str, Box<dyn GrantType>>,
}

impl AuthorizationServer {
    /// Build a server from its configuration and the persistence implementations backing each
    /// primitive trait. Logs the set of enabled grants at `info`.
    pub fn new(
        config: ServerConfig,
        registrar: Box<dyn Registrar + Send + Sync>,
        authorizer: Box<dyn Authorizer + Send + Sync>,
        issuer: Box<dyn Issuer + Send + Sync>,
        devices: Box<dyn DeviceChallengeStore + Send + Sync>,
        par: Box<dyn PushedRequestStore + Send + Sync>,
    ) -> Self {
        let mut grants: HashMap<&'static str, Box<dyn GrantType>> = HashMap::new();

        if config.authorization_code.is_some() {
            let grant = AuthorizationCodeGrant;
            grants.insert(grant.grant_type_id(), Box::new(grant));
        }
        if config.refresh_token.is_some() {
            let grant = RefreshTokenGrant;
            grants.insert(grant.grant_type_id(), Box::new(grant));
        }
        if config.client_credentials.is_some() {
            let grant = ClientCredentialsGrant;
            grants.insert(grant.grant_type_id(), Box::new(grant));
        }
        if config.device_code.is_some() {
            let grant = DeviceCodeGrant;
            grants.insert(grant.grant_type_id(), Box::new(grant));
        }

        info!(
            "authorization server constructed for issuer {} with grants: {}",
            config.issuer,
            grants.keys().copied().collect::<Vec<_>>().join(", ")
        );

        AuthorizationServer { config, registrar, authorizer, issuer, devices, par, grants }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthorizationCodeConfig, RefreshTokenConfig, TokenEndpointConfig};
    use crate::primitives::authorizer::AuthorizationCodeMap;
    use crate::primitives::device::DeviceChallengeMap;
    use crate::primitives::generator::RandGenerator;
    use crate::primitives::issuer::TokenMap;
    use crate::primitives::par::PushedRequestMap;
    use crate::primitives::registrar::ClientMap;

    fn config(authorization_code: bool, refresh_token: bool) -> ServerConfig {
        ServerConfig {
            issuer: "https://as.example".into(),
            base_uri: None,
            access_token_ttl: 3600,
            refresh_token_ttl: 604_800,
            id_token_ttl: None,
            authorization_code: authorization_code.then(AuthorizationCodeConfig::default),
            refresh_token: refresh_token.then_some(RefreshTokenConfig {}),
            client_credentials: None,
            device_code: None,
            pushed_authorization_requests: None,
            token_revocation: false,
            token_introspection: false,
            server_metadata: false,
            token: TokenEndpointConfig::default(),
        }
    }

    fn server(config: ServerConfig) -> AuthorizationServer {
        AuthorizationServer::new(
            config,
            Box::new(ClientMap::new()),
            Box::new(AuthorizationCodeMap::new(RandGenerator::new(16))),
            Box::new(TokenMap::new(RandGenerator::new(16))),
            Box::new(DeviceChallengeMap::new()),
            Box::new(PushedRequestMap::new()),
        )
    }

    #[test]
    fn only_configured_grants_are_registered() {
        let server = server(config(true, false));
        assert!(server.grants.contains_key("authorization_code"));
        assert!(!server.grants.contains_key("refresh_token"));
        assert!(!server.grants.contains_key("client_credentials"));
    }

    #[test]
    fn every_grant_can_be_enabled_together() {
        let server = server(config(true, true));
        assert!(server.grants.contains_key("authorization_code"));
        assert!(server.grants.contains_key("refresh_token"));
    }

    #[test]
    fn no_grants_configured_means_no_grants_registered() {
        let server = server(config(false, false));
        assert!(server.grants.is_empty());
    }
}
