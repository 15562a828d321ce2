//! The bearer-assertion helper exposed to resource servers embedding this crate.
use crate::error::ErrorResponse;
use crate::primitives::issuer::AccessToken;
use crate::request;
use crate::server::AuthorizationServer;

/// Authenticate a resource request: read `Authorization: Bearer <token>`, load it, and confirm
/// it is still active. Resource servers call this directly; it is not exposed over HTTP by this
/// crate.
pub fn check_authorization(
    server: &AuthorizationServer, authorization_header: Option<&str>,
) -> Result<AccessToken, ErrorResponse> {
    request::bearer_token(server.issuer.as_ref(), authorization_header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthorizationCodeConfig, ServerConfig, TokenEndpointConfig};
    use crate::primitives::authorizer::AuthorizationCodeMap;
    use crate::primitives::device::DeviceChallengeMap;
    use crate::primitives::generator::RandGenerator;
    use crate::primitives::grant::Grant;
    use crate::primitives::issuer::{Issuer, TokenMap};
    use crate::primitives::par::PushedRequestMap;
    use crate::primitives::registrar::ClientMap;
    use chrono::{Duration, Utc};

    fn server() -> AuthorizationServer {
        let config = ServerConfig {
            issuer: "https://as.example".into(),
            base_uri: None,
            access_token_ttl: 3600,
            refresh_token_ttl: 604_800,
            id_token_ttl: None,
            authorization_code: Some(AuthorizationCodeConfig::default()),
            refresh_token: None,
            client_credentials: None,
            device_code: None,
            pushed_authorization_requests: None,
            token_revocation: false,
            token_introspection: false,
            server_metadata: false,
            token: TokenEndpointConfig::default(),
        };

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
    fn valid_bearer_token_resolves_to_its_access_token() {
        let mut server = server();
        let grant = Grant {
            client_id: "app".into(),
            subject: Some("alice".into()),
            scope: "read".parse().unwrap(),
            until: Utc::now() + Duration::hours(1),
            id_token_claims: None,
        };
        let issued = server.issuer.issue(grant, "https://as.example").unwrap();
        let header = format!("Bearer {}", issued.access_token);

        let access_token = check_authorization(&server, Some(&header)).unwrap();
        assert_eq!(access_token.client_id, "app");
        assert!(access_token.is_active());
    }

    #[test]
    fn missing_header_is_rejected() {
        let server = server();
        assert!(check_authorization(&server, None).is_err());
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let server = server();
        assert!(check_authorization(&server, Some("Basic dXNlcjpwYXNz")).is_err());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let server = server();
        assert!(check_authorization(&server, Some("Bearer does-not-exist")).is_err());
    }
}
