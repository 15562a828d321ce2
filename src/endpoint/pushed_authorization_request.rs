//! `./par` (RFC 9126): accepts authorization parameters out-of-band, returning an opaque
//! `request_uri` to reference them from `./authorize`.
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::primitives::grant::{PkceChallenge, PkceMethod};
use crate::request::{self, ParsedBody};
use crate::server::AuthorizationServer;

#[derive(Clone, Debug)]
pub struct PushedAuthorizationResponse {
    pub request_uri: String,
    pub expires_in: i64,
}

impl PushedAuthorizationResponse {
    pub fn to_json(&self) -> Value {
        json!({ "request_uri": self.request_uri, "expires_in": self.expires_in })
    }
}

/// Persist a pushed authorization request, client-authenticated the same way the token endpoint
/// authenticates a confidential client.
pub fn pushed_authorization_request(
    server: &mut AuthorizationServer, body: &ParsedBody,
) -> Result<PushedAuthorizationResponse, ErrorResponse> {
    if body.get("request_uri").is_some() {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest)
            .with_description("request_uri must not be present in a pushed authorization request"));
    }

    let par_config = server.config.pushed_authorization_requests.clone().unwrap_or_default();
    let authorization_code_config = server.config.authorization_code.clone().unwrap_or_default();

    let client_id = body.require("client_id")?;
    let client = request::resolve_client(server.registrar.as_ref(), &client_id)?;

    if client.is_confidential() {
        let client_secret = body
            .require("client_secret")
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("missing client_secret"))?;
        if !client.verify_secret(client_secret.as_bytes()) {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidClient).with_description("bad client_secret"));
        }
    }

    let response_type = body.require("response_type")?.into_owned();
    if !authorization_code_config.response_types_supported.iter().any(|t| t == &response_type) {
        return Err(ErrorResponse::new(OAuthErrorCode::UnsupportedResponseType));
    }

    let redirect_uri = body.require("redirect_uri")?.into_owned();
    if !client.matches_redirect_uri(&redirect_uri) {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("redirect_uri is not registered"));
    }

    let requested_scope = match body.get("scope") {
        Some(scope) => scope.parse().map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidScope))?,
        None => crate::primitives::scope::Scope::empty(),
    };
    let scope = request::resolve_scopes(&client, &requested_scope, true)?;

    let code_challenge = body
        .require("code_challenge")
        .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("missing code_challenge"))?
        .into_owned();
    let method_str = body.get("code_challenge_method").map(|m| m.into_owned()).unwrap_or_else(|| "S256".into());
    if !authorization_code_config.code_challenge_methods_supported.iter().any(|m| m == &method_str) {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("unsupported code_challenge_method"));
    }
    let method = PkceMethod::parse(&method_str)
        .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("unknown code_challenge_method"))?;

    let state = body.get("state").map(|s| s.into_owned());

    let expires_at = Utc::now() + Duration::seconds(par_config.ttl);
    let request = server.par.create(
        client.client_id,
        Some(PkceChallenge { method, challenge: code_challenge }),
        response_type,
        redirect_uri,
        scope,
        state,
        expires_at,
    );

    Ok(PushedAuthorizationResponse { request_uri: request.request_uri, expires_in: par_config.ttl })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthorizationCodeConfig, PushedAuthorizationRequestConfig, ServerConfig, TokenEndpointConfig};
    use crate::primitives::authorizer::AuthorizationCodeMap;
    use crate::primitives::device::DeviceChallengeMap;
    use crate::primitives::generator::RandGenerator;
    use crate::primitives::issuer::TokenMap;
    use crate::primitives::par::{PushedRequestMap, REQUEST_URI_PREFIX};
    use crate::primitives::registrar::{Client, ClientMap};

    fn server() -> AuthorizationServer {
        let registrar = ClientMap::new();
        registrar.register_client(
            Client::confidential("app", b"s3cr3t", Some(vec!["https://app.example/cb".into()]), "read".parse().unwrap())
                .allowing_grant_types(["authorization_code"]),
        );

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
            pushed_authorization_requests: Some(PushedAuthorizationRequestConfig::default()),
            token_revocation: false,
            token_introspection: false,
            server_metadata: false,
            token: TokenEndpointConfig::default(),
        };

        AuthorizationServer::new(
            config,
            Box::new(registrar),
            Box::new(AuthorizationCodeMap::new(RandGenerator::new(16))),
            Box::new(TokenMap::new(RandGenerator::new(16))),
            Box::new(DeviceChallengeMap::new()),
            Box::new(PushedRequestMap::new()),
        )
    }

    #[test]
    fn pushes_a_valid_request_and_returns_an_opaque_uri() {
        let mut server = server();
        let body = ParsedBody::from_form(
            "client_id=app&client_secret=s3cr3t&response_type=code\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcb&code_challenge=abc&scope=read",
        )
        .unwrap();
        let response = pushed_authorization_request(&mut server, &body).unwrap();
        assert!(response.request_uri.starts_with(REQUEST_URI_PREFIX));
        assert_eq!(response.expires_in, 60);
    }

    #[test]
    fn bad_client_secret_is_rejected() {
        let mut server = server();
        let body = ParsedBody::from_form(
            "client_id=app&client_secret=wrong&response_type=code\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcb&code_challenge=abc",
        )
        .unwrap();
        let error = pushed_authorization_request(&mut server, &body).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::InvalidClient);
    }

    #[test]
    fn embedded_request_uri_is_rejected() {
        let mut server = server();
        let body = ParsedBody::from_form("client_id=app&client_secret=s3cr3t&request_uri=urn:foo").unwrap();
        let error = pushed_authorization_request(&mut server, &body).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::InvalidRequest);
    }

    #[test]
    fn missing_code_challenge_is_rejected() {
        let mut server = server();
        let body = ParsedBody::from_form(
            "client_id=app&client_secret=s3cr3t&response_type=code&redirect_uri=https%3A%2F%2Fapp.example%2Fcb",
        )
        .unwrap();
        let error = pushed_authorization_request(&mut server, &body).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::InvalidRequest);
    }
}
