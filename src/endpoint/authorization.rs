//! `./authorize`: the redirect-based half of the authorization code grant, plus PAR loading.
//!
//! User authentication and consent are out of scope for this crate (see the non-goals in
//! `spec.md` §1); callers invoke [`authorize`] only once a `subject` has already been
//! established and the resource owner has approved the request.
use chrono::{Duration, Utc};
use serde_json::Value;
use url::Url;

use crate::error::{ErrorRedirect, ErrorResponse, OAuthErrorCode};
use crate::primitives::grant::{Grant, PkceChallenge, PkceMethod};
use crate::primitives::par::REQUEST_URI_PREFIX;
use crate::primitives::scope::Scope;
use crate::request::{self, ParsedBody};
use crate::server::AuthorizationServer;

/// The outcome of an authorization request: either a redirect (the happy path, and every error
/// once `redirect_uri` has been resolved and validated) or a direct response shown to the user
/// agent, used only for failures that precede that point, so a forged `redirect_uri` is never
/// trusted as a place to send error information.
pub enum AuthorizeOutcome {
    Redirect { location: String },
    Direct { status: u16, body: Value },
}

impl From<&ErrorResponse> for AuthorizeOutcome {
    fn from(error: &ErrorResponse) -> Self {
        AuthorizeOutcome::Direct { status: error.code.http_status(), body: error.to_json() }
    }
}

struct RequestParams {
    response_type: String,
    redirect_uri: String,
    scope: Scope,
    state: Option<String>,
    pkce: Option<PkceChallenge>,
}

/// Handle a `GET ./authorize` request. `query` is the parsed query string; `subject` identifies
/// the already-authenticated, already-consenting resource owner.
pub fn authorize(server: &mut AuthorizationServer, query: &ParsedBody, subject: String) -> AuthorizeOutcome {
    let client_id = match query.require("client_id") {
        Ok(value) => value.into_owned(),
        Err(error) => return AuthorizeOutcome::from(&error),
    };
    let client = match request::resolve_client(server.registrar.as_ref(), &client_id) {
        Ok(client) => client,
        Err(error) => return AuthorizeOutcome::from(&error),
    };

    let params = match resolve_params(server, query, &client, &client_id) {
        Ok(params) => params,
        Err(response) => return AuthorizeOutcome::from(&response),
    };

    let authorization_code_config = server.config.authorization_code.clone().unwrap_or_default();

    if !authorization_code_config.response_types_supported.iter().any(|t| t == &params.response_type) {
        return redirect_error(&server.config.issuer, &params.redirect_uri, params.state, OAuthErrorCode::UnsupportedResponseType);
    }
    if params.pkce.is_none() {
        return redirect_error(&server.config.issuer, &params.redirect_uri, params.state, OAuthErrorCode::InvalidRequest);
    }

    let scope = match request::resolve_scopes(&client, &params.scope, true) {
        Ok(scope) => scope,
        Err(error) => return redirect_error(&server.config.issuer, &params.redirect_uri, params.state, error.code),
    };

    let grant = Grant {
        client_id: client.client_id,
        subject: Some(subject),
        scope,
        until: Utc::now() + Duration::seconds(authorization_code_config.ttl),
        id_token_claims: None,
    };

    let code = match server.authorizer.authorize(grant, params.redirect_uri.clone(), params.pkce) {
        Ok(code) => code,
        Err(()) => return redirect_error(&server.config.issuer, &params.redirect_uri, params.state, OAuthErrorCode::ServerError),
    };

    let mut location =
        Url::parse(&params.redirect_uri).unwrap_or_else(|_| Url::parse("about:blank").expect("valid fallback URL"));
    {
        let mut pairs = location.query_pairs_mut();
        pairs.append_pair("code", &code);
        pairs.append_pair("iss", &server.config.issuer);
        if let Some(state) = &params.state {
            pairs.append_pair("state", state);
        }
    }
    AuthorizeOutcome::Redirect { location: location.into() }
}

fn resolve_params(
    server: &mut AuthorizationServer, query: &ParsedBody, client: &crate::primitives::registrar::Client,
    client_id: &str,
) -> Result<RequestParams, ErrorResponse> {
    if let Some(request_uri) = query.get("request_uri") {
        if !request_uri.starts_with(REQUEST_URI_PREFIX) {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("malformed request_uri"));
        }
        let pushed = server
            .par
            .consume(&request_uri, client_id)
            .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("unknown, expired, or foreign request_uri"))?;

        if !is_acceptable_redirect_uri(&pushed.redirect_uri) {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("pushed redirect_uri has an unacceptable scheme"));
        }

        return Ok(RequestParams {
            response_type: pushed.response_type,
            redirect_uri: pushed.redirect_uri,
            scope: pushed.scope,
            state: pushed.state,
            pkce: pushed.pkce,
        });
    }

    if server.config.pushed_authorization_requests.as_ref().map(|c| c.required).unwrap_or(false) {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("this server requires pushed authorization requests"));
    }

    let redirect_uri = query.require("redirect_uri")?.into_owned();
    if !client.matches_redirect_uri(&redirect_uri) {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("redirect_uri is not registered"));
    }
    if !is_acceptable_redirect_uri(&redirect_uri) {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest)
            .with_description("redirect_uri must be HTTPS, http://localhost, or a private-use scheme"));
    }

    let state = query.get("state").map(|s| s.into_owned());
    let response_type = query.get("response_type").map(|s| s.into_owned()).unwrap_or_default();
    let code_challenge = query.get("code_challenge").map(|s| s.into_owned());
    let method_str = query.get("code_challenge_method").map(|m| m.into_owned()).unwrap_or_else(|| "S256".into());
    let requested_scope = match query.get("scope") {
        Some(scope) => scope.parse().unwrap_or_else(|_| Scope::empty()),
        None => Scope::empty(),
    };

    Ok(RequestParams {
        response_type,
        redirect_uri,
        scope: requested_scope,
        state,
        pkce: code_challenge.and_then(|challenge| PkceMethod::parse(&method_str).map(|method| PkceChallenge { method, challenge })),
    })
}

fn redirect_error(issuer: &str, redirect_uri: &str, state: Option<String>, code: OAuthErrorCode) -> AuthorizeOutcome {
    let redirect = ErrorRedirect {
        redirect_uri: redirect_uri.to_string(),
        code,
        description: None,
        uri: None,
        state,
        issuer: issuer.to_string(),
    };
    AuthorizeOutcome::Redirect { location: redirect.location() }
}

/// HTTPS, `http://localhost[:port]`, or a non-`http(s)` scheme (treated as a native app's
/// private-use URI scheme).
fn is_acceptable_redirect_uri(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => match url.scheme() {
            "https" => true,
            "http" => matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("::1")),
            _ => true,
        },
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthorizationCodeConfig, ServerConfig, TokenEndpointConfig};
    use crate::primitives::authorizer::AuthorizationCodeMap;
    use crate::primitives::device::DeviceChallengeMap;
    use crate::primitives::generator::RandGenerator;
    use crate::primitives::issuer::TokenMap;
    use crate::primitives::par::PushedRequestMap;
    use crate::primitives::registrar::{Client, ClientMap};
    use crate::request::ParsedBody;

    fn server() -> AuthorizationServer {
        let registrar = ClientMap::new();
        registrar.register_client(
            Client::public("app", vec!["https://app.example/cb".into()], "read".parse().unwrap())
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
            pushed_authorization_requests: None,
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

    fn happy_query() -> ParsedBody {
        ParsedBody::from_form(
            "client_id=app&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&response_type=code\
             &code_challenge=abc&code_challenge_method=S256&scope=read&state=xyz",
        )
        .unwrap()
    }

    #[test]
    fn valid_request_redirects_with_code_and_state() {
        let mut server = server();
        match authorize(&mut server, &happy_query(), "alice".into()) {
            AuthorizeOutcome::Redirect { location } => {
                assert!(location.contains("code="));
                assert!(location.contains("state=xyz"));
                assert!(location.contains("iss=https%3A%2F%2Fas.example"));
            }
            AuthorizeOutcome::Direct { .. } => panic!("expected a redirect"),
        }
    }

    #[test]
    fn unregistered_redirect_uri_is_shown_directly() {
        let mut server = server();
        let query = ParsedBody::from_form("client_id=app&redirect_uri=https%3A%2F%2Fevil.example%2Fcb").unwrap();
        match authorize(&mut server, &query, "alice".into()) {
            AuthorizeOutcome::Direct { status, .. } => assert_eq!(status, 400),
            AuthorizeOutcome::Redirect { .. } => panic!("must not redirect to an unregistered redirect_uri"),
        }
    }

    #[test]
    fn missing_code_challenge_redirects_invalid_request() {
        let mut server = server();
        let query = ParsedBody::from_form(
            "client_id=app&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&response_type=code&scope=read",
        )
        .unwrap();
        match authorize(&mut server, &query, "alice".into()) {
            AuthorizeOutcome::Redirect { location } => assert!(location.contains("error=invalid_request")),
            AuthorizeOutcome::Direct { .. } => panic!("redirect_uri is valid, failure must redirect"),
        }
    }

    #[test]
    fn excess_scope_redirects_invalid_scope() {
        let mut server = server();
        let query = ParsedBody::from_form(
            "client_id=app&redirect_uri=https%3A%2F%2Fapp.example%2Fcb&response_type=code\
             &code_challenge=abc&scope=read+write",
        )
        .unwrap();
        match authorize(&mut server, &query, "alice".into()) {
            AuthorizeOutcome::Redirect { location } => assert!(location.contains("error=invalid_scope")),
            AuthorizeOutcome::Direct { .. } => panic!("redirect_uri is valid, failure must redirect"),
        }
    }
}
