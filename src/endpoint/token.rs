//! `./token`: the single place `issueTokens` is invoked, per `grant_type` dispatch.
use log::debug;
use serde_json::json;

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::grant_type::GrantContext;
use crate::request::{self, ParsedBody};
use crate::server::AuthorizationServer;

/// The success body of a token-endpoint response: `{access_token, token_type, expires_in, ...}`.
#[derive(Clone, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub scope: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
}

impl TokenResponse {
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = json!({
            "access_token": self.access_token,
            "token_type": self.token_type,
            "expires_in": self.expires_in,
            "scope": self.scope,
        });
        let object = body.as_object_mut().expect("constructed as an object literal");
        if let Some(refresh_token) = &self.refresh_token {
            object.insert("refresh_token".into(), json!(refresh_token));
        }
        if let Some(id_token) = &self.id_token {
            object.insert("id_token".into(), json!(id_token));
        }
        body
    }
}

/// Run the token-endpoint pipeline (`spec.md` §4.4): resolve the client, dispatch to the
/// requested grant, then issue exactly once.
pub fn token(server: &mut AuthorizationServer, body: &ParsedBody) -> Result<TokenResponse, ErrorResponse> {
    let client_id = body.require("client_id")?;
    request::resolve_client(server.registrar.as_ref(), &client_id)?;

    let grant_type = body.require("grant_type")?;
    let grant = server
        .grants
        .get(grant_type.as_ref())
        .ok_or_else(|| {
            debug!("rejected token request for unsupported grant_type {grant_type}");
            ErrorResponse::new(OAuthErrorCode::UnsupportedGrantType)
        })?;

    let validated = {
        let mut ctx = GrantContext {
            registrar: server.registrar.as_ref(),
            authorizer: server.authorizer.as_mut(),
            devices: server.devices.as_mut(),
            par: server.par.as_mut(),
            config: &server.config,
        };
        grant.validate(&mut ctx, body, server.issuer.as_ref()).map_err(|err| {
            debug!("token request for grant_type {grant_type} failed validation: {err}");
            err
        })?
    };

    let issuance = {
        let ctx = GrantContext {
            registrar: server.registrar.as_ref(),
            authorizer: server.authorizer.as_mut(),
            devices: server.devices.as_mut(),
            par: server.par.as_mut(),
            config: &server.config,
        };
        grant.handle(&ctx, validated)?
    };

    let scope = issuance.grant.scope.to_string();
    let until = issuance.grant.until;

    let issued = match issuance.refresh_exchange {
        Some(old_refresh_token) => server.issuer.refresh(&old_refresh_token, issuance.grant, &server.config.issuer),
        None => server.issuer.issue(issuance.grant, &server.config.issuer),
    }
    .map_err(|_| ErrorResponse::new(OAuthErrorCode::ServerError))?;

    debug!("issued tokens for client {client_id} via grant_type {grant_type}");

    Ok(TokenResponse {
        access_token: issued.access_token,
        token_type: "Bearer",
        expires_in: (until - chrono::Utc::now()).num_seconds().max(0),
        scope,
        refresh_token: issued.refresh_token,
        id_token: issued.id_token,
    })
}
