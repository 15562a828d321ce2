//! `./tokeninfo` (RFC 7662): disclosure-minimizing token introspection.
use serde_json::json;

use crate::error::ErrorResponse;
use crate::request::{self, ParsedBody};
use crate::server::AuthorizationServer;

/// Introspect the token named in `body`. Returns `{"active": false}` for every case but an
/// active token whose owning client matches the caller's — never reveals anything else about a
/// foreign, revoked, expired, or unknown token.
pub fn introspect(
    server: &AuthorizationServer, body: &ParsedBody, authorization_header: Option<&str>,
) -> Result<serde_json::Value, ErrorResponse> {
    let caller = request::bearer_token(server.issuer.as_ref(), authorization_header)?;
    let token = body.require("token")?;

    let found = server
        .issuer
        .recover_token(&token)
        .map_err(|_| ErrorResponse::new(crate::error::OAuthErrorCode::ServerError))?;

    let active = found.as_ref().filter(|access_token| {
        access_token.is_active() && access_token.client_id == caller.client_id
    });

    Ok(match active {
        None => json!({ "active": false }),
        Some(access_token) => json!({
            "active": true,
            "scope": access_token.scope.to_string(),
            "client_id": access_token.client_id,
            "username": access_token.subject,
            "exp": access_token.until.timestamp(),
        }),
    })
}
