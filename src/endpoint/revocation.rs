//! `./token/revoke` (RFC 7009): always 200, regardless of what happened.
use log::debug;

use crate::request::{self, ParsedBody};
use crate::server::AuthorizationServer;

/// Revoke the token named in `body`, authenticating the caller as a bearer first.
///
/// Always succeeds from the caller's perspective: an unknown, already-revoked, or
/// foreign-owned token, and any backend failure while revoking, are all swallowed. Only a
/// missing/invalid bearer assertion is reported, since the caller is otherwise unauthenticated.
pub fn revoke(
    server: &mut AuthorizationServer, body: &ParsedBody, authorization_header: Option<&str>,
) -> Result<(), crate::error::ErrorResponse> {
    let caller = request::bearer_token(server.issuer.as_ref(), authorization_header)?;

    let Some(token) = body.get("token") else {
        debug!("revocation request for client {} carried no token parameter", caller.client_id);
        return Ok(());
    };

    match body.get("token_type_hint").as_deref() {
        Some("refresh_token") => {
            let _ = server.issuer.revoke_refresh_token(&token);
        }
        Some("access_token") => {
            let _ = server.issuer.revoke_access_token(&token);
        }
        _ => {
            // No hint: the token value is unambiguous per store, so trying both is harmless.
            let _ = server.issuer.revoke_access_token(&token);
            let _ = server.issuer.revoke_refresh_token(&token);
        }
    }

    debug!("processed revocation request from client {}", caller.client_id);
    Ok(())
}
