//! The refresh-token grant: exchanges a still-active refresh token for a fresh token bundle,
//! rotating the refresh token atomically in the same call.
use chrono::Utc;

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::primitives::grant::Grant;
use crate::primitives::issuer::Issuer;
use crate::request::ParsedBody;

use super::{GrantContext, GrantType, IssuanceRequest, ValidatedExtra, ValidatedRequest};

/// `grant_type=refresh_token`.
pub struct RefreshTokenGrant;

impl GrantType for RefreshTokenGrant {
    fn grant_type_id(&self) -> &'static str {
        "refresh_token"
    }

    fn validate(
        &self, ctx: &mut GrantContext<'_>, body: &ParsedBody, issuer: &dyn Issuer,
    ) -> Result<ValidatedRequest, ErrorResponse> {
        let client_id = body.require("client_id")?;
        let refresh_token = body.require("refresh_token")?;

        let client = ctx
            .registrar
            .client(&client_id)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidClient))?;
        if !client.allows_grant_type(self.grant_type_id()) {
            return Err(ErrorResponse::new(OAuthErrorCode::UnauthorizedClient));
        }

        let stored = issuer
            .recover_refresh(&refresh_token)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::ServerError))?
            .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("unknown refresh token"))?;

        if !stored.is_active() {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("refresh token revoked or expired"));
        }
        if stored.client_id != client_id {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("refresh token issued to a different client"));
        }

        let scope = match body.get("scope") {
            Some(requested) => {
                let requested = requested
                    .parse()
                    .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidScope))?;
                if !requested.is_subset_of(&stored.scope) {
                    return Err(ErrorResponse::new(OAuthErrorCode::InvalidScope)
                        .with_description("scope must not exceed the scope of the original grant"));
                }
                requested
            }
            None => stored.scope.clone(),
        };

        Ok(ValidatedRequest {
            client,
            subject: stored.subject.clone(),
            scope,
            extra: ValidatedExtra::RefreshToken { old_refresh_token: refresh_token.into_owned() },
        })
    }

    fn handle(&self, ctx: &GrantContext<'_>, validated: ValidatedRequest) -> Result<IssuanceRequest, ErrorResponse> {
        let old_refresh_token = match validated.extra {
            ValidatedExtra::RefreshToken { old_refresh_token } => old_refresh_token,
            _ => unreachable!("refresh_token handle always receives its own ValidatedExtra variant"),
        };

        let grant = Grant {
            client_id: validated.client.client_id,
            subject: validated.subject,
            scope: validated.scope,
            until: Utc::now() + ctx.config.access_token_duration(),
            id_token_claims: None,
        };

        Ok(IssuanceRequest { grant, refresh_exchange: Some(old_refresh_token) })
    }
}
