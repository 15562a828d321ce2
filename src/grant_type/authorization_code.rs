//! The authorization code grant, with mandatory PKCE and optional PAR-originated requests.
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::primitives::grant::{Grant, PkceMethod};
use crate::primitives::issuer::Issuer;
use crate::request::ParsedBody;

use super::{GrantContext, GrantType, IssuanceRequest, ValidatedExtra, ValidatedRequest};

/// `grant_type=authorization_code`.
pub struct AuthorizationCodeGrant;

impl GrantType for AuthorizationCodeGrant {
    fn grant_type_id(&self) -> &'static str {
        "authorization_code"
    }

    fn validate(
        &self, ctx: &mut GrantContext<'_>, body: &ParsedBody, _issuer: &dyn Issuer,
    ) -> Result<ValidatedRequest, ErrorResponse> {
        let code = body.require("code")?;
        let redirect_uri = body.require("redirect_uri")?;
        let client_id = body.require("client_id")?;

        let authorization_code = ctx
            .authorizer
            .extract(&code)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::ServerError))?
            .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("unknown code"))?;

        if authorization_code.used_at.is_some() {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("code already used"));
        }
        if authorization_code.grant.client_id != client_id {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("code issued to a different client"));
        }
        if authorization_code.redirect_uri != redirect_uri {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("redirect_uri mismatch"));
        }
        if authorization_code.grant.until <= chrono::Utc::now() {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("code expired"));
        }

        if let Some(pkce) = &authorization_code.pkce {
            let verifier = body
                .require("code_verifier")
                .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("missing code_verifier"))?;

            let matches = match pkce.method {
                PkceMethod::Plain => verifier.as_ref() == pkce.challenge,
                PkceMethod::S256 => {
                    let digest = Sha256::digest(verifier.as_bytes());
                    URL_SAFE_NO_PAD.encode(digest) == pkce.challenge
                }
            };
            if !matches {
                return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("PKCE verification failed"));
            }
        }

        let client = ctx
            .registrar
            .client(&client_id)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidClient))?;
        if !client.allows_grant_type(self.grant_type_id()) {
            return Err(ErrorResponse::new(OAuthErrorCode::UnauthorizedClient));
        }

        Ok(ValidatedRequest {
            client,
            subject: authorization_code.grant.subject.clone(),
            scope: authorization_code.grant.scope.clone(),
            extra: ValidatedExtra::AuthorizationCode {
                id_token_claims: authorization_code.grant.id_token_claims.clone(),
            },
        })
    }

    fn handle(&self, ctx: &GrantContext<'_>, validated: ValidatedRequest) -> Result<IssuanceRequest, ErrorResponse> {
        let id_token_claims = match validated.extra {
            ValidatedExtra::AuthorizationCode { id_token_claims } => id_token_claims,
            _ => unreachable!("authorization_code handle always receives its own ValidatedExtra variant"),
        };

        let grant = Grant {
            client_id: validated.client.client_id,
            subject: validated.subject,
            scope: validated.scope,
            until: chrono::Utc::now() + ctx.config.access_token_duration(),
            id_token_claims,
        };

        Ok(IssuanceRequest { grant, refresh_exchange: None })
    }
}
