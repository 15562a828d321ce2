//! The client-credentials grant: a confidential, non-redirect client authenticates itself and is
//! issued tokens for its own registered scopes, with no end user involved.
use chrono::Utc;

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::primitives::grant::Grant;
use crate::primitives::issuer::Issuer;
use crate::request::{self, ParsedBody};

use super::{GrantContext, GrantType, IssuanceRequest, ValidatedExtra, ValidatedRequest};

/// `grant_type=client_credentials`.
pub struct ClientCredentialsGrant;

impl GrantType for ClientCredentialsGrant {
    fn grant_type_id(&self) -> &'static str {
        "client_credentials"
    }

    fn validate(
        &self, ctx: &mut GrantContext<'_>, body: &ParsedBody, _issuer: &dyn Issuer,
    ) -> Result<ValidatedRequest, ErrorResponse> {
        let client_id = body.require("client_id")?;
        let client_secret = body
            .require("client_secret")
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("missing client_secret"))?;

        let client = ctx
            .registrar
            .client(&client_id)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidClient))?;

        if !client.eligible_for_client_credentials() {
            return Err(ErrorResponse::new(OAuthErrorCode::UnauthorizedClient)
                .with_description("client is not eligible for client_credentials"));
        }
        if !client.allows_grant_type(self.grant_type_id()) {
            return Err(ErrorResponse::new(OAuthErrorCode::UnauthorizedClient));
        }
        if !client.verify_secret(client_secret.as_bytes()) {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("bad client_secret"));
        }

        let requested = match body.get("scope") {
            Some(scope) => scope
                .parse()
                .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidScope))?,
            None => client.allowed_scopes.clone(),
        };
        let scope = request::resolve_scopes(&client, &requested, true)?;

        Ok(ValidatedRequest { client, subject: None, scope, extra: ValidatedExtra::ClientCredentials })
    }

    fn handle(&self, ctx: &GrantContext<'_>, validated: ValidatedRequest) -> Result<IssuanceRequest, ErrorResponse> {
        let issue_refresh_token = ctx
            .config
            .client_credentials
            .as_ref()
            .map(|config| config.issue_refresh_token)
            .unwrap_or(false);

        // `Grant::wants_refresh_token` requires both a subject and `offline_access`; client
        // credentials has no resource owner, so the client's own id stands in for one when the
        // option is turned on.
        let (subject, scope) = if issue_refresh_token {
            let scope = validated.scope.iter().map(str::to_string).chain(std::iter::once("offline_access".to_string())).collect();
            (Some(validated.client.client_id.clone()), scope)
        } else {
            (None, validated.scope)
        };

        let grant = Grant {
            client_id: validated.client.client_id,
            subject,
            scope,
            until: Utc::now() + ctx.config.access_token_duration(),
            id_token_claims: None,
        };

        Ok(IssuanceRequest { grant, refresh_exchange: None })
    }
}
