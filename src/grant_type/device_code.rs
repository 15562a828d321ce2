//! The device-authorization grant (RFC 8628): a polling token endpoint backed by a device
//! challenge approved out-of-band by the user.
use chrono::{Duration, Utc};

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::primitives::device::PollOutcome;
use crate::primitives::grant::Grant;
use crate::primitives::issuer::Issuer;
use crate::request::ParsedBody;

use super::{GrantContext, GrantType, IssuanceRequest, ValidatedExtra, ValidatedRequest};

/// `grant_type=urn:ietf:params:oauth:grant-type:device_code`.
pub struct DeviceCodeGrant;

impl GrantType for DeviceCodeGrant {
    fn grant_type_id(&self) -> &'static str {
        "urn:ietf:params:oauth:grant-type:device_code"
    }

    fn validate(
        &self, ctx: &mut GrantContext<'_>, body: &ParsedBody, _issuer: &dyn Issuer,
    ) -> Result<ValidatedRequest, ErrorResponse> {
        let device_code = body.require("device_code")?;
        let client_id = body.require("client_id")?;

        let client = ctx
            .registrar
            .client(&client_id)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidClient))?;
        if !client.allows_grant_type(self.grant_type_id()) {
            return Err(ErrorResponse::new(OAuthErrorCode::UnauthorizedClient));
        }

        let interval = ctx
            .config
            .device_code
            .as_ref()
            .map(|config| config.polling_interval)
            .unwrap_or(5);

        let outcome = ctx
            .devices
            .poll(&device_code, Duration::seconds(interval))
            .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("unknown device_code"))?;

        match outcome {
            PollOutcome::AuthorizationPending => {
                return Err(ErrorResponse::new(OAuthErrorCode::AuthorizationPending))
            }
            PollOutcome::SlowDown => return Err(ErrorResponse::new(OAuthErrorCode::SlowDown)),
            PollOutcome::AccessDenied => return Err(ErrorResponse::new(OAuthErrorCode::AccessDenied)),
            PollOutcome::ExpiredToken => return Err(ErrorResponse::new(OAuthErrorCode::ExpiredToken)),
            PollOutcome::AlreadyUsed => {
                return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("device_code already redeemed"))
            }
            PollOutcome::Ready => {}
        }

        let (owning_client_id, scope) = ctx
            .devices
            .exchange(&device_code)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("device_code no longer ready"))?;

        if owning_client_id != client_id {
            return Err(ErrorResponse::new(OAuthErrorCode::InvalidGrant).with_description("device_code issued to a different client"));
        }

        Ok(ValidatedRequest { client, subject: None, scope, extra: ValidatedExtra::DeviceCode })
    }

    fn handle(&self, ctx: &GrantContext<'_>, validated: ValidatedRequest) -> Result<IssuanceRequest, ErrorResponse> {
        let grant = Grant {
            client_id: validated.client.client_id,
            subject: None,
            scope: validated.scope,
            until: Utc::now() + ctx.config.access_token_duration(),
            id_token_claims: None,
        };

        Ok(IssuanceRequest { grant, refresh_exchange: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceCodeConfig, ServerConfig, TokenEndpointConfig};
    use crate::primitives::authorizer::AuthorizationCodeMap;
    use crate::primitives::device::DeviceChallengeMap;
    use crate::primitives::generator::RandGenerator;
    use crate::primitives::issuer::TokenMap;
    use crate::primitives::par::PushedRequestMap;
    use crate::primitives::registrar::{Client, ClientMap};

    fn config(polling_interval: i64) -> ServerConfig {
        ServerConfig {
            issuer: "https://as.example".into(),
            base_uri: None,
            access_token_ttl: 3600,
            refresh_token_ttl: 604_800,
            id_token_ttl: None,
            authorization_code: None,
            refresh_token: None,
            client_credentials: None,
            device_code: Some(DeviceCodeConfig { ttl: 900, polling_interval }),
            pushed_authorization_requests: None,
            token_revocation: false,
            token_introspection: false,
            server_metadata: false,
            token: TokenEndpointConfig::default(),
        }
    }

    fn registrar() -> ClientMap {
        let registrar = ClientMap::new();
        registrar.register_client(
            Client::public("device-app", vec![], "read".parse().unwrap())
                .allowing_grant_types(["urn:ietf:params:oauth:grant-type:device_code"]),
        );
        registrar
    }

    fn body(device_code: &str) -> ParsedBody {
        ParsedBody::from_form(&format!("device_code={device_code}&client_id=device-app")).unwrap()
    }

    /// A poll before the user has acted reports `authorization_pending`; a poll inside the
    /// configured interval of the previous one reports `slow_down` even once approved; once the
    /// interval has elapsed a `Ready` challenge is issued exactly once, and a replay of the same
    /// device code is `invalid_grant`.
    #[test]
    fn full_timing_lifecycle() {
        let registrar = registrar();
        let mut authorizer = AuthorizationCodeMap::new(RandGenerator::new(16));
        let mut devices = DeviceChallengeMap::new();
        let mut par = PushedRequestMap::new();
        let issuer = TokenMap::new(RandGenerator::new(16));
        let slow = config(300);
        let grant = DeviceCodeGrant;

        let challenge = devices.create("device-app".into(), "read".parse().unwrap(), Utc::now() + Duration::minutes(15));

        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &slow,
        };
        let error = grant.validate(&mut ctx, &body(&challenge.device_code), &issuer).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::AuthorizationPending);

        // Polling again immediately is rate-limited against the configured interval.
        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &slow,
        };
        let error = grant.validate(&mut ctx, &body(&challenge.device_code), &issuer).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::SlowDown);

        devices.set_approval(&challenge.user_code, true).unwrap();

        // Still within the interval: rate-limited even though it is now approved.
        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &slow,
        };
        let error = grant.validate(&mut ctx, &body(&challenge.device_code), &issuer).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::SlowDown);

        // A zero-second interval never rate-limits, modeling the interval having elapsed.
        let fast = config(0);
        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &fast,
        };
        let validated = grant.validate(&mut ctx, &body(&challenge.device_code), &issuer).unwrap();
        assert_eq!(validated.client.client_id, "device-app");

        // A second exchange of the same, now-redeemed device code is a replay.
        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &fast,
        };
        let error = grant.validate(&mut ctx, &body(&challenge.device_code), &issuer).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::InvalidGrant);
    }

    #[test]
    fn denied_challenge_is_access_denied() {
        let registrar = registrar();
        let mut authorizer = AuthorizationCodeMap::new(RandGenerator::new(16));
        let mut devices = DeviceChallengeMap::new();
        let mut par = PushedRequestMap::new();
        let issuer = TokenMap::new(RandGenerator::new(16));
        let config = config(0);
        let grant = DeviceCodeGrant;

        let challenge = devices.create("device-app".into(), "read".parse().unwrap(), Utc::now() + Duration::minutes(15));
        devices.set_approval(&challenge.user_code, false).unwrap();

        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &config,
        };
        let error = grant.validate(&mut ctx, &body(&challenge.device_code), &issuer).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::AccessDenied);
    }

    #[test]
    fn unknown_device_code_is_invalid_grant() {
        let registrar = registrar();
        let mut authorizer = AuthorizationCodeMap::new(RandGenerator::new(16));
        let mut devices = DeviceChallengeMap::new();
        let mut par = PushedRequestMap::new();
        let issuer = TokenMap::new(RandGenerator::new(16));
        let config = config(0);
        let grant = DeviceCodeGrant;

        let mut ctx = GrantContext {
            registrar: &registrar,
            authorizer: &mut authorizer,
            devices: &mut devices,
            par: &mut par,
            config: &config,
        };
        let error = grant.validate(&mut ctx, &body("does-not-exist"), &issuer).unwrap_err();
        assert_eq!(error.code, OAuthErrorCode::InvalidGrant);
    }
}
