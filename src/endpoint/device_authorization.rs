//! `./device` (RFC 8628 §3.1): issues a device/user code pair for later polling.
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::request::{self, ParsedBody};
use crate::server::AuthorizationServer;

#[derive(Clone, Debug)]
pub struct DeviceAuthorizationResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub verification_uri_complete: String,
    pub expires_in: i64,
    pub interval: i64,
}

impl DeviceAuthorizationResponse {
    pub fn to_json(&self) -> Value {
        json!({
            "device_code": self.device_code,
            "user_code": self.user_code,
            "verification_uri": self.verification_uri,
            "verification_uri_complete": self.verification_uri_complete,
            "expires_in": self.expires_in,
            "interval": self.interval,
        })
    }
}

/// Create a device-authorization challenge for `client_id`, optionally scoped.
pub fn device_authorization(
    server: &mut AuthorizationServer, body: &ParsedBody,
) -> Result<DeviceAuthorizationResponse, ErrorResponse> {
    let device_config = server
        .config
        .device_code
        .clone()
        .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::UnsupportedGrantType).with_description("device code grant disabled"))?;

    let client_id = body.require("client_id")?;
    let client = request::resolve_client(server.registrar.as_ref(), &client_id)?;

    let requested = match body.get("scope") {
        Some(scope) => scope.parse().map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidScope))?,
        None => client.allowed_scopes.clone(),
    };
    let scope = request::resolve_scopes(&client, &requested, false)?;

    let expires_at = Utc::now() + Duration::seconds(device_config.ttl);
    let challenge = server.devices.create(client_id.into_owned(), scope, expires_at);

    let verification_uri = server.config.device_endpoint();
    let verification_uri_complete = format!("{verification_uri}?user_code={}", challenge.user_code);

    Ok(DeviceAuthorizationResponse {
        device_code: challenge.device_code,
        user_code: challenge.user_code,
        verification_uri,
        verification_uri_complete,
        expires_in: device_config.ttl,
        interval: device_config.polling_interval,
    })
}
