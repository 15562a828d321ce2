//! `./.well-known/oauth-authorization-server` (RFC 8414).
use serde_json::{json, Map, Value};

use crate::server::AuthorizationServer;

/// Build the server-metadata document from configuration. Only fields applicable to enabled
/// features are emitted; a zero-element array is omitted entirely rather than serialized empty.
pub fn server_metadata(server: &AuthorizationServer) -> Value {
    let config = &server.config;
    let mut grant_types_supported = Vec::new();
    let mut response_types_supported = Vec::new();
    let mut response_modes_supported = Vec::new();
    let mut code_challenge_methods_supported = Vec::new();

    if let Some(authorization_code) = &config.authorization_code {
        grant_types_supported.push("authorization_code".to_string());
        response_types_supported.extend(authorization_code.response_types_supported.iter().cloned());
        response_modes_supported.extend(authorization_code.response_modes_supported.iter().cloned());
        code_challenge_methods_supported.extend(authorization_code.code_challenge_methods_supported.iter().cloned());
    }
    if config.refresh_token.is_some() {
        grant_types_supported.push("refresh_token".to_string());
    }
    if config.client_credentials.is_some() {
        grant_types_supported.push("client_credentials".to_string());
    }
    if config.device_code.is_some() {
        grant_types_supported.push("urn:ietf:params:oauth:grant-type:device_code".to_string());
    }

    let mut document = Map::new();
    document.insert("issuer".into(), json!(config.issuer));
    document.insert("token_endpoint".into(), json!(config.token_endpoint()));
    document.insert(
        "token_endpoint_auth_methods_supported".into(),
        json!(config.token.auth_methods_supported),
    );
    document.insert(
        "token_endpoint_auth_signing_alg_values_supported".into(),
        json!(config.token.auth_signing_alg_values_supported),
    );
    document.insert("authorization_response_iss_parameter_supported".into(), json!(true));

    if config.authorization_code.is_some() {
        document.insert("authorization_endpoint".into(), json!(config.authorize_endpoint()));
    }
    if let Some(par) = &config.pushed_authorization_requests {
        document.insert("pushed_authorization_request_endpoint".into(), json!(config.par_endpoint()));
        document.insert("require_pushed_authorization_requests".into(), json!(par.required));
    }
    if config.device_code.is_some() {
        document.insert("device_authorization_endpoint".into(), json!(config.device_endpoint()));
    }
    if config.token_revocation {
        document.insert("revocation_endpoint".into(), json!(config.revocation_endpoint()));
    }
    if config.token_introspection {
        document.insert("introspection_endpoint".into(), json!(config.introspection_endpoint()));
    }

    insert_if_nonempty(&mut document, "grant_types_supported", grant_types_supported);
    insert_if_nonempty(&mut document, "response_types_supported", response_types_supported);
    insert_if_nonempty(&mut document, "response_modes_supported", response_modes_supported);
    insert_if_nonempty(&mut document, "code_challenge_methods_supported", code_challenge_methods_supported);

    Value::Object(document)
}

fn insert_if_nonempty(document: &mut Map<String, Value>, key: &str, values: Vec<String>) {
    if !values.is_empty() {
        document.insert(key.into(), json!(values));
    }
}
