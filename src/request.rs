//! Request-body parsing and the common resolution steps shared by every endpoint: loading the
//! client, intersecting scopes, and authenticating a bearer token.
use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::{ErrorResponse, OAuthErrorCode};
use crate::primitives::issuer::{AccessToken, Issuer};
use crate::primitives::registrar::{Client, Registrar, RegistrarError};
use crate::primitives::scope::Scope;

/// A request body parsed into a flat map of parameter name to value.
///
/// Built from `application/x-www-form-urlencoded`, `multipart/form-data`, or
/// `application/json`; unrecognized parameters are ignored by callers, absent values are
/// treated as missing, and duplicate parameters are rejected while parsing.
#[derive(Clone, Debug, Default)]
pub struct ParsedBody {
    params: HashMap<String, String>,
}

impl ParsedBody {
    /// Parse a `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &str) -> Result<Self, ErrorResponse> {
        let mut params = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let key = key.into_owned();
            if params.insert(key.clone(), value.into_owned()).is_some() {
                return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest)
                    .with_description(format!("duplicate parameter: {key}")));
            }
        }
        Ok(ParsedBody { params })
    }

    /// Parse a `multipart/form-data` body given its declared boundary. Each part must carry a
    /// `Content-Disposition: form-data; name="..."` header; this protocol has no use for file
    /// parts, so content is decoded as UTF-8 text exactly like the other two body formats.
    pub fn from_multipart(body: &str, boundary: &str) -> Result<Self, ErrorResponse> {
        let delimiter = format!("--{boundary}");
        let mut params = HashMap::new();

        for part in body.split(delimiter.as_str()).skip(1) {
            let part = part.strip_prefix("\r\n").or_else(|| part.strip_prefix('\n')).unwrap_or(part);
            if part.starts_with("--") {
                break;
            }

            let (headers, content) = part
                .split_once("\r\n\r\n")
                .or_else(|| part.split_once("\n\n"))
                .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("malformed multipart part"))?;

            let name = headers
                .lines()
                .find_map(|line| {
                    let line = line.trim();
                    if !line.to_ascii_lowercase().starts_with("content-disposition") {
                        return None;
                    }
                    line.split(';').find_map(|field| field.trim().strip_prefix("name=\"")?.strip_suffix('"'))
                })
                .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("multipart part missing a name"))?;

            let value = content.strip_suffix("\r\n").or_else(|| content.strip_suffix('\n')).unwrap_or(content);
            if value.is_empty() {
                continue;
            }
            if params.insert(name.to_string(), value.to_string()).is_some() {
                return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest)
                    .with_description(format!("duplicate parameter: {name}")));
            }
        }

        Ok(ParsedBody { params })
    }

    /// Parse an `application/json` body, which must decode to a flat object of string values.
    pub fn from_json(body: &str) -> Result<Self, ErrorResponse> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|_| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("malformed JSON body"))?;
        let object = value
            .as_object()
            .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("JSON body must be an object"))?;

        let mut params = HashMap::new();
        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) if !s.is_empty() => s.clone(),
                serde_json::Value::Null => continue,
                _ => {
                    return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest)
                        .with_description(format!("parameter must be a string: {key}")))
                }
            };
            params.insert(key.clone(), value);
        }
        Ok(ParsedBody { params })
    }

    /// Look up a parameter, borrowing where possible.
    pub fn get(&self, key: &str) -> Option<Cow<'_, str>> {
        self.params.get(key).map(|s| Cow::Borrowed(s.as_str()))
    }

    /// Look up a required parameter, failing with `invalid_request` when absent.
    pub fn require(&self, key: &'static str) -> Result<Cow<'_, str>, ErrorResponse> {
        self.get(key).ok_or_else(|| {
            ErrorResponse::new(OAuthErrorCode::InvalidRequest)
                .with_description(format!("missing required parameter: {key}"))
        })
    }
}

/// Parse a request body according to its declared `Content-Type`, dispatching to the form,
/// JSON, or multipart parser. Parameters the media type carries beyond its base type (e.g. a
/// `charset`) are ignored, except `boundary`, which multipart bodies require.
pub fn parse_body(content_type: &str, body: &str) -> Result<ParsedBody, ErrorResponse> {
    let mut parts = content_type.split(';');
    let media_type = parts.next().unwrap_or("").trim().to_ascii_lowercase();

    match media_type.as_str() {
        "application/x-www-form-urlencoded" => ParsedBody::from_form(body),
        "application/json" => ParsedBody::from_json(body),
        "multipart/form-data" => {
            let boundary = parts
                .find_map(|param| param.trim().strip_prefix("boundary="))
                .map(|boundary| boundary.trim_matches('"'))
                .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("multipart body missing a boundary"))?;
            ParsedBody::from_multipart(body, boundary)
        }
        _ => Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest)
            .with_description(format!("unsupported content type: {content_type}"))),
    }
}

/// Load a client by id, rejecting missing, inactive, or revoked clients uniformly.
pub fn resolve_client(registrar: &dyn Registrar, client_id: &str) -> Result<Client, ErrorResponse> {
    registrar.client(client_id).map_err(|err| match err {
        RegistrarError::NotFound => ErrorResponse::new(OAuthErrorCode::InvalidClient),
        RegistrarError::Backend => ErrorResponse::new(OAuthErrorCode::ServerError),
    })
}

/// Intersect `requested` with `client.allowed_scopes`. In strict mode, any requested token
/// absent from the allowed set fails with `invalid_scope`; otherwise the grant is silently
/// narrowed to the allowed subset.
pub fn resolve_scopes(client: &Client, requested: &Scope, strict: bool) -> Result<Scope, ErrorResponse> {
    if strict && !requested.is_subset_of(&client.allowed_scopes) {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidScope));
    }
    Ok(requested.intersection(&client.allowed_scopes))
}

/// Read the `Authorization: Bearer <token>` header, load the referenced access token, and
/// confirm it is active.
pub fn bearer_token(issuer: &dyn Issuer, authorization_header: Option<&str>) -> Result<AccessToken, ErrorResponse> {
    let header = authorization_header
        .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("missing Authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("unsupported authorization scheme"))?;

    let access_token = issuer
        .recover_token(token)
        .map_err(|_| ErrorResponse::new(OAuthErrorCode::ServerError))?
        .ok_or_else(|| ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("unknown bearer token"))?;

    if !access_token.is_active() {
        return Err(ErrorResponse::new(OAuthErrorCode::InvalidRequest).with_description("bearer token revoked or expired"));
    }

    Ok(access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_body_parses_and_rejects_duplicates() {
        let body = ParsedBody::from_form("client_id=app&scope=read+write").unwrap();
        assert_eq!(body.require("client_id").unwrap(), "app");
        assert_eq!(body.require("scope").unwrap(), "read write");

        assert!(ParsedBody::from_form("client_id=app&client_id=other").is_err());
    }

    #[test]
    fn missing_required_parameter_is_invalid_request() {
        let body = ParsedBody::from_form("client_id=app").unwrap();
        let err = body.require("redirect_uri").unwrap_err();
        assert_eq!(err.code, OAuthErrorCode::InvalidRequest);
    }

    #[test]
    fn json_body_requires_string_values() {
        let body = ParsedBody::from_json(r#"{"client_id": "app", "count": 3}"#);
        assert!(body.is_err());

        let body = ParsedBody::from_json(r#"{"client_id": "app"}"#).unwrap();
        assert_eq!(body.require("client_id").unwrap(), "app");
    }

    #[test]
    fn strict_scope_resolution_rejects_excess() {
        let client = Client::public("app", vec![], "read".parse().unwrap());
        let requested: Scope = "read write".parse().unwrap();
        assert!(resolve_scopes(&client, &requested, true).is_err());
        let narrowed = resolve_scopes(&client, &requested, false).unwrap();
        assert!(narrowed.contains("read"));
        assert!(!narrowed.contains("write"));
    }

    #[test]
    fn multipart_body_parses_named_parts() {
        let body = "--XYZ\r\n\
                     Content-Disposition: form-data; name=\"client_id\"\r\n\r\n\
                     app\r\n\
                     --XYZ\r\n\
                     Content-Disposition: form-data; name=\"scope\"\r\n\r\n\
                     read write\r\n\
                     --XYZ--\r\n";
        let parsed = ParsedBody::from_multipart(body, "XYZ").unwrap();
        assert_eq!(parsed.require("client_id").unwrap(), "app");
        assert_eq!(parsed.require("scope").unwrap(), "read write");
    }

    #[test]
    fn multipart_body_rejects_duplicate_names() {
        let body = "--XYZ\r\n\
                     Content-Disposition: form-data; name=\"client_id\"\r\n\r\n\
                     app\r\n\
                     --XYZ\r\n\
                     Content-Disposition: form-data; name=\"client_id\"\r\n\r\n\
                     other\r\n\
                     --XYZ--\r\n";
        assert!(ParsedBody::from_multipart(body, "XYZ").is_err());
    }

    #[test]
    fn parse_body_dispatches_on_content_type() {
        let form = parse_body("application/x-www-form-urlencoded", "client_id=app").unwrap();
        assert_eq!(form.require("client_id").unwrap(), "app");

        let json = parse_body("application/json; charset=utf-8", r#"{"client_id": "app"}"#).unwrap();
        assert_eq!(json.require("client_id").unwrap(), "app");

        let multipart_body = "--XYZ\r\nContent-Disposition: form-data; name=\"client_id\"\r\n\r\napp\r\n--XYZ--\r\n";
        let multipart = parse_body("multipart/form-data; boundary=XYZ", multipart_body).unwrap();
        assert_eq!(multipart.require("client_id").unwrap(), "app");

        assert!(parse_body("multipart/form-data", multipart_body).is_err());
        assert!(parse_body("text/plain", "client_id=app").is_err());
    }
}
