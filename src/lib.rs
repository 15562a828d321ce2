//! # oxide-oidc
//!
//! A framework-agnostic OAuth 2.1 / OpenID Connect authorization server engine.
//!
//! This crate implements the protocol core — grant validation, token issuance, PKCE, PAR,
//! device authorization, revocation, and introspection — without committing to any particular
//! HTTP framework or storage backend. It is meant to sit behind a thin adapter: parse the
//! incoming request into a [`request::ParsedBody`], call into [`endpoint`], and translate the
//! result ([`endpoint::TokenResponse`], [`endpoint::AuthorizeOutcome`], ...) into whatever
//! response type your framework expects.
//!
//! ## Assembling a server
//!
//! Choose the [`primitives`] backing your deployment: a [`primitives::registrar::Registrar`],
//! an [`primitives::authorizer::Authorizer`], an [`primitives::issuer::Issuer`], a
//! [`primitives::device::DeviceChallengeStore`], and a [`primitives::par::PushedRequestStore`].
//! In-memory reference implementations of each are provided for tests and prototyping; a
//! production deployment backs these traits with its own client/token database, either directly
//! (if lookups are synchronous) or through [`persistence`]'s async mirror traits, bridged onto a
//! blocking call per request.
//!
//! Build a [`config::ServerConfig`] naming which grants are enabled, then construct a
//! [`server::AuthorizationServer`] from the two. Each enabled grant family is dispatched from
//! [`grant_type`] by its `grant_type` identifier; [`endpoint`] exposes one function per HTTP
//! endpoint (`./token`, `./authorize`, `./device`, `./par`, `./token/revoke`, `./tokeninfo`,
//! `./.well-known/oauth-authorization-server`) that a framework adapter calls directly.
//!
//! ```
//! use oxide_oidc::config::{AuthorizationCodeConfig, ServerConfig, TokenEndpointConfig};
//! use oxide_oidc::primitives::prelude::*;
//! use oxide_oidc::server::AuthorizationServer;
//!
//! let registrar = ClientMap::new();
//! registrar.register_client(
//!     Client::public("demo", vec!["https://app.example/cb".into()], "read".parse().unwrap())
//!         .allowing_grant_types(["authorization_code"]),
//! );
//!
//! let config = ServerConfig {
//!     issuer: "https://as.example".into(),
//!     base_uri: None,
//!     access_token_ttl: 3600,
//!     refresh_token_ttl: 604_800,
//!     id_token_ttl: None,
//!     authorization_code: Some(AuthorizationCodeConfig::default()),
//!     refresh_token: None,
//!     client_credentials: None,
//!     device_code: None,
//!     pushed_authorization_requests: None,
//!     token_revocation: false,
//!     token_introspection: false,
//!     server_metadata: true,
//!     token: TokenEndpointConfig::default(),
//! };
//!
//! let _server = AuthorizationServer::new(
//!     config,
//!     Box::new(registrar),
//!     Box::new(AuthorizationCodeMap::new(RandGenerator::new(32))),
//!     Box::new(TokenMap::new(RandGenerator::new(32))),
//!     Box::new(DeviceChallengeMap::new()),
//!     Box::new(PushedRequestMap::new()),
//! );
//! ```
//!
//! ## Non-goals
//!
//! This crate does not parse HTTP itself, run a consent UI, manage user sessions, or sign ID
//! tokens with a JOSE library — [`endpoint::authorize`] takes an already-authenticated `subject`
//! and expects the caller to have obtained the resource owner's consent beforehand.
#![warn(missing_docs)]

pub mod config;
pub mod endpoint;
pub mod error;
pub mod grant_type;
pub mod persistence;
pub mod primitives;
pub mod request;
pub mod server;
