//! A collection of primitives useful for more than one grant type.
//!
//! A primitive is the smallest independent unit of policy used by the engine. For example, an
//! `authorizer` generates and verifies authorization codes, while a `registrar` knows about
//! registered clients. Abstracting away the underlying storage makes it possible to provide,
//! e.g., an independent database-backed implementation without touching protocol logic.
//!
//! In-memory reference implementations (`ClientMap`, `AuthorizationCodeMap`, `TokenMap`,
//! `DeviceChallengeMap`, `PushedRequestMap`) are provided for tests and prototyping:
//!
//! ```
//! use oxide_oidc::primitives::{
//!     authorizer::AuthorizationCodeMap,
//!     generator::RandGenerator,
//!     issuer::TokenMap,
//!     registrar::ClientMap,
//! };
//!
//! let registrar = ClientMap::new();
//! let authorizer = AuthorizationCodeMap::new(RandGenerator::new(32));
//! let issuer = TokenMap::new(RandGenerator::new(32));
//! ```

use chrono::DateTime;
use chrono::Utc;

pub mod authorizer;
pub mod device;
pub mod generator;
pub mod grant;
pub mod issuer;
pub mod par;
pub mod registrar;
pub mod scope;

type Time = DateTime<Utc>;

/// Commonly used primitives for composing a server.
pub mod prelude {
    pub use super::authorizer::{AuthorizationCode, AuthorizationCodeMap, Authorizer};
    pub use super::device::{DeviceChallenge, DeviceChallengeMap, DeviceChallengeStore, PollOutcome};
    pub use super::generator::{RandGenerator, TagGenerator};
    pub use super::grant::{Grant, PkceChallenge, PkceMethod};
    pub use super::issuer::{AccessToken, IssuedToken, Issuer, RefreshToken, TokenMap};
    pub use super::par::{PushedAuthorizationRequest, PushedRequestMap, PushedRequestStore};
    pub use super::registrar::{Client, ClientMap, Registrar, RegistrarError};
    pub use super::scope::Scope;
}
