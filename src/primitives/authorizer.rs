//! Authorizers issue and redeem authorization codes.
//!
//! The role of an authorizer is to ensure the consistency and security of the exchange in which
//! a client trades an authorization code for a bearer token. It issues codes according to
//! parameters decided at the authorization endpoint, then later validates and consumes them at
//! the token endpoint. A code must never be usable twice, which rules out any stateless
//! implementation.
use std::collections::HashMap;

use super::generator::TagGenerator;
use super::grant::{Grant, PkceChallenge};
use super::Time;

/// An issued, not-yet-redeemed authorization code together with everything needed to validate
/// its later redemption.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationCode {
    /// The grant this code will be exchanged for, once redeemed.
    pub grant: Grant,

    /// The exact `redirect_uri` supplied when this code was issued; the token request's
    /// `redirect_uri` must match it exactly.
    pub redirect_uri: String,

    /// The PKCE challenge bound to this code, if the authorization request carried one.
    pub pkce: Option<PkceChallenge>,

    /// Set the first time this code is redeemed. A second redemption attempt is `invalid_grant`
    /// even before expiry.
    pub used_at: Option<Time>,
}

/// Authorizers create and redeem authorization codes.
pub trait Authorizer {
    /// Issue a fresh, single-use code for `grant`, bound to `redirect_uri` and an optional PKCE
    /// challenge.
    fn authorize(
        &mut self, grant: Grant, redirect_uri: String, pkce: Option<PkceChallenge>,
    ) -> Result<String, ()>;

    /// Look up a code without consuming it, to let a caller distinguish "unknown" from "already
    /// used" for more precise error reporting.
    fn peek(&self, code: &str) -> Option<&AuthorizationCode>;

    /// Redeem a code: returns the bound authorization code and marks it used, so any subsequent
    /// redemption attempt fails. A code already marked used is still returned here — callers
    /// must check `used_at` themselves — since distinguishing "used" from "unknown" is part of
    /// the caller's `invalid_grant` diagnostics, not the authorizer's.
    fn extract(&mut self, code: &str) -> Result<Option<AuthorizationCode>, ()>;
}

/// An in-memory `Authorizer` backed by a hash map, generating codes with a pluggable
/// `TagGenerator`.
pub struct AuthorizationCodeMap<I: TagGenerator = Box<dyn TagGenerator + Send + Sync + 'static>> {
    tagger: I,
    usage: u64,
    codes: HashMap<String, AuthorizationCode>,
}

impl<I: TagGenerator> AuthorizationCodeMap<I> {
    /// Create an authorizer generating codes with `tagger`. Starts out empty.
    pub fn new(tagger: I) -> Self {
        AuthorizationCodeMap { tagger, usage: 0, codes: HashMap::new() }
    }
}

impl<I: TagGenerator> Authorizer for AuthorizationCodeMap<I> {
    fn authorize(
        &mut self, grant: Grant, redirect_uri: String, pkce: Option<PkceChallenge>,
    ) -> Result<String, ()> {
        let next_usage = self.usage.wrapping_add(1);
        let code = self.tagger.tag(next_usage - 1, &grant).map_err(|_| ())?;
        self.codes.insert(
            code.clone(),
            AuthorizationCode { grant, redirect_uri, pkce, used_at: None },
        );
        self.usage = next_usage;
        Ok(code)
    }

    fn peek(&self, code: &str) -> Option<&AuthorizationCode> {
        self.codes.get(code)
    }

    fn extract(&mut self, code: &str) -> Result<Option<AuthorizationCode>, ()> {
        match self.codes.get_mut(code) {
            None => Ok(None),
            Some(entry) => {
                let result = entry.clone();
                if entry.used_at.is_none() {
                    entry.used_at = Some(chrono::Utc::now());
                }
                Ok(Some(result))
            }
        }
    }
}
