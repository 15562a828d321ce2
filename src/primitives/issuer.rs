//! Issuers mint access, refresh, and ID tokens and keep track of their validity.
//!
//! Issuance is atomic: a single call produces every token a grant is entitled to, and rotation
//! of a refresh token revokes its predecessor in the same call. This mirrors the
//! `issueTokens`/`exchange` contract the grant-type layer relies on — see `grant_type` and
//! `persistence`.
use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use serde_json::json;

use super::generator::TagGenerator;
use super::grant::Grant;
use super::scope::Scope;
use super::Time;

/// A minted, revocable access token.
#[derive(Clone, Debug)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub subject: Option<String>,
    pub scope: Scope,
    pub until: Time,
    pub revoked_at: Option<Time>,
}

impl AccessToken {
    /// An access token is active iff it has not been revoked and its expiry is strictly in the
    /// future.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.until > Utc::now()
    }
}

/// A minted, revocable refresh token.
#[derive(Clone, Debug)]
pub struct RefreshToken {
    pub token: String,
    pub client_id: String,
    pub subject: Option<String>,
    pub scope: Scope,
    pub until: Time,
    pub revoked_at: Option<Time>,
}

impl RefreshToken {
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.until > Utc::now()
    }
}

/// The full bundle produced by one issuance, matching the token endpoint's success response.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub until: Time,
}

/// Issuers mint and track bearer tokens.
///
/// It is the issuer's decision whether a refresh or ID token accompanies the access token; that
/// decision follows from `Grant::wants_refresh_token`/`wants_id_token`, which the grant-type
/// layer has already evaluated by the time `issue` is called.
pub trait Issuer {
    /// Issue a full token bundle for `grant`. Always produces an access token; a refresh token
    /// and ID token are included exactly when the grant calls for them. `issuer` is the `iss`
    /// claim for any ID token minted alongside it.
    fn issue(&mut self, grant: Grant, issuer: &str) -> Result<IssuedToken, ()>;

    /// Rotate a refresh token: the token named by `old_refresh_token` is revoked atomically with
    /// the issuance of a new bundle for `grant`. Must fail if the old refresh token is unknown,
    /// already revoked, or expired. The new refresh token keeps the scope ceiling of the one it
    /// replaces rather than the (possibly narrower) scope requested for this one exchange, so a
    /// later exchange can still request up to that original ceiling.
    fn refresh(&mut self, old_refresh_token: &str, grant: Grant, issuer: &str) -> Result<IssuedToken, ()>;

    /// Look up the grant behind an access token, ignoring whether it is still active; callers
    /// check `AccessToken::is_active` themselves.
    fn recover_token(&self, token: &str) -> Result<Option<AccessToken>, ()>;

    /// Look up the grant behind a refresh token.
    fn recover_refresh(&self, token: &str) -> Result<Option<RefreshToken>, ()>;

    /// Revoke an access token. A no-op, not an error, if the token is unknown — revocation is
    /// defined to always succeed from the caller's perspective.
    fn revoke_access_token(&mut self, token: &str) -> Result<(), ()>;

    /// Revoke a refresh token. Same semantics as `revoke_access_token`.
    fn revoke_refresh_token(&mut self, token: &str) -> Result<(), ()>;
}

struct Entry {
    access: Arc<str>,
    refresh: Option<Arc<str>>,
    grant: Grant,
    /// The scope ceiling a refresh token was originally issued with. Preserved unchanged across
    /// rotations, independent of how far an individual exchange narrows `grant.scope` for that
    /// one access token.
    refresh_scope: Scope,
    access_revoked_at: Option<Time>,
    refresh_revoked_at: Option<Time>,
}

/// An in-memory `Issuer` backed by hash maps, generating tokens with a pluggable
/// `TagGenerator`.
pub struct TokenMap<G: TagGenerator = Box<dyn TagGenerator + Send + Sync + 'static>> {
    duration: Option<Duration>,
    generator: G,
    usage: u64,
    access: HashMap<Arc<str>, Arc<Entry>>,
    refresh: HashMap<Arc<str>, Arc<Entry>>,
}

impl<G: TagGenerator> TokenMap<G> {
    /// Construct an empty token store generating tokens with `generator`.
    pub fn new(generator: G) -> Self {
        TokenMap { duration: None, generator, usage: 0, access: HashMap::new(), refresh: HashMap::new() }
    }

    /// Override the validity period of every subsequently issued access token.
    pub fn valid_for(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    fn apply_duration(&self, grant: &mut Grant) {
        if let Some(duration) = &self.duration {
            grant.until = Utc::now() + *duration;
        }
    }

    fn next_tag(&mut self, grant: &Grant) -> Result<String, ()> {
        let tag = self.generator.tag(self.usage, grant).map_err(|_| ())?;
        self.usage = self.usage.wrapping_add(1);
        Ok(tag)
    }
}

/// Build an unsigned, structured ID token: a base64url-encoded JSON document of standard and
/// custom claims. The core does not mandate a JWT format for access tokens and, likewise,
/// leaves signing of this document to the persistence adapter if one is required downstream.
fn encode_id_token(grant: &Grant, issuer: &str) -> Option<String> {
    let subject = grant.subject.as_deref()?;
    let mut claims = json!({
        "iss": issuer,
        "sub": subject,
        "aud": grant.client_id,
        "exp": grant.until.timestamp(),
        "iat": Utc::now().timestamp(),
    });
    if let (Some(extra), Some(claims_obj)) = (grant.id_token_claims.as_ref(), claims.as_object_mut()) {
        if let Some(extra_obj) = extra.as_object() {
            for (key, value) in extra_obj {
                claims_obj.insert(key.clone(), value.clone());
            }
        }
    }
    Some(URL_SAFE_NO_PAD.encode(claims.to_string()))
}

impl<G: TagGenerator> Issuer for TokenMap<G> {
    fn issue(&mut self, mut grant: Grant, issuer: &str) -> Result<IssuedToken, ()> {
        self.apply_duration(&mut grant);
        let until = grant.until;
        let wants_refresh = grant.wants_refresh_token();
        let wants_id_token = grant.wants_id_token();
        let id_token = if wants_id_token { encode_id_token(&grant, issuer) } else { None };
        let refresh_scope = grant.scope.clone();

        let access = self.next_tag(&grant)?;
        let refresh = if wants_refresh { Some(self.next_tag(&grant)?) } else { None };

        let access_key: Arc<str> = Arc::from(access.clone());
        let refresh_key = refresh.clone().map(Arc::<str>::from);
        let entry = Arc::new(Entry {
            access: access_key.clone(),
            refresh: refresh_key.clone(),
            grant,
            refresh_scope,
            access_revoked_at: None,
            refresh_revoked_at: None,
        });

        self.access.insert(access_key, entry.clone());
        if let Some(refresh_key) = refresh_key {
            self.refresh.insert(refresh_key, entry);
        }

        Ok(IssuedToken { access_token: access, refresh_token: refresh, id_token, until })
    }

    fn refresh(&mut self, old_refresh_token: &str, mut grant: Grant, issuer: &str) -> Result<IssuedToken, ()> {
        let (old_key, old_entry) = self.refresh.remove_entry(old_refresh_token).ok_or(())?;
        if old_entry.refresh_revoked_at.is_some() {
            return Err(());
        }
        self.access.remove(&old_entry.access);
        let refresh_scope = old_entry.refresh_scope.clone();

        self.apply_duration(&mut grant);
        let until = grant.until;
        let wants_id_token = grant.wants_id_token();
        let id_token = if wants_id_token { encode_id_token(&grant, issuer) } else { None };

        let new_access = self.next_tag(&grant)?;
        let new_refresh = self.next_tag(&grant)?;

        let access_key: Arc<str> = Arc::from(new_access.clone());
        let refresh_key: Arc<str> = Arc::from(new_refresh.clone());
        let entry = Arc::new(Entry {
            access: access_key.clone(),
            refresh: Some(refresh_key.clone()),
            grant,
            refresh_scope,
            access_revoked_at: None,
            refresh_revoked_at: None,
        });

        self.access.insert(access_key, entry.clone());
        self.refresh.insert(refresh_key, entry);
        drop(old_key);

        Ok(IssuedToken {
            access_token: new_access,
            refresh_token: Some(new_refresh),
            id_token,
            until,
        })
    }

    fn recover_token(&self, token: &str) -> Result<Option<AccessToken>, ()> {
        Ok(self.access.get(token).map(|entry| AccessToken {
            token: entry.access.to_string(),
            client_id: entry.grant.client_id.clone(),
            subject: entry.grant.subject.clone(),
            scope: entry.grant.scope.clone(),
            until: entry.grant.until,
            revoked_at: entry.access_revoked_at,
        }))
    }

    fn recover_refresh(&self, token: &str) -> Result<Option<RefreshToken>, ()> {
        Ok(self.refresh.get(token).map(|entry| RefreshToken {
            token: entry.refresh.as_ref().map(ToString::to_string).unwrap_or_default(),
            client_id: entry.grant.client_id.clone(),
            subject: entry.grant.subject.clone(),
            scope: entry.refresh_scope.clone(),
            until: entry.grant.until,
            revoked_at: entry.refresh_revoked_at,
        }))
    }

    fn revoke_access_token(&mut self, token: &str) -> Result<(), ()> {
        self.access.remove(token);
        Ok(())
    }

    fn revoke_refresh_token(&mut self, token: &str) -> Result<(), ()> {
        self.refresh.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::generator::RandGenerator;

    fn grant(scope: &str, subject: Option<&str>) -> Grant {
        Grant {
            client_id: "app".into(),
            subject: subject.map(str::to_string),
            scope: scope.parse().unwrap(),
            until: Utc::now() + Duration::hours(1),
            id_token_claims: None,
        }
    }

    #[test]
    fn issues_refresh_and_id_token_when_entitled() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let issued = issuer
            .issue(grant("read offline_access openid", Some("alice")), "https://as.example")
            .unwrap();
        assert!(issued.refresh_token.is_some());
        assert!(issued.id_token.is_some());
    }

    #[test]
    fn withholds_refresh_and_id_token_without_entitlement() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let issued = issuer.issue(grant("read", None), "https://as.example").unwrap();
        assert!(issued.refresh_token.is_none());
        assert!(issued.id_token.is_none());
    }

    #[test]
    fn id_token_names_the_server_as_issuer() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let issued = issuer
            .issue(grant("read openid", Some("alice")), "https://as.example")
            .unwrap();
        let id_token = issued.id_token.unwrap();
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(id_token).unwrap()).unwrap();
        assert_eq!(claims["iss"], "https://as.example");
        assert_eq!(claims["aud"], "app");
    }

    #[test]
    fn refresh_rotation_revokes_old_token() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let first = issuer
            .issue(grant("read offline_access", Some("alice")), "https://as.example")
            .unwrap();
        let old_refresh = first.refresh_token.unwrap();

        let second = issuer
            .refresh(&old_refresh, grant("read", Some("alice")), "https://as.example")
            .unwrap();
        assert!(second.refresh_token.is_some());
        assert_ne!(second.access_token, first.access_token);

        assert!(issuer
            .refresh(&old_refresh, grant("read", Some("alice")), "https://as.example")
            .is_err());
    }

    #[test]
    fn rotation_narrows_only_the_access_token_not_the_refresh_ceiling() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let first = issuer
            .issue(grant("read offline_access", Some("alice")), "https://as.example")
            .unwrap();
        let r1 = first.refresh_token.unwrap();

        let second = issuer
            .refresh(&r1, grant("read", Some("alice")), "https://as.example")
            .unwrap();
        let r2 = second.refresh_token.unwrap();

        let recovered = issuer.recover_refresh(&r2).unwrap().unwrap();
        assert!(recovered.scope.contains("read"));
        assert!(recovered.scope.contains("offline_access"), "the ceiling must survive narrowing");

        // R2 can still be exchanged for the original, broader scope.
        let widened = issuer
            .refresh(&r2, grant("read offline_access", Some("alice")), "https://as.example")
            .unwrap();
        assert!(widened.refresh_token.is_some());
    }

    #[test]
    fn recovers_active_access_token() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let issued = issuer.issue(grant("read", Some("alice")), "https://as.example").unwrap();
        let recovered = issuer.recover_token(&issued.access_token).unwrap().unwrap();
        assert!(recovered.is_active());
        assert_eq!(recovered.client_id, "app");
    }

    #[test]
    fn revoked_access_token_is_gone() {
        let mut issuer = TokenMap::new(RandGenerator::new(16));
        let issued = issuer.issue(grant("read", Some("alice")), "https://as.example").unwrap();
        issuer.revoke_access_token(&issued.access_token).unwrap();
        assert!(issuer.recover_token(&issued.access_token).unwrap().is_none());
    }
}
