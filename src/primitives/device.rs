//! Tracks device-authorization challenges for the device code grant (RFC 8628).
use std::collections::HashMap;
use std::sync::RwLock;

use rand::Rng;

use super::generator::format_user_code;
use super::scope::Scope;
use super::Time;

/// A single device-authorization challenge, from `./device` until it is exchanged or expires.
#[derive(Clone, Debug)]
pub struct DeviceChallenge {
    pub device_code: String,
    pub user_code: String,
    pub client_id: String,
    pub scope: Scope,
    pub expires_at: Time,

    /// `None` while the user has not yet acted, `Some(true)` once approved, `Some(false)` once
    /// denied.
    pub approved: Option<bool>,

    /// Updated on every poll so the next poll can be rate-limited against the configured
    /// interval.
    pub last_poll_at: Option<Time>,

    /// Set once a poll has successfully exchanged this challenge for tokens, so a second
    /// exchange attempt is rejected even though `approved` remains `Some(true)`.
    pub used_at: Option<Time>,
}

impl DeviceChallenge {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now()
    }
}

/// Outcome of a single poll against a device challenge, matching RFC 8628's token-endpoint
/// states one-to-one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Not yet acted on by the user.
    AuthorizationPending,
    /// Polled again before the configured interval elapsed.
    SlowDown,
    /// The user denied the request.
    AccessDenied,
    /// The challenge has expired.
    ExpiredToken,
    /// Approved and not yet exchanged: ready for token issuance.
    Ready,
    /// Approved but already exchanged once: a replay.
    AlreadyUsed,
}

/// Stores device-authorization challenges.
pub trait DeviceChallengeStore {
    /// Create a new challenge for `client_id` requesting `scope`, valid until `expires_at`.
    fn create(&mut self, client_id: String, scope: Scope, expires_at: Time) -> DeviceChallenge;

    /// Poll a challenge by its device code: updates `last_poll_at` and returns the outcome,
    /// rate-limited against `interval`. Returns `None` if the device code is unknown.
    fn poll(&mut self, device_code: &str, interval: chrono::Duration) -> Option<PollOutcome>;

    /// Mark an approved-and-unused challenge as exchanged, returning its stored scope and
    /// client id for issuance. Fails if the challenge is not in the `Ready` state.
    fn exchange(&mut self, device_code: &str) -> Result<(String, Scope), ()>;

    /// Resolve a user-facing approval decision for `user_code`.
    fn set_approval(&mut self, user_code: &str, approved: bool) -> Result<(), ()>;
}

/// An in-memory `DeviceChallengeStore` backed by a hash map.
#[derive(Default)]
pub struct DeviceChallengeMap {
    by_device_code: RwLock<HashMap<String, DeviceChallenge>>,
}

impl DeviceChallengeMap {
    pub fn new() -> Self {
        DeviceChallengeMap::default()
    }
}

impl DeviceChallengeStore for DeviceChallengeMap {
    fn create(&mut self, client_id: String, scope: Scope, expires_at: Time) -> DeviceChallenge {
        let mut rng = rand::thread_rng();
        let device_code = {
            let mut bytes = [0u8; 32];
            rng.fill(&mut bytes);
            hex_encode(&bytes)
        };
        let user_code = format_user_code(&mut rng);

        let challenge = DeviceChallenge {
            device_code: device_code.clone(),
            user_code,
            client_id,
            scope,
            expires_at,
            approved: None,
            last_poll_at: None,
            used_at: None,
        };

        self.by_device_code
            .write()
            .expect("device challenge map lock poisoned")
            .insert(device_code, challenge.clone());
        challenge
    }

    fn poll(&mut self, device_code: &str, interval: chrono::Duration) -> Option<PollOutcome> {
        let mut challenges = self.by_device_code.write().expect("device challenge map lock poisoned");
        let challenge = challenges.get_mut(device_code)?;

        if challenge.is_expired() {
            return Some(PollOutcome::ExpiredToken);
        }

        let now = chrono::Utc::now();
        if let Some(last) = challenge.last_poll_at {
            if now - last < interval {
                return Some(PollOutcome::SlowDown);
            }
        }
        challenge.last_poll_at = Some(now);

        Some(match challenge.approved {
            None => PollOutcome::AuthorizationPending,
            Some(false) => PollOutcome::AccessDenied,
            Some(true) if challenge.used_at.is_some() => PollOutcome::AlreadyUsed,
            Some(true) => PollOutcome::Ready,
        })
    }

    fn exchange(&mut self, device_code: &str) -> Result<(String, Scope), ()> {
        let mut challenges = self.by_device_code.write().expect("device challenge map lock poisoned");
        let challenge = challenges.get_mut(device_code).ok_or(())?;

        if challenge.is_expired() || challenge.approved != Some(true) || challenge.used_at.is_some() {
            return Err(());
        }

        challenge.used_at = Some(chrono::Utc::now());
        Ok((challenge.client_id.clone(), challenge.scope.clone()))
    }

    fn set_approval(&mut self, user_code: &str, approved: bool) -> Result<(), ()> {
        let mut challenges = self.by_device_code.write().expect("device challenge map lock poisoned");
        let challenge = challenges.values_mut().find(|c| c.user_code == user_code).ok_or(())?;
        challenge.approved = Some(approved);
        Ok(())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{:02x}", byte).expect("writing to a String never fails");
    }
    out
}
