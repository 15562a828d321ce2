//! Generators produce the opaque strings used as authorization codes, access and refresh
//! tokens, device codes, user codes, and PAR request URIs.
//!
//! The only implementation provided draws its entropy from a cryptographically secure RNG; an
//! assertion-based, storage-free generator (trading revocability for statelessness) is
//! deliberately not provided, matching this engine's persistence-backed design.
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::rngs::{OsRng, StdRng, ThreadRng};
use rand::{CryptoRng, Rng, RngCore, SeedableRng};

use super::grant::Grant;

/// Produces an opaque tag for a grant.
///
/// The interface is reused for authorization codes, bearer tokens, refresh tokens, and device
/// codes. When queried without repetition, the output must be indistinguishable from a random
/// function: no token may be derivable from another. The `usage` counter lets a caller request
/// several distinct tags for the same grant (for instance, one for the access token and one for
/// the paired refresh token) without the generator reusing entropy.
pub trait TagGenerator {
    /// Produce a fresh opaque tag bound to `grant`. Implementations that consult `grant` at all
    /// are expected to do so only to vary the encoded length or similar, never to derive the tag
    /// deterministically from it.
    fn tag(&mut self, usage: u64, grant: &Grant) -> Result<String, GeneratorError>;
}

/// The generator's source of entropy has failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorError;

/// A `TagGenerator` backed by a cryptographically secure source of randomness, encoding its
/// output as unpadded URL-safe base64.
pub struct RandGenerator<T> {
    rand: T,
    len: usize,
}

impl RandGenerator<StdRng> {
    /// A generator seeded from OS entropy at construction time, reused for subsequent calls.
    pub fn new_std_rng(len: usize) -> Self {
        RandGenerator { rand: SeedableRng::from_entropy(), len }
    }
}

impl RandGenerator<OsRng> {
    /// A generator reading directly from the OS entropy source on every call.
    pub fn new_os_rng(len: usize) -> Self {
        RandGenerator { rand: OsRng, len }
    }
}

impl RandGenerator<ThreadRng> {
    /// A generator backed by the thread-local RNG. The common default.
    pub fn new(len: usize) -> Self {
        RandGenerator { rand: rand::thread_rng(), len }
    }
}

impl<T> RandGenerator<T>
where
    T: CryptoRng + RngCore,
{
    /// Build a generator from an arbitrary cryptographically secure RNG, producing tags of
    /// `len` random bytes before base64 encoding.
    pub fn from_rng(rand: T, len: usize) -> Self {
        RandGenerator { rand, len }
    }

    fn generate(&mut self) -> Result<String, GeneratorError> {
        let mut bytes = vec![0u8; self.len];
        self.rand.try_fill_bytes(&mut bytes).map_err(|_| GeneratorError)?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }
}

impl<T> TagGenerator for RandGenerator<T>
where
    T: CryptoRng + RngCore,
{
    fn tag(&mut self, _usage: u64, _grant: &Grant) -> Result<String, GeneratorError> {
        self.generate()
    }
}

impl<T: TagGenerator + ?Sized> TagGenerator for Box<T> {
    fn tag(&mut self, usage: u64, grant: &Grant) -> Result<String, GeneratorError> {
        (**self).tag(usage, grant)
    }
}

/// Format a freshly generated random byte string as a device-flow user code: eight uppercase
/// alphanumeric characters split into two hyphenated groups of four, e.g. `WDJB-MJHT`, per
/// RFC 8628's recommendation to keep the code short and easy to transcribe by hand.
pub fn format_user_code<T: Rng + ?Sized>(rng: &mut T) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let code: String = (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..ALPHABET.len());
            ALPHABET[idx] as char
        })
        .collect();
    format!("{}-{}", &code[..4], &code[4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::scope::Scope;

    fn build_grant() -> Grant {
        Grant {
            client_id: "client".into(),
            subject: Some("alice".into()),
            scope: "read".parse::<Scope>().unwrap(),
            until: chrono::Utc::now(),
            id_token_claims: None,
        }
    }

    #[test]
    fn generators_produce_distinct_tags() {
        let mut generator = RandGenerator::new(32);
        let grant = build_grant();
        let first = generator.tag(0, &grant).unwrap();
        let second = generator.tag(1, &grant).unwrap();
        assert_ne!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn user_code_has_expected_shape() {
        let mut rng = rand::thread_rng();
        let code = format_user_code(&mut rng);
        assert_eq!(code.len(), 9);
        assert_eq!(code.chars().nth(4), Some('-'));
    }

    #[test]
    fn assert_send_sync_static() {
        fn uses<T: Send + Sync + 'static>(_: T) {}
        uses(RandGenerator::new_os_rng(16));
        uses(RandGenerator::new_std_rng(16));
    }
}
