//! Defines the `Scope` type and its parsing/formatting/ordering rules.
use std::{cmp, fmt, str};

use std::collections::HashSet;
use serde::{Deserialize, Serialize};

/// Scope of a given grant or resource, a set of scope-tokens separated by spaces.
///
/// Scopes are interpreted as a conjunction of scope tokens, i.e. a scope is fulfilled if all of
/// its scope tokens are fulfilled. This induces a partial ordering on scopes where scope `A`
/// is less or equal than scope `B` if all scope tokens of `A` are also found in `B`. This can be
/// interpreted as the rule
/// > A token with scope `B` is allowed to access a resource requiring scope `A` iff `A <= B`
///
/// ```
/// # use std::cmp;
/// # use oxide_oidc::primitives::scope::Scope;
/// let grant_scope    = "read offline_access".parse::<Scope>().unwrap();
/// let resource_scope = "read".parse::<Scope>().unwrap();
///
/// assert!(resource_scope <= grant_scope);
/// assert!(resource_scope.allow_access(&grant_scope));
/// ```
///
/// Scope-tokens are restricted to the following subset of ascii:
///   - The character `!`
///   - The character range `\x23` to `\x5b`, which includes numbers and upper case letters
///   - The character range `\x5d` to `\x7e`, which includes lower case letters
/// Individual scope-tokens are separated by spaces. The characters `"` and `\` are not allowed.
#[derive(Clone, PartialEq, Eq)]
pub struct Scope {
    tokens: HashSet<String>,
}

impl Serialize for Scope {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let string: &str = Deserialize::deserialize(deserializer)?;
        str::FromStr::from_str(string).map_err(serde::de::Error::custom)
    }
}

impl Scope {
    /// The empty scope, satisfied by any grant and satisfying no requirement.
    pub fn empty() -> Self {
        Scope { tokens: HashSet::new() }
    }

    fn invalid_scope_char(ch: char) -> bool {
        match ch {
            '\x21' => false,
            ch if ('\x23'..='\x5b').contains(&ch) => false,
            ch if ('\x5d'..='\x7e').contains(&ch) => false,
            ' ' => false,
            _ => true,
        }
    }

    /// Determine if this scope has enough privileges to access some resource requiring the scope
    /// on the right side. Equivalent to comparison via `>=`.
    pub fn privileged_to(&self, rhs: &Scope) -> bool {
        rhs <= self
    }

    /// Determine if a resource protected by this scope should allow access to a token with the
    /// grant on the right side. Equivalent to comparison via `<=`.
    pub fn allow_access(&self, rhs: &Scope) -> bool {
        self <= rhs
    }

    /// Whether a single scope token is present.
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    /// Iterate over the individual scope tokens.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(AsRef::as_ref)
    }

    /// Intersect this scope with another, keeping only tokens present in both.
    pub fn intersection(&self, rhs: &Scope) -> Scope {
        Scope {
            tokens: self.tokens.intersection(&rhs.tokens).cloned().collect(),
        }
    }

    /// True if every token in `self` is also present in `rhs`.
    pub fn is_subset_of(&self, rhs: &Scope) -> bool {
        self.tokens.is_subset(&rhs.tokens)
    }

    /// Number of scope tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if no scope tokens are present.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Error returned from parsing a scope as encoded in an authorization token request.
#[derive(Debug)]
pub enum ParseScopeErr {
    /// A character was encountered which is not allowed to appear in scope strings.
    InvalidCharacter(char),
}

impl str::FromStr for Scope {
    type Err = ParseScopeErr;

    fn from_str(string: &str) -> Result<Scope, ParseScopeErr> {
        if let Some(ch) = string.chars().find(|&ch| Scope::invalid_scope_char(ch)) {
            return Err(ParseScopeErr::InvalidCharacter(ch));
        }
        let tokens = string.split(' ').filter(|s| !s.is_empty());
        Ok(Scope {
            tokens: tokens.map(str::to_string).collect(),
        })
    }
}

impl fmt::Display for ParseScopeErr {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseScopeErr::InvalidCharacter(chr) => {
                write!(fmt, "encountered invalid character in scope: {:?}", chr)
            }
        }
    }
}

impl std::error::Error for ParseScopeErr {}

impl fmt::Debug for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("Scope").field(&self.to_string()).finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let mut tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        tokens.sort_unstable();
        fmt.write_str(&tokens.join(" "))
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, rhs: &Self) -> Option<cmp::Ordering> {
        let intersect_count = self.tokens.intersection(&rhs.tokens).count();
        if intersect_count == self.tokens.len() && intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Equal)
        } else if intersect_count == self.tokens.len() {
            Some(cmp::Ordering::Less)
        } else if intersect_count == rhs.tokens.len() {
            Some(cmp::Ordering::Greater)
        } else {
            None
        }
    }
}

impl FromIterator<String> for Scope {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Scope { tokens: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats() {
        let scope = "read offline_access openid".parse::<Scope>().unwrap();
        let again = scope.to_string().parse::<Scope>().unwrap();
        assert_eq!(scope, again);
    }

    #[test]
    fn ordering_and_subset() {
        let base = "read write".parse::<Scope>().unwrap();
        let less = "read".parse::<Scope>().unwrap();
        let uncomparable = "read delete".parse::<Scope>().unwrap();

        assert!(less <= base);
        assert!(less.allow_access(&base));
        assert!(base.privileged_to(&less));
        assert!(less.is_subset_of(&base));
        assert_eq!(base.partial_cmp(&uncomparable), None);
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!("read\"write".parse::<Scope>().is_err());
    }

    #[test]
    fn intersection() {
        let requested = "read write delete".parse::<Scope>().unwrap();
        let allowed = "read write".parse::<Scope>().unwrap();
        let intersected = requested.intersection(&allowed);
        assert!(intersected.contains("read"));
        assert!(intersected.contains("write"));
        assert!(!intersected.contains("delete"));
    }
}
