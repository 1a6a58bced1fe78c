//! Customer referral codes.

use core::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ReferralCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferralCodeError {
    /// The code does not start with the `AE-` prefix.
    #[error("referral code must start with {prefix}")]
    MissingPrefix {
        /// Required prefix.
        prefix: &'static str,
    },
    /// The suffix after the prefix has the wrong length.
    #[error("referral code suffix must be {expected} characters (got {actual})")]
    WrongLength {
        /// Required suffix length.
        expected: usize,
        /// Length found.
        actual: usize,
    },
    /// The suffix contains something other than `A-Z` or `0-9`.
    #[error("referral code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A per-customer referral code, e.g. `AE-7KQ2ZD`.
///
/// Format: the `AE-` prefix followed by six uppercase ASCII letters or digits.
/// A code is generated once when a client profile is created and then kept
/// for the lifetime of the profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReferralCode(String);

impl ReferralCode {
    /// Fixed prefix of every code.
    pub const PREFIX: &'static str = "AE-";
    /// Number of random characters after the prefix.
    pub const SUFFIX_LENGTH: usize = 6;

    const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Generate a fresh random code.
    ///
    /// ```
    /// use amber_eats_core::ReferralCode;
    ///
    /// let code = ReferralCode::generate(&mut rand::rng());
    /// assert!(ReferralCode::parse(code.as_str()).is_ok());
    /// ```
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..Self::SUFFIX_LENGTH)
            .filter_map(|_| Self::ALPHABET.choose(rng).copied().map(char::from))
            .collect();
        Self(format!("{}{suffix}", Self::PREFIX))
    }

    /// Parse an existing code.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix, length or character set is wrong.
    pub fn parse(s: &str) -> Result<Self, ReferralCodeError> {
        let suffix = s
            .strip_prefix(Self::PREFIX)
            .ok_or(ReferralCodeError::MissingPrefix {
                prefix: Self::PREFIX,
            })?;

        if let Some(bad) = suffix
            .chars()
            .find(|c| !(c.is_ascii_uppercase() || c.is_ascii_digit()))
        {
            return Err(ReferralCodeError::InvalidCharacter(bad));
        }

        if suffix.len() != Self::SUFFIX_LENGTH {
            return Err(ReferralCodeError::WrongLength {
                expected: Self::SUFFIX_LENGTH,
                actual: suffix.len(),
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferralCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReferralCode {
    type Error = ReferralCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ReferralCode> for String {
    fn from(code: ReferralCode) -> Self {
        code.0
    }
}

impl std::str::FromStr for ReferralCode {
    type Err = ReferralCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn matches_pattern(code: &str) -> bool {
        code.len() == 9
            && code.starts_with("AE-")
            && code
                .chars()
                .skip(3)
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    }

    #[test]
    fn test_generated_codes_match_pattern() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let code = ReferralCode::generate(&mut rng);
            assert!(matches_pattern(code.as_str()), "bad code {code}");
        }
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(ReferralCode::parse("AE-7KQ2ZD").unwrap().as_str(), "AE-7KQ2ZD");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ReferralCode::parse("XY-7KQ2ZD"),
            Err(ReferralCodeError::MissingPrefix { .. })
        ));
        assert!(matches!(
            ReferralCode::parse("AE-7KQ2"),
            Err(ReferralCodeError::WrongLength { actual: 4, .. })
        ));
        assert_eq!(
            ReferralCode::parse("AE-7kq2zd"),
            Err(ReferralCodeError::InvalidCharacter('k'))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<ReferralCode, _> = serde_json::from_str("\"AE-ABC123\"");
        assert!(ok.is_ok());
        let bad: Result<ReferralCode, _> = serde_json::from_str("\"AE-abc\"");
        assert!(bad.is_err());
    }
}
