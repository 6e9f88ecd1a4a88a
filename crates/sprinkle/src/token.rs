//! Short claim tokens and their generator.
//!
//! A [`Token`] is three symbols drawn from a 62-symbol alphanumeric alphabet,
//! giving 238,328 possible values. The space is deliberately small: tokens are
//! meant to be typed into a chat. Uniqueness is only required among *live*
//! allocations, so an archived allocation frees its token.

use crate::{Error, RandSource, Result};
use core::{fmt, str::FromStr};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Number of symbols in a token.
pub const TOKEN_LEN: usize = 3;

/// The symbols a token is drawn from.
pub const TOKEN_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default number of candidates tried before giving up.
pub const MAX_TOKEN_ATTEMPTS: usize = 1000;

/// An opaque claim token, e.g. `"x7Q"`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token([u8; TOKEN_LEN]);

impl Token {
    /// Builds a token from alphabet indices.
    ///
    /// Each index is reduced modulo the alphabet size.
    pub const fn from_indices(indices: [usize; TOKEN_LEN]) -> Self {
        let n = TOKEN_ALPHABET.len();
        Self([
            TOKEN_ALPHABET[indices[0] % n],
            TOKEN_ALPHABET[indices[1] % n],
            TOKEN_ALPHABET[indices[2] % n],
        ])
    }

    pub fn as_str(&self) -> &str {
        // Only alphabet bytes are ever stored, which are ASCII.
        core::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.as_str())
    }
}

impl FromStr for Token {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; TOKEN_LEN] =
            s.as_bytes()
                .try_into()
                .map_err(|_| Error::MalformedToken {
                    input: s.to_owned(),
                })?;
        if !bytes.iter().all(u8::is_ascii_alphanumeric) {
            return Err(Error::MalformedToken {
                input: s.to_owned(),
            });
        }
        Ok(Self(bytes))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Token {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Token {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Draws random tokens and retries until one can be reserved.
///
/// The generator itself keeps no record of issued tokens. Uniqueness is
/// decided by the `reserve` callback passed to [`Self::generate`], which must
/// perform an atomic check-and-insert against the live set; a separate
/// "is it taken?" read followed by a write would race with concurrent
/// creators.
#[derive(Clone, Debug)]
pub struct TokenGenerator<R> {
    rng: R,
    max_attempts: usize,
}

impl<R: RandSource> TokenGenerator<R> {
    /// Creates a generator allowing [`MAX_TOKEN_ATTEMPTS`] attempts.
    pub const fn new(rng: R) -> Self {
        Self::with_max_attempts(rng, MAX_TOKEN_ATTEMPTS)
    }

    pub const fn with_max_attempts(rng: R, max_attempts: usize) -> Self {
        Self { rng, max_attempts }
    }

    /// Draws a single candidate uniformly from the token space.
    pub fn candidate(&self) -> Token {
        let bound = TOKEN_ALPHABET.len() as u64;
        let mut indices = [0; TOKEN_LEN];
        for index in &mut indices {
            *index = self.rng.next_below(bound) as usize;
        }
        Token::from_indices(indices)
    }

    /// Draws candidates until `reserve` accepts one.
    ///
    /// `reserve` returns `true` when it claimed the token for the caller and
    /// `false` on collision.
    ///
    /// # Errors
    /// Returns [`Error::GenerationExhausted`] once the attempt budget is spent.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip_all))]
    pub fn generate<F>(&self, mut reserve: F) -> Result<Token>
    where
        F: FnMut(Token) -> bool,
    {
        for _attempt in 1..=self.max_attempts {
            let token = self.candidate();
            if reserve(token) {
                #[cfg(feature = "tracing")]
                tracing::debug!(%token, attempts = _attempt, "reserved token");
                return Ok(token);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::warn!(attempts = self.max_attempts, "token space exhausted");
        Err(Error::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
