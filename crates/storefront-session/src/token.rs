//! Session tokens.
//!
//! A token is 32 bytes from the thread-local CSPRNG, encoded as URL-safe
//! base64 without padding. Anything a client sends that does not have
//! exactly that shape is rejected by [`SessionToken::parse`].

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Raw entropy per token.
const TOKEN_BYTES: usize = 32;

/// Opaque identifier naming one session.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Encoded length of every valid token.
    pub const ENCODED_LEN: usize = 43;

    /// Generate a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accept a client-supplied token only if it is well-formed.
    pub fn parse(raw: &str) -> Option<Self> {
        let well_formed = raw.len() == Self::ENCODED_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(raw.to_string()))
    }

    /// The encoded token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are bearer credentials; keep them out of debug logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}
