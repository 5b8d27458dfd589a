//! Confirmation token issuance and comparison

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("OS random source unavailable: {0}")]
    Randomness(String),

    #[error("Token expiry out of range: {now} + {validity}")]
    ExpiryOutOfRange {
        now: DateTime<Utc>,
        validity: chrono::Duration,
    },
}

/// A freshly issued token and the instant after which it is refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

/// Issues unforgeable, time-bounded confirmation tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenIssuer;

impl TokenIssuer {
    pub fn new() -> Self {
        Self
    }

    /// 32 bytes from the OS CSPRNG, URL-safe base64 without padding
    pub fn issue(&self, now: DateTime<Utc>, validity: chrono::Duration) -> Result<IssuedToken, TokenError> {
        let expiry = now
            .checked_add_signed(validity)
            .ok_or(TokenError::ExpiryOutOfRange { now, validity })?;

        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| TokenError::Randomness(e.to_string()))?;

        Ok(IssuedToken {
            token: URL_SAFE_NO_PAD.encode(bytes),
            expiry,
        })
    }
}

/// Constant-time token comparison
pub fn tokens_match(stored: &str, submitted: &str) -> bool {
    bool::from(stored.as_bytes().ct_eq(submitted.as_bytes()))
}
