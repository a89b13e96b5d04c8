//! Encrypted game tokens.
//!
//! Wire format: `base64url(nonce[12] || tag[16] || ciphertext)`, where the
//! ciphertext is AES-256-GCM over the JSON-serialized [`GameState`]. The key
//! is derived once from the server secret with scrypt.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

use serde::Deserialize;

use crate::types::{GameState, GAME_STATE_VERSION};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

const KDF_SALT: &[u8] = b"pokemon-hangman-salt-v1";
const KDF_LOG_N: u8 = 14;
const KDF_R: u32 = 8;
const KDF_P: u32 = 1;

pub type TokenResult<T> = Result<T, TokenError>;

/// Only the schema tag, read before the rest of the payload
#[derive(Deserialize)]
struct Header {
    v: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Invalid game token")]
    InvalidToken,

    #[error("Game token failed authentication")]
    Authentication,

    #[error("Unsupported game token version {0}")]
    UnsupportedVersion(u32),

    #[error("Game token payload is malformed: {0}")]
    Malformed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
}

/// Encrypts and decrypts [`GameState`] tokens. Immutable after construction,
/// so one instance can be shared across all requests.
#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Derive the cipher key from `secret`. This is deliberately slow; call it once at startup.
    pub fn new(secret: &str) -> TokenResult<Self> {
        let params = scrypt::Params::new(KDF_LOG_N, KDF_R, KDF_P, KEY_LEN)
            .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;

        let mut key = [0u8; KEY_LEN];
        scrypt::scrypt(secret.as_bytes(), KDF_SALT, &params, &mut key)
            .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| TokenError::KeyDerivation(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt a state into a fresh token. Every call draws a new nonce,
    /// so encoding the same state twice yields different tokens.
    pub fn encode(&self, state: &GameState) -> TokenResult<String> {
        let plaintext =
            serde_json::to_vec(state).map_err(|e| TokenError::Malformed(e.to_string()))?;
        self.seal(plaintext)
    }

    pub(crate) fn seal(&self, mut buffer: Vec<u8>) -> TokenResult<String> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);

        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", &mut buffer)
            .map_err(|_| TokenError::Authentication)?;

        let mut packed = Vec::with_capacity(NONCE_LEN + TAG_LEN + buffer.len());
        packed.extend_from_slice(&nonce);
        packed.extend_from_slice(&tag);
        packed.extend_from_slice(&buffer);

        Ok(URL_SAFE_NO_PAD.encode(packed))
    }

    /// Decrypt and parse a token. Any tampering fails closed before the
    /// payload is parsed, and the schema tag is checked before the state
    /// itself, so tokens from another schema version never reach the
    /// [`GameState`] parser.
    pub fn decode(&self, token: &str) -> TokenResult<GameState> {
        // Accept padded input too
        let packed = URL_SAFE_NO_PAD
            .decode(token.trim().trim_end_matches('='))
            .map_err(|_| TokenError::InvalidToken)?;

        if packed.len() < NONCE_LEN + TAG_LEN + 1 {
            return Err(TokenError::InvalidToken);
        }

        let (nonce, rest) = packed.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        let mut buffer = ciphertext.to_vec();

        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| TokenError::Authentication)?;

        let header: Header =
            serde_json::from_slice(&buffer).map_err(|e| TokenError::Malformed(e.to_string()))?;
        if header.v != GAME_STATE_VERSION {
            return Err(TokenError::UnsupportedVersion(header.v));
        }

        serde_json::from_slice(&buffer).map_err(|e| TokenError::Malformed(e.to_string()))
    }
}
