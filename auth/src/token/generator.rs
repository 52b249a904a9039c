use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use rand::RngCore;

use super::errors::TokenError;

/// Random bytes behind each secret.
const SECRET_BYTES: usize = 32;

/// Length of secrets produced by [`generate_secret`] (unpadded base64 of 32 bytes).
pub const SECRET_LENGTH: usize = 43;

/// Generator for short, alphanumeric unique identifiers.
///
/// Identifiers are drawn from the operating system CSPRNG, so no shared
/// counter or worker state is needed between processes.
#[derive(Debug, Clone, Copy)]
pub struct ShortIdGenerator {
    length: usize,
}

impl ShortIdGenerator {
    pub const MIN_LENGTH: usize = 8;
    pub const MAX_LENGTH: usize = 64;
    pub const DEFAULT_LENGTH: usize = 12;

    /// Create a generator producing identifiers of `length` characters.
    ///
    /// # Errors
    /// * `InvalidLength` - Length outside `MIN_LENGTH..=MAX_LENGTH`
    pub fn new(length: usize) -> Result<Self, TokenError> {
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&length) {
            return Err(TokenError::InvalidLength {
                min: Self::MIN_LENGTH,
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        Ok(Self { length })
    }

    /// Generate a new identifier.
    pub fn generate(&self) -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for ShortIdGenerator {
    fn default() -> Self {
        Self {
            length: Self::DEFAULT_LENGTH,
        }
    }
}

/// Generate an unguessable URL-safe secret.
///
/// Used for bearer token values and one-time ticket secrets.
///
/// # Errors
/// * `RandomSourceUnavailable` - The OS random source failed
pub fn generate_secret() -> Result<String, TokenError> {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError::RandomSourceUnavailable(e.to_string()))?;

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
