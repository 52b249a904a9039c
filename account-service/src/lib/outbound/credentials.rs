use crate::account::errors::HashingError;
use crate::account::errors::IdGenerationError;
use crate::account::ports::IdGenerator;
use crate::account::ports::PasswordHasher;

/// Argon2id hasher backed by the `auth` library.
pub struct Argon2PasswordHasher {
    inner: auth::PasswordHasher,
}

impl Argon2PasswordHasher {
    pub fn new(inner: auth::PasswordHasher) -> Self {
        Self { inner }
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        self.inner
            .hash(plaintext)
            .map_err(|e| HashingError(e.to_string()))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        match self.inner.verify(plaintext, hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash could not be parsed");
                false
            }
        }
    }
}

/// Short id and secret generator backed by the `auth` library.
pub struct ShortIdProvider {
    ids: auth::ShortIdGenerator,
}

impl ShortIdProvider {
    pub fn new(ids: auth::ShortIdGenerator) -> Self {
        Self { ids }
    }
}

impl IdGenerator for ShortIdProvider {
    fn generate(&self) -> Result<String, IdGenerationError> {
        Ok(self.ids.generate())
    }

    fn generate_secret(&self) -> Result<String, IdGenerationError> {
        auth::generate_secret().map_err(|e| IdGenerationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hasher_round_trip_and_mismatch() {
        let hasher = Argon2PasswordHasher::new(
            auth::PasswordHasher::with_work_factor(1024, 1, 1).unwrap(),
        );

        let hash = hasher.hash("pw1").unwrap();
        assert!(hasher.verify(&hash, "pw1"));
        assert!(!hasher.verify(&hash, "pw2"));
    }

    #[test]
    fn test_unreadable_hash_never_verifies() {
        let hasher = Argon2PasswordHasher::new(auth::PasswordHasher::new());
        assert!(!hasher.verify("not-a-phc-string", "pw1"));
    }

    #[test]
    fn test_ids_and_secrets_differ() {
        let provider = ShortIdProvider::new(auth::ShortIdGenerator::default());

        let id = provider.generate().unwrap();
        let secret = provider.generate_secret().unwrap();

        assert_eq!(id.len(), 12);
        assert_eq!(secret.len(), auth::SECRET_LENGTH);
        assert_ne!(id, provider.generate().unwrap());
    }
}
