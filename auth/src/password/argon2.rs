use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;

use super::errors::PasswordError;

/// Plaintext behind the decoy hash used for missing records.
const DECOY_PASSWORD: &str = "decoy-password-for-missing-records";

/// Password hashing implementation.
///
/// Argon2id (v0x13) with a fixed work factor and a fresh random salt per hash,
/// so two hashes of the same password never compare equal. Stored values are
/// PHC strings carrying algorithm, parameters and salt.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
    decoy_hash: OnceLock<String>,
}

impl PasswordHasher {
    /// Create a new password hasher instance.
    ///
    /// # Returns
    /// PasswordHasher configured with the argon2 crate's default cost
    /// (19 MiB memory, 2 iterations, 1 lane)
    pub fn new() -> Self {
        Self {
            params: Params::default(),
            decoy_hash: OnceLock::new(),
        }
    }

    fn argon2(&self) -> Argon2<'_> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to hash
    ///
    /// # Returns
    /// PHC string format hash
    ///
    /// # Errors
    /// * `HashingFailed` - Input is not supported by Argon2 (e.g. exceeds the maximum length)
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored hash.
    ///
    /// The comparison of the derived output is constant-time. A stored hash
    /// that does not parse yields `false` rather than an error so callers
    /// cannot tell a corrupt record from a wrong password.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `hash` - Stored password hash in PHC string format
    ///
    /// # Returns
    /// True if password matches, false otherwise
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        // Parameters are taken from the PHC string, not from `self.params`.
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Spend one verification's worth of work for a record that does not exist.
    ///
    /// Runs a full verification against a decoy hash made with this hasher's
    /// parameters, so rejecting an unknown account costs the same as rejecting
    /// a wrong password. The outcome is discarded.
    pub fn verify_missing(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_init(|| self.hash(DECOY_PASSWORD).unwrap_or_default());

        let _ = self.verify(password, decoy);
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let password = "my_secure_password";

        let hash = hasher.hash(password).expect("Failed to hash password");

        assert!(hasher.verify(password, &hash));
        assert!(!hasher.verify("wrong_password", &hash));
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("secret1").expect("Failed to hash password");

        assert_ne!(hash, "secret1");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let hasher = PasswordHasher::new();

        let first = hasher.hash("secret1").expect("Failed to hash password");
        let second = hasher.hash("secret1").expect("Failed to hash password");

        assert_ne!(first, second);
        assert!(hasher.verify("secret1", &first));
        assert!(hasher.verify("secret1", &second));
    }

    #[test]
    fn test_verify_malformed_hash_is_false() {
        let hasher = PasswordHasher::new();

        assert!(!hasher.verify("password", "invalid_hash"));
        assert!(!hasher.verify("password", ""));
        assert!(!hasher.verify("password", "$argon2id$v=19$m=19456,t=2,p=1$garbage"));
    }

    #[test]
    fn test_verify_missing_uses_same_cost_as_stored_hashes() {
        let hasher = PasswordHasher::new();
        let stored = hasher.hash("secret1").expect("Failed to hash password");

        hasher.verify_missing("secret1");
        hasher.verify_missing(DECOY_PASSWORD);

        let decoy = hasher.decoy_hash.get().expect("Decoy hash was not built");
        let parameters = |hash: &str| hash.split('$').take(4).collect::<Vec<_>>().join("$");

        assert_eq!(parameters(decoy), parameters(&stored));
        assert!(hasher.verify(DECOY_PASSWORD, decoy));
    }

    #[test]
    fn test_verify_empty_password_against_real_hash() {
        let hasher = PasswordHasher::new();
        let hash = hasher.hash("secret1").expect("Failed to hash password");

        assert!(!hasher.verify("", &hash));
    }
}
