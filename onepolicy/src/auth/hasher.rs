//! Password hashing with Argon2id.

use super::errors::{AuthError, AuthResult};
use argon2::{
    Argon2,
    password_hash::{
        self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};

/// One-way salted password hasher
#[derive(Clone)]
pub struct CredentialHasher {
    pepper: String,
}

impl CredentialHasher {
    /// Create a hasher. `pepper` is appended to every password and may be empty.
    pub fn new(pepper: String) -> Self {
        Self { pepper }
    }

    /// Hash password with Argon2id + pepper
    ///
    /// Returns a PHC string carrying algorithm, parameters and salt.
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingError)?
            .to_string())
    }

    /// Verify password against hash
    ///
    /// `Ok(false)` on mismatch. Errors only when `hash` is not a valid PHC string.
    pub fn verify(&self, password: &str, hash: &str) -> AuthResult<bool> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::HashingError)?;

        match Argon2::default().verify_password(peppered.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::HashingError),
        }
    }
}
