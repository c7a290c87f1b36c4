use bcrypt::BcryptError;
use thiserror::Error;

/// bcrypt work factor used unless the configuration overrides it.
pub const DEFAULT_PASSWORD_COST: u32 = 10;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("stored digest is not a bcrypt hash: {0}")]
    MalformedDigest(String),
}

/// Salted, adaptive one-way hashing of passwords.
///
/// Both operations are CPU-bound; async callers should move them onto the
/// blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_PASSWORD_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// `Ok(false)` means the password does not match; an error means the
    /// stored digest could not be interpreted at all.
    pub fn verify(&self, digest: &str, plaintext: &str) -> Result<bool, PasswordError> {
        match bcrypt::verify(plaintext, digest) {
            Ok(matches) => Ok(matches),
            Err(
                e @ (BcryptError::InvalidHash(_)
                | BcryptError::InvalidPrefix(_)
                | BcryptError::InvalidCost(_)
                | BcryptError::InvalidBase64(_)),
            ) => Err(PasswordError::MalformedDigest(e.to_string())),
            Err(e) => Err(PasswordError::Hashing(e.to_string())),
        }
    }
}
