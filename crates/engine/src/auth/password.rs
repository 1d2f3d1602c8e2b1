//! Password hashing.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use serde::Deserialize;

use crate::{EngineError, ResultEngine};

/// Hashing primitive used by the auth manager.
///
/// Implementations are CPU-bound; the manager calls them from a blocking
/// task.
pub trait PasswordHasher: Clone + Send + Sync + 'static {
    fn hash(&self, password: &str) -> ResultEngine<String>;

    /// `Ok(false)` for a wrong password, `Err` for an unusable stored hash.
    fn verify(&self, password: &str, hash: &str) -> ResultEngine<bool>;
}

/// Argon2id cost parameters.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Argon2id hasher producing PHC strings (`$argon2id$v=19$m=...`).
#[derive(Clone, Debug)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new(settings: Argon2Settings) -> ResultEngine<Self> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|err| EngineError::Hashing(err.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> ResultEngine<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| EngineError::Hashing(err.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, password: &str, hash: &str) -> ResultEngine<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|err| EngineError::Hashing(err.to_string()))?;
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(EngineError::Hashing(err.to_string())),
        }
    }
}
