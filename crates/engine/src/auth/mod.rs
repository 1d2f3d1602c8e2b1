//! Account registration, login and session tokens.
//!
//! Tokens are stateless. What makes an old token stop working after a
//! password or username change is the account's `token_version`: every such
//! change bumps it, and [`AuthManager::me`] rejects tokens carrying an older
//! version.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{PASSWORD_MAX_LEN, validate_password, validate_username},
};

mod password;
mod token;

pub use password::{Argon2Hasher, Argon2Settings, PasswordHasher};
pub use token::{Claims, IssuedToken, TokenSigner};

/// A stored account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub token_version: i64,
    pub created_at: DateTime<Utc>,
}

/// Account data handed to the store on registration.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

/// Persistence used by [`AuthManager`].
///
/// `create_user` and `update_user` report a username collision as
/// [`EngineError::DuplicateAccount`].
pub trait UserStore: Send + Sync {
    fn find_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = ResultEngine<Option<UserRecord>>> + Send;

    fn find_user_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = ResultEngine<Option<UserRecord>>> + Send;

    fn create_user(&self, user: NewUser) -> impl Future<Output = ResultEngine<UserRecord>> + Send;

    fn update_user(
        &self,
        user: &UserRecord,
    ) -> impl Future<Output = ResultEngine<UserRecord>> + Send;
}

#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub secret: String,
    pub token_ttl: TimeDelta,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl: TimeDelta::minutes(60),
        }
    }
}

#[derive(Debug)]
pub struct AuthManager<S, H> {
    store: S,
    hasher: H,
    signer: TokenSigner,
}

impl<S, H> AuthManager<S, H>
where
    S: UserStore,
    H: PasswordHasher,
{
    pub fn new(store: S, hasher: H, settings: &AuthSettings) -> ResultEngine<Self> {
        Ok(Self {
            store,
            hasher,
            signer: TokenSigner::new(&settings.secret, settings.token_ttl)?,
        })
    }

    /// Create an account if `username` is free.
    pub async fn register(&self, username: &str, password: &str) -> ResultEngine<UserRecord> {
        validate_username(username)?;
        validate_password(password)?;

        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(EngineError::DuplicateAccount(username.to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
            })
            .await?;
        tracing::info!("registered user {}", user.username);
        Ok(user)
    }

    /// Verify credentials and issue a token.
    ///
    /// Unknown users and wrong passwords both yield
    /// [`EngineError::InvalidCredentials`].
    pub async fn login(&self, username: &str, password: &str) -> ResultEngine<IssuedToken> {
        if username.is_empty() || password.is_empty() {
            return Err(EngineError::Validation(
                "username and password are required".to_string(),
            ));
        }

        if password.chars().count() > PASSWORD_MAX_LEN {
            tracing::debug!("login rejected: oversized password");
            return Err(EngineError::InvalidCredentials);
        }

        let Some(user) = self.store.find_user_by_username(username).await? else {
            tracing::debug!("login rejected: unknown user");
            return Err(EngineError::InvalidCredentials);
        };
        if !self.verify_password(password, &user.password_hash).await? {
            tracing::debug!("login rejected: wrong password for {}", user.username);
            return Err(EngineError::InvalidCredentials);
        }

        self.signer.issue_at(&user, Utc::now())
    }

    /// Check the token signature and expiry. Touches no storage.
    pub fn verify(&self, token: &str) -> ResultEngine<Claims> {
        self.signer.verify_at(token, Utc::now())
    }

    /// Resolve the account a token belongs to.
    pub async fn me(&self, token: &str) -> ResultEngine<UserRecord> {
        let claims = self.verify(token)?;
        let user = self
            .store
            .find_user_by_id(claims.uid)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(claims.sub.clone()))?;

        if user.username != claims.sub || user.token_version != claims.ver {
            return Err(EngineError::TokenInvalid("stale token".to_string()));
        }
        Ok(user)
    }

    /// Replace the password after re-checking the current one.
    ///
    /// Every token issued before the change, `token` included, stops
    /// resolving; the caller has to log in again.
    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> ResultEngine<()> {
        let mut user = self.me(token).await?;
        if !self.verify_password(current_password, &user.password_hash).await? {
            return Err(EngineError::WrongPassword);
        }
        validate_password(new_password)?;

        user.password_hash = self.hash_password(new_password).await?;
        user.token_version += 1;
        self.store.update_user(&user).await?;
        tracing::info!("password changed for {}", user.username);
        Ok(())
    }

    /// Rename the account and issue a token for the new name.
    ///
    /// Tokens carrying the old name are stale afterwards.
    pub async fn change_username(
        &self,
        token: &str,
        new_username: &str,
    ) -> ResultEngine<(UserRecord, IssuedToken)> {
        let mut user = self.me(token).await?;
        validate_username(new_username)?;
        if self
            .store
            .find_user_by_username(new_username)
            .await?
            .is_some()
        {
            return Err(EngineError::DuplicateAccount(new_username.to_string()));
        }

        let old_username = std::mem::replace(&mut user.username, new_username.to_string());
        user.token_version += 1;
        let user = self.store.update_user(&user).await?;
        tracing::info!("user {old_username} renamed to {}", user.username);

        let token = self.signer.issue_at(&user, Utc::now())?;
        Ok((user, token))
    }

    async fn hash_password(&self, password: &str) -> ResultEngine<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| EngineError::Hashing(err.to_string()))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> ResultEngine<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|err| EngineError::Hashing(err.to_string()))?
    }
}
