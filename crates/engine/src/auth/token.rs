//! HS256 session tokens in the compact JWT layout.
//!
//! `base64url(header).base64url(claims).base64url(hmac_sha256(secret, header.claims))`

use base64::Engine as _;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

use super::UserRecord;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token.
///
/// Never holds the password or its hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username at issuance time.
    pub sub: String,
    /// Stable user id.
    pub uid: Uuid,
    /// `token_version` of the account at issuance time.
    pub ver: i64,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: TimeDelta,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, ttl: TimeDelta) -> ResultEngine<Self> {
        if secret.trim().is_empty() {
            return Err(EngineError::Validation(
                "token secret must not be empty".to_string(),
            ));
        }
        if ttl <= TimeDelta::zero() {
            return Err(EngineError::Validation(
                "token lifetime must be positive".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            ttl,
        })
    }

    /// Sign a token for `user`, valid for the configured TTL from `now`.
    pub fn issue_at(&self, user: &UserRecord, now: DateTime<Utc>) -> ResultEngine<IssuedToken> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| EngineError::Validation("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            ver: user.token_version,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };

        let signing_input = format!("{}.{}", encode_json(&header)?, encode_json(&claims)?);
        let signature = self.sign(signing_input.as_bytes())?;
        Ok(IssuedToken {
            access_token: format!("{signing_input}.{}", encode(&signature)),
            expires_at,
        })
    }

    /// Check the signature first, then the expiry.
    ///
    /// A token whose signature verifies but whose `exp` is not after `now`
    /// is always [`EngineError::TokenExpired`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> ResultEngine<Claims> {
        let mut parts = token.trim().split('.');
        let (Some(header), Some(claims), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("malformed token"));
        };

        let signature = decode(signature)?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))?;

        let header: Header = decode_json(header)?;
        if header.alg != ALGORITHM {
            return Err(invalid("unsupported algorithm"));
        }
        let claims: Claims = decode_json(claims)?;

        if claims.exp <= now.timestamp() {
            return Err(EngineError::TokenExpired);
        }
        Ok(claims)
    }

    fn mac(&self) -> ResultEngine<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).map_err(|_| invalid("unusable signing key"))
    }

    fn sign(&self, input: &[u8]) -> ResultEngine<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(input);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn invalid(reason: &str) -> EngineError {
    EngineError::TokenInvalid(reason.to_string())
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn decode(input: &str) -> ResultEngine<Vec<u8>> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(input.as_bytes())
        .map_err(|_| invalid("malformed token"))
}

fn encode_json<T: Serialize>(value: &T) -> ResultEngine<String> {
    let bytes = serde_json::to_vec(value).map_err(|_| invalid("unserializable claims"))?;
    Ok(encode(&bytes))
}

fn decode_json<T: for<'de> Deserialize<'de>>(input: &str) -> ResultEngine<T> {
    serde_json::from_slice(&decode(input)?).map_err(|_| invalid("malformed token"))
}
