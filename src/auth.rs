//! Bearer tokens of the form `<user_id>.<expires_unix>.<hex hmac-sha256>`.
//!
//! Accounts live with an external identity provider; the API only needs to
//! trust a user id that was signed with the shared secret and has not expired.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const MAX_USER_ID_LEN: usize = 64;

pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "token secret cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
        })
    }

    pub fn issue(&self, user_id: &str, expires_at: DateTime<Utc>) -> Result<String, AppError> {
        validate_user_id(user_id)?;
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(user_id, expires)?.finalize().into_bytes());
        Ok(format!("{user_id}.{expires}.{signature}"))
    }

    /// Returns the owner encoded in `token` when the signature matches and
    /// `now` is before the expiry.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        let invalid = || AppError::Unauthorized("Not authorized, token failed".to_string());
        let mut parts = token.trim().split('.');
        let (Some(user_id), Some(expires), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        if validate_user_id(user_id).is_err() {
            return Err(invalid());
        }
        let expires: i64 = expires.parse().map_err(|_| invalid())?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;
        self.mac(user_id, expires)?
            .verify_slice(&signature)
            .map_err(|_| invalid())?;
        if now.timestamp() >= expires {
            return Err(AppError::Unauthorized(
                "Not authorized, token expired".to_string(),
            ));
        }
        Ok(user_id.to_string())
    }

    fn mac(&self, user_id: &str, expires: i64) -> Result<HmacSha256, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| AppError::InvalidInput(format!("invalid token secret: {err}")))?;
        mac.update(format!("{user_id}\n{expires}\n").as_bytes());
        Ok(mac)
    }
}

pub fn validate_user_id(user_id: &str) -> Result<(), AppError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(AppError::InvalidInput(format!(
            "user id must be 1-{MAX_USER_ID_LEN} ascii letters, digits, '-' or '_': {user_id:?}"
        )));
    }
    Ok(())
}

/// Extracts the credential from an `Authorization: Bearer <token>` value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
