use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState};

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token issuer, audience or algorithm mismatch")]
    InvalidClaims,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::ImmatureSignature => TokenError::InvalidClaims,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String, TokenError> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(&self, user_id: i64, now: OffsetDateTime) -> Result<String, TokenError> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(TokenError::Signing)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    /// Returns the user id carried by a token whose signature, expiry, issuer
    /// and audience all check out.
    pub fn validate(&self, token: &str) -> Result<i64, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        let user_id = data.claims.user_id().ok_or(TokenError::Malformed)?;
        debug!(user_id, "jwt verified");
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ACCESS_TOKEN_TTL_MINUTES;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: ACCESS_TOKEN_TTL_MINUTES,
        })
    }

    #[test]
    fn issue_then_validate_returns_same_user() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.issue(42).expect("issue");
        assert_eq!(keys.validate(&token).expect("validate"), 42);
    }

    #[test]
    fn token_expires_one_hour_after_issuance() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue(7).unwrap();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["aud"]);
        let claims = decode::<Claims>(&token, &keys.decoding, &validation)
            .expect("decode")
            .claims;
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.sub, "7");
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(2);
        let token = keys.issue_at(1, issued).unwrap();
        assert!(matches!(keys.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn token_just_before_expiry_is_accepted() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(59);
        let token = keys.issue_at(3, issued).unwrap();
        assert_eq!(keys.validate(&token).unwrap(), 3);
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let good = make_keys("secret-a", "iss", "aud");
        let bad = make_keys("secret-b", "iss", "aud");
        let token = good.issue(1).unwrap();
        assert!(matches!(bad.validate(&token), Err(TokenError::BadSignature)));
    }

    #[test]
    fn tampered_payload_is_bad_signature() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue(1).unwrap();
        let other = keys.issue(2).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert!(matches!(keys.validate(&forged), Err(TokenError::BadSignature)));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.validate("not-a-jwt"), Err(TokenError::Malformed)));
        assert!(matches!(keys.validate(""), Err(TokenError::Malformed)));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(1).unwrap();
        assert!(matches!(bad.validate(&token), Err(TokenError::InvalidClaims)));
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "alice".into(),
            iat: now,
            exp: now + 600,
            iss: "iss".into(),
            aud: "aud".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert!(matches!(keys.validate(&token), Err(TokenError::Malformed)));
    }
}
