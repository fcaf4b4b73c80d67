use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{
    auth::claims::{Claims, Identity},
    config::JwtConfig,
    error::AppError,
    state::AppState,
};

/// Session token signer/verifier. Built once at startup from `JwtConfig`.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }

    pub fn issue(&self, identity: &Identity) -> anyhow::Result<String> {
        self.issue_at(identity, OffsetDateTime::now_utc())
    }

    /// Signs `identity` as if issued at `now`.
    pub fn issue_at(&self, identity: &Identity, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            identity: identity.clone(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %identity.user_id, role = %identity.role, "jwt signed");
        Ok(token)
    }

    /// Checks signature, structure and expiry. Every failure is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(user_id = %data.claims.identity.user_id, "jwt verified");
        Ok(data.claims.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;
    use uuid::Uuid;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            ttl_minutes: 12 * 60,
        })
    }

    fn identity() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            role: Role::Manager,
            name: "A".into(),
            email: "a@x.com".into(),
        }
    }

    #[test]
    fn issue_and_verify() {
        let keys = make_keys("dev-secret");
        let id = identity();
        let token = keys.issue(&id).expect("sign");
        assert_eq!(keys.verify(&token).expect("verify"), id);
    }

    #[test]
    fn payload_carries_exactly_identity_and_timestamps() {
        let keys = make_keys("dev-secret");
        let id = identity();
        let token = keys.issue(&id).unwrap();
        let mut validation = Validation::default();
        validation.required_spec_claims.clear();
        let data = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"dev-secret"),
            &validation,
        )
        .unwrap();
        let obj = data.claims.as_object().unwrap();
        let mut keys_seen: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys_seen.sort_unstable();
        assert_eq!(keys_seen, ["email", "exp", "iat", "name", "role", "userId"]);
        assert_eq!(obj["role"], "manager");
        let exp = obj["exp"].as_i64().unwrap();
        let iat = obj["iat"].as_i64().unwrap();
        assert_eq!(exp - iat, 12 * 60 * 60);
    }

    #[test]
    fn expired_after_twelve_hours() {
        let keys = make_keys("dev-secret");
        let issued = OffsetDateTime::now_utc() - TimeDuration::hours(12) - TimeDuration::seconds(5);
        let token = keys.issue_at(&identity(), issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));

        let recent = OffsetDateTime::now_utc() - TimeDuration::hours(11);
        let token = keys.issue_at(&identity(), recent).unwrap();
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn rejects_other_secret_and_garbage() {
        let token = make_keys("one").issue(&identity()).unwrap();
        assert!(matches!(make_keys("two").verify(&token), Err(AppError::InvalidToken)));
        assert!(matches!(make_keys("one").verify("not.a.jwt"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn rejects_tampered_payload() {
        let keys = make_keys("dev-secret");
        let token = keys.issue(&identity()).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1].push('A');
        assert!(matches!(keys.verify(&parts.join(".")), Err(AppError::InvalidToken)));
    }
}
