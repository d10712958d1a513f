use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::Claims;
use super::errors::JwtError;

/// The only algorithm tokens are signed with and accepted under.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Default session lifetime.
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Longest session lifetime a codec accepts (five years).
pub const MAX_TOKEN_LIFETIME_HOURS: i64 = 5 * 365 * 24;

/// Session token issuer and validator.
///
/// Signs with a single HMAC secret fixed at construction. Validation pins
/// HS256: a token whose header names any other algorithm is rejected before
/// its signature is looked at.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenCodec {
    /// Create a codec with the default 24 hour token lifetime.
    ///
    /// # Arguments
    /// * `secret` - HMAC signing secret
    ///
    /// # Errors
    /// * `EmptySecret` - The secret is empty
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        Self::with_lifetime(secret, Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS))
    }

    /// Create a codec issuing tokens valid for `lifetime`.
    ///
    /// # Errors
    /// * `EmptySecret` - The secret is empty
    /// * `InvalidLifetime` - `lifetime` is not positive or exceeds
    ///   [`MAX_TOKEN_LIFETIME_HOURS`]
    pub fn with_lifetime(secret: &[u8], lifetime: Duration) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::EmptySecret);
        }
        if lifetime <= Duration::zero() || lifetime > Duration::hours(MAX_TOKEN_LIFETIME_HOURS) {
            return Err(JwtError::InvalidLifetime {
                max_hours: MAX_TOKEN_LIFETIME_HOURS,
            });
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.algorithms = vec![ALGORITHM];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    /// Lifetime of issued tokens.
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for a user, valid from now.
    ///
    /// # Errors
    /// * `InvalidSubject` - `user_id` is not positive
    /// * `EncodingFailed` - Signing failed
    pub fn issue(&self, user_id: i64) -> Result<String, JwtError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issue a token as if it had been issued at `issued_at`.
    pub fn issue_at(&self, user_id: i64, issued_at: DateTime<Utc>) -> Result<String, JwtError> {
        if user_id <= 0 {
            return Err(JwtError::InvalidSubject(user_id));
        }

        let claims = Claims::for_user(user_id, issued_at, self.lifetime).ok_or_else(|| {
            JwtError::EncodingFailed("token expiry is out of range".to_string())
        })?;

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    /// Decode and validate a token.
    ///
    /// Checks, in order: algorithm, signature, expiry, claim shape, that the
    /// expiry follows the issue time, and that the subject is a positive id.
    ///
    /// # Errors
    /// * `InvalidToken` - Any of the checks failed
    pub fn validate(&self, token: &str) -> Result<Claims, JwtError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "Token rejected");
                JwtError::InvalidToken
            })?;

        if token_data.header.alg != ALGORITHM {
            tracing::debug!(alg = ?token_data.header.alg, "Token rejected: unexpected algorithm");
            return Err(JwtError::InvalidToken);
        }

        let claims = token_data.claims;

        if claims.exp <= claims.iat {
            tracing::debug!(iat = claims.iat, exp = claims.exp, "Token rejected: expiry before issue time");
            return Err(JwtError::InvalidToken);
        }

        if claims.user_id().is_none() {
            tracing::debug!("Token rejected: subject is not a positive user id");
            return Err(JwtError::InvalidToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde_json::json;

    use super::*;

    const SECRET: &[u8] = b"my_secret_key_at_least_32_bytes_long!";

    fn sign_raw(alg: Algorithm, secret: &[u8], claims: &serde_json::Value) -> String {
        encode(&Header::new(alg), claims, &EncodingKey::from_secret(secret))
            .expect("Failed to encode token")
    }

    #[test]
    fn test_issue_and_validate() {
        let codec = TokenCodec::new(SECRET).unwrap();

        let token = codec.issue(42).expect("Failed to issue token");
        let claims = codec.validate(&token).expect("Failed to validate token");

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_empty_secret_is_rejected() {
        assert_eq!(TokenCodec::new(b"").err(), Some(JwtError::EmptySecret));
    }

    #[test]
    fn test_issue_rejects_non_positive_user_id() {
        let codec = TokenCodec::new(SECRET).unwrap();

        assert_eq!(codec.issue(0).err(), Some(JwtError::InvalidSubject(0)));
        assert_eq!(codec.issue(-3).err(), Some(JwtError::InvalidSubject(-3)));
    }

    #[test]
    fn test_custom_lifetime() {
        let codec = TokenCodec::with_lifetime(SECRET, Duration::minutes(5)).unwrap();

        let token = codec.issue(7).unwrap();
        let claims = codec.validate(&token).unwrap();

        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn test_lifetime_bounds() {
        let invalid = Err(JwtError::InvalidLifetime {
            max_hours: MAX_TOKEN_LIFETIME_HOURS,
        });

        for lifetime in [
            Duration::zero(),
            Duration::seconds(-1),
            Duration::hours(MAX_TOKEN_LIFETIME_HOURS) + Duration::seconds(1),
            Duration::hours(10_000_000_000),
        ] {
            assert_eq!(
                TokenCodec::with_lifetime(SECRET, lifetime).map(|c| c.lifetime()),
                invalid.clone(),
                "lifetime {lifetime}"
            );
        }

        let longest = TokenCodec::with_lifetime(SECRET, Duration::hours(MAX_TOKEN_LIFETIME_HOURS)).unwrap();
        let claims = longest.validate(&longest.issue(1).unwrap()).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TOKEN_LIFETIME_HOURS * 60 * 60);
    }

    #[test]
    fn test_issue_with_unrepresentable_expiry_fails() {
        let codec = TokenCodec::new(SECRET).unwrap();

        let result = codec.issue_at(1, DateTime::<Utc>::MAX_UTC);

        assert!(matches!(result, Err(JwtError::EncodingFailed(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let issued_at = Utc::now() - Duration::hours(24) - Duration::seconds(10);

        let token = codec.issue_at(42, issued_at).unwrap();

        assert_eq!(codec.validate(&token), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_token_just_before_expiry_is_accepted() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let issued_at = Utc::now() - Duration::hours(24) + Duration::seconds(30);

        let token = codec.issue_at(42, issued_at).unwrap();

        assert!(codec.validate(&token).is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = TokenCodec::new(b"secret1_at_least_32_bytes_long_key!").unwrap();
        let validator = TokenCodec::new(b"secret2_at_least_32_bytes_long_key!").unwrap();

        let token = issuer.issue(42).unwrap();

        assert_eq!(validator.validate(&token), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let token = codec.issue(42).unwrap();

        let signature_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.into_bytes();
        let target = signature_start + 4;
        bytes[target] = if bytes[target] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert_eq!(codec.validate(&tampered), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let token = codec.issue(42).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let now = Utc::now().timestamp();
        let forged = URL_SAFE_NO_PAD.encode(
            json!({ "sub": "1", "iat": now, "exp": now + 3600 }).to_string(),
        );
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

        assert_eq!(codec.validate(&tampered), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_other_hmac_algorithm_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let now = Utc::now().timestamp();
        let claims = json!({ "sub": "42", "iat": now, "exp": now + 3600 });

        // Correctly signed with the right secret, but under HS512.
        let token = sign_raw(Algorithm::HS512, SECRET, &claims);

        assert_eq!(codec.validate(&token), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_unsigned_token_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let now = Utc::now().timestamp();

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload =
            URL_SAFE_NO_PAD.encode(json!({ "sub": "42", "iat": now, "exp": now + 3600 }).to_string());
        let token = format!("{header}.{payload}.");

        assert_eq!(codec.validate(&token), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_bad_subjects_are_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let now = Utc::now().timestamp();

        for sub in ["", "0", "-1", "abc"] {
            let token = sign_raw(
                Algorithm::HS256,
                SECRET,
                &json!({ "sub": sub, "iat": now, "exp": now + 3600 }),
            );
            assert_eq!(codec.validate(&token), Err(JwtError::InvalidToken), "subject {sub:?}");
        }
    }

    #[test]
    fn test_missing_claims_are_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let now = Utc::now().timestamp();

        let without_exp = sign_raw(Algorithm::HS256, SECRET, &json!({ "sub": "42", "iat": now }));
        let without_sub =
            sign_raw(Algorithm::HS256, SECRET, &json!({ "iat": now, "exp": now + 3600 }));

        assert_eq!(codec.validate(&without_exp), Err(JwtError::InvalidToken));
        assert_eq!(codec.validate(&without_sub), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_expiry_not_after_issue_time_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();
        let now = Utc::now().timestamp();

        let token = sign_raw(
            Algorithm::HS256,
            SECRET,
            &json!({ "sub": "42", "iat": now + 7200, "exp": now + 3600 }),
        );

        assert_eq!(codec.validate(&token), Err(JwtError::InvalidToken));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let codec = TokenCodec::new(SECRET).unwrap();

        assert_eq!(codec.validate("invalid.token.here"), Err(JwtError::InvalidToken));
        assert_eq!(codec.validate(""), Err(JwtError::InvalidToken));
    }
}
