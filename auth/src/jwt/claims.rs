use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Session token claims.
///
/// The subject is the user's numeric identity rendered as a string; `iat`
/// and `exp` are Unix timestamps in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims for a user session.
    ///
    /// # Arguments
    /// * `user_id` - Numeric user identifier
    /// * `issued_at` - Issuance instant
    /// * `lifetime` - Time until the token expires
    ///
    /// # Returns
    /// Claims with sub, iat and exp set, or `None` if the expiry is not
    /// representable
    pub fn for_user(user_id: i64, issued_at: DateTime<Utc>, lifetime: Duration) -> Option<Self> {
        let expiration = issued_at.checked_add_signed(lifetime)?;

        Some(Self {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: expiration.timestamp(),
        })
    }

    /// Subject as a positive user identifier.
    ///
    /// Returns `None` for an empty, non-numeric, zero or negative subject.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse::<i64>().ok().filter(|id| *id > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_user() {
        let now = Utc::now();
        let claims = Claims::for_user(42, now, Duration::hours(24)).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_for_user_with_unrepresentable_expiry() {
        assert_eq!(Claims::for_user(42, DateTime::<Utc>::MAX_UTC, Duration::hours(1)), None);
    }

    #[test]
    fn test_user_id_rejects_non_positive_and_garbage() {
        let mut claims = Claims::for_user(1, Utc::now(), Duration::hours(1)).unwrap();

        for sub in ["", "0", "-7", "abc", "12abc", " 5"] {
            claims.sub = sub.to_string();
            assert_eq!(claims.user_id(), None, "subject {sub:?}");
        }
    }
}
