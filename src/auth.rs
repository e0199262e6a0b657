/// Authentication extractors and utilities
///
/// Identity is issued elsewhere: callers arrive with a bearer JWT minted by
/// the identity provider, carrying their id and role. This service only
/// validates the token and reads the claims; it never re-derives identity
/// or accepts an actor from a request body.
use crate::{
    context::AppContext,
    error::{DirectoryError, DirectoryResult},
    moderation::{Actor, Role},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use serde::{Deserialize, Serialize};

/// Access-token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Caller id
    pub sub: String,
    /// Caller role, one of the ordered role names
    pub role: String,
    /// Expiry (seconds since epoch)
    pub exp: u64,
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Verify a JWT access token and parse its claims
pub fn verify_token(token: &str, jwt_secret: &str) -> DirectoryResult<TokenClaims> {
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    // Allow some clock skew (5 minutes)
    validation.leeway = 300;

    let data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::warn!("JWT verification failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                DirectoryError::Authentication("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                DirectoryError::Authentication("Invalid token signature".to_string())
            }
            _ => DirectoryError::Authentication(format!("Invalid token: {}", e)),
        }
    })?;

    Ok(data.claims)
}

/// Authenticated context - validates the bearer token or rejects with 401
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    /// The actor handed to the moderation engine
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id.clone(),
            role: Some(self.role),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = DirectoryError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or_else(|| {
            DirectoryError::Authentication("Missing authorization header".to_string())
        })?;

        let claims = verify_token(&token, &state.config.authentication.jwt_secret)?;
        let role = Role::from_str(&claims.role)
            .map_err(|_| DirectoryError::Authentication(format!("Unknown role: {}", claims.role)))?;

        Ok(AuthContext {
            user_id: claims.sub,
            role,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::TokenClaims;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";

    /// Mint a token the way the identity provider would
    pub fn token_for(user_id: &str, role: &str) -> String {
        let claims = TokenClaims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as u64,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{token_for, TEST_SECRET};
    use super::*;

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "abc123".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);

        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_token_round_trip() {
        let token = token_for("user-1", "moderator");
        let claims = verify_token(&token, TEST_SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, "moderator");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = token_for("user-1", "moderator");
        let err = verify_token(&token, "another-secret-another-secret!!!").unwrap_err();
        assert!(matches!(err, DirectoryError::Authentication(_)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = verify_token("not.a.jwt", TEST_SECRET).unwrap_err();
        assert!(matches!(err, DirectoryError::Authentication(_)));
    }
}
