use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use duel_types::UserId;

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String, // Subject, the user's UUID
    #[serde(default)]
    pub exp: Option<u64>,
    pub iss: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksKey {
    pub kty: String,
    #[serde(rename = "use")]
    pub use_field: Option<String>,
    pub x5c: Option<Vec<String>>,
    pub n: Option<String>,
    pub e: Option<String>,
    pub kid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JwksKey>,
}

/// The identity a request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub display_name: Option<String>,
}

pub struct AuthService {
    client: Client,
    jwks_cache: Arc<RwLock<HashMap<String, (DecodingKey, SystemTime)>>>,
    jwks_url: String,
    audience: String,
    issuer: Option<String>,
    dev_mode: bool,
}

impl AuthService {
    pub fn new(jwks_url: String, audience: String, issuer: Option<String>) -> Self {
        Self {
            client: Client::new(),
            jwks_cache: Arc::new(RwLock::new(HashMap::new())),
            jwks_url,
            audience,
            issuer,
            dev_mode: false,
        }
    }

    pub fn new_dev_mode() -> Self {
        Self {
            client: Client::new(),
            jwks_cache: Arc::new(RwLock::new(HashMap::new())),
            jwks_url: String::new(),
            audience: "dev".to_string(),
            issuer: None,
            dev_mode: true,
        }
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if self.dev_mode {
            return self.validate_dev_token(token);
        }

        let header = decode_header(token).map_err(|e| {
            tracing::warn!("Failed to decode JWT header: {:?}", e);
            AuthError::InvalidToken
        })?;
        let kid = header.kid.ok_or_else(|| {
            tracing::warn!("JWT header missing 'kid' field");
            AuthError::InvalidToken
        })?;

        let decoding_key = self.get_decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<AccessTokenClaims>(token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
                _ => {
                    tracing::warn!("JWT validation failed for kid '{}': {:?}", kid, e);
                    AuthError::InvalidToken
                }
            })?;

        Self::user_from_claims(token_data.claims)
    }

    fn user_from_claims(claims: AccessTokenClaims) -> Result<AuthenticatedUser, AuthError> {
        let id = UserId::parse_str(&claims.sub).map_err(|_| {
            tracing::warn!("Token subject is not a user id: {}", claims.sub);
            AuthError::InvalidSubject
        })?;

        Ok(AuthenticatedUser {
            id,
            display_name: claims.name,
        })
    }

    async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.jwks_cache.read().await;
            if let Some((key, cached_time)) = cache.get(kid) {
                let elapsed = cached_time.elapsed().unwrap_or(JWKS_CACHE_TTL);
                if elapsed < JWKS_CACHE_TTL {
                    return Ok(key.clone());
                }
                tracing::debug!("Cached key for kid '{}' is {}s old, refetching", kid, elapsed.as_secs());
            }
        }

        tracing::debug!("Fetching JWKS from {}", self.jwks_url);
        let response = self.client.get(&self.jwks_url).send().await.map_err(|e| {
            tracing::warn!("Failed to fetch JWKS: {:?}", e);
            AuthError::JwksFetchError
        })?;

        if !response.status().is_success() {
            tracing::warn!("JWKS fetch returned status: {}", response.status());
            return Err(AuthError::JwksFetchError);
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::warn!("Failed to parse JWKS JSON: {:?}", e);
            AuthError::JwksFetchError
        })?;

        let jwks_key = jwks.keys.iter().find(|key| key.kid == kid).ok_or_else(|| {
            tracing::warn!("Key with kid '{}' not found in JWKS ({} keys)", kid, jwks.keys.len());
            AuthError::KeyNotFound
        })?;

        let decoding_key = Self::decoding_key_from_jwk(jwks_key)?;

        {
            let mut cache = self.jwks_cache.write().await;
            cache.insert(kid.to_string(), (decoding_key.clone(), SystemTime::now()));
        }

        Ok(decoding_key)
    }

    fn decoding_key_from_jwk(jwks_key: &JwksKey) -> Result<DecodingKey, AuthError> {
        if let (Some(n), Some(e)) = (&jwks_key.n, &jwks_key.e) {
            return DecodingKey::from_rsa_components(n, e).map_err(|e| {
                tracing::warn!("Failed to create decoding key from RSA components: {:?}", e);
                AuthError::InvalidKey
            });
        }

        let cert = jwks_key
            .x5c
            .as_ref()
            .and_then(|chain| chain.first())
            .ok_or_else(|| {
                tracing::warn!("JWKS key '{}' has neither n,e nor x5c", jwks_key.kid);
                AuthError::InvalidKey
            })?;
        let cert_der = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .map_err(|e| {
                tracing::warn!("Failed to decode x5c certificate: {:?}", e);
                AuthError::InvalidKey
            })?;

        Ok(DecodingKey::from_rsa_der(&cert_der))
    }

    /// Dev tokens are either an unsigned JWT whose payload carries `sub`, or
    /// the plain form `<user uuid>[:<display name>]`.
    fn validate_dev_token(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() == 3 {
            let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
                .decode(parts[1].trim_end_matches('='))
                .map_err(|e| {
                    tracing::warn!("Failed to decode JWT payload in dev mode: {:?}", e);
                    AuthError::InvalidToken
                })?;

            let claims: AccessTokenClaims =
                serde_json::from_slice(&payload_bytes).map_err(|e| {
                    tracing::warn!("Failed to parse JWT claims in dev mode: {:?}", e);
                    AuthError::InvalidToken
                })?;

            return Self::user_from_claims(claims);
        }

        let (raw_id, display_name) = match token.split_once(':') {
            Some((raw_id, name)) => (raw_id, Some(name.to_string())),
            None => (token, None),
        };
        let id = UserId::parse_str(raw_id).map_err(|_| AuthError::InvalidSubject)?;

        Ok(AuthenticatedUser { id, display_name })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a valid user id")]
    InvalidSubject,
    #[error("Failed to fetch JWKS")]
    JwksFetchError,
    #[error("Key not found")]
    KeyNotFound,
    #[error("Invalid key")]
    InvalidKey,
    #[error("Audience mismatch")]
    AudienceMismatch,
    #[error("Issuer mismatch")]
    IssuerMismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsigned_jwt(payload: serde_json::Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.",
            engine.encode(r#"{"alg":"none","typ":"JWT"}"#),
            engine.encode(payload.to_string())
        )
    }

    #[test]
    fn test_auth_service_creation() {
        let auth_service = AuthService::new(
            "https://auth.example.com/.well-known/jwks.json".to_string(),
            "duel-arena".to_string(),
            None,
        );

        assert_eq!(auth_service.audience, "duel-arena");
        assert!(!auth_service.is_dev_mode());
    }

    #[tokio::test]
    async fn test_invalid_token_validation() {
        let auth_service = AuthService::new(
            "https://auth.example.com/.well-known/jwks.json".to_string(),
            "duel-arena".to_string(),
            None,
        );

        let result = auth_service.validate_token("invalid-token").await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_dev_mode_plain_token() {
        let auth_service = AuthService::new_dev_mode();
        let user_id = UserId::new_v4();

        let user = auth_service
            .validate_token(&format!("{}:Alice", user_id))
            .await
            .unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.display_name.as_deref(), Some("Alice"));

        let bare = auth_service.validate_token(&user_id.to_string()).await.unwrap();
        assert_eq!(bare.id, user_id);
        assert_eq!(bare.display_name, None);
    }

    #[tokio::test]
    async fn test_dev_mode_unsigned_jwt() {
        let auth_service = AuthService::new_dev_mode();
        let user_id = UserId::new_v4();
        let token = unsigned_jwt(serde_json::json!({
            "sub": user_id.to_string(),
            "exp": 4_102_444_800u64,
            "name": "Bob",
        }));

        let user = auth_service.validate_token(&token).await.unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.display_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_dev_mode_rejects_non_uuid_subject() {
        let auth_service = AuthService::new_dev_mode();

        let result = auth_service.validate_token("not-a-user:Mallory").await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidSubject));
    }
}
