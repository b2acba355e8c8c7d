//! Azure AD access token verification

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::{Error, Result};

use super::{ClaimSet, JwksCache, TokenVerifier};

/// Verifies RS256 tokens issued for this application
///
/// Checks signature, expiry, issuer and audience. Signing keys come from the
/// injected [`JwksCache`].
pub struct JwtVerifier {
    jwks: Arc<JwksCache>,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier for tokens from `issuer` addressed to `audience`
    pub fn new(jwks: Arc<JwksCache>, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self { jwks, validation }
    }

    /// Create a verifier and its key cache from the auth configuration
    ///
    /// # Errors
    /// Returns error if the key cache's HTTP client cannot be created
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let jwks = Arc::new(
            JwksCache::new(config.jwks_url(), config.jwks_cache_ttl)?
                .with_refresh_cooldown(config.jwks_refresh_cooldown),
        );
        Ok(Self::new(jwks, &config.issuer(), &config.client_id))
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<ClaimSet> {
        let header = decode_header(token)
            .map_err(|e| Error::Authentication(format!("malformed token: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(Error::Authentication(format!(
                "unsupported signing algorithm {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| Error::Authentication("token header missing 'kid'".to_string()))?;

        let jwk = self
            .jwks
            .find(&kid)
            .await?
            .ok_or_else(|| Error::Authentication(format!("unknown signing key '{kid}'")))?;

        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| Error::Authentication(format!("unusable signing key: {e}")))?;

        let data = decode::<ClaimSet>(token, &key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => Error::Authentication("token expired".to_string()),
            _ => Error::Authentication(format!("invalid token: {e}")),
        })?;

        Ok(data.claims)
    }
}
