//! Session token issuance and validation.

use certdesk_core::db::unix_timestamp;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use super::claims::{ACCESS, Claims, REFRESH};

/// Issues and validates HS256 admin session tokens.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Returns the token and its lifetime in seconds.
    pub fn issue_access_token(
        &self,
        admin_id: &str,
        email: &str,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let token = self.issue(admin_id, email, ACCESS, self.access_ttl_secs)?;
        Ok((token, self.access_ttl_secs))
    }

    /// Returns the token and its absolute expiry (unix seconds).
    pub fn issue_refresh_token(
        &self,
        admin_id: &str,
        email: &str,
    ) -> Result<(String, i64), jsonwebtoken::errors::Error> {
        let exp = unix_timestamp() + self.refresh_ttl_secs;
        let token = self.issue(admin_id, email, REFRESH, self.refresh_ttl_secs)?;
        Ok((token, exp))
    }

    fn issue(
        &self,
        admin_id: &str,
        email: &str,
        token_type: &str,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = unix_timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: admin_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now + ttl_secs,
            token_type: token_type.to_string(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(data.claims)
    }

    /// Hash a token for storage; raw refresh tokens are never persisted.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
