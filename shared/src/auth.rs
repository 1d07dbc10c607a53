//! Google service-account authentication.
//!
//! Signs an RS256 JWT assertion with the service-account key and exchanges it
//! for a short-lived OAuth access token, which is reused until shortly before
//! it expires.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::secrets::ServiceAccountKey;
use crate::{Error, Result};

/// OAuth scope granting read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Claims of the self-signed assertion sent to Google's token endpoint.
#[derive(Debug, Serialize)]
pub struct AssertionClaims {
    /// Issuer (service-account email)
    pub iss: String,
    /// Space-separated scopes
    pub scope: String,
    /// Audience (token endpoint)
    pub aud: String,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

impl AssertionClaims {
    pub fn new(key: &ServiceAccountKey, scope: &str, now: DateTime<Utc>) -> Self {
        Self {
            iss: key.client_email.clone(),
            scope: scope.to_string(),
            aud: key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Access-token provider for a single service account.
pub struct GoogleAuth {
    http_client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    token: RwLock<Option<CachedToken>>,
}

impl GoogleAuth {
    /// Create a provider, failing early if the private key is not valid PEM.
    pub fn new(http_client: reqwest::Client, key: ServiceAccountKey, scope: &str) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::Auth(format!("Invalid service-account private key: {}", e)))?;

        Ok(Self {
            http_client,
            key,
            encoding_key,
            scope: scope.to_string(),
            token: RwLock::new(None),
        })
    }

    /// Sign a fresh assertion for the token endpoint.
    pub fn build_assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims::new(&self.key, &self.scope, now);
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Auth(format!("Failed to sign assertion: {}", e)))
    }

    /// Return a valid access token, exchanging a new assertion when needed.
    pub async fn access_token(&self) -> Result<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        *self.token.write().await = Some(token);

        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.build_assertion(now)?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .http_client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Auth(format!("Token exchange failed: {}", error_text)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Failed to parse token response: {}", e)))?;

        debug!(expires_in = token.expires_in, "Obtained Google access token");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
