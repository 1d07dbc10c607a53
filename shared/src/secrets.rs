//! Credential loading from AWS Secrets Manager or the environment.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Error, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Google service-account key (the subset of the JSON key file we use).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Twilio account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
}

/// Everything the service needs to reach its two collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceCredentials {
    pub google: ServiceAccountKey,
    pub twilio: TwilioCredentials,
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    // Check cache first
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Get Google and Twilio credentials from Secrets Manager.
pub async fn get_service_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<ServiceCredentials> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_service_credentials(&secret_string)
}

fn parse_service_credentials(raw: &str) -> Result<ServiceCredentials> {
    let mut credentials: ServiceCredentials = serde_json::from_str(raw)
        .map_err(|e| Error::Aws(format!("Failed to parse service credentials: {}", e)))?;
    credentials.google.private_key = unescape_private_key(&credentials.google.private_key);
    Ok(credentials)
}

/// Read credentials from environment variables.
pub fn credentials_from_env() -> Result<ServiceCredentials> {
    credentials_from_lookup(|key| env::var(key).ok())
}

fn credentials_from_lookup<F>(lookup: F) -> Result<ServiceCredentials>
where
    F: Fn(&str) -> Option<String>,
{
    let required =
        |key: &str| lookup(key).ok_or_else(|| Error::Config(format!("{} not set", key)));

    Ok(ServiceCredentials {
        google: ServiceAccountKey {
            client_email: required("GOOGLE_CLIENT_EMAIL")?,
            private_key: unescape_private_key(&required("GOOGLE_PRIVATE_KEY")?),
            token_uri: lookup("GOOGLE_TOKEN_URI").unwrap_or_else(default_token_uri),
        },
        twilio: TwilioCredentials {
            account_sid: required("TWILIO_ACCOUNT_SID")?,
            auth_token: required("TWILIO_AUTH_TOKEN")?,
        },
    })
}

/// PEM keys stored in env vars usually carry literal `\n` sequences.
fn unescape_private_key(key: &str) -> String {
    key.replace("\\n", "\n")
}
