//! Configuration management for the RSVP service.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google spreadsheet receiving attendance rows
    pub spreadsheet_id: String,
    /// Tab inside the spreadsheet
    pub sheet_name: String,
    /// Sender address on the messaging channel (e.g. `whatsapp:+14155238886`)
    pub messaging_from: String,
    /// Host address that receives every notification
    pub host_recipient: String,
    /// ARN of the secret holding Google and Twilio credentials
    pub credentials_secret_arn: Option<String>,
    /// AWS region
    pub aws_region: String,
    /// Timeout applied to every outbound HTTP call
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| Error::Config(format!("Invalid HTTP_TIMEOUT_SECS: {}", e)))?,
            None => Duration::from_secs(10),
        };

        Ok(Self {
            spreadsheet_id: required("SPREADSHEET_ID")?,
            sheet_name: lookup("SHEET_NAME")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "RSVP".to_string()),
            messaging_from: required("MESSAGING_FROM")?,
            host_recipient: required("HOST_RECIPIENT")?,
            credentials_secret_arn: lookup("CREDENTIALS_SECRET_ARN"),
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            http_timeout,
        })
    }

    /// A1 range covering the four attendance columns.
    pub fn sheet_range(&self) -> String {
        format!("{}!A:D", self.sheet_name)
    }
}
