//! Twilio Messages API client (SMS or WhatsApp, depending on the addresses).

use serde::Deserialize;

use crate::rsvp::Notifier;
use crate::secrets::TwilioCredentials;
use crate::{Error, Result};

const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: String,
}

/// Sends every message from one fixed address to one fixed recipient.
pub struct TwilioClient {
    http_client: reqwest::Client,
    credentials: TwilioCredentials,
    api_base: String,
    from: String,
    to: String,
}

impl TwilioClient {
    pub fn new(
        http_client: reqwest::Client,
        credentials: TwilioCredentials,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            credentials,
            api_base: TWILIO_API_BASE.to_string(),
            from: from.into(),
            to: to.into(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

fn messages_url(api_base: &str, account_sid: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Messages.json",
        api_base, account_sid
    )
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<TwilioErrorBody>(body) {
        Ok(TwilioErrorBody {
            code: Some(code),
            message,
        }) => format!("Twilio error {} ({}): {}", code, status, message),
        Ok(TwilioErrorBody { message, .. }) => format!("Twilio error ({}): {}", status, message),
        Err(_) => format!("Twilio error ({}): {}", status, body),
    }
}

impl Notifier for TwilioClient {
    async fn send_message(&self, body: &str) -> Result<String> {
        let params = [
            ("From", self.from.as_str()),
            ("To", self.to.as_str()),
            ("Body", body),
        ];

        let response = self
            .http_client
            .post(messages_url(&self.api_base, &self.credentials.account_sid))
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("Twilio request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Notification(describe_failure(status, &error_text)));
        }

        let message: MessageResource = response
            .json()
            .await
            .map_err(|e| Error::Notification(format!("Failed to parse Twilio response: {}", e)))?;

        Ok(message.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, Route};

    fn client(base_url: &str) -> TwilioClient {
        TwilioClient::new(
            reqwest::Client::new(),
            TwilioCredentials {
                account_sid: "AC123".to_string(),
                auth_token: "secret123".to_string(),
            },
            "whatsapp:+14155238886",
            "whatsapp:+15005550006",
        )
        .with_api_base(base_url)
    }

    #[tokio::test]
    async fn test_send_message_returns_sid() {
        let base_url = serve(vec![Route {
            prefix: "/2010-04-01/Accounts/AC123/Messages.json",
            status: 201,
            body: r#"{"sid":"SM0123456789","status":"queued"}"#,
        }])
        .await;

        let sid = client(&base_url).send_message("hello").await.unwrap();
        assert_eq!(sid, "SM0123456789");
    }

    #[tokio::test]
    async fn test_non_success_send_is_notification_error() {
        let base_url = serve(vec![Route {
            prefix: "/2010-04-01/Accounts/",
            status: 400,
            body: r#"{"code":21211,"message":"The 'To' number is not a valid phone number.","status":400}"#,
        }])
        .await;

        let err = client(&base_url).send_message("hello").await.unwrap_err();
        assert!(matches!(&err, Error::Notification(msg) if msg.contains("21211")));
    }

    #[test]
    fn test_messages_url() {
        assert_eq!(
            messages_url(TWILIO_API_BASE, "AC123"),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_describe_failure_with_code() {
        let body = r#"{"code":21211,"message":"The 'To' number is not a valid phone number.","status":400}"#;
        let text = describe_failure(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(text.contains("21211"));
        assert!(text.contains("not a valid phone number"));
    }

    #[test]
    fn test_describe_failure_unparseable() {
        let text = describe_failure(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(text, "Twilio error (502 Bad Gateway): upstream down");
    }
}
