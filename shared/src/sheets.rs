//! Google Sheets append client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::GoogleAuth;
use crate::rsvp::RowStore;
use crate::{Error, Result};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

#[derive(Debug, Serialize)]
struct ValueRange<'a> {
    values: [&'a [Value]; 1],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendResponse {
    updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: Option<String>,
}

/// Appends rows to a fixed range of one spreadsheet.
pub struct SheetsClient {
    http_client: reqwest::Client,
    auth: GoogleAuth,
    api_base: String,
    spreadsheet_id: String,
    range: String,
}

impl SheetsClient {
    pub fn new(
        http_client: reqwest::Client,
        auth: GoogleAuth,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            auth,
            api_base: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn append_url(&self) -> String {
        append_url(&self.api_base, &self.spreadsheet_id, &self.range)
    }
}

fn append_url(api_base: &str, spreadsheet_id: &str, range: &str) -> String {
    format!(
        "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=RAW",
        api_base,
        urlencoding::encode(spreadsheet_id),
        urlencoding::encode(range)
    )
}

impl RowStore for SheetsClient {
    async fn append_row(&self, row: &[Value]) -> Result<()> {
        let access_token = self
            .auth
            .access_token()
            .await
            .map_err(|e| Error::StoreWrite(e.to_string()))?;

        let response = self
            .http_client
            .post(self.append_url())
            .bearer_auth(access_token)
            .json(&ValueRange { values: [row] })
            .send()
            .await
            .map_err(|e| Error::StoreWrite(format!("Sheets append request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::StoreWrite(format!(
                "Sheets append failed ({}): {}",
                status, error_text
            )));
        }

        let body: AppendResponse = response
            .json()
            .await
            .map_err(|e| Error::StoreWrite(format!("Failed to parse append response: {}", e)))?;

        let updated_range = body
            .updates
            .and_then(|u| u.updated_range)
            .unwrap_or_else(|| "unknown".to_string());
        debug!(updated_range = %updated_range, "Sheets append complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SHEETS_SCOPE;
    use crate::test_support::{serve, stub_service_account, Route};
    use serde_json::json;

    const TOKEN_OK: Route = Route {
        prefix: "/token",
        status: 200,
        body: r#"{"access_token":"ya29.stub","expires_in":3600,"token_type":"Bearer"}"#,
    };

    fn client(base_url: &str) -> SheetsClient {
        let http_client = reqwest::Client::new();
        let auth = GoogleAuth::new(http_client.clone(), stub_service_account(base_url), SHEETS_SCOPE)
            .unwrap();
        SheetsClient::new(http_client, auth, "abc123", "RSVP!A:D").with_api_base(base_url)
    }

    fn row() -> Vec<Value> {
        vec![json!("Luis"), json!(2), json!("confirmed"), json!("2026-10-19T12:00:00.000Z")]
    }

    #[tokio::test]
    async fn test_append_row_success() {
        let base_url = serve(vec![
            TOKEN_OK,
            Route {
                prefix: "/v4/spreadsheets/abc123/values/",
                status: 200,
                body: r#"{"spreadsheetId":"abc123","updates":{"updatedRange":"RSVP!A2:D2","updatedRows":1}}"#,
            },
        ])
        .await;

        client(&base_url).append_row(&row()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_append_is_store_write() {
        let base_url = serve(vec![
            TOKEN_OK,
            Route {
                prefix: "/v4/spreadsheets/",
                status: 503,
                body: r#"{"error":{"code":503,"message":"The service is currently unavailable."}}"#,
            },
        ])
        .await;

        let err = client(&base_url).append_row(&row()).await.unwrap_err();

        assert!(matches!(&err, Error::StoreWrite(msg) if msg.contains("503")));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_token_failure_is_store_write() {
        let base_url = serve(vec![Route {
            prefix: "/token",
            status: 400,
            body: r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#,
        }])
        .await;

        let err = client(&base_url).append_row(&row()).await.unwrap_err();

        assert!(matches!(&err, Error::StoreWrite(msg) if msg.contains("invalid_grant")));
    }

    #[test]
    fn test_append_url_encodes_range() {
        assert_eq!(
            append_url(SHEETS_API_BASE, "abc123", "RSVP!A:D"),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/RSVP%21A%3AD:append?valueInputOption=RAW"
        );
    }

    #[test]
    fn test_value_range_body() {
        let row = [json!("Ana"), json!("-"), json!("not_attending"), json!("2026-10-19T12:00:00.000Z")];
        let body = serde_json::to_value(ValueRange { values: [&row] }).unwrap();

        assert_eq!(
            body,
            json!({ "values": [["Ana", "-", "not_attending", "2026-10-19T12:00:00.000Z"]] })
        );
    }

    #[test]
    fn test_parse_append_response() {
        let raw = r#"{"spreadsheetId":"abc123","tableRange":"RSVP!A1:D4","updates":{"updatedRange":"RSVP!A5:D5","updatedRows":1}}"#;
        let parsed: AppendResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.updates.unwrap().updated_range.as_deref(),
            Some("RSVP!A5:D5")
        );
    }
}
