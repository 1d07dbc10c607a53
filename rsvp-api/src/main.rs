//! RSVP Lambda - Handles the guest-facing RSVP API.
//!
//! Endpoints:
//! - POST /api/confirm - Record an attending guest and notify the host
//! - POST /api/decline - Record a guest who will not attend and notify the host
//! - GET /api/ping - Liveness check

use aws_config::{BehaviorVersion, Region};
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{error_response, json_response, text_response};
use shared::{
    credentials_from_env, get_service_credentials, parse_body, Config, ConfirmRequest,
    DeclineRequest, GoogleAuth, Notifier, RowStore, RsvpOutcome, RsvpService, SheetsClient,
    TwilioClient, LIVENESS_MESSAGE, SHEETS_SCOPE,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

type LiveService = RsvpService<SheetsClient, TwilioClient>;

/// Build the service once per cold start.
async fn build_service() -> Result<LiveService, Error> {
    let config = Config::from_env()?;

    let credentials = match &config.credentials_secret_arn {
        Some(secret_arn) => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(config.aws_region.clone()))
                .load()
                .await;
            let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);
            get_service_credentials(&secrets_client, secret_arn).await?
        }
        None => credentials_from_env()?,
    };

    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let auth = GoogleAuth::new(http_client.clone(), credentials.google, SHEETS_SCOPE)?;
    let store = SheetsClient::new(
        http_client.clone(),
        auth,
        &config.spreadsheet_id,
        config.sheet_range(),
    );
    let notifier = TwilioClient::new(
        http_client,
        credentials.twilio,
        &config.messaging_from,
        &config.host_recipient,
    );

    info!(
        spreadsheet_id = %config.spreadsheet_id,
        range = %config.sheet_range(),
        "RSVP service configured"
    );

    Ok(RsvpService::new(store, notifier))
}

fn respond(result: shared::Result<RsvpOutcome>) -> Result<Response<Body>, Error> {
    match result {
        Ok(outcome) => json_response(200, &outcome.response()),
        Err(shared::Error::Validation(msg)) => error_response(400, msg),
        Err(shared::Error::StoreWrite(_)) => {
            error_response(500, "Failed to save RSVP; the response was not recorded")
        }
        Err(e) => error_response(e.status_code(), "Internal error"),
    }
}

async fn handler<S: RowStore, N: Notifier>(
    service: Arc<RsvpService<S, N>>,
    event: Request,
) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let path = event.uri().path();

    info!("RSVP request: {} {}", method, path);

    match (method, path) {
        ("POST", "/api/confirm") => {
            let request: ConfirmRequest = parse_body!(event.body());
            respond(service.confirm(request).await)
        }
        ("POST", "/api/decline") => {
            let request: DeclineRequest = parse_body!(event.body());
            respond(service.decline(request).await)
        }
        ("GET", "/api/ping") => text_response(200, LIVENESS_MESSAGE),
        (_, "/api/confirm" | "/api/decline" | "/api/ping") => {
            error_response(405, "Method not allowed")
        }
        _ => error_response(404, "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let service = Arc::new(build_service().await?);

    run(service_fn(move |event| {
        let service = Arc::clone(&service);
        async move { handler(service, event).await }
    }))
    .await
}
