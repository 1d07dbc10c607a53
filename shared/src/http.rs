//! HTTP helpers for the Lambda entry point.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error body returned for every non-2xx JSON response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create an error response with the given status code and message.
pub fn error_response(status: u16, message: impl Into<String>) -> Result<Response<Body>, lambda_http::Error> {
    json_response(
        status,
        &ErrorBody {
            error: message.into(),
        },
    )
}

/// Create a plain-text response.
pub fn text_response(status: u16, text: &str) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .body(Body::from(text.to_string()))?)
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure. An empty body parses as `{}`.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    let bytes: &[u8] = body.as_ref();
    let bytes = if bytes.is_empty() { b"{}".as_slice() } else { bytes };

    match serde_json::from_slice(bytes) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: MyRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}
