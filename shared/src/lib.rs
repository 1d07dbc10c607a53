//! Shared library for the RSVP service.
//!
//! This crate provides configuration, credentials, the Google Sheets and Twilio
//! clients, and the RSVP core used by the Lambda entry point.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod messaging;
pub mod rsvp;
pub mod secrets;
pub mod sheets;

#[cfg(test)]
mod test_support;

pub use auth::{GoogleAuth, SHEETS_SCOPE};
pub use config::Config;
pub use error::{Error, Result};
pub use messaging::TwilioClient;
pub use rsvp::{
    AttendanceRecord, AttendanceStatus, ConfirmRequest, DeclineRequest, Notifier, NotifyOutcome,
    PartySize, RowStore, RsvpOutcome, RsvpResponse, RsvpService, LIVENESS_MESSAGE,
};
pub use secrets::{credentials_from_env, get_service_credentials, ServiceCredentials};
pub use sheets::SheetsClient;
