//! RSVP core: durable spreadsheet write followed by a best-effort host notification.
//!
//! The store append is a hard dependency; if it fails the request fails and no
//! notification is attempted. The notification is best-effort and its failure
//! only shows up as [`NotifyOutcome::Failed`] on an otherwise successful outcome.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::{error, info};

use crate::{Error, Result};

/// Plain-text body returned by the liveness check.
pub const LIVENESS_MESSAGE: &str = "Server is up 🎉";

/// Party size written for guests who decline.
pub const DECLINED_PARTY_SIZE: &str = "-";

/// Response message when the row was saved and the host was notified.
pub const SAVED_AND_NOTIFIED: &str = "saved and notified";

/// Response message when the row was saved but the notification did not go out.
pub const SAVED_NOTIFICATION_FAILED: &str = "saved, notification failed";

/// Append-only tabular store holding one row per RSVP.
pub trait RowStore: Send + Sync {
    fn append_row(&self, row: &[Value]) -> impl Future<Output = Result<()>> + Send;
}

/// Channel delivering a text message to the fixed host recipient.
pub trait Notifier: Send + Sync {
    /// Send `body`, returning the provider's message id.
    fn send_message(&self, body: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Guest-supplied party size. Kept opaque: any truthy JSON scalar.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PartySize {
    Count(serde_json::Number),
    Flag(bool),
    Label(String),
}

impl PartySize {
    /// Mirrors the truthiness check guests' browsers are used to.
    pub fn is_present(&self) -> bool {
        match self {
            PartySize::Count(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
            PartySize::Flag(b) => *b,
            PartySize::Label(s) => !s.is_empty(),
        }
    }

    pub fn to_cell(&self) -> Value {
        match self {
            PartySize::Count(n) => Value::Number(n.clone()),
            PartySize::Flag(b) => Value::Bool(*b),
            PartySize::Label(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for PartySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartySize::Count(n) => write!(f, "{}", n),
            PartySize::Flag(b) => write!(f, "{}", b),
            PartySize::Label(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Confirmed,
    NotAttending,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Confirmed => "confirmed",
            AttendanceStatus::NotAttending => "not_attending",
        }
    }
}

/// One row of the attendance sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub name: String,
    pub party_size: PartySize,
    pub status: AttendanceStatus,
    pub timestamp: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Cells in column order A:D.
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::String(self.name.clone()),
            self.party_size.to_cell(),
            Value::String(self.status.as_str().to_string()),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ]
    }

    /// Text sent to the host for this record.
    pub fn notification_body(&self) -> String {
        match self.status {
            AttendanceStatus::Confirmed => format!(
                "✅ {} confirmed attendance with {} guests. 🎉",
                self.name, self.party_size
            ),
            AttendanceStatus::NotAttending => {
                format!("❌ {} will not be able to attend the event.", self.name)
            }
        }
    }
}

/// Body of `POST /api/confirm`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    pub name: Option<String>,
    pub party_size: Option<PartySize>,
}

/// Body of `POST /api/decline`.
#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    pub name: Option<String>,
}

/// Result of the best-effort notification step.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    Sent { message_id: String },
    Failed { reason: String },
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent { .. })
    }
}

/// A saved record together with how the notification went.
#[derive(Debug, Clone)]
pub struct RsvpOutcome {
    pub record: AttendanceRecord,
    pub notification: NotifyOutcome,
}

impl RsvpOutcome {
    pub fn response(&self) -> RsvpResponse {
        if self.notification.is_sent() {
            RsvpResponse {
                message: SAVED_AND_NOTIFIED.to_string(),
                notification_sent: None,
            }
        } else {
            RsvpResponse {
                message: SAVED_NOTIFICATION_FAILED.to_string(),
                notification_sent: Some(false),
            }
        }
    }
}

/// JSON body returned for a saved RSVP.
#[derive(Debug, Serialize, PartialEq)]
pub struct RsvpResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_sent: Option<bool>,
}

fn present_name(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.is_empty())
}

/// Handles guest responses against a store and a notifier.
pub struct RsvpService<S, N> {
    store: S,
    notifier: N,
}

impl<S: RowStore, N: Notifier> RsvpService<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Record an attending guest and tell the host.
    pub async fn confirm(&self, request: ConfirmRequest) -> Result<RsvpOutcome> {
        let name = present_name(request.name);
        let party_size = request.party_size.filter(PartySize::is_present);

        let (Some(name), Some(party_size)) = (name, party_size) else {
            return Err(Error::Validation("Missing name or party_size".to_string()));
        };

        self.record_and_notify(AttendanceRecord {
            name,
            party_size,
            status: AttendanceStatus::Confirmed,
            timestamp: Utc::now(),
        })
        .await
    }

    /// Record a guest who will not attend and tell the host.
    pub async fn decline(&self, request: DeclineRequest) -> Result<RsvpOutcome> {
        let name = present_name(request.name)
            .ok_or_else(|| Error::Validation("Missing name".to_string()))?;

        self.record_and_notify(AttendanceRecord {
            name,
            party_size: PartySize::Label(DECLINED_PARTY_SIZE.to_string()),
            status: AttendanceStatus::NotAttending,
            timestamp: Utc::now(),
        })
        .await
    }

    async fn record_and_notify(&self, record: AttendanceRecord) -> Result<RsvpOutcome> {
        if let Err(e) = self.store.append_row(&record.to_row()).await {
            error!(
                name = %record.name,
                status = record.status.as_str(),
                error = %e,
                "Failed to append attendance row"
            );
            return Err(match e {
                Error::StoreWrite(msg) => Error::StoreWrite(msg),
                other => Error::StoreWrite(other.to_string()),
            });
        }

        info!(name = %record.name, status = record.status.as_str(), "Attendance row appended");

        let notification = self.notify(&record.notification_body()).await;

        Ok(RsvpOutcome {
            record,
            notification,
        })
    }

    async fn notify(&self, body: &str) -> NotifyOutcome {
        match self.notifier.send_message(body).await {
            Ok(message_id) => {
                info!(message_id = %message_id, "Host notification sent");
                NotifyOutcome::Sent { message_id }
            }
            Err(e) => {
                error!(error = %e, "Failed to send host notification");
                NotifyOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
