//! Fire-and-forget notification records.

use crate::models::player::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    MatchCreated,
    DatesProposed,
    MatchScheduled,
    ResultSubmitted,
    ResultRejected,
    MatchCompleted,
    PlacementRecorded,
    PrizeAwarded,
    TournamentCompleted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub player_id: PlayerId,
    pub kind: NotificationKind,
    pub message: String,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        player_id: PlayerId,
        kind: NotificationKind,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            player_id,
            kind,
            message: message.into(),
            data,
            created_at: Utc::now(),
        }
    }
}

/// Delivery channel for notifications (email, push...). Called after the
/// transaction that produced them has committed.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification);
}

/// Sink that only writes notifications to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) {
        log::info!(
            "notify {} [{:?}]: {}",
            notification.player_id,
            notification.kind,
            notification.message
        );
    }
}
