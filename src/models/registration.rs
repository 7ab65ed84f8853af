//! Tournament registrations.

use crate::models::player::PlayerId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RegistrationId = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A player's entry into a tournament. Never deleted; rejection is a status.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub player_id: PlayerId,
    pub payment_status: PaymentStatus,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(tournament_id: TournamentId, player_id: PlayerId) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            player_id,
            payment_status: PaymentStatus::Unpaid,
            status: RegistrationStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Eligible as a community-level entrant.
    pub fn is_approved(&self) -> bool {
        self.status == RegistrationStatus::Approved
    }
}
