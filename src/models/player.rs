//! Player and acting-caller identity.

use crate::models::error::TournamentError;
use crate::models::geography::Location;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a player (used in matches and lookups).
pub type PlayerId = Uuid;

/// A registered player with a fixed geographic assignment.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub location: Location,
    /// Cumulative points balance; only prize distribution changes it.
    pub points: u64,
}

impl Player {
    pub fn new(name: impl Into<String>, location: Location) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            location,
            points: 0,
        }
    }

    pub fn award_points(&mut self, amount: u64) {
        self.points = self.points.saturating_add(amount);
    }
}

/// Who is performing an operation. Passed explicitly into every operation that needs it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Actor {
    Admin,
    Player(PlayerId),
}

impl Actor {
    pub fn require_admin(self) -> Result<(), TournamentError> {
        match self {
            Actor::Admin => Ok(()),
            Actor::Player(_) => Err(TournamentError::admin_required()),
        }
    }

    pub fn player_id(self) -> Option<PlayerId> {
        match self {
            Actor::Admin => None,
            Actor::Player(id) => Some(id),
        }
    }

    /// The acting player, or a permission error for callers without a player identity.
    pub fn require_player(self) -> Result<PlayerId, TournamentError> {
        self.player_id()
            .ok_or_else(|| TournamentError::Permission("A player identity is required".to_string()))
    }
}
