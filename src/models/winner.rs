//! Placed finishers of a resolved group.

use crate::models::geography::{GroupId, Level};
use crate::models::player::PlayerId;
use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};

/// Finishing place within a group. Serialized as 1, 2 or 3.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Position {
    First,
    Second,
    Third,
}

impl Position {
    pub fn rank(self) -> u8 {
        match self {
            Position::First => 1,
            Position::Second => 2,
            Position::Third => 3,
        }
    }
}

impl From<Position> for u8 {
    fn from(p: Position) -> u8 {
        p.rank()
    }
}

impl TryFrom<u8> for Position {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Position::First),
            2 => Ok(Position::Second),
            3 => Ok(Position::Third),
            other => Err(format!("invalid position {}", other)),
        }
    }
}

/// A player's finishing place, before it is persisted as a [`Winner`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Placement {
    pub player_id: PlayerId,
    pub position: Position,
}

impl Placement {
    pub fn new(player_id: PlayerId, position: Position) -> Self {
        Self { player_id, position }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub tournament_id: TournamentId,
    pub level: Level,
    pub group_id: Option<GroupId>,
    pub player_id: PlayerId,
    pub position: Position,
    pub prize_amount: u64,
    pub prize_awarded: bool,
}
