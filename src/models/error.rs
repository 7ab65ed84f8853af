//! Error types shared by the engine, the store and the web layer.

use crate::models::game::MatchId;
use crate::models::geography::Level;
use crate::models::player::PlayerId;
use thiserror::Error;

/// Errors raised by the pure bracket engine (pairing, progression, placement).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum BracketError {
    #[error("Cannot draw a round without entrants")]
    NoEntrants,
    #[error("Player {0} entered the draw twice")]
    DuplicateEntrant(PlayerId),
    #[error("Match {0} is resolved but has no winner")]
    MissingWinner(MatchId),
    #[error("Bracket history is inconsistent: {0}")]
    InconsistentHistory(String),
}

/// Errors that can occur during tournament operations.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    /// Bad or missing input; the caller fixes the request.
    #[error("{0}")]
    Validation(String),
    /// Action conflicts with the current state (double initialization, self-confirmation...).
    #[error("{0}")]
    StateConflict(String),
    #[error("{0}")]
    NotFound(String),
    /// An earlier step has not produced what this one needs.
    #[error("{0}")]
    PrerequisiteMissing(String),
    #[error("{0}")]
    Permission(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error(transparent)]
    Bracket(#[from] BracketError),
}

impl TournamentError {
    pub fn no_eligible_players(level: Level) -> Self {
        TournamentError::PrerequisiteMissing(format!("No eligible players found for {} level", level))
    }

    pub fn no_previous_winners() -> Self {
        TournamentError::PrerequisiteMissing("No winners found from previous level".to_string())
    }

    pub fn already_initialized() -> Self {
        TournamentError::StateConflict("Tournament already initialized".to_string())
    }

    pub fn admin_required() -> Self {
        TournamentError::Permission("Administrator access required".to_string())
    }

    pub fn lock_poisoned() -> Self {
        TournamentError::Internal("lock error".to_string())
    }
}
