//! Match entity, its status lifecycle, round names and date proposals.

use crate::models::error::TournamentError;
use crate::models::geography::{GroupId, Level};
use crate::models::player::PlayerId;
use crate::models::tournament::TournamentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// One self-contained bracket: (tournament, level, group).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct GroupKey {
    pub tournament_id: TournamentId,
    pub level: Level,
    pub group_id: Option<GroupId>,
}

impl GroupKey {
    pub fn new(tournament_id: TournamentId, level: Level, group_id: Option<GroupId>) -> Self {
        Self {
            tournament_id,
            level,
            group_id,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.group_id {
            Some(id) => write!(f, "{}/{}#{}", self.tournament_id, self.level, id),
            None => write!(f, "{}/{}", self.tournament_id, self.level),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Scheduled,
    PendingConfirmation,
    Completed,
    Forfeit,
}

impl MatchStatus {
    /// Completed or forfeit: no further changes allowed.
    pub fn is_resolved(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Forfeit)
    }
}

/// Name of a bracket round.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum RoundName {
    /// Early rounds of large brackets, sized to the next power of two.
    RoundOf(u32),
    QuarterFinal,
    SemiFinal,
    WinnersSemiFinal,
    LosersSemiFinal,
    Final,
}

impl RoundName {
    /// Round name for a field of `entrants` players in an elimination bracket.
    pub fn for_field(entrants: usize) -> Self {
        match entrants {
            0..=2 => RoundName::Final,
            3..=4 => RoundName::SemiFinal,
            5..=8 => RoundName::QuarterFinal,
            n => RoundName::RoundOf(n.next_power_of_two() as u32),
        }
    }
}

impl fmt::Display for RoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundName::RoundOf(size) => write!(f, "round_of_{}", size),
            RoundName::QuarterFinal => f.write_str("quarter_final"),
            RoundName::SemiFinal => f.write_str("semi_final"),
            RoundName::WinnersSemiFinal => f.write_str("Winners_SF"),
            RoundName::LosersSemiFinal => f.write_str("Losers_SF"),
            RoundName::Final => f.write_str("final"),
        }
    }
}

impl std::str::FromStr for RoundName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quarter_final" => Ok(RoundName::QuarterFinal),
            "semi_final" => Ok(RoundName::SemiFinal),
            "Winners_SF" => Ok(RoundName::WinnersSemiFinal),
            "Losers_SF" => Ok(RoundName::LosersSemiFinal),
            "final" => Ok(RoundName::Final),
            other => other
                .strip_prefix("round_of_")
                .and_then(|n| n.parse().ok())
                .map(RoundName::RoundOf)
                .ok_or_else(|| format!("unknown round name {}", other)),
        }
    }
}

impl Serialize for RoundName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoundName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Candidate dates offered by one participant; the opponent picks one.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DateTime<Utc>>", into = "Vec<DateTime<Utc>>")]
pub struct ProposedDates(Vec<DateTime<Utc>>);

impl ProposedDates {
    pub const MAX_DATES: usize = 5;

    pub fn new(mut dates: Vec<DateTime<Utc>>) -> Result<Self, TournamentError> {
        if dates.is_empty() {
            return Err(TournamentError::Validation("At least one date must be proposed".to_string()));
        }
        if dates.len() > Self::MAX_DATES {
            return Err(TournamentError::Validation(format!(
                "At most {} dates can be proposed",
                Self::MAX_DATES
            )));
        }
        dates.sort();
        dates.dedup();
        Ok(Self(dates))
    }

    pub fn contains(&self, date: &DateTime<Utc>) -> bool {
        self.0.contains(date)
    }

    pub fn dates(&self) -> &[DateTime<Utc>] {
        &self.0
    }
}

impl TryFrom<Vec<DateTime<Utc>>> for ProposedDates {
    type Error = TournamentError;

    fn try_from(dates: Vec<DateTime<Utc>>) -> Result<Self, Self::Error> {
        ProposedDates::new(dates)
    }
}

impl From<ProposedDates> for Vec<DateTime<Utc>> {
    fn from(p: ProposedDates) -> Self {
        p.0
    }
}

/// A single match between two players, or a bye when `player_2_id` is None.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub level: Level,
    pub group_id: Option<GroupId>,
    pub round: u32,
    pub round_name: RoundName,
    /// Traceable name: level, round token and the slot within the round.
    pub match_name: String,
    pub player_1_id: PlayerId,
    pub player_2_id: Option<PlayerId>,
    pub bye_player_id: Option<PlayerId>,
    pub status: MatchStatus,
    pub proposed_dates: Option<ProposedDates>,
    pub proposed_by: Option<PlayerId>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub player_1_points: Option<u32>,
    pub player_2_points: Option<u32>,
    /// None while unresolved, and always None for byes.
    pub winner_id: Option<PlayerId>,
    pub submitted_by: Option<PlayerId>,
    pub confirmed_by: Option<PlayerId>,
    pub created_at: DateTime<Utc>,
}

impl GameMatch {
    pub fn new(
        key: GroupKey,
        round: u32,
        round_name: RoundName,
        match_name: String,
        player_1_id: PlayerId,
        player_2_id: PlayerId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id: key.tournament_id,
            level: key.level,
            group_id: key.group_id,
            round,
            round_name,
            match_name,
            player_1_id,
            player_2_id: Some(player_2_id),
            bye_player_id: None,
            status: MatchStatus::Pending,
            proposed_dates: None,
            proposed_by: None,
            scheduled_date: None,
            player_1_points: None,
            player_2_points: None,
            winner_id: None,
            submitted_by: None,
            confirmed_by: None,
            created_at: Utc::now(),
        }
    }

    /// A bye: completed at creation, no opponent, and no recorded winner.
    pub fn bye(key: GroupKey, round: u32, round_name: RoundName, match_name: String, player_id: PlayerId) -> Self {
        Self {
            player_2_id: None,
            bye_player_id: Some(player_id),
            status: MatchStatus::Completed,
            ..Self::new(key, round, round_name, match_name, player_id, player_id)
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.tournament_id, self.level, self.group_id)
    }

    pub fn is_bye(&self) -> bool {
        self.player_2_id.is_none()
    }

    pub fn involves(&self, player_id: PlayerId) -> bool {
        self.player_1_id == player_id || self.player_2_id == Some(player_id)
    }

    pub fn players(&self) -> Vec<PlayerId> {
        std::iter::once(self.player_1_id).chain(self.player_2_id).collect()
    }

    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        if self.player_1_id == player_id {
            self.player_2_id
        } else if self.player_2_id == Some(player_id) {
            Some(self.player_1_id)
        } else {
            None
        }
    }

    pub fn loser_id(&self) -> Option<PlayerId> {
        self.winner_id.and_then(|w| self.opponent_of(w))
    }

    /// Points scored by a participant (0 when no score was recorded, e.g. forfeits).
    pub fn points_of(&self, player_id: PlayerId) -> u32 {
        if self.player_1_id == player_id {
            self.player_1_points.unwrap_or(0)
        } else if self.player_2_id == Some(player_id) {
            self.player_2_points.unwrap_or(0)
        } else {
            0
        }
    }

    /// Player who moves on from this match: the winner, or the bye player.
    pub fn advancing_player(&self) -> Option<PlayerId> {
        if self.is_bye() {
            self.bye_player_id
        } else {
            self.winner_id
        }
    }
}
