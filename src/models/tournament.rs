//! Tournament, its lifecycle status and prize configuration.

use crate::models::error::TournamentError;
use crate::models::geography::Level;
use crate::models::winner::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    #[default]
    Upcoming,
    Registration,
    Ongoing,
    Completed,
}

impl TournamentStatus {
    pub fn accepts_registrations(self) -> bool {
        matches!(self, TournamentStatus::Upcoming | TournamentStatus::Registration)
    }
}

/// Whether level-to-level progression happens on its own or waits for an admin.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationMode {
    #[default]
    Manual,
    Automatic,
}

/// Percentage share of a level's prize for each placed position.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDistribution")]
pub struct PrizeDistribution {
    first: u32,
    second: u32,
    third: u32,
}

#[derive(Deserialize)]
struct RawDistribution {
    first: u32,
    second: u32,
    third: u32,
}

impl TryFrom<RawDistribution> for PrizeDistribution {
    type Error = TournamentError;

    fn try_from(raw: RawDistribution) -> Result<Self, Self::Error> {
        PrizeDistribution::new(raw.first, raw.second, raw.third)
    }
}

impl Default for PrizeDistribution {
    fn default() -> Self {
        Self {
            first: 60,
            second: 30,
            third: 10,
        }
    }
}

impl PrizeDistribution {
    pub fn new(first: u32, second: u32, third: u32) -> Result<Self, TournamentError> {
        if u64::from(first) + u64::from(second) + u64::from(third) > 100 {
            return Err(TournamentError::Validation(
                "Prize shares must not exceed 100 percent".to_string(),
            ));
        }
        Ok(Self { first, second, third })
    }

    pub fn share(&self, position: Position) -> u32 {
        match position {
            Position::First => self.first,
            Position::Second => self.second,
            Position::Third => self.third,
        }
    }
}

/// Prize pool per level plus the per-position split applied to every level.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrizeConfig {
    pub community: u64,
    pub county: u64,
    pub regional: u64,
    pub national: u64,
    #[serde(default)]
    pub distribution: PrizeDistribution,
}

impl PrizeConfig {
    pub fn level_amount(&self, level: Level) -> u64 {
        match level {
            Level::Community => self.community,
            Level::County => self.county,
            Level::Regional => self.regional,
            Level::National => self.national,
        }
    }

    pub fn amount_for(&self, level: Level, position: Position) -> u64 {
        // pool = 100q + r, so pool * share / 100 = q * share + r * share / 100 without overflow
        let pool = self.level_amount(level);
        let share = u64::from(self.distribution.share(position));
        pool / 100 * share + pool % 100 * share / 100
    }
}

/// Admin-supplied fields for a new tournament.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTournament {
    pub name: String,
    #[serde(default)]
    pub charge: u64,
    #[serde(default)]
    pub prizes: PrizeConfig,
    #[serde(default)]
    pub automation_mode: AutomationMode,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Registration fee.
    pub charge: u64,
    pub prizes: PrizeConfig,
    pub status: TournamentStatus,
    pub automation_mode: AutomationMode,
    /// Highest level initialized so far.
    pub current_level: Option<Level>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Tournament {
    pub fn new(fields: NewTournament) -> Result<Self, TournamentError> {
        let name = fields.name.trim();
        if name.is_empty() {
            return Err(TournamentError::Validation("Tournament name is required".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            charge: fields.charge,
            prizes: fields.prizes,
            status: TournamentStatus::Upcoming,
            automation_mode: fields.automation_mode,
            current_level: None,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    pub fn is_automatic(&self) -> bool {
        self.automation_mode == AutomationMode::Automatic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_amount_uses_level_pool_and_share() {
        let prizes = PrizeConfig {
            community: 1_000,
            national: 10_000,
            ..PrizeConfig::default()
        };
        assert_eq!(prizes.amount_for(Level::Community, Position::First), 600);
        assert_eq!(prizes.amount_for(Level::National, Position::Third), 1_000);
        assert_eq!(prizes.amount_for(Level::County, Position::First), 0);
    }

    #[test]
    fn distribution_over_100_percent_is_rejected() {
        assert!(PrizeDistribution::new(70, 30, 10).is_err());
        let err = serde_json::from_str::<PrizeDistribution>(r#"{"first":90,"second":20,"third":0}"#);
        assert!(err.is_err());
    }

    #[test]
    fn oversized_shares_do_not_wrap() {
        assert!(PrizeDistribution::new(u32::MAX, 1, 0).is_err());
        let raw = r#"{"first":4294967295,"second":1,"third":0}"#;
        assert!(serde_json::from_str::<PrizeDistribution>(raw).is_err());
    }

    #[test]
    fn huge_prize_pools_are_split_exactly() {
        let prizes = PrizeConfig {
            national: u64::MAX / 10,
            regional: 199,
            ..PrizeConfig::default()
        };
        let exact = u128::from(u64::MAX / 10) * 60 / 100;
        assert_eq!(u128::from(prizes.amount_for(Level::National, Position::First)), exact);
        assert_eq!(prizes.amount_for(Level::Regional, Position::First), 119);
        assert_eq!(prizes.amount_for(Level::Regional, Position::Third), 19);
    }

    #[test]
    fn blank_name_is_rejected() {
        let fields = NewTournament {
            name: "  ".to_string(),
            ..NewTournament::default()
        };
        assert!(matches!(Tournament::new(fields), Err(TournamentError::Validation(_))));
    }
}
