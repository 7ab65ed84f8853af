//! Admin statistics and the winners export.

use crate::models::{GroupId, Level, MatchStatus, Position, RegistrationStatus, TournamentError, TournamentId, TournamentStatus};
use crate::store::Store;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RegistrationCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct LevelStatistics {
    pub level: Level,
    pub groups: usize,
    pub groups_completed: usize,
    pub matches: usize,
    pub matches_by_status: BTreeMap<MatchStatus, usize>,
    pub byes: usize,
    pub winners: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TournamentStatistics {
    pub tournament_id: TournamentId,
    pub status: TournamentStatus,
    pub current_level: Option<Level>,
    pub registrations: RegistrationCounts,
    /// Only levels that have been initialized.
    pub levels: Vec<LevelStatistics>,
}

pub fn tournament_statistics(store: &Store, tournament_id: TournamentId) -> Result<TournamentStatistics, TournamentError> {
    store.read(|data| {
        let tournament = data.tournament(tournament_id)?;

        let mut registrations = RegistrationCounts::default();
        for r in data.registrations.iter().filter(|r| r.tournament_id == tournament_id) {
            registrations.total += 1;
            match r.status {
                RegistrationStatus::Pending => registrations.pending += 1,
                RegistrationStatus::Approved => registrations.approved += 1,
                RegistrationStatus::Rejected => registrations.rejected += 1,
            }
        }

        let mut levels = Vec::new();
        for level in Level::ALL {
            let groups = data.level_groups(tournament_id, level);
            if groups.is_empty() {
                continue;
            }
            let mut matches_by_status = BTreeMap::new();
            let mut matches = 0;
            let mut byes = 0;
            for m in data.level_matches(tournament_id, level) {
                if m.is_bye() {
                    byes += 1;
                    continue;
                }
                matches += 1;
                *matches_by_status.entry(m.status).or_insert(0) += 1;
            }
            levels.push(LevelStatistics {
                level,
                groups: groups.len(),
                groups_completed: groups.iter().filter(|k| !data.group_winners(**k).is_empty()).count(),
                matches,
                matches_by_status,
                byes,
                winners: data.level_winners(tournament_id, level).count(),
            });
        }

        Ok(TournamentStatistics {
            tournament_id,
            status: tournament.status,
            current_level: tournament.current_level,
            registrations,
            levels,
        })
    })?
}

#[derive(Serialize)]
struct WinnerRow<'a> {
    level: Level,
    group_id: Option<GroupId>,
    position: Position,
    player_id: String,
    player_name: &'a str,
    prize_amount: u64,
    prize_awarded: bool,
}

/// Winner rows as CSV, ordered by level, group and position.
pub fn winners_csv(store: &Store, tournament_id: TournamentId) -> Result<String, TournamentError> {
    store.read(|data| {
        data.tournament(tournament_id)?;
        let mut winners: Vec<_> = data.winners.iter().filter(|w| w.tournament_id == tournament_id).collect();
        winners.sort_by_key(|w| (w.level, w.group_id, w.position));

        let mut wtr = csv::Writer::from_writer(Vec::new());
        for w in winners {
            let player_name = data.players.get(&w.player_id).map(|p| p.name.as_str()).unwrap_or("");
            wtr.serialize(WinnerRow {
                level: w.level,
                group_id: w.group_id,
                position: w.position,
                player_id: w.player_id.to_string(),
                player_name,
                prize_amount: w.prize_amount,
                prize_awarded: w.prize_awarded,
            })
            .map_err(|e| TournamentError::Internal(format!("csv export failed: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| TournamentError::Internal(format!("csv export failed: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| TournamentError::Internal(format!("csv export failed: {}", e)))
    })?
}
