//! Level completion detection: decides whether a group's bracket is finished and
//! records its Winner rows exactly once.

use crate::logic::progression::{analyze, GroupProgress};
use crate::models::{
    GroupKey, Level, Notification, NotificationKind, Placement, PlayerId, TournamentError, TournamentId,
    Winner,
};
use crate::store::{Store, StoreData};
use serde::Serialize;

/// Outcome of a completion check for one group.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct CompletionReport {
    pub completed: bool,
    /// Placed players, first place first.
    pub winners: Vec<PlayerId>,
    /// True only for the call that wrote the Winner rows.
    #[serde(skip)]
    pub newly_recorded: bool,
}

impl CompletionReport {
    fn from_winners(winners: &[Winner], newly_recorded: bool) -> Self {
        Self {
            completed: true,
            winners: winners.iter().map(|w| w.player_id).collect(),
            newly_recorded,
        }
    }
}

/// Check a group and record its winners if the bracket is finished.
/// Safe to call any number of times; Winner rows are written once.
pub fn check_group_completion(store: &Store, key: GroupKey) -> Result<CompletionReport, TournamentError> {
    store.with_group_lock(key, || record_if_resolved(store, key))
}

/// Same as [`check_group_completion`] for callers already holding the group lock.
pub(crate) fn record_if_resolved(store: &Store, key: GroupKey) -> Result<CompletionReport, TournamentError> {
    store.transaction(|data| {
        let existing = data.group_winners(key);
        if !existing.is_empty() {
            return Ok(CompletionReport::from_winners(&existing, false));
        }
        let history = data.group_matches(key);
        if history.is_empty() {
            return Ok(CompletionReport::default());
        }
        match analyze(&history)? {
            GroupProgress::Resolved(placements) => {
                let winners = record_placements(data, key, &placements);
                Ok(CompletionReport::from_winners(&winners, true))
            }
            GroupProgress::RoundInProgress { .. } | GroupProgress::NextRound(_) => Ok(CompletionReport::default()),
        }
    })
}

/// Insert Winner rows for a group unless it already has some; returns the group's rows.
pub(crate) fn record_placements(data: &mut StoreData, key: GroupKey, placements: &[Placement]) -> Vec<Winner> {
    let existing = data.group_winners(key);
    if !existing.is_empty() {
        return existing;
    }
    for placement in placements {
        data.winners.push(Winner {
            tournament_id: key.tournament_id,
            level: key.level,
            group_id: key.group_id,
            player_id: placement.player_id,
            position: placement.position,
            prize_amount: 0,
            prize_awarded: false,
        });
        data.notify(Notification::new(
            placement.player_id,
            NotificationKind::PlacementRecorded,
            format!("You finished #{} at {} level", placement.position.rank(), key.level),
            serde_json::json!({
                "tournament_id": key.tournament_id,
                "level": key.level,
                "group_id": key.group_id,
                "position": placement.position,
            }),
        ));
    }
    log::info!(
        "group {} resolved: {}",
        key,
        placements
            .iter()
            .map(|p| format!("#{} {}", p.position.rank(), p.player_id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    data.group_winners(key)
}

/// True when the level has at least one group and every group has Winner rows.
pub(crate) fn level_resolved(data: &StoreData, tournament_id: TournamentId, level: Level) -> bool {
    let groups = data.level_groups(tournament_id, level);
    !groups.is_empty() && groups.iter().all(|k| !data.group_winners(*k).is_empty())
}
