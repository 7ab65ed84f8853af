//! Level orchestration: opening a level's brackets and generating follow-up rounds.

use crate::logic::completion::{record_if_resolved, record_placements};
use crate::logic::coordinator::settle_level;
use crate::logic::pairing::Entrant;
use crate::logic::progression::{analyze, build_next_round, first_round, GroupProgress};
use crate::models::{
    Actor, GameMatch, GroupId, GroupKey, Level, Notification, NotificationKind, Placement, PlayerId, Position,
    TournamentError, TournamentId, TournamentStatus, Winner,
};
use crate::store::{Store, StoreData};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group_id: Option<GroupId>,
    pub entrants: usize,
    pub matches_created: usize,
    /// Set when the group had a single entrant and was resolved without matches.
    pub immediate_winner: Option<PlayerId>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct InitializeSummary {
    pub tournament_id: TournamentId,
    pub level: Level,
    pub groups: Vec<GroupSummary>,
    pub matches_created: usize,
}

/// What generating the next round of a group produced.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NextRoundOutcome {
    Generated { matches: Vec<GameMatch> },
    Resolved { winners: Vec<Winner> },
}

/// Open the brackets of a level (admin only). Rejects a second initialization of the same level.
pub fn initialize(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    level: Level,
) -> Result<InitializeSummary, TournamentError> {
    actor.require_admin()?;
    let summary = initialize_level(store, tournament_id, level)?;
    settle_level(store, tournament_id, level)?;
    Ok(summary)
}

pub(crate) fn initialize_level(
    store: &Store,
    tournament_id: TournamentId,
    level: Level,
) -> Result<InitializeSummary, TournamentError> {
    store.with_level_lock(tournament_id, level, || {
        store.transaction_with_rng(|data, rng| {
            let tournament = data.tournament(tournament_id)?;
            if tournament.status == TournamentStatus::Completed {
                return Err(TournamentError::StateConflict("Tournament is already completed".to_string()));
            }
            if data.level_matches(tournament_id, level).next().is_some()
                || data.level_winners(tournament_id, level).next().is_some()
            {
                return Err(TournamentError::already_initialized());
            }

            let entrants = collect_entrants(data, tournament_id, level)?;
            let groups = partition(data, level, entrants)?;

            let mut summary = InitializeSummary {
                tournament_id,
                level,
                groups: Vec::with_capacity(groups.len()),
                matches_created: 0,
            };
            for (group_id, entrants) in groups {
                let key = GroupKey::new(tournament_id, level, group_id);
                let entrant_count = entrants.len();
                let mut group = GroupSummary {
                    group_id,
                    entrants: entrant_count,
                    matches_created: 0,
                    immediate_winner: None,
                };
                if entrant_count == 1 {
                    let only = entrants[0].player_id;
                    record_placements(data, key, &[Placement::new(only, Position::First)]);
                    group.immediate_winner = Some(only);
                } else {
                    let matches = first_round(key, entrants, rng)?;
                    group.matches_created = matches.len();
                    announce_matches(data, &matches);
                    data.matches.extend(matches);
                }
                log::info!(
                    "initialized {}: {} entrant(s), {} match(es)",
                    key,
                    entrant_count,
                    group.matches_created
                );
                summary.matches_created += group.matches_created;
                summary.groups.push(group);
            }

            let tournament = data.tournament_mut(tournament_id)?;
            tournament.status = TournamentStatus::Ongoing;
            tournament.current_level = tournament.current_level.max(Some(level));
            Ok(summary)
        })
    })
}

/// Entrants for a level: approved registrants at community level, otherwise the
/// placed players of the previous level seeded by their position.
fn collect_entrants(
    data: &StoreData,
    tournament_id: TournamentId,
    level: Level,
) -> Result<Vec<Entrant>, TournamentError> {
    match level {
        Level::Community => {
            let entrants: Vec<Entrant> = data
                .registrations
                .iter()
                .filter(|r| r.tournament_id == tournament_id && r.is_approved())
                .map(|r| Entrant::new(r.player_id))
                .collect();
            if entrants.is_empty() {
                return Err(TournamentError::no_eligible_players(level));
            }
            Ok(entrants)
        }
        Level::County | Level::Regional | Level::National => {
            let previous = level
                .previous()
                .ok_or_else(|| TournamentError::Internal(format!("{} level has no previous level", level)))?;
            let entrants: Vec<Entrant> = data
                .level_winners(tournament_id, previous)
                .map(|w| Entrant::seeded(w.player_id, w.group_id, w.position.rank()))
                .collect();
            if entrants.is_empty() {
                return Err(TournamentError::no_previous_winners());
            }
            let unresolved = data
                .level_groups(tournament_id, previous)
                .into_iter()
                .filter(|k| data.group_winners(*k).is_empty())
                .count();
            if unresolved > 0 {
                return Err(TournamentError::PrerequisiteMissing(format!(
                    "Previous level is not complete ({} group(s) still playing)",
                    unresolved
                )));
            }
            Ok(entrants)
        }
    }
}

/// Split entrants by their group at `level`, derived from each player's location.
fn partition(
    data: &StoreData,
    level: Level,
    entrants: Vec<Entrant>,
) -> Result<BTreeMap<Option<GroupId>, Vec<Entrant>>, TournamentError> {
    let mut groups: BTreeMap<Option<GroupId>, Vec<Entrant>> = BTreeMap::new();
    for entrant in entrants {
        let player = data.player(entrant.player_id)?;
        groups
            .entry(player.location.group_for(level))
            .or_default()
            .push(entrant);
    }
    Ok(groups)
}

fn announce_matches(data: &mut StoreData, matches: &[GameMatch]) {
    for m in matches.iter().filter(|m| !m.is_bye()) {
        for player_id in m.players() {
            data.notify(Notification::new(
                player_id,
                NotificationKind::MatchCreated,
                format!("New {} match: {}", m.round_name, m.match_name),
                serde_json::json!({ "match_id": m.id, "round": m.round, "level": m.level }),
            ));
        }
    }
}

/// Generate the next round of one group (admin only).
pub fn generate_next_round(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    level: Level,
    group_id: Option<GroupId>,
) -> Result<NextRoundOutcome, TournamentError> {
    actor.require_admin()?;
    let key = GroupKey::new(tournament_id, level, group_id);
    let outcome = store
        .with_group_lock(key, || advance_ready_group(store, key))?
        .ok_or_else(|| TournamentError::StateConflict("Current round is not complete".to_string()))?;
    if matches!(outcome, NextRoundOutcome::Resolved { .. }) {
        settle_level(store, tournament_id, level)?;
    }
    Ok(outcome)
}

/// Generate the next round for every group of a level whose current round is done
/// (admin only). Groups still playing are skipped.
pub fn generate_next_rounds_for_level(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    level: Level,
) -> Result<Vec<(Option<GroupId>, NextRoundOutcome)>, TournamentError> {
    actor.require_admin()?;
    let groups = store.read(|data| {
        data.tournament(tournament_id)?;
        Ok::<_, TournamentError>(data.level_groups(tournament_id, level))
    })??;
    if groups.is_empty() {
        return Err(TournamentError::PrerequisiteMissing(format!(
            "{} level has not been initialized",
            level
        )));
    }
    let mut outcomes = Vec::new();
    for key in groups {
        if let Some(outcome) = store.with_group_lock(key, || advance_ready_group(store, key))? {
            outcomes.push((key.group_id, outcome));
        }
    }
    settle_level(store, tournament_id, level)?;
    Ok(outcomes)
}

/// Next round for a group whose latest round is finished; None while it is still playing.
/// The caller holds the group lock.
pub(crate) fn advance_ready_group(store: &Store, key: GroupKey) -> Result<Option<NextRoundOutcome>, TournamentError> {
    let report = record_if_resolved(store, key)?;
    if report.completed {
        let winners = store.read(|data| data.group_winners(key))?;
        return Ok(Some(NextRoundOutcome::Resolved { winners }));
    }
    store.transaction_with_rng(|data, rng| {
        data.tournament(key.tournament_id)?;
        let history = data.group_matches(key);
        if history.is_empty() {
            return Err(TournamentError::NotFound(format!("No matches found for group {}", key)));
        }
        match analyze(&history)? {
            GroupProgress::RoundInProgress { .. } => Ok(None),
            GroupProgress::NextRound(next) => {
                let matches = build_next_round(key, next, rng)?;
                log::info!(
                    "generated round {} for {}: {} match(es)",
                    matches.first().map(|m| m.round).unwrap_or_default(),
                    key,
                    matches.len()
                );
                announce_matches(data, &matches);
                data.matches.extend(matches.iter().cloned());
                Ok(Some(NextRoundOutcome::Generated { matches }))
            }
            GroupProgress::Resolved(placements) => {
                let winners = record_placements(data, key, &placements);
                Ok(Some(NextRoundOutcome::Resolved { winners }))
            }
        }
    })
}
