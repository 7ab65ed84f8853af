//! Tournament completion coordination: runs after every resolved match, records
//! group winners, drives automatic progression and closes the tournament once the
//! national bracket is decided.

use crate::logic::completion::{level_resolved, record_if_resolved, CompletionReport};
use crate::logic::orchestrator::{advance_ready_group, initialize_level};
use crate::models::{
    GroupKey, Level, MatchId, Notification, NotificationKind, Position, RegistrationStatus,
    TournamentError, TournamentId, TournamentStatus,
};
use crate::store::Store;
use chrono::Utc;

/// React to a match reaching completed/forfeit.
pub fn on_match_resolved(store: &Store, match_id: MatchId) -> Result<CompletionReport, TournamentError> {
    let (key, automatic) = store.read(|data| {
        let m = data.game(match_id)?;
        let automatic = data.tournament(m.tournament_id)?.is_automatic();
        Ok::<_, TournamentError>((m.key(), automatic))
    })??;

    let report = store.with_group_lock(key, || {
        let report = record_if_resolved(store, key)?;
        if !report.completed && automatic {
            advance_ready_group(store, key)?;
        }
        Ok(report)
    })?;

    if report.newly_recorded {
        settle_level(store, key.tournament_id, key.level)?;
    }
    Ok(report)
}

/// Follow-up once a group of `level` has been resolved: finish the tournament after
/// the national level, or open the next level in automatic mode when the whole level is done.
pub(crate) fn settle_level(store: &Store, tournament_id: TournamentId, level: Level) -> Result<(), TournamentError> {
    let (resolved, automatic) = store.read(|data| {
        let automatic = data.tournament(tournament_id)?.is_automatic();
        Ok::<_, TournamentError>((level_resolved(data, tournament_id, level), automatic))
    })??;
    if !resolved {
        return Ok(());
    }

    match level.next() {
        None => complete_tournament(store, tournament_id),
        Some(_) if !automatic => Ok(()),
        Some(next) => match initialize_level(store, tournament_id, next) {
            Ok(summary) => {
                log::info!(
                    "automatic progression opened {} level of {} ({} group(s))",
                    next,
                    tournament_id,
                    summary.groups.len()
                );
                settle_level(store, tournament_id, next)
            }
            // another completion got there first
            Err(TournamentError::StateConflict(reason)) => {
                log::warn!("automatic progression to {} skipped: {}", next, reason);
                Ok(())
            }
            Err(e) => Err(e),
        },
    }
}

/// Mark the tournament completed and pay out every unpaid Winner row. Idempotent.
pub fn complete_tournament(store: &Store, tournament_id: TournamentId) -> Result<(), TournamentError> {
    store.transaction(|data| {
        let tournament = data.tournament_mut(tournament_id)?;
        if tournament.status == TournamentStatus::Completed {
            return Ok(());
        }
        tournament.status = TournamentStatus::Completed;
        tournament.completed_at = Some(Utc::now());
        let prizes = tournament.prizes;
        let name = tournament.name.clone();

        let mut awards = Vec::new();
        for winner in data
            .winners
            .iter_mut()
            .filter(|w| w.tournament_id == tournament_id && !w.prize_awarded)
        {
            winner.prize_amount = prizes.amount_for(winner.level, winner.position);
            winner.prize_awarded = true;
            awards.push(winner.clone());
        }

        let mut total = 0u64;
        for award in &awards {
            if let Some(player) = data.players.get_mut(&award.player_id) {
                player.award_points(award.prize_amount);
            }
            total = total.saturating_add(award.prize_amount);
            data.notify(Notification::new(
                award.player_id,
                NotificationKind::PrizeAwarded,
                format!(
                    "You won {} points for finishing #{} at {} level",
                    award.prize_amount,
                    award.position.rank(),
                    award.level
                ),
                serde_json::json!({
                    "tournament_id": tournament_id,
                    "level": award.level,
                    "position": award.position,
                    "amount": award.prize_amount,
                }),
            ));
        }

        let champion = data
            .level_winners(tournament_id, Level::National)
            .find(|w| w.position == Position::First)
            .map(|w| w.player_id);
        let registrants: Vec<_> = data
            .registrations
            .iter()
            .filter(|r| r.tournament_id == tournament_id && r.status == RegistrationStatus::Approved)
            .map(|r| r.player_id)
            .collect();
        for player_id in registrants {
            data.notify(Notification::new(
                player_id,
                NotificationKind::TournamentCompleted,
                format!("{} has finished", name),
                serde_json::json!({ "tournament_id": tournament_id, "champion": champion }),
            ));
        }

        log::info!(
            "tournament {} completed: {} prize(s), {} points awarded",
            tournament_id,
            awards.len(),
            total
        );
        Ok(())
    })
}

/// One pass of automatic progression over every ongoing automatic tournament.
/// Returns the number of groups or levels that moved forward.
pub fn run_automation(store: &Store) -> Result<usize, TournamentError> {
    let work: Vec<(TournamentId, Vec<GroupKey>, Option<Level>)> = store.read(|data| {
        data.tournaments
            .values()
            .filter(|t| t.status == TournamentStatus::Ongoing && t.is_automatic())
            .map(|t| {
                let groups = Level::ALL
                    .iter()
                    .flat_map(|&level| data.level_groups(t.id, level))
                    .filter(|k| data.group_winners(*k).is_empty())
                    .collect();
                (t.id, groups, t.current_level)
            })
            .collect()
    })?;

    let mut progressed = 0;
    for (tournament_id, groups, current_level) in work {
        for key in groups {
            let moved = store.with_group_lock(key, || {
                let report = record_if_resolved(store, key)?;
                if report.completed {
                    return Ok(true);
                }
                Ok(advance_ready_group(store, key)?.is_some())
            })?;
            if moved {
                progressed += 1;
            }
        }
        if let Some(level) = current_level {
            settle_level(store, tournament_id, level)?;
        }
    }
    if progressed > 0 {
        log::info!("automation sweep advanced {} group(s)", progressed);
    }
    Ok(progressed)
}
