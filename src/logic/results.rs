//! Match result handshake: date proposals, result submission by one participant and
//! confirmation by the other, and forfeits.

use crate::logic::completion::CompletionReport;
use crate::logic::coordinator::on_match_resolved;
use crate::models::{
    Actor, GameMatch, MatchId, MatchStatus, Notification, NotificationKind, PlayerId, ProposedDates,
    TournamentError,
};
use crate::store::{Store, StoreData};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Match after a resolving action, plus what the completion check found.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ResolutionOutcome {
    #[serde(rename = "match")]
    pub game: GameMatch,
    pub completion: Option<CompletionReport>,
}

/// Borrow a match the acting player takes part in.
fn participant_match(
    data: &mut StoreData,
    match_id: MatchId,
    player_id: PlayerId,
) -> Result<&mut GameMatch, TournamentError> {
    let m = data.game_mut(match_id)?;
    if !m.involves(player_id) {
        return Err(TournamentError::Permission(
            "You are not a participant in this match".to_string(),
        ));
    }
    if m.is_bye() {
        return Err(TournamentError::StateConflict("A bye has no opponent".to_string()));
    }
    Ok(m)
}

fn opponent(m: &GameMatch, player_id: PlayerId) -> Result<PlayerId, TournamentError> {
    m.opponent_of(player_id)
        .ok_or_else(|| TournamentError::Internal(format!("match {} has no opponent", m.id)))
}

/// Offer candidate dates to the opponent (pending matches only).
pub fn propose_dates(
    store: &Store,
    actor: Actor,
    match_id: MatchId,
    dates: ProposedDates,
) -> Result<GameMatch, TournamentError> {
    let player_id = actor.require_player()?;
    store.transaction(|data| {
        let m = participant_match(data, match_id, player_id)?;
        if m.status != MatchStatus::Pending {
            return Err(TournamentError::StateConflict(
                "Dates can only be proposed for pending matches".to_string(),
            ));
        }
        m.proposed_dates = Some(dates);
        m.proposed_by = Some(player_id);
        let game = m.clone();
        data.notify(Notification::new(
            opponent(&game, player_id)?,
            NotificationKind::DatesProposed,
            format!("New dates proposed for {}", game.match_name),
            serde_json::json!({ "match_id": game.id, "dates": game.proposed_dates }),
        ));
        Ok(game)
    })
}

/// Accept one of the opponent's proposed dates; the match becomes scheduled.
pub fn select_date(
    store: &Store,
    actor: Actor,
    match_id: MatchId,
    date: DateTime<Utc>,
) -> Result<GameMatch, TournamentError> {
    let player_id = actor.require_player()?;
    store.transaction(|data| {
        let m = participant_match(data, match_id, player_id)?;
        if m.status != MatchStatus::Pending {
            return Err(TournamentError::StateConflict("Match is not waiting for a date".to_string()));
        }
        let proposed = m
            .proposed_dates
            .as_ref()
            .ok_or_else(|| TournamentError::PrerequisiteMissing("No dates have been proposed".to_string()))?;
        if m.proposed_by == Some(player_id) {
            return Err(TournamentError::Permission(
                "The opponent must choose from your proposed dates".to_string(),
            ));
        }
        if !proposed.contains(&date) {
            return Err(TournamentError::Validation("Date was not among the proposed dates".to_string()));
        }
        m.scheduled_date = Some(date);
        m.status = MatchStatus::Scheduled;
        let game = m.clone();
        for p in game.players() {
            data.notify(Notification::new(
                p,
                NotificationKind::MatchScheduled,
                format!("{} scheduled for {}", game.match_name, date.format("%Y-%m-%d %H:%M")),
                serde_json::json!({ "match_id": game.id, "scheduled_date": date }),
            ));
        }
        Ok(game)
    })
}

/// Report the score; the opponent has to confirm it.
pub fn submit_results(
    store: &Store,
    actor: Actor,
    match_id: MatchId,
    player_1_points: u32,
    player_2_points: u32,
) -> Result<GameMatch, TournamentError> {
    let player_id = actor.require_player()?;
    if player_1_points == player_2_points {
        return Err(TournamentError::Validation("A match cannot end in a draw".to_string()));
    }
    store.transaction(|data| {
        let m = participant_match(data, match_id, player_id)?;
        if !matches!(m.status, MatchStatus::Pending | MatchStatus::Scheduled) {
            return Err(TournamentError::StateConflict(
                "Results can only be submitted for pending or scheduled matches".to_string(),
            ));
        }
        m.player_1_points = Some(player_1_points);
        m.player_2_points = Some(player_2_points);
        m.submitted_by = Some(player_id);
        m.status = MatchStatus::PendingConfirmation;
        let game = m.clone();
        data.notify(Notification::new(
            opponent(&game, player_id)?,
            NotificationKind::ResultSubmitted,
            format!(
                "Result {}-{} submitted for {}; please confirm",
                player_1_points, player_2_points, game.match_name
            ),
            serde_json::json!({
                "match_id": game.id,
                "player_1_points": player_1_points,
                "player_2_points": player_2_points,
            }),
        ));
        Ok(game)
    })
}

/// Accept or reject the submitted score. Only the opponent of the submitter may do this.
pub fn confirm_results(
    store: &Store,
    actor: Actor,
    match_id: MatchId,
    confirm: bool,
) -> Result<ResolutionOutcome, TournamentError> {
    let player_id = actor.require_player()?;
    let game = store.transaction(|data| {
        let m = participant_match(data, match_id, player_id)?;
        if m.status != MatchStatus::PendingConfirmation {
            return Err(TournamentError::StateConflict("Match is not awaiting confirmation".to_string()));
        }
        let submitter = m
            .submitted_by
            .ok_or_else(|| TournamentError::Internal(format!("match {} has no submitter", m.id)))?;
        if submitter == player_id {
            return Err(TournamentError::Permission(
                "You cannot confirm your own result submission".to_string(),
            ));
        }

        if confirm {
            let (p1, p2) = (m.player_1_points.unwrap_or(0), m.player_2_points.unwrap_or(0));
            m.winner_id = if p1 > p2 { Some(m.player_1_id) } else { m.player_2_id };
            m.confirmed_by = Some(player_id);
            m.status = MatchStatus::Completed;
            let game = m.clone();
            for p in game.players() {
                data.notify(Notification::new(
                    p,
                    NotificationKind::MatchCompleted,
                    format!("{} confirmed {}-{}", game.match_name, p1, p2),
                    serde_json::json!({ "match_id": game.id, "winner_id": game.winner_id }),
                ));
            }
            Ok(game)
        } else {
            m.player_1_points = None;
            m.player_2_points = None;
            m.submitted_by = None;
            m.status = MatchStatus::Scheduled;
            let game = m.clone();
            data.notify(Notification::new(
                submitter,
                NotificationKind::ResultRejected,
                format!("Your result for {} was rejected", game.match_name),
                serde_json::json!({ "match_id": game.id }),
            ));
            Ok(game)
        }
    })?;

    if game.status == MatchStatus::Completed {
        log::info!("match {} completed, winner {:?}", game.match_name, game.winner_id);
        resolved(store, game)
    } else {
        Ok(ResolutionOutcome { game, completion: None })
    }
}

/// Give up a match; the opponent wins.
pub fn forfeit(store: &Store, actor: Actor, match_id: MatchId) -> Result<ResolutionOutcome, TournamentError> {
    let player_id = actor.require_player()?;
    let game = store.transaction(|data| {
        let m = participant_match(data, match_id, player_id)?;
        if m.status.is_resolved() {
            return Err(TournamentError::StateConflict("Match is already finished".to_string()));
        }
        let winner = opponent(m, player_id)?;
        m.winner_id = Some(winner);
        m.status = MatchStatus::Forfeit;
        let game = m.clone();
        for p in game.players() {
            data.notify(Notification::new(
                p,
                NotificationKind::MatchCompleted,
                format!("{} ended by forfeit", game.match_name),
                serde_json::json!({ "match_id": game.id, "winner_id": winner }),
            ));
        }
        Ok(game)
    })?;
    log::info!("match {} forfeited by {}", game.match_name, player_id);
    resolved(store, game)
}

/// The match is already committed; a failing follow-up is logged, not reported to the player.
/// Later completion checks on the group pick it up again.
fn resolved(store: &Store, game: GameMatch) -> Result<ResolutionOutcome, TournamentError> {
    let completion = match on_match_resolved(store, game.id) {
        Ok(report) => Some(report),
        Err(e) => {
            log::error!("completion check after match {} failed: {}", game.match_name, e);
            None
        }
    };
    let game = store.read(|data| data.game(game.id).cloned())??;
    Ok(ResolutionOutcome { game, completion })
}
