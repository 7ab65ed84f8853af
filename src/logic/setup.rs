//! Setup: tournaments, players and the registration window.

use crate::models::{
    Actor, AutomationMode, CommunityId, GeographyRecord, Location, NewTournament, Player, Tournament,
    TournamentError, TournamentId, TournamentStatus,
};
use crate::store::Store;

/// Create a tournament in `upcoming` status (admin only).
pub fn create_tournament(store: &Store, actor: Actor, fields: NewTournament) -> Result<Tournament, TournamentError> {
    actor.require_admin()?;
    let tournament = Tournament::new(fields)?;
    store.transaction(|data| {
        data.tournaments.insert(tournament.id, tournament.clone());
        Ok(())
    })?;
    log::info!("created tournament {} ({})", tournament.name, tournament.id);
    Ok(tournament)
}

/// Upcoming → registration (admin only).
pub fn open_registration(store: &Store, actor: Actor, tournament_id: TournamentId) -> Result<Tournament, TournamentError> {
    actor.require_admin()?;
    store.transaction(|data| {
        let t = data.tournament_mut(tournament_id)?;
        if t.status != TournamentStatus::Upcoming {
            return Err(TournamentError::StateConflict(
                "Registration can only be opened for upcoming tournaments".to_string(),
            ));
        }
        t.status = TournamentStatus::Registration;
        Ok(t.clone())
    })
}

/// Switch between manual and automatic level progression (admin only).
pub fn set_automation_mode(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    mode: AutomationMode,
) -> Result<Tournament, TournamentError> {
    actor.require_admin()?;
    store.transaction(|data| {
        let t = data.tournament_mut(tournament_id)?;
        if t.status == TournamentStatus::Completed {
            return Err(TournamentError::StateConflict("Tournament is already completed".to_string()));
        }
        t.automation_mode = mode;
        Ok(t.clone())
    })
}

/// Add a player living in `community_id` (admin only). The county and region come from the geography.
pub fn create_player(
    store: &Store,
    actor: Actor,
    name: &str,
    community_id: CommunityId,
) -> Result<Player, TournamentError> {
    actor.require_admin()?;
    let name = name.trim();
    if name.is_empty() {
        return Err(TournamentError::Validation("Player name is required".to_string()));
    }
    store.transaction(|data| {
        let location = data.geography.locate(community_id)?;
        let player = Player::new(name, location);
        data.players.insert(player.id, player.clone());
        Ok(player)
    })
}

/// Add a community → county → region line to the geography (admin only).
pub fn add_geography(store: &Store, actor: Actor, record: GeographyRecord) -> Result<Location, TournamentError> {
    actor.require_admin()?;
    store.transaction(|data| {
        data.geography.add_record(record)?;
        data.geography.locate(record.community_id)
    })
}
