//! Registration: entering players, recording payment and admin approval.

use crate::models::{
    Actor, PaymentStatus, PlayerId, Registration, RegistrationStatus, TournamentError, TournamentId,
};
use crate::store::Store;
use serde::Serialize;

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RegistrationOutcome {
    pub registration: Registration,
    pub already_registered: bool,
}

/// Register a player. Players register themselves; admins may register anyone.
/// A repeated request returns the existing registration.
pub fn register(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<RegistrationOutcome, TournamentError> {
    if let Actor::Player(acting) = actor {
        if acting != player_id {
            return Err(TournamentError::Permission(
                "Players can only register themselves".to_string(),
            ));
        }
    }
    store.transaction(|data| {
        let tournament = data.tournament(tournament_id)?;
        if !tournament.status.accepts_registrations() {
            return Err(TournamentError::StateConflict("Registration is closed".to_string()));
        }
        data.player(player_id)?;
        if let Some(existing) = data.registration(tournament_id, player_id) {
            return Ok(RegistrationOutcome {
                registration: existing.clone(),
                already_registered: true,
            });
        }
        let registration = Registration::new(tournament_id, player_id);
        data.registrations.push(registration.clone());
        Ok(RegistrationOutcome {
            registration,
            already_registered: false,
        })
    })
}

/// Mark the registration fee as paid (admin or payment hook).
pub fn record_payment(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<Registration, TournamentError> {
    actor.require_admin()?;
    store.transaction(|data| {
        let r = data.registration_mut(tournament_id, player_id)?;
        r.payment_status = PaymentStatus::Paid;
        Ok(r.clone())
    })
}

/// Approve a registration (admin only). Paid tournaments need the fee first.
pub fn approve_registration(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<Registration, TournamentError> {
    set_status(store, actor, tournament_id, player_id, RegistrationStatus::Approved)
}

pub fn reject_registration(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> Result<Registration, TournamentError> {
    set_status(store, actor, tournament_id, player_id, RegistrationStatus::Rejected)
}

fn set_status(
    store: &Store,
    actor: Actor,
    tournament_id: TournamentId,
    player_id: PlayerId,
    status: RegistrationStatus,
) -> Result<Registration, TournamentError> {
    actor.require_admin()?;
    store.transaction(|data| {
        let tournament = data.tournament(tournament_id)?;
        if !tournament.status.accepts_registrations() {
            return Err(TournamentError::StateConflict("Registration is closed".to_string()));
        }
        let charge = tournament.charge;
        let r = data.registration_mut(tournament_id, player_id)?;
        if status == RegistrationStatus::Approved && charge > 0 && r.payment_status != PaymentStatus::Paid {
            return Err(TournamentError::PrerequisiteMissing(
                "Registration fee has not been paid".to_string(),
            ));
        }
        r.status = status;
        Ok(r.clone())
    })
}
