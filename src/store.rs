//! In-memory persistence: transactional writes, per-group locks and the draw RNG.
//!
//! Every write goes through [`Store::transaction`], which works on a copy of the data
//! and swaps it in only when the closure succeeds, so a failed operation leaves no
//! partial Match/Winner rows behind.

use crate::models::{
    GameMatch, Geography, GroupKey, Level, LogSink, MatchId, Notification, NotificationSink, Player,
    PlayerId, Registration, Tournament, TournamentError, TournamentId, Winner,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// All persisted entities.
#[derive(Clone, Debug, Default)]
pub struct StoreData {
    pub geography: Geography,
    pub players: HashMap<PlayerId, Player>,
    pub tournaments: HashMap<TournamentId, Tournament>,
    pub registrations: Vec<Registration>,
    /// Matches in creation order.
    pub matches: Vec<GameMatch>,
    pub winners: Vec<Winner>,
    /// Notifications raised by the running transaction. Drained on commit, never stored.
    outbox: Vec<Notification>,
}

impl StoreData {
    pub fn tournament(&self, id: TournamentId) -> Result<&Tournament, TournamentError> {
        self.tournaments
            .get(&id)
            .ok_or_else(|| TournamentError::NotFound("Tournament not found".to_string()))
    }

    pub fn tournament_mut(&mut self, id: TournamentId) -> Result<&mut Tournament, TournamentError> {
        self.tournaments
            .get_mut(&id)
            .ok_or_else(|| TournamentError::NotFound("Tournament not found".to_string()))
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player, TournamentError> {
        self.players
            .get(&id)
            .ok_or_else(|| TournamentError::NotFound(format!("Player {} not found", id)))
    }

    pub fn game(&self, id: MatchId) -> Result<&GameMatch, TournamentError> {
        self.matches
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| TournamentError::NotFound("Match not found".to_string()))
    }

    pub fn game_mut(&mut self, id: MatchId) -> Result<&mut GameMatch, TournamentError> {
        self.matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| TournamentError::NotFound("Match not found".to_string()))
    }

    pub fn group_matches(&self, key: GroupKey) -> Vec<GameMatch> {
        self.matches.iter().filter(|m| m.key() == key).cloned().collect()
    }

    pub fn level_matches(&self, tournament_id: TournamentId, level: Level) -> impl Iterator<Item = &GameMatch> {
        self.matches
            .iter()
            .filter(move |m| m.tournament_id == tournament_id && m.level == level)
    }

    pub fn group_winners(&self, key: GroupKey) -> Vec<Winner> {
        let mut winners: Vec<Winner> = self
            .winners
            .iter()
            .filter(|w| w.tournament_id == key.tournament_id && w.level == key.level && w.group_id == key.group_id)
            .cloned()
            .collect();
        winners.sort_by_key(|w| w.position);
        winners
    }

    pub fn level_winners(&self, tournament_id: TournamentId, level: Level) -> impl Iterator<Item = &Winner> {
        self.winners
            .iter()
            .filter(move |w| w.tournament_id == tournament_id && w.level == level)
    }

    /// Groups at a level that have matches or winners, in id order.
    pub fn level_groups(&self, tournament_id: TournamentId, level: Level) -> Vec<GroupKey> {
        let mut keys: Vec<GroupKey> = self
            .level_matches(tournament_id, level)
            .map(|m| m.key())
            .chain(
                self.level_winners(tournament_id, level)
                    .map(|w| GroupKey::new(w.tournament_id, w.level, w.group_id)),
            )
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn registration(&self, tournament_id: TournamentId, player_id: PlayerId) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.tournament_id == tournament_id && r.player_id == player_id)
    }

    pub fn registration_mut(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> Result<&mut Registration, TournamentError> {
        self.registrations
            .iter_mut()
            .find(|r| r.tournament_id == tournament_id && r.player_id == player_id)
            .ok_or_else(|| TournamentError::NotFound("Registration not found".to_string()))
    }

    pub fn notify(&mut self, notification: Notification) {
        self.outbox.push(notification);
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
enum LockKey {
    Group(GroupKey),
    Level(TournamentId, Level),
}

/// Shared application store.
pub struct Store {
    data: RwLock<StoreData>,
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
    rng: Mutex<StdRng>,
    sink: Box<dyn NotificationSink>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(Geography::default(), None)
    }
}

impl Store {
    /// Create a store. With a seed, every draw is reproducible.
    pub fn new(geography: Geography, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            data: RwLock::new(StoreData {
                geography,
                ..StoreData::default()
            }),
            locks: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
            sink: Box::new(LogSink),
        }
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Run a read-only closure over the current data.
    pub fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> Result<T, TournamentError> {
        let guard = self.data.read().map_err(|_| TournamentError::lock_poisoned())?;
        Ok(f(&guard))
    }

    /// Run `f` against a working copy and commit it only if `f` succeeds.
    /// Notifications added by `f` are delivered after the commit.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut StoreData) -> Result<T, TournamentError>,
    ) -> Result<T, TournamentError> {
        let (value, fresh) = {
            let mut guard = self.data.write().map_err(|_| TournamentError::lock_poisoned())?;
            let mut working = guard.clone();
            let value = f(&mut working)?;
            let fresh = std::mem::take(&mut working.outbox);
            *guard = working;
            (value, fresh)
        };
        for notification in &fresh {
            self.sink.deliver(notification);
        }
        Ok(value)
    }

    /// Like [`Store::transaction`], with the draw RNG available.
    pub fn transaction_with_rng<T>(
        &self,
        f: impl FnOnce(&mut StoreData, &mut StdRng) -> Result<T, TournamentError>,
    ) -> Result<T, TournamentError> {
        self.transaction(|data| {
            let mut rng = self.rng.lock().map_err(|_| TournamentError::lock_poisoned())?;
            f(data, &mut rng)
        })
    }

    /// Serialize all work on one (tournament, level, group).
    pub fn with_group_lock<T>(
        &self,
        key: GroupKey,
        f: impl FnOnce() -> Result<T, TournamentError>,
    ) -> Result<T, TournamentError> {
        self.with_lock(LockKey::Group(key), f)
    }

    /// Serialize initialization of one level of a tournament.
    pub fn with_level_lock<T>(
        &self,
        tournament_id: TournamentId,
        level: Level,
        f: impl FnOnce() -> Result<T, TournamentError>,
    ) -> Result<T, TournamentError> {
        self.with_lock(LockKey::Level(tournament_id, level), f)
    }

    fn with_lock<T>(&self, key: LockKey, f: impl FnOnce() -> Result<T, TournamentError>) -> Result<T, TournamentError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| TournamentError::lock_poisoned())?;
            Arc::clone(locks.entry(key).or_default())
        };
        let _guard = lock.lock().map_err(|_| TournamentError::lock_poisoned())?;
        f()
    }
}
