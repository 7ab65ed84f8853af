//! Shared setup for the integration tests: a seeded store, a small geography and
//! helpers that play matches through the public operations.

#![allow(dead_code)]

use pool_tournament_web::logic::NextRoundOutcome;
use pool_tournament_web::models::{AutomationMode, GeographyRecord, NewTournament, PrizeConfig};
use pool_tournament_web::{
    approve_registration, confirm_results, create_player, create_tournament, generate_next_round, open_registration,
    register, submit_results, Actor, GameMatch, Geography, Level, MatchStatus, PlayerId, Store, TournamentId,
    TournamentStatus, Winner,
};

pub const SEED: u64 = 20_240_601;

/// Communities 1..=4; 1 and 2 in county 10, 3 and 4 in county 11, both counties in region 100.
pub fn geography() -> Geography {
    let mut geo = Geography::new();
    for (community_id, county_id) in [(1, 10), (2, 10), (3, 11), (4, 11)] {
        geo.add_record(GeographyRecord {
            community_id,
            county_id,
            region_id: 100,
        })
        .unwrap();
    }
    geo
}

pub fn store() -> Store {
    Store::new(geography(), Some(SEED))
}

pub fn prizes() -> PrizeConfig {
    PrizeConfig {
        community: 100,
        county: 200,
        regional: 500,
        national: 1_000,
        ..PrizeConfig::default()
    }
}

/// Open tournament with approved players; `per_community[i]` players live in community `i + 1`.
pub fn tournament(store: &Store, per_community: &[usize], mode: AutomationMode) -> (TournamentId, Vec<PlayerId>) {
    let t = create_tournament(
        store,
        Actor::Admin,
        NewTournament {
            name: "County Pool Open".to_string(),
            prizes: prizes(),
            automation_mode: mode,
            ..NewTournament::default()
        },
    )
    .unwrap();
    open_registration(store, Actor::Admin, t.id).unwrap();

    let mut players = Vec::new();
    for (i, &count) in per_community.iter().enumerate() {
        let community_id = i as u32 + 1;
        for n in 0..count {
            let p = create_player(store, Actor::Admin, &format!("C{community_id}P{n}"), community_id).unwrap();
            register(store, Actor::Player(p.id), t.id, p.id).unwrap();
            approve_registration(store, Actor::Admin, t.id, p.id).unwrap();
            players.push(p.id);
        }
    }
    (t.id, players)
}

/// Submit a 7-3 result for player 1 and have player 2 confirm it.
pub fn play(store: &Store, m: &GameMatch) {
    let p1 = m.player_1_id;
    let p2 = m.player_2_id.expect("not a bye");
    submit_results(store, Actor::Player(p1), m.id, 7, 3).unwrap();
    confirm_results(store, Actor::Player(p2), m.id, true).unwrap();
}

pub fn matches_at(store: &Store, tournament_id: TournamentId, level: Level) -> Vec<GameMatch> {
    store
        .read(|d| d.level_matches(tournament_id, level).cloned().collect())
        .unwrap()
}

pub fn open_matches(store: &Store, tournament_id: TournamentId, level: Level) -> Vec<GameMatch> {
    matches_at(store, tournament_id, level)
        .into_iter()
        .filter(|m| !m.is_bye() && !m.status.is_resolved())
        .collect()
}

pub fn winners_at(store: &Store, tournament_id: TournamentId, level: Level) -> Vec<Winner> {
    store
        .read(|d| {
            let mut w: Vec<Winner> = d.level_winners(tournament_id, level).cloned().collect();
            w.sort_by_key(|w| (w.group_id, w.position));
            w
        })
        .unwrap()
}

pub fn level_done(store: &Store, tournament_id: TournamentId, level: Level) -> bool {
    store
        .read(|d| {
            let groups = d.level_groups(tournament_id, level);
            !groups.is_empty() && groups.iter().all(|k| !d.group_winners(*k).is_empty())
        })
        .unwrap()
}

/// Play every group of a level to the end, generating rounds as an admin would.
pub fn play_level(store: &Store, tournament_id: TournamentId, level: Level) {
    for _ in 0..32 {
        if level_done(store, tournament_id, level) {
            return;
        }
        let open = open_matches(store, tournament_id, level);
        if !open.is_empty() {
            open.iter().for_each(|m| play(store, m));
            continue;
        }
        let groups = store.read(|d| d.level_groups(tournament_id, level)).unwrap();
        for key in groups {
            let outcome = generate_next_round(store, Actor::Admin, tournament_id, level, key.group_id).unwrap();
            if let NextRoundOutcome::Generated { matches } = outcome {
                assert!(!matches.is_empty());
            }
        }
    }
    panic!("{level} level did not finish");
}

/// Play whatever is open until the tournament completes (automatic mode).
pub fn play_until_completed(store: &Store, tournament_id: TournamentId) {
    for _ in 0..64 {
        let status = store.read(|d| d.tournament(tournament_id).map(|t| t.status)).unwrap().unwrap();
        if status == TournamentStatus::Completed {
            return;
        }
        let open: Vec<GameMatch> = store
            .read(|d| {
                d.matches
                    .iter()
                    .filter(|m| m.tournament_id == tournament_id && !m.is_bye())
                    .filter(|m| matches!(m.status, MatchStatus::Pending | MatchStatus::Scheduled))
                    .cloned()
                    .collect()
            })
            .unwrap();
        assert!(!open.is_empty(), "automatic tournament stalled");
        open.iter().for_each(|m| play(store, m));
    }
    panic!("tournament did not complete");
}
