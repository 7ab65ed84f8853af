//! Round progression: reads a group's match history and decides what happens next.
//!
//! Bracket shapes by size of the opening field:
//! - 2: a single `final`.
//! - 3: `semi_final` (one match plus a bye), then a `final` between the semi-final
//!   loser and the bye player. Semi-final winner takes first place.
//! - 4: `quarter_final` (`4_player_match1/2`), then `Winners_SF` and `Losers_SF`, then a
//!   `final` between the Winners_SF loser and the Losers_SF winner. Winners_SF winner takes
//!   first place; the Losers_SF loser is not placed.
//! - 5+: elimination rounds with a bye for odd counts. Three players left fall into the
//!   3-player shape above; two left play a `final`, and third place goes to the better
//!   semi-final loser.

use crate::logic::pairing::{draw_round, Draw, Entrant};
use crate::models::{BracketError, GameMatch, GroupKey, MatchStatus, Placement, PlayerId, Position, RoundName};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

/// Where a group's bracket stands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroupProgress {
    /// Some matches of the latest round are unresolved.
    RoundInProgress { round: u32 },
    /// The latest round is done; this round comes next.
    NextRound(NextRound),
    /// The bracket is finished with these placements.
    Resolved(Vec<Placement>),
}

/// The next round of a group, before it is turned into matches.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NextRound {
    /// A fresh draw among the advancing players.
    Draw { round: u32, entrants: Vec<Entrant> },
    /// Fixed pairings decided by the endgame rules.
    Fixed { round: u32, pairs: Vec<FixedPair> },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FixedPair {
    pub round_name: RoundName,
    pub token: &'static str,
    pub player_1: PlayerId,
    pub player_2: PlayerId,
}

/// `<level>_R<round>_<token>`.
pub fn match_name(key: GroupKey, round: u32, token: &str) -> String {
    format!("{}_R{}_{}", key.level, round, token)
}

/// Matches for the opening round of a group with two or more entrants.
pub fn first_round<R: Rng + ?Sized>(
    key: GroupKey,
    entrants: Vec<Entrant>,
    rng: &mut R,
) -> Result<Vec<GameMatch>, BracketError> {
    let field = entrants.len();
    if field < 2 {
        return Err(BracketError::InconsistentHistory(format!(
            "an opening round needs at least two entrants, got {}",
            field
        )));
    }
    let draw = draw_round(entrants, rng)?;
    let round_name = match field {
        2 => RoundName::Final,
        3 => RoundName::SemiFinal,
        4 => RoundName::QuarterFinal,
        n => RoundName::for_field(n),
    };
    Ok(build_draw(key, 1, round_name, draw))
}

/// Turn a planned round into matches.
pub fn build_next_round<R: Rng + ?Sized>(
    key: GroupKey,
    next: NextRound,
    rng: &mut R,
) -> Result<Vec<GameMatch>, BracketError> {
    match next {
        NextRound::Draw { round, entrants } => {
            let round_name = RoundName::for_field(entrants.len());
            let draw = draw_round(entrants, rng)?;
            Ok(build_draw(key, round, round_name, draw))
        }
        NextRound::Fixed { round, pairs } => Ok(pairs
            .into_iter()
            .map(|p| GameMatch::new(key, round, p.round_name, match_name(key, round, p.token), p.player_1, p.player_2))
            .collect()),
    }
}

fn build_draw(key: GroupKey, round: u32, round_name: RoundName, draw: Draw) -> Vec<GameMatch> {
    let field = draw.entrant_count();
    let mut matches: Vec<GameMatch> = draw
        .pairs
        .iter()
        .enumerate()
        .map(|(i, &(p1, p2))| {
            let token = match (round, field) {
                (1, 2) => "2_final".to_string(),
                (1, 3) => "3_player_semi".to_string(),
                (1, 4) => format!("4_player_match{}", i + 1),
                _ => format!("match{}", i + 1),
            };
            GameMatch::new(key, round, round_name, match_name(key, round, &token), p1, p2)
        })
        .collect();
    if let Some(bye) = draw.bye {
        let token = if field == 3 { "3_player_bye" } else { "bye" };
        matches.push(GameMatch::bye(key, round, round_name, match_name(key, round, token), bye));
    }
    matches
}

/// Inspect a group's full match history.
pub fn analyze(history: &[GameMatch]) -> Result<GroupProgress, BracketError> {
    let mut rounds: BTreeMap<u32, Vec<&GameMatch>> = BTreeMap::new();
    for m in history {
        rounds.entry(m.round).or_default().push(m);
    }
    let Some((&latest_no, latest)) = rounds.iter().next_back() else {
        return Err(BracketError::InconsistentHistory("group has no matches".to_string()));
    };

    if latest.iter().any(|m| !m.status.is_resolved()) {
        return Ok(GroupProgress::RoundInProgress { round: latest_no });
    }
    for m in history.iter().filter(|m| m.status.is_resolved() && !m.is_bye()) {
        if m.winner_id.is_none() {
            return Err(BracketError::MissingWinner(m.id));
        }
    }

    let previous = rounds.range(..latest_no).next_back().map(|(_, r)| r.as_slice());
    let next_no = latest_no + 1;

    if latest.iter().any(|m| m.round_name == RoundName::Final) {
        let final_match = single_match(latest)?;
        return resolve_final(final_match, previous).map(GroupProgress::Resolved);
    }

    if latest.iter().any(|m| m.round_name == RoundName::WinnersSemiFinal) {
        let winners_sf = find_round(latest, RoundName::WinnersSemiFinal)?;
        let losers_sf = find_round(latest, RoundName::LosersSemiFinal)?;
        return Ok(GroupProgress::NextRound(NextRound::Fixed {
            round: next_no,
            pairs: vec![FixedPair {
                round_name: RoundName::Final,
                token: "4_player_final",
                player_1: loser(winners_sf)?,
                player_2: winner(losers_sf)?,
            }],
        }));
    }

    let field: usize = latest.iter().map(|m| m.players().len()).sum();
    let real: Vec<&GameMatch> = latest.iter().copied().filter(|m| !m.is_bye()).collect();

    if field == 3 {
        let semi = single_match(&real)?;
        let bye_player = latest
            .iter()
            .find(|m| m.is_bye())
            .and_then(|m| m.bye_player_id)
            .ok_or_else(|| BracketError::InconsistentHistory("three-player round without a bye".to_string()))?;
        return Ok(GroupProgress::NextRound(NextRound::Fixed {
            round: next_no,
            pairs: vec![FixedPair {
                round_name: RoundName::Final,
                token: "3_player_final",
                player_1: loser(semi)?,
                player_2: bye_player,
            }],
        }));
    }

    if latest_no == 1 && field == 4 && real.len() == 2 {
        let (first, second) = (real[0], real[1]);
        return Ok(GroupProgress::NextRound(NextRound::Fixed {
            round: next_no,
            pairs: vec![
                FixedPair {
                    round_name: RoundName::WinnersSemiFinal,
                    token: "4_player_winners_sf",
                    player_1: winner(first)?,
                    player_2: winner(second)?,
                },
                FixedPair {
                    round_name: RoundName::LosersSemiFinal,
                    token: "4_player_losers_sf",
                    player_1: loser(first)?,
                    player_2: loser(second)?,
                },
            ],
        }));
    }

    let advancing: Vec<PlayerId> = latest
        .iter()
        .map(|m| m.advancing_player().ok_or(BracketError::MissingWinner(m.id)))
        .collect::<Result<_, _>>()?;

    match advancing.len() {
        0 | 1 => Err(BracketError::InconsistentHistory(format!(
            "round {} leaves {} player(s) without a final",
            latest_no,
            advancing.len()
        ))),
        2 => Ok(GroupProgress::NextRound(NextRound::Fixed {
            round: next_no,
            pairs: vec![FixedPair {
                round_name: RoundName::Final,
                token: "final",
                player_1: advancing[0],
                player_2: advancing[1],
            }],
        })),
        _ => {
            let byes = bye_counts(history);
            let entrants = advancing
                .into_iter()
                .map(|player_id| Entrant {
                    byes: byes.get(&player_id).copied().unwrap_or(0),
                    ..Entrant::new(player_id)
                })
                .collect();
            Ok(GroupProgress::NextRound(NextRound::Draw {
                round: next_no,
                entrants,
            }))
        }
    }
}

/// Placements once the final is played.
fn resolve_final(final_match: &GameMatch, previous: Option<&[&GameMatch]>) -> Result<Vec<Placement>, BracketError> {
    let champion = winner(final_match)?;
    let runner_up = loser(final_match)?;
    let Some(previous) = previous else {
        // two-player group: the final was the only match
        return Ok(vec![
            Placement::new(champion, Position::First),
            Placement::new(runner_up, Position::Second),
        ]);
    };

    if let Some(winners_sf) = previous.iter().find(|m| m.round_name == RoundName::WinnersSemiFinal) {
        return Ok(vec![
            Placement::new(winner(winners_sf)?, Position::First),
            Placement::new(champion, Position::Second),
            Placement::new(runner_up, Position::Third),
        ]);
    }

    let field: usize = previous.iter().map(|m| m.players().len()).sum();
    if field == 3 {
        let semi = previous
            .iter()
            .find(|m| !m.is_bye())
            .ok_or_else(|| BracketError::InconsistentHistory("three-player round without a match".to_string()))?;
        return Ok(vec![
            Placement::new(winner(semi)?, Position::First),
            Placement::new(champion, Position::Second),
            Placement::new(runner_up, Position::Third),
        ]);
    }

    let third = best_semi_final_loser(previous, champion)?;
    Ok(vec![
        Placement::new(champion, Position::First),
        Placement::new(runner_up, Position::Second),
        Placement::new(third, Position::Third),
    ])
}

/// Semi-final loser with the most points; ties go to the one beaten by the champion.
fn best_semi_final_loser(semis: &[&GameMatch], champion: PlayerId) -> Result<PlayerId, BracketError> {
    let mut candidates = Vec::new();
    for m in semis.iter().filter(|m| !m.is_bye()) {
        let l = loser(m)?;
        let beaten_by_champion = m.winner_id == Some(champion);
        let points = if m.status == MatchStatus::Forfeit { 0 } else { m.points_of(l) };
        candidates.push((points, beaten_by_champion, l));
    }
    candidates
        .into_iter()
        .max_by_key(|&(points, beaten_by_champion, _)| (points, beaten_by_champion))
        .map(|(_, _, l)| l)
        .ok_or_else(|| BracketError::InconsistentHistory("no semi-final loser for third place".to_string()))
}

fn bye_counts(history: &[GameMatch]) -> HashMap<PlayerId, u32> {
    let mut counts = HashMap::new();
    for bye in history.iter().filter_map(|m| m.bye_player_id) {
        *counts.entry(bye).or_insert(0) += 1;
    }
    counts
}

fn single_match<'a>(round: &[&'a GameMatch]) -> Result<&'a GameMatch, BracketError> {
    match round {
        [only] => Ok(*only),
        _ => Err(BracketError::InconsistentHistory(format!(
            "expected one match in round, found {}",
            round.len()
        ))),
    }
}

fn find_round<'a>(round: &[&'a GameMatch], name: RoundName) -> Result<&'a GameMatch, BracketError> {
    round
        .iter()
        .copied()
        .find(|m| m.round_name == name)
        .ok_or_else(|| BracketError::InconsistentHistory(format!("missing {} match", name)))
}

fn winner(m: &GameMatch) -> Result<PlayerId, BracketError> {
    m.winner_id.ok_or(BracketError::MissingWinner(m.id))
}

fn loser(m: &GameMatch) -> Result<PlayerId, BracketError> {
    m.loser_id().ok_or(BracketError::MissingWinner(m.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Level;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn key() -> GroupKey {
        GroupKey::new(Uuid::new_v4(), Level::Community, Some(7))
    }

    fn entrants(n: usize) -> Vec<Entrant> {
        (0..n).map(|_| Entrant::new(Uuid::new_v4())).collect()
    }

    /// Player 1 wins every unresolved match.
    fn play(matches: &mut [GameMatch]) {
        for m in matches.iter_mut().filter(|m| !m.status.is_resolved()) {
            m.player_1_points = Some(7);
            m.player_2_points = Some(3);
            m.winner_id = Some(m.player_1_id);
            m.status = MatchStatus::Completed;
        }
    }

    fn run_to_end(n: usize) -> (Vec<GameMatch>, Vec<Placement>) {
        let mut rng = StdRng::seed_from_u64(n as u64);
        let key = key();
        let mut history = first_round(key, entrants(n), &mut rng).unwrap();
        loop {
            play(&mut history);
            match analyze(&history).unwrap() {
                GroupProgress::Resolved(placements) => return (history, placements),
                GroupProgress::NextRound(next) => history.extend(build_next_round(key, next, &mut rng).unwrap()),
                GroupProgress::RoundInProgress { .. } => unreachable!(),
            }
        }
    }

    #[test]
    fn opening_round_names() {
        let mut rng = StdRng::seed_from_u64(1);
        let two = first_round(key(), entrants(2), &mut rng).unwrap();
        assert_eq!(two.len(), 1);
        assert_eq!(two[0].round_name, RoundName::Final);
        assert!(two[0].match_name.ends_with("2_final"));

        let four = first_round(key(), entrants(4), &mut rng).unwrap();
        assert!(four.iter().all(|m| m.round_name == RoundName::QuarterFinal));
        assert!(four[0].match_name.ends_with("4_player_match1"));
        assert!(four[1].match_name.starts_with("community_R1_"));

        let eight = first_round(key(), entrants(8), &mut rng).unwrap();
        assert_eq!(eight.len(), 4);
        assert!(eight.iter().all(|m| m.round_name == RoundName::QuarterFinal));
    }

    #[test]
    fn unfinished_round_is_in_progress() {
        let mut rng = StdRng::seed_from_u64(2);
        let history = first_round(key(), entrants(5), &mut rng).unwrap();
        assert_eq!(analyze(&history).unwrap(), GroupProgress::RoundInProgress { round: 1 });
    }

    #[test]
    fn four_player_endgame() {
        let (history, placements) = run_to_end(4);
        let names: Vec<RoundName> = history.iter().map(|m| m.round_name).collect();
        assert!(names.contains(&RoundName::WinnersSemiFinal));
        assert!(names.contains(&RoundName::LosersSemiFinal));
        let wsf = history.iter().find(|m| m.round_name == RoundName::WinnersSemiFinal).unwrap();
        let lsf = history.iter().find(|m| m.round_name == RoundName::LosersSemiFinal).unwrap();
        let fin = history.iter().find(|m| m.round_name == RoundName::Final).unwrap();
        assert_eq!(fin.player_1_id, wsf.loser_id().unwrap());
        assert_eq!(fin.player_2_id, lsf.winner_id);
        assert_eq!(placements[0], Placement::new(wsf.winner_id.unwrap(), Position::First));
        assert_eq!(placements[1], Placement::new(fin.winner_id.unwrap(), Position::Second));
        assert_eq!(placements[2], Placement::new(fin.loser_id().unwrap(), Position::Third));
        assert!(!placements.iter().any(|p| Some(p.player_id) == lsf.loser_id()));
    }

    #[test]
    fn three_player_final_uses_semi_final_loser() {
        let (history, placements) = run_to_end(3);
        let semi = history.iter().find(|m| m.round == 1 && !m.is_bye()).unwrap();
        let bye = history.iter().find(|m| m.is_bye()).unwrap();
        let fin = history.iter().find(|m| m.round_name == RoundName::Final).unwrap();
        assert_eq!(fin.player_1_id, semi.loser_id().unwrap());
        assert_eq!(fin.player_2_id, bye.bye_player_id);
        assert_eq!(placements[0].player_id, semi.winner_id.unwrap());
        assert_eq!(placements.len(), 3);
    }

    #[test]
    fn eight_players_run_quarter_semi_final() {
        let (history, placements) = run_to_end(8);
        let count = |name: RoundName| history.iter().filter(|m| m.round_name == name).count();
        assert_eq!(count(RoundName::QuarterFinal), 4);
        assert_eq!(count(RoundName::SemiFinal), 2);
        assert_eq!(count(RoundName::Final), 1);
        assert_eq!(placements.len(), 3);
        let semi_losers: Vec<PlayerId> = history
            .iter()
            .filter(|m| m.round_name == RoundName::SemiFinal)
            .filter_map(|m| m.loser_id())
            .collect();
        assert!(semi_losers.contains(&placements[2].player_id));
    }

    #[test]
    fn larger_fields_always_resolve_three_distinct_places() {
        for n in 5..=20 {
            let (_, placements) = run_to_end(n);
            assert_eq!(placements.len(), 3, "n = {}", n);
            let mut ids: Vec<PlayerId> = placements.iter().map(|p| p.player_id).collect();
            ids.dedup();
            assert_eq!(ids.len(), 3);
        }
    }

    #[test]
    fn resolved_match_without_winner_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut history = first_round(key(), entrants(2), &mut rng).unwrap();
        history[0].status = MatchStatus::Completed;
        assert_eq!(analyze(&history), Err(BracketError::MissingWinner(history[0].id)));
    }

    #[test]
    fn third_place_prefers_higher_scoring_semi_final_loser() {
        let k = key();
        let p: Vec<PlayerId> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut semi_1 = GameMatch::new(k, 2, RoundName::SemiFinal, "a".into(), p[0], p[1]);
        semi_1.winner_id = Some(p[0]);
        semi_1.player_1_points = Some(5);
        semi_1.player_2_points = Some(1);
        let mut semi_2 = GameMatch::new(k, 2, RoundName::SemiFinal, "b".into(), p[2], p[3]);
        semi_2.winner_id = Some(p[2]);
        semi_2.player_1_points = Some(5);
        semi_2.player_2_points = Some(4);
        assert_eq!(best_semi_final_loser(&[&semi_1, &semi_2], p[0]).unwrap(), p[3]);
        semi_2.player_2_points = Some(1);
        assert_eq!(best_semi_final_loser(&[&semi_1, &semi_2], p[0]).unwrap(), p[1]);
    }
}
