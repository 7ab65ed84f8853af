//! Pool tournament organizer: community → county → regional → national brackets
//! with a REST API on top.

pub mod api;
pub mod config;
pub mod logic;
pub mod models;
pub mod store;

pub use config::Settings;
pub use logic::{
    add_geography, approve_registration, confirm_results, create_player, create_tournament, forfeit,
    generate_next_round, generate_next_rounds_for_level, initialize, open_registration, propose_dates,
    record_payment, register, reject_registration, run_automation, select_date, set_automation_mode,
    submit_results, tournament_statistics, winners_csv,
};
pub use models::{
    Actor, GameMatch, Geography, Level, MatchId, MatchStatus, Player, PlayerId, Tournament, TournamentError,
    TournamentId, TournamentStatus, Winner,
};
pub use store::Store;
