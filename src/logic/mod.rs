//! Tournament business logic: pairing, round progression, completion, orchestration.

pub mod completion;
pub mod coordinator;
pub mod orchestrator;
pub mod pairing;
pub mod progression;
pub mod registration;
pub mod results;
pub mod setup;
pub mod statistics;

pub use completion::{check_group_completion, CompletionReport};
pub use coordinator::{complete_tournament, on_match_resolved, run_automation};
pub use orchestrator::{
    generate_next_round, generate_next_rounds_for_level, initialize, GroupSummary, InitializeSummary,
    NextRoundOutcome,
};
pub use pairing::{draw_round, Draw, Entrant};
pub use progression::{analyze, GroupProgress};
pub use registration::{
    approve_registration, record_payment, register, reject_registration, RegistrationOutcome,
};
pub use results::{confirm_results, forfeit, propose_dates, select_date, submit_results, ResolutionOutcome};
pub use setup::{add_geography, create_player, create_tournament, open_registration, set_automation_mode};
pub use statistics::{tournament_statistics, winners_csv, LevelStatistics, TournamentStatistics};
