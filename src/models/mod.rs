//! Data structures for the pool tournament: geography, players, tournaments, matches, winners.

mod error;
mod game;
mod geography;
mod notification;
mod player;
mod registration;
mod tournament;
mod winner;

pub use error::{BracketError, TournamentError};
pub use game::{GameMatch, GroupKey, MatchId, MatchStatus, ProposedDates, RoundName};
pub use geography::{
    CommunityId, CountyId, Geography, GeographyRecord, GroupId, Level, Location, RegionId,
};
pub use notification::{LogSink, Notification, NotificationKind, NotificationSink};
pub use player::{Actor, Player, PlayerId};
pub use registration::{PaymentStatus, Registration, RegistrationId, RegistrationStatus};
pub use tournament::{
    AutomationMode, NewTournament, PrizeConfig, PrizeDistribution, Tournament, TournamentId,
    TournamentStatus,
};
pub use winner::{Placement, Position, Winner};
