//! REST API: actix-web handlers and route registration.
//!
//! Callers identify themselves with `X-Admin-Token` (admin) or `X-Player-Id` (player).
//! Errors are returned as `{"error": "..."}` with 400/403/404/500.

use crate::config::Settings;
use crate::logic;
use crate::models::{
    Actor, AutomationMode, GeographyRecord, GroupId, Level, MatchId, NewTournament, PlayerId, ProposedDates,
    TournamentError, TournamentId,
};
use crate::store::Store;
use actix_web::{
    get, http::StatusCode, post, put,
    web::{self, Data, Json, Path, Query},
    HttpRequest, HttpResponse, Responder, ResponseError,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Shared state: the store plus settings needed for authentication.
pub struct AppState {
    pub store: Store,
    pub settings: Settings,
}

type State = Data<AppState>;

impl ResponseError for TournamentError {
    fn status_code(&self) -> StatusCode {
        match self {
            TournamentError::Validation(_)
            | TournamentError::StateConflict(_)
            | TournamentError::PrerequisiteMissing(_)
            | TournamentError::Bracket(_) => StatusCode::BAD_REQUEST,
            TournamentError::Permission(_) => StatusCode::FORBIDDEN,
            TournamentError::NotFound(_) => StatusCode::NOT_FOUND,
            TournamentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            TournamentError::Internal(detail) => {
                log::error!("internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

/// Resolve the caller from the request headers.
fn actor(req: &HttpRequest, settings: &Settings) -> Result<Actor, TournamentError> {
    let header = |name: &str| req.headers().get(name).and_then(|v| v.to_str().ok());
    if let Some(token) = header("X-Admin-Token") {
        return if token == settings.admin_token {
            Ok(Actor::Admin)
        } else {
            Err(TournamentError::Permission("Invalid admin token".to_string()))
        };
    }
    match header("X-Player-Id") {
        Some(id) => id
            .parse::<PlayerId>()
            .map(Actor::Player)
            .map_err(|_| TournamentError::Validation("Invalid X-Player-Id header".to_string())),
        None => Err(TournamentError::Permission("Authentication required".to_string())),
    }
}

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

#[derive(Deserialize)]
struct RegistrationPath {
    id: TournamentId,
    player_id: PlayerId,
}

#[derive(Deserialize)]
struct MatchPath {
    id: MatchId,
}

#[derive(Deserialize)]
struct CreatePlayerBody {
    name: String,
    community_id: u32,
}

#[derive(Deserialize)]
struct AutomationBody {
    automation_mode: AutomationMode,
}

#[derive(Deserialize)]
struct InitializeBody {
    level: Level,
}

#[derive(Deserialize)]
struct NextRoundBody {
    level: Level,
    group_id: Option<GroupId>,
}

#[derive(Deserialize)]
struct MatchFilter {
    level: Option<Level>,
    group_id: Option<GroupId>,
}

#[derive(Deserialize)]
struct ProposeDatesBody {
    dates: ProposedDates,
}

#[derive(Deserialize)]
struct SelectDateBody {
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SubmitResultsBody {
    player_1_points: u32,
    player_2_points: u32,
}

#[derive(Deserialize)]
struct ConfirmBody {
    confirm: bool,
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "pool-tournament-web",
    })
}

#[post("/admin/geography")]
async fn api_add_geography(state: State, req: HttpRequest, body: Json<GeographyRecord>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let location = logic::add_geography(&state.store, actor, body.into_inner())?;
    Ok(HttpResponse::Ok().json(location))
}

#[post("/admin/players")]
async fn api_create_player(state: State, req: HttpRequest, body: Json<CreatePlayerBody>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let player = logic::create_player(&state.store, actor, &body.name, body.community_id)?;
    Ok(HttpResponse::Ok().json(player))
}

#[post("/admin/tournaments")]
async fn api_create_tournament(state: State, req: HttpRequest, body: Json<NewTournament>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let tournament = logic::create_tournament(&state.store, actor, body.into_inner())?;
    Ok(HttpResponse::Ok().json(tournament))
}

#[post("/admin/tournaments/{id}/open-registration")]
async fn api_open_registration(state: State, req: HttpRequest, path: Path<TournamentPath>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let tournament = logic::open_registration(&state.store, actor, path.id)?;
    Ok(HttpResponse::Ok().json(tournament))
}

#[put("/admin/tournaments/{id}/automation")]
async fn api_set_automation(
    state: State,
    req: HttpRequest,
    path: Path<TournamentPath>,
    body: Json<AutomationBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let tournament = logic::set_automation_mode(&state.store, actor, path.id, body.automation_mode)?;
    Ok(HttpResponse::Ok().json(tournament))
}

#[post("/admin/tournaments/{id}/registrations/{player_id}/payment")]
async fn api_record_payment(state: State, req: HttpRequest, path: Path<RegistrationPath>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let registration = logic::record_payment(&state.store, actor, path.id, path.player_id)?;
    Ok(HttpResponse::Ok().json(registration))
}

#[post("/admin/tournaments/{id}/registrations/{player_id}/approve")]
async fn api_approve_registration(state: State, req: HttpRequest, path: Path<RegistrationPath>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let registration = logic::approve_registration(&state.store, actor, path.id, path.player_id)?;
    Ok(HttpResponse::Ok().json(registration))
}

#[post("/admin/tournaments/{id}/registrations/{player_id}/reject")]
async fn api_reject_registration(state: State, req: HttpRequest, path: Path<RegistrationPath>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let registration = logic::reject_registration(&state.store, actor, path.id, path.player_id)?;
    Ok(HttpResponse::Ok().json(registration))
}

/// Open the brackets of a level.
#[post("/admin/tournaments/{id}/initialize")]
async fn api_initialize(
    state: State,
    req: HttpRequest,
    path: Path<TournamentPath>,
    body: Json<InitializeBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let summary = logic::initialize(&state.store, actor, path.id, body.level)?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Next round for one group, or for every ready group of the level when `group_id` is omitted.
/// The national level has a single group, so it is always addressed as one group.
#[post("/admin/tournaments/{id}/generate-next-round")]
async fn api_generate_next_round(
    state: State,
    req: HttpRequest,
    path: Path<TournamentPath>,
    body: Json<NextRoundBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    match (body.level, body.group_id) {
        (Level::National, _) | (_, Some(_)) => {
            let outcome = logic::generate_next_round(&state.store, actor, path.id, body.level, body.group_id)?;
            Ok(HttpResponse::Ok().json(outcome))
        }
        (level, None) => {
            let outcomes: Vec<_> = logic::generate_next_rounds_for_level(&state.store, actor, path.id, level)?
                .into_iter()
                .map(|(group_id, outcome)| serde_json::json!({ "group_id": group_id, "result": outcome }))
                .collect();
            Ok(HttpResponse::Ok().json(serde_json::json!({ "groups": outcomes })))
        }
    }
}

#[get("/admin/tournaments/{id}/statistics")]
async fn api_statistics(state: State, req: HttpRequest, path: Path<TournamentPath>) -> Result<HttpResponse, TournamentError> {
    actor(&req, &state.settings)?.require_admin()?;
    let stats = logic::tournament_statistics(&state.store, path.id)?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/admin/tournaments/{id}/winners.csv")]
async fn api_winners_csv(state: State, req: HttpRequest, path: Path<TournamentPath>) -> Result<HttpResponse, TournamentError> {
    actor(&req, &state.settings)?.require_admin()?;
    let csv = logic::winners_csv(&state.store, path.id)?;
    Ok(HttpResponse::Ok().content_type("text/csv; charset=utf-8").body(csv))
}

#[post("/tournaments/{id}/register")]
async fn api_register(state: State, req: HttpRequest, path: Path<TournamentPath>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let player_id = actor.require_player()?;
    let outcome = logic::register(&state.store, actor, path.id, player_id)?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/tournaments/{id}/matches")]
async fn api_list_matches(state: State, path: Path<TournamentPath>, filter: Query<MatchFilter>) -> Result<HttpResponse, TournamentError> {
    let matches = state.store.read(|data| {
        data.tournament(path.id)?;
        Ok::<_, TournamentError>(
            data.matches
                .iter()
                .filter(|m| m.tournament_id == path.id)
                .filter(|m| filter.level.map_or(true, |l| m.level == l))
                .filter(|m| filter.group_id.map_or(true, |g| m.group_id == Some(g)))
                .cloned()
                .collect::<Vec<_>>(),
        )
    })??;
    Ok(HttpResponse::Ok().json(matches))
}

#[get("/tournaments/{id}/winners")]
async fn api_list_winners(state: State, path: Path<TournamentPath>) -> Result<HttpResponse, TournamentError> {
    let winners = state.store.read(|data| {
        data.tournament(path.id)?;
        Ok::<_, TournamentError>(
            data.winners
                .iter()
                .filter(|w| w.tournament_id == path.id)
                .cloned()
                .collect::<Vec<_>>(),
        )
    })??;
    Ok(HttpResponse::Ok().json(winners))
}

#[post("/matches/{id}/propose-dates")]
async fn api_propose_dates(
    state: State,
    req: HttpRequest,
    path: Path<MatchPath>,
    body: Json<ProposeDatesBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let game = logic::propose_dates(&state.store, actor, path.id, body.into_inner().dates)?;
    Ok(HttpResponse::Ok().json(game))
}

#[post("/matches/{id}/select-date")]
async fn api_select_date(
    state: State,
    req: HttpRequest,
    path: Path<MatchPath>,
    body: Json<SelectDateBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let game = logic::select_date(&state.store, actor, path.id, body.date)?;
    Ok(HttpResponse::Ok().json(game))
}

#[post("/matches/{id}/submit-results")]
async fn api_submit_results(
    state: State,
    req: HttpRequest,
    path: Path<MatchPath>,
    body: Json<SubmitResultsBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let game = logic::submit_results(&state.store, actor, path.id, body.player_1_points, body.player_2_points)?;
    Ok(HttpResponse::Ok().json(game))
}

#[post("/matches/{id}/confirm-results")]
async fn api_confirm_results(
    state: State,
    req: HttpRequest,
    path: Path<MatchPath>,
    body: Json<ConfirmBody>,
) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let outcome = logic::confirm_results(&state.store, actor, path.id, body.confirm)?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/matches/{id}/forfeit")]
async fn api_forfeit(state: State, req: HttpRequest, path: Path<MatchPath>) -> Result<HttpResponse, TournamentError> {
    let actor = actor(&req, &state.settings)?;
    let outcome = logic::forfeit(&state.store, actor, path.id)?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Register every route and the extractor error handlers. The caller provides `Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        TournamentError::Validation(format!("Invalid request body: {}", err)).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        TournamentError::Validation(format!("Invalid query: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        TournamentError::Validation(format!("Invalid path: {}", err)).into()
    }))
    .service(api_health)
        .service(api_add_geography)
        .service(api_create_player)
        .service(api_create_tournament)
        .service(api_open_registration)
        .service(api_set_automation)
        .service(api_record_payment)
        .service(api_approve_registration)
        .service(api_reject_registration)
        .service(api_initialize)
        .service(api_generate_next_round)
        .service(api_statistics)
        .service(api_winners_csv)
        .service(api_register)
        .service(api_list_matches)
        .service(api_list_winners)
        .service(api_propose_dates)
        .service(api_select_date)
        .service(api_submit_results)
        .service(api_confirm_results)
        .service(api_forfeit);
}
