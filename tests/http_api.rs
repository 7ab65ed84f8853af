//! HTTP tests: routing, authentication headers and the error-to-status mapping.

mod common;

use actix_web::{http::StatusCode, test, web::Data, App};
use pool_tournament_web::api::{self, AppState};
use pool_tournament_web::models::AutomationMode;
use pool_tournament_web::{Level, Settings};
use serde_json::{json, Value};

const TOKEN: &str = "test-admin";

fn state() -> Data<AppState> {
    Data::new(AppState {
        store: common::store(),
        settings: Settings {
            admin_token: TOKEN.to_string(),
            ..Settings::default()
        },
    })
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state.clone()).configure(api::configure)).await
    };
}

#[actix_web::test]
async fn health_is_public() {
    let state = state();
    let app = app!(state);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
}

#[actix_web::test]
async fn admin_routes_need_the_token() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/admin/tournaments")
        .set_json(json!({ "name": "Open" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/admin/tournaments")
        .insert_header(("X-Admin-Token", "wrong"))
        .set_json(json!({ "name": "Open" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/admin/tournaments")
        .insert_header(("X-Admin-Token", TOKEN))
        .set_json(json!({ "name": "Open", "charge": 10 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "upcoming");
    assert_eq!(body["charge"], 10);
}

#[actix_web::test]
async fn errors_map_to_status_codes() {
    let state = state();
    let (tid, players) = common::tournament(&state.store, &[2], AutomationMode::Manual);
    let app = app!(state);

    // county before community
    let req = test::TestRequest::post()
        .uri(&format!("/admin/tournaments/{tid}/initialize"))
        .insert_header(("X-Admin-Token", TOKEN))
        .set_json(json!({ "level": "county" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "No winners found from previous level");

    // players cannot initialize
    let req = test::TestRequest::post()
        .uri(&format!("/admin/tournaments/{tid}/initialize"))
        .insert_header(("X-Player-Id", players[0].to_string()))
        .set_json(json!({ "level": "community" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/tournaments/{}/winners", uuid::Uuid::new_v4()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_bodies_get_json_errors() {
    let state = state();
    let (tid, _) = common::tournament(&state.store, &[2], AutomationMode::Manual);
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/admin/tournaments/{tid}/initialize"))
        .insert_header(("X-Admin-Token", TOKEN))
        .set_json(json!({ "level": "planet" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));

    let req = test::TestRequest::get()
        .uri(&format!("/tournaments/{tid}/matches?level=planet"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn match_flow_over_http() {
    let state = state();
    let (tid, _) = common::tournament(&state.store, &[2], AutomationMode::Manual);
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/admin/tournaments/{tid}/initialize"))
        .insert_header(("X-Admin-Token", TOKEN))
        .set_json(json!({ "level": "community" }))
        .to_request();
    let summary: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(summary["matches_created"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/tournaments/{tid}/matches?level=community&group_id=1"))
        .to_request();
    let matches: Value = test::call_and_read_body_json(&app, req).await;
    let m = &matches[0];
    assert_eq!(m["match_name"], "community_R1_2_final");
    assert_eq!(m["round_name"], "final");
    let match_id = m["id"].as_str().unwrap().to_string();
    let p1 = m["player_1_id"].as_str().unwrap().to_string();
    let p2 = m["player_2_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/matches/{match_id}/submit-results"))
        .insert_header(("X-Player-Id", p1.clone()))
        .set_json(json!({ "player_1_points": 7, "player_2_points": 4 }))
        .to_request();
    let submitted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(submitted["status"], "pending_confirmation");

    let req = test::TestRequest::post()
        .uri(&format!("/matches/{match_id}/confirm-results"))
        .insert_header(("X-Player-Id", p1.clone()))
        .set_json(json!({ "confirm": true }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "You cannot confirm your own result submission");

    let req = test::TestRequest::post()
        .uri(&format!("/matches/{match_id}/confirm-results"))
        .insert_header(("X-Player-Id", p2))
        .set_json(json!({ "confirm": true }))
        .to_request();
    let outcome: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(outcome["match"]["status"], "completed");
    assert_eq!(outcome["completion"]["completed"], true);

    let req = test::TestRequest::get().uri(&format!("/tournaments/{tid}/winners")).to_request();
    let winners: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(winners[0]["player_id"], p1.as_str());
    assert_eq!(winners[0]["position"], 1);

    let req = test::TestRequest::get()
        .uri(&format!("/admin/tournaments/{tid}/statistics"))
        .insert_header(("X-Admin-Token", TOKEN))
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats["levels"][0]["level"], Level::Community.as_str());
    assert_eq!(stats["levels"][0]["groups_completed"], 1);
}

#[actix_web::test]
async fn players_register_themselves() {
    let state = state();
    let (tid, _) = common::tournament(&state.store, &[], AutomationMode::Manual);
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/admin/players")
        .insert_header(("X-Admin-Token", TOKEN))
        .set_json(json!({ "name": "Dana", "community_id": 3 }))
        .to_request();
    let player: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(player["location"]["county_id"], 11);
    let pid = player["id"].as_str().unwrap().to_string();

    for expected in [false, true] {
        let req = test::TestRequest::post()
            .uri(&format!("/tournaments/{tid}/register"))
            .insert_header(("X-Player-Id", pid.clone()))
            .to_request();
        let outcome: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(outcome["already_registered"], expected);
    }

    let req = test::TestRequest::post()
        .uri(&format!("/admin/tournaments/{tid}/registrations/{pid}/approve"))
        .insert_header(("X-Admin-Token", TOKEN))
        .to_request();
    let registration: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(registration["status"], "approved");
}
