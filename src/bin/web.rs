//! Web server for the pool tournament API.
//! Run with: cargo run --bin web
//! Env: HOST, PORT, ADMIN_TOKEN, GEOGRAPHY_CSV, BRACKET_SEED, AUTOMATION_INTERVAL_SECS.

use actix_web::{web::Data, App, HttpServer};
use pool_tournament_web::{api, run_automation, Settings, Store};
use std::time::Duration;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env();
    let geography = settings
        .load_geography()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    log::info!("Loaded geography with {} communities", geography.community_count());

    let bind = (settings.host.clone(), settings.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let interval = settings.automation_interval.max(Duration::from_secs(1));
    let state = Data::new(api::AppState {
        store: Store::new(geography, settings.bracket_seed),
        settings,
    });

    // Background task: advance automatic tournaments whose rounds are done
    let state_automation = state.clone();
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = run_automation(&state_automation.store) {
                log::error!("Automation sweep failed: {}", e);
            }
        }
    });

    HttpServer::new(move || App::new().app_data(state.clone()).configure(api::configure))
        .bind(bind)?
        .run()
        .await
}
