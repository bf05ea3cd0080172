mod handlers;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing_actix_web::TracingLogger;

pub use state::AppState;

/// Register every API route on a service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/locations/states", web::get().to(handlers::states))
        .route("/api/locations/districts", web::post().to(handlers::districts))
        .route(
            "/api/locations/subdistricts",
            web::post().to(handlers::subdistricts),
        )
        .route("/api/locations/villages", web::post().to(handlers::villages))
        .route(
            "/api/time_series/arithmetic",
            web::post().to(handlers::time_series),
        )
        .route(
            "/api/time_series/demographic",
            web::post().to(handlers::demographic),
        )
        .route("/api/cohort", web::post().to(handlers::cohort))
        .route(
            "/api/subdistricts/{code}/growth_rates",
            web::get().to(handlers::growth_rates),
        );
}

pub async fn start_server(state: AppState) -> std::io::Result<()> {
    let host = state.config.server.host.clone();
    let port = state.config.server.port;
    let data = web::Data::new(state);

    tracing::info!(%host, port, "Starting population forecaster web server");

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .app_data(data.clone())
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024))
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
