use actix_identity::IdentityMiddleware;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{
    middleware,
    web::{self, Data},
    App, HttpServer,
};
use log::info;
use sqlx::SqlitePool;

mod auth;
mod config;
mod db;
mod errors;
mod routes;
mod services;
mod structs;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(|e| {
        log::error!("FATAL: {}", e);
        e
    })?;
    let session_key = config.session_key()?;

    let db_pool = db::connect(&config.database_url).await?;

    if config.seed_database {
        db::seed::run(&db_pool).await?;
    }

    info!(
        "Starting HTTP server on http://{}:{}/",
        config.host, config.port
    );

    HttpServer::new(move || {
        App::new()
            // enable automatic response compression - usually register this first
            .wrap(middleware::Compress::default())
            .wrap(IdentityMiddleware::default())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                session_key.clone(),
            ))
            // enable logger - always register Actix Web Logger middleware last
            .wrap(middleware::Logger::default())
            .app_data(Data::new(AppState {
                db_pool: db_pool.clone(),
            }))
            .configure(routes::configure)
            .default_service(web::to(routes::default_handler))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
