use std::env;

use actix_web::cookie::Key;

use crate::errors::AppError;

const DEFAULT_DATABASE_URL: &str = "sqlite://plant_store.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_key: Vec<u8>,
    pub seed_database: bool,
}

impl Config {
    /// Reads the service configuration from the environment. Call after
    /// `dotenvy::dotenv()` so `.env` values are visible.
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_owned());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port: {raw}")))?,
            Err(_) => 8080,
        };
        let session_key = env::var("SESSION_KEY")?.into_bytes();
        let seed_database = env::var("SEED_DATABASE")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        let config = Config {
            database_url,
            host,
            port,
            session_key,
            seed_database,
        };
        config.session_key()?;
        Ok(config)
    }

    pub fn session_key(&self) -> Result<Key, AppError> {
        Key::try_from(self.session_key.as_slice())
            .map_err(|_| AppError::Config("SESSION_KEY must be at least 64 bytes".to_owned()))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
