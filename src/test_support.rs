use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{auth::Actor, db, structs::Role};

/// Fresh in-memory database with migrations applied. A single connection
/// that never expires keeps the database alive for the whole test.
pub async fn memory_pool() -> SqlitePool {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

pub fn actor(id: i64, role: Role) -> Actor {
    Actor {
        id,
        name: format!("actor {id}"),
        email: format!("actor{id}@example.com"),
        role,
    }
}
