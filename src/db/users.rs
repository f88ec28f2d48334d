use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    errors::{constraint_violation, AppResult},
    structs::{Page, PageParams, Role, User},
    utils::{like_pattern, now},
};

const EMAIL_TAKEN: &str = "The email has already been taken.";

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(total)
}

pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    pwd_hash: &str,
    role: Role,
) -> AppResult<User> {
    let created_at = now();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, pwd_hash, role, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(name)
    .bind(email)
    .bind(pwd_hash)
    .bind(role)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(pool)
    .await
    .map_err(|e| constraint_violation(e, EMAIL_TAKEN, EMAIL_TAKEN))?;
    log::info!("User created: {} <{}>", user.id, user.email);
    Ok(user)
}

/// Column changes for a user; `None` leaves the column untouched.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pwd_hash: Option<String>,
}

pub async fn update(pool: &SqlitePool, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
    let mut query = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
    query.push_bind(now());
    if let Some(name) = changes.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(email) = changes.email {
        query.push(", email = ").push_bind(email);
    }
    if let Some(pwd_hash) = changes.pwd_hash {
        query.push(", pwd_hash = ").push_bind(pwd_hash);
    }
    query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

    let user = query
        .build_query_as::<User>()
        .fetch_optional(pool)
        .await
        .map_err(|e| constraint_violation(e, EMAIL_TAKEN, EMAIL_TAKEN))?;
    if let Some(user) = &user {
        log::info!("User updated: {}", user.id);
    }
    Ok(user)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() > 0 {
        log::info!("User with id {} deleted", id);
    }
    Ok(result.rows_affected() > 0)
}

pub async fn page(pool: &SqlitePool, params: PageParams) -> AppResult<Page<User>> {
    super::paginate(pool, "SELECT *", "FROM users", "id", params, |_| {}).await
}

/// Name or email containing `q`, or an id equal to `q`.
pub async fn search(pool: &SqlitePool, q: &str, params: PageParams) -> AppResult<Page<User>> {
    let pattern = like_pattern(q);
    let id: Option<i64> = q.trim().parse().ok();
    super::paginate(pool, "SELECT *", "FROM users", "id", params, |qb| {
        qb.push(" WHERE (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" OR id = ")
            .push_bind(id)
            .push(")");
    })
    .await
}
