use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::Actor,
    db::{self, users::UserChanges},
    errors::{AppError, AppResult},
    structs::{Page, PageParams, Role, User},
    utils::{hash_password, verify_password},
};

const MIN_PASSWORD: usize = 8;
const MAX_PASSWORD: usize = 128;

#[derive(Deserialize, Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

/// Partial account update. `null` and `""` both mean "not supplied", so a
/// field can never be blanked through this payload.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct UserSearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("The name field is required."));
    }
    if name.len() > 255 {
        return Err(AppError::validation(
            "The name may not be greater than 255 characters.",
        ));
    }
    Ok(())
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("The email field is required."));
    }
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty())
        .unwrap_or(false);
    if !valid || email.len() > 255 {
        return Err(AppError::validation("The email must be a valid email address."));
    }
    Ok(email)
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD {
        return Err(AppError::validation(format!(
            "The password must be at least {MIN_PASSWORD} characters."
        )));
    }
    if password.len() > MAX_PASSWORD {
        return Err(AppError::validation(format!(
            "The password may not be greater than {MAX_PASSWORD} characters."
        )));
    }
    Ok(())
}

fn supplied(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn list(pool: &SqlitePool, actor: &Actor, page: Option<i64>) -> AppResult<Page<User>> {
    actor.require_admin()?;
    db::users::page(pool, PageParams::new(page, None)?).await
}

/// Admin-created account; the role defaults to `user`.
pub async fn create(pool: &SqlitePool, actor: &Actor, account: NewAccount) -> AppResult<User> {
    actor.require_admin()?;
    insert_account(pool, account).await
}

/// Self-service sign-up. Always produces a `user`-role account.
pub async fn register(pool: &SqlitePool, account: NewAccount) -> AppResult<User> {
    insert_account(
        pool,
        NewAccount {
            role: None,
            ..account
        },
    )
    .await
}

async fn insert_account(pool: &SqlitePool, account: NewAccount) -> AppResult<User> {
    validate_name(&account.name)?;
    let email = normalize_email(&account.email)?;
    validate_password(&account.password)?;
    let pwd_hash = hash_password(&account.password)?;
    db::users::insert(
        pool,
        account.name.trim(),
        &email,
        &pwd_hash,
        account.role.unwrap_or(Role::User),
    )
    .await
}

pub async fn get(pool: &SqlitePool, actor: &Actor, id: i64) -> AppResult<User> {
    actor.require_admin()?;
    db::users::find(pool, id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn update(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    patch: AccountPatch,
) -> AppResult<User> {
    let user = db::users::find(pool, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    actor.authorize(user.id)?;

    let mut changes = UserChanges::default();
    if let Some(name) = supplied(patch.name) {
        validate_name(&name)?;
        changes.name = Some(name.trim().to_owned());
    }
    if let Some(email) = supplied(patch.email) {
        changes.email = Some(normalize_email(&email)?);
    }
    if let Some(password) = supplied(patch.password) {
        validate_password(&password)?;
        changes.pwd_hash = Some(hash_password(&password)?);
    }

    db::users::update(pool, id, changes)
        .await?
        .ok_or(AppError::NotFound("User"))
}

pub async fn delete(pool: &SqlitePool, actor: &Actor, id: i64) -> AppResult<()> {
    let user = db::users::find(pool, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    actor.authorize(user.id)?;
    if db::users::delete(pool, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("User"))
    }
}

pub async fn search(
    pool: &SqlitePool,
    actor: &Actor,
    query: UserSearchQuery,
) -> AppResult<Page<User>> {
    actor.require_admin()?;
    let params = PageParams::new(query.page, None)?;
    db::users::search(pool, query.q.as_deref().unwrap_or(""), params).await
}

/// Verifies an email/password pair. Unknown emails and wrong passwords are
/// indistinguishable to the caller.
pub async fn authenticate(pool: &SqlitePool, credentials: Credentials) -> AppResult<User> {
    let email = credentials.email.trim().to_lowercase();
    if email.is_empty() || credentials.password.is_empty() {
        return Err(AppError::validation("All fields are required"));
    }
    let Some(user) = db::users::find_by_email(pool, &email).await? else {
        return Err(AppError::InvalidCredentials);
    };
    if verify_password(&credentials.password, &user.pwd_hash)? {
        Ok(user)
    } else {
        log::warn!("Failed login for user ID: {}", user.id);
        Err(AppError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, memory_pool};

    fn account(name: &str, email: &str) -> NewAccount {
        NewAccount {
            name: name.into(),
            email: email.into(),
            password: "12341234".into(),
            role: None,
        }
    }

    #[actix_web::test]
    async fn admin_creates_accounts_with_default_role() {
        let pool = memory_pool().await;
        let admin = actor(1, Role::Admin);

        let user = create(&pool, &admin, account("Ana", "Ana@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.email, "ana@example.com");
        assert!(verify_password("12341234", &user.pwd_hash).unwrap());

        let customer = actor(user.id, Role::User);
        assert!(matches!(
            create(&pool, &customer, account("Eve", "eve@example.com")).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(list(&pool, &customer, None).await, Err(AppError::Forbidden)));
        assert!(matches!(get(&pool, &customer, user.id).await, Err(AppError::Forbidden)));
    }

    #[actix_web::test]
    async fn register_ignores_requested_role() {
        let pool = memory_pool().await;
        let mut wants_admin = account("Mallory", "mallory@example.com");
        wants_admin.role = Some(Role::Admin);
        let user = register(&pool, wants_admin).await.unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[actix_web::test]
    async fn update_skips_blank_and_null_fields() {
        let pool = memory_pool().await;
        let user = register(&pool, account("Ana", "ana@example.com"))
            .await
            .unwrap();
        let me = actor(user.id, Role::User);

        let patch = AccountPatch {
            name: Some(String::new()),
            email: None,
            password: Some("a-brand-new-secret".into()),
        };
        let updated = update(&pool, &me, user.id, patch).await.unwrap();
        assert_eq!(updated.name, "Ana");
        assert_eq!(updated.email, "ana@example.com");
        assert!(verify_password("a-brand-new-secret", &updated.pwd_hash).unwrap());
    }

    #[actix_web::test]
    async fn only_self_or_admin_may_mutate() {
        let pool = memory_pool().await;
        let ana = register(&pool, account("Ana", "ana@example.com"))
            .await
            .unwrap();
        let eve = register(&pool, account("Eve", "eve@example.com"))
            .await
            .unwrap();
        let eve_actor = actor(eve.id, Role::User);

        let patch = AccountPatch {
            name: Some("Hacked".into()),
            ..Default::default()
        };
        assert!(matches!(
            update(&pool, &eve_actor, ana.id, patch).await,
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            delete(&pool, &eve_actor, ana.id).await,
            Err(AppError::Forbidden)
        ));
        let unchanged = db::users::find(&pool, ana.id).await.unwrap().unwrap();
        assert_eq!(unchanged, ana);

        let admin = actor(999, Role::Admin);
        delete(&pool, &admin, ana.id).await.unwrap();
        assert!(matches!(
            delete(&pool, &admin, ana.id).await,
            Err(AppError::NotFound("User"))
        ));
    }

    #[actix_web::test]
    async fn repeated_reads_return_the_same_user() {
        let pool = memory_pool().await;
        let user = register(&pool, account("Ana", "ana@example.com"))
            .await
            .unwrap();
        let admin = actor(user.id + 1, Role::Admin);

        let first = get(&pool, &admin, user.id).await.unwrap();
        let second = get(&pool, &admin, user.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, user);
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[actix_web::test]
    async fn authenticate_checks_password() {
        let pool = memory_pool().await;
        register(&pool, account("Ana", "ana@example.com"))
            .await
            .unwrap();

        let ok = authenticate(
            &pool,
            Credentials {
                email: "ANA@example.com".into(),
                password: "12341234".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.name, "Ana");

        for (email, password) in [("ana@example.com", "wrong-pass"), ("nobody@example.com", "12341234")] {
            let err = authenticate(
                &pool,
                Credentials {
                    email: email.into(),
                    password: password.into(),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
    }

    #[test]
    fn email_and_password_rules() {
        assert_eq!(normalize_email(" A@B.io ").unwrap(), "a@b.io");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@b.io").is_err());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"x".repeat(129)).is_err());
        assert!(validate_password("12341234").is_ok());
    }
}
