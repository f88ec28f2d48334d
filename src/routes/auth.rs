use actix_identity::Identity;
use actix_web::{get, post, web, HttpMessage, HttpRequest, HttpResponse, Responder};
use serde_json::json;

use crate::{
    auth::Actor,
    errors::AppError,
    services::accounts::{self, Credentials, NewAccount},
    AppState,
};

/// Self-service sign-up; the new account is logged in straight away.
#[post("/register")]
pub async fn register_handler(
    state: web::Data<AppState>,
    web::Json(account): web::Json<NewAccount>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let user = accounts::register(&state.db_pool, account).await?;
    Identity::login(&request.extensions(), user.id.to_string())?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully.",
        "user": user,
    })))
}

#[post("/login")]
pub async fn login_handler(
    state: web::Data<AppState>,
    web::Json(credentials): web::Json<Credentials>,
    request: HttpRequest,
) -> Result<impl Responder, AppError> {
    let user = accounts::authenticate(&state.db_pool, credentials).await?;
    Identity::login(&request.extensions(), user.id.to_string())?;
    log::info!("User {} logged in", user.id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful.",
        "user": user,
    })))
}

#[post("/logout")]
pub async fn logout_handler(user: Option<Identity>) -> Result<impl Responder, AppError> {
    let user = user.ok_or(AppError::Unauthenticated)?;
    user.logout();
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out." })))
}

#[get("/user")]
pub async fn current_user_handler(actor: Actor) -> impl Responder {
    HttpResponse::Ok().json(actor)
}
