use actix_web::{delete, get, post, route, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::Actor,
    errors::AppError,
    services::{
        accounts::{self, AccountPatch, NewAccount, UserSearchQuery},
        orders,
    },
    AppState,
};

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[get("/users/search")]
pub async fn search_handler(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<UserSearchQuery>,
) -> Result<impl Responder, AppError> {
    let users = accounts::search(&state.db_pool, &actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/users")]
pub async fn index_handler(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, AppError> {
    let users = accounts::list(&state.db_pool, &actor, query.page).await?;
    Ok(HttpResponse::Ok().json(users))
}

#[post("/users")]
pub async fn store_handler(
    state: web::Data<AppState>,
    actor: Actor,
    web::Json(account): web::Json<NewAccount>,
) -> Result<impl Responder, AppError> {
    let user = accounts::create(&state.db_pool, &actor, account).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully.",
        "user": user,
    })))
}

#[get("/users/{id}")]
pub async fn show_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let user = accounts::get(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[route("/users/{id}", method = "PUT", method = "PATCH")]
pub async fn update_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
    web::Json(patch): web::Json<AccountPatch>,
) -> Result<impl Responder, AppError> {
    let user = accounts::update(&state.db_pool, &actor, id.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "User updated successfully.",
        "user": user,
    })))
}

#[delete("/users/{id}")]
pub async fn destroy_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    accounts::delete(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully." })))
}

#[get("/users/{id}/orders")]
pub async fn orders_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let orders = orders::list_by_user(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(orders))
}
