use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::{
    auth::Actor,
    errors::AppError,
    services::orders::{self, OrderSearchQuery, PlaceOrder, StatusUpdate},
    AppState,
};

use super::users::PageQuery;

#[get("/orders/search")]
pub async fn search_handler(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<OrderSearchQuery>,
) -> Result<impl Responder, AppError> {
    let orders = orders::search(&state.db_pool, &actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[get("/orders")]
pub async fn index_handler(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, AppError> {
    let orders = orders::list(&state.db_pool, &actor, query.page).await?;
    Ok(HttpResponse::Ok().json(orders))
}

#[post("/orders")]
pub async fn store_handler(
    state: web::Data<AppState>,
    actor: Actor,
    web::Json(request): web::Json<PlaceOrder>,
) -> Result<impl Responder, AppError> {
    let order_id = orders::create(&state.db_pool, &actor, request).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Order placed successfully.",
        "order_id": order_id,
    })))
}

#[get("/orders/{id}")]
pub async fn show_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let order = orders::get(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[patch("/orders/{id}/status")]
pub async fn status_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
    web::Json(update): web::Json<StatusUpdate>,
) -> Result<impl Responder, AppError> {
    let order = orders::update_status(&state.db_pool, &actor, id.into_inner(), update).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Order status updated successfully.",
        "order": order,
    })))
}

#[delete("/orders/{id}")]
pub async fn destroy_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    orders::delete(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Order deleted successfully" })))
}

#[get("/orders/{id}/user")]
pub async fn owner_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let user = orders::owner(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}
