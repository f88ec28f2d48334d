use actix_web::{delete, get, post, route, web, HttpResponse, Responder};

use crate::{
    auth::Actor,
    errors::AppError,
    services::catalog::{self, PlantInput, PlantListQuery, PlantSearchQuery},
    AppState,
};

#[get("/plant-families")]
pub async fn families_handler(
    state: web::Data<AppState>,
    actor: Actor,
) -> Result<impl Responder, AppError> {
    let families = catalog::families(&state.db_pool, &actor).await?;
    Ok(HttpResponse::Ok().json(families))
}

#[get("/plants/search")]
pub async fn search_handler(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<PlantSearchQuery>,
) -> Result<impl Responder, AppError> {
    let plants = catalog::search(&state.db_pool, &actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(plants))
}

/// `?family=<id>&sortBy=priceAsc|priceDesc&perPage=<n>&page=<n>`
#[get("/plants")]
pub async fn index_handler(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<PlantListQuery>,
) -> Result<impl Responder, AppError> {
    let plants = catalog::list(&state.db_pool, &actor, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(plants))
}

#[post("/plants")]
pub async fn store_handler(
    state: web::Data<AppState>,
    actor: Actor,
    web::Json(input): web::Json<PlantInput>,
) -> Result<impl Responder, AppError> {
    let plant = catalog::create(&state.db_pool, &actor, input).await?;
    Ok(HttpResponse::Created().json(plant))
}

#[get("/plants/{id}")]
pub async fn show_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let plant = catalog::get(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(plant))
}

#[route("/plants/{id}", method = "PUT", method = "PATCH")]
pub async fn update_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
    web::Json(input): web::Json<PlantInput>,
) -> Result<impl Responder, AppError> {
    let plant = catalog::update(&state.db_pool, &actor, id.into_inner(), input).await?;
    Ok(HttpResponse::Ok().json(plant))
}

#[delete("/plants/{id}")]
pub async fn destroy_handler(
    state: web::Data<AppState>,
    actor: Actor,
    id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    catalog::delete(&state.db_pool, &actor, id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
