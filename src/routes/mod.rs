use actix_web::{
    http::Method,
    web::{self, ServiceConfig},
    HttpResponse, Responder,
};

use crate::errors::AppError;

pub mod auth;
pub mod orders;
pub mod plants;
pub mod users;

/// Registers every endpoint. Literal segments such as `/plants/search` are
/// registered ahead of the `{id}` routes they would otherwise collide with.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::validation(err.to_string()).into()),
    )
    .service(auth::register_handler)
    .service(auth::login_handler)
    .service(auth::logout_handler)
    .service(auth::current_user_handler)
    .service(plants::families_handler)
    .service(plants::search_handler)
    .service(plants::index_handler)
    .service(plants::store_handler)
    .service(plants::show_handler)
    .service(plants::update_handler)
    .service(plants::destroy_handler)
    .service(users::search_handler)
    .service(users::index_handler)
    .service(users::store_handler)
    .service(users::show_handler)
    .service(users::update_handler)
    .service(users::destroy_handler)
    .service(users::orders_handler)
    .service(orders::search_handler)
    .service(orders::index_handler)
    .service(orders::store_handler)
    .service(orders::show_handler)
    .service(orders::status_handler)
    .service(orders::destroy_handler)
    .service(orders::owner_handler);
}

pub async fn default_handler(req_method: Method) -> Result<impl Responder, AppError> {
    match req_method {
        Method::GET => Err(AppError::NotFound("Resource")),
        _ => Ok(HttpResponse::MethodNotAllowed().json(serde_json::json!({
            "error": "Method not allowed."
        }))),
    }
}
