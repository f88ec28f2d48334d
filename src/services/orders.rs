use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::Actor,
    db::{self, orders::NewOrder},
    errors::{AppError, AppResult},
    structs::{Order, OrderStatus, OrderWithPlants, Page, PageParams, User},
};

#[derive(Deserialize, Debug, Clone)]
pub struct LineItem {
    pub id: i64,
    pub quantity: i64,
    pub price: f64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlaceOrder {
    pub total_price: f64,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone_number: String,
    pub plants: Vec<LineItem>,
}

impl PlaceOrder {
    fn validate(&self) -> AppResult<()> {
        if !self.total_price.is_finite() || self.total_price < 0.0 {
            return Err(AppError::validation("The total price must be at least 0."));
        }
        for (field, value) in [
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
            ("phone number", &self.phone_number),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("The {field} field is required.")));
            }
            if value.len() > 255 {
                return Err(AppError::validation(format!(
                    "The {field} may not be greater than 255 characters."
                )));
            }
        }
        if self.plants.is_empty() {
            return Err(AppError::validation("The plants field is required."));
        }
        for line in &self.plants {
            if line.quantity < 1 {
                return Err(AppError::validation("The quantity must be at least 1."));
            }
            if !line.price.is_finite() || line.price < 0.0 {
                return Err(AppError::validation("The price must be at least 0."));
            }
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct OrderSearchQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
}

/// Places an order for `actor`. The order row, every line and every stock
/// decrement commit together or not at all.
pub async fn create(pool: &SqlitePool, actor: &Actor, request: PlaceOrder) -> AppResult<i64> {
    request.validate()?;

    let mut tx = pool.begin().await.map_err(AppError::Transaction)?;
    match place(&mut tx, actor.id, &request).await {
        Ok(order_id) => {
            tx.commit().await.map_err(AppError::Transaction)?;
            log::info!(
                "Order {} placed by user {} with {} line(s)",
                order_id,
                actor.id,
                request.plants.len()
            );
            Ok(order_id)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                log::error!("Failed to roll back order placement: {}", rollback);
            }
            log::warn!("Order placement by user {} rolled back: {}", actor.id, err);
            Err(match err {
                AppError::Database(e) => AppError::Transaction(e),
                other => other,
            })
        }
    }
}

async fn place(conn: &mut SqliteConnection, user_id: i64, request: &PlaceOrder) -> AppResult<i64> {
    let order_id = db::orders::insert(
        conn,
        &NewOrder {
            user_id,
            total_price: request.total_price,
            address: request.address.trim(),
            city: request.city.trim(),
            country: request.country.trim(),
            phone_number: request.phone_number.trim(),
        },
    )
    .await?;

    for line in &request.plants {
        let plant = db::plants::find(&mut *conn, line.id)
            .await?
            .ok_or(AppError::NotFound("Plant"))?;
        if plant.stock < line.quantity {
            return Err(AppError::InsufficientStock(plant.name));
        }
        db::orders::insert_line(conn, order_id, plant.id, line.quantity, line.price).await?;
        // The guarded update also covers stock that moved since the read above.
        if !db::plants::decrement_stock(conn, plant.id, line.quantity).await? {
            return Err(AppError::InsufficientStock(plant.name));
        }
    }

    Ok(order_id)
}

pub async fn list(
    pool: &SqlitePool,
    actor: &Actor,
    page: Option<i64>,
) -> AppResult<Page<OrderWithPlants>> {
    actor.require_admin()?;
    db::orders::page(pool, PageParams::new(page, None)?).await
}

pub async fn get(pool: &SqlitePool, actor: &Actor, id: i64) -> AppResult<OrderWithPlants> {
    let order = db::orders::find_with_plants(pool, id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    actor.authorize(order.order.user_id)?;
    Ok(order)
}

/// Overwrites the status with any of the enumerated values. Transitions are
/// not constrained, so `delivered` may go back to `pending`.
pub async fn update_status(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    update: StatusUpdate,
) -> AppResult<Order> {
    actor.require_admin()?;
    let status: OrderStatus = update.status.parse()?;
    db::orders::update_status(pool, id, status)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

pub async fn delete(pool: &SqlitePool, actor: &Actor, id: i64) -> AppResult<()> {
    let order = db::orders::find(pool, id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    actor.authorize(order.user_id)?;
    if db::orders::delete(pool, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Order"))
    }
}

/// Only the owner may list their orders. Admins get no exception here.
pub async fn list_by_user(
    pool: &SqlitePool,
    actor: &Actor,
    user_id: i64,
) -> AppResult<Vec<OrderWithPlants>> {
    actor.require_self(user_id)?;
    db::orders::by_user(pool, user_id).await
}

// TODO: apply `actor.authorize(order.user_id)` here; right now any signed-in
// caller can resolve the owner of any order.
pub async fn owner(pool: &SqlitePool, _actor: &Actor, order_id: i64) -> AppResult<User> {
    db::orders::owner(pool, order_id)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

pub async fn search(
    pool: &SqlitePool,
    actor: &Actor,
    query: OrderSearchQuery,
) -> AppResult<Page<OrderWithPlants>> {
    actor.require_admin()?;
    let params = PageParams::new(query.page, None)?;
    db::orders::search(pool, query.q.as_deref().unwrap_or(""), params).await
}
