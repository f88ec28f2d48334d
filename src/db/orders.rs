use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    errors::AppResult,
    structs::{Order, OrderStatus, OrderWithPlants, OrderedPlant, Page, PageParams, User},
    utils::{like_pattern, now},
};

#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: i64,
    pub total_price: f64,
    pub address: &'a str,
    pub city: &'a str,
    pub country: &'a str,
    pub phone_number: &'a str,
}

pub async fn insert(conn: &mut SqliteConnection, order: &NewOrder<'_>) -> AppResult<i64> {
    let created_at = now();
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO orders (user_id, order_date, status, total_price, address, city, country, phone_number, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(order.user_id)
    .bind(&created_at)
    .bind(OrderStatus::Pending)
    .bind(order.total_price)
    .bind(order.address)
    .bind(order.city)
    .bind(order.country)
    .bind(order.phone_number)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn insert_line(
    conn: &mut SqliteConnection,
    order_id: i64,
    plant_id: i64,
    quantity: i64,
    price: f64,
) -> AppResult<()> {
    let created_at = now();
    sqlx::query(
        "INSERT INTO order_plant (order_id, plant_id, quantity, price, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(order_id)
    .bind(plant_id)
    .bind(quantity)
    .bind(price)
    .bind(&created_at)
    .bind(&created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(order)
}

pub async fn find_with_plants(pool: &SqlitePool, id: i64) -> AppResult<Option<OrderWithPlants>> {
    let Some(order) = find(pool, id).await? else {
        return Ok(None);
    };
    Ok(with_plants(pool, vec![order]).await?.pop())
}

pub async fn page(pool: &SqlitePool, params: PageParams) -> AppResult<Page<OrderWithPlants>> {
    let page = super::paginate::<Order, _>(pool, "SELECT *", "FROM orders", "id", params, |_| {})
        .await?;
    attach(pool, page).await
}

pub async fn by_user(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<OrderWithPlants>> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY id")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    with_plants(pool, orders).await
}

/// Status containing `q`, or an order placed on the calendar day `q`
/// (`YYYY-MM-DD`).
pub async fn search(
    pool: &SqlitePool,
    q: &str,
    params: PageParams,
) -> AppResult<Page<OrderWithPlants>> {
    let pattern = like_pattern(q);
    let day = NaiveDate::parse_from_str(q.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string());
    let page = super::paginate::<Order, _>(pool, "SELECT *", "FROM orders", "id", params, |qb| {
        qb.push(" WHERE (status LIKE ")
            .push_bind(pattern.clone())
            .push(" OR date(order_date) = ")
            .push_bind(day.clone())
            .push(")");
    })
    .await?;
    attach(pool, page).await
}

pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: OrderStatus,
) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *",
    )
    .bind(status)
    .bind(now())
    .bind(id)
    .fetch_optional(pool)
    .await?;
    if let Some(order) = &order {
        log::info!("Order {} status set to {}", order.id, order.status);
    }
    Ok(order)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() > 0 {
        log::info!("Order with id {} deleted", id);
    }
    Ok(result.rows_affected() > 0)
}

/// The user who placed `order_id`, or `None` when the order is absent.
pub async fn owner(pool: &SqlitePool, order_id: i64) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u JOIN orders o ON o.user_id = u.id WHERE o.id = $1",
    )
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

async fn attach(pool: &SqlitePool, page: Page<Order>) -> AppResult<Page<OrderWithPlants>> {
    let Page {
        current_page,
        data,
        per_page,
        total,
        last_page,
    } = page;
    Ok(Page {
        current_page,
        data: with_plants(pool, data).await?,
        per_page,
        total,
        last_page,
    })
}

/// Loads the line items for `orders` in one query and pairs them up,
/// keeping the input order.
async fn with_plants(pool: &SqlitePool, orders: Vec<Order>) -> AppResult<Vec<OrderWithPlants>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT p.id, p.name, p.price, p.stock, p.plant_family_id, \
         op.order_id AS pivot_order_id, op.quantity AS pivot_quantity, op.price AS pivot_price \
         FROM order_plant op JOIN plants p ON p.id = op.plant_id WHERE op.order_id IN (",
    );
    let mut ids = query.separated(", ");
    for order in &orders {
        ids.push_bind(order.id);
    }
    ids.push_unseparated(") ORDER BY op.id");
    let lines: Vec<OrderedPlant> = query.build_query_as().fetch_all(pool).await?;

    let mut by_order: HashMap<i64, Vec<OrderedPlant>> = HashMap::new();
    for line in lines {
        by_order.entry(line.pivot.order_id).or_default().push(line);
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderWithPlants {
            plants: by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, structs::Role, test_support::memory_pool};

    async fn seed_order(pool: &SqlitePool) -> (i64, i64) {
        let user = db::users::insert(pool, "Ana", "ana@example.com", "h", Role::User)
            .await
            .unwrap();
        let family = db::plants::insert_family(pool, "Cactaceae", None, None)
            .await
            .unwrap();
        let plant = db::plants::insert(pool, "Saguaro", 15.0, 10, family.id)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let new_order = NewOrder {
            user_id: user.id,
            total_price: 30.0,
            address: "Calle 1",
            city: "Sevilla",
            country: "ES",
            phone_number: "600000000",
        };
        let order_id = insert(&mut conn, &new_order).await.unwrap();
        insert_line(&mut conn, order_id, plant.id, 2, 14.0)
            .await
            .unwrap();
        (user.id, order_id)
    }

    #[actix_web::test]
    async fn lines_carry_the_snapshot_price() {
        let pool = memory_pool().await;
        let (_, order_id) = seed_order(&pool).await;

        let order = find_with_plants(&pool, order_id).await.unwrap().unwrap();
        assert_eq!(order.order.status, OrderStatus::Pending);
        assert_eq!(order.plants.len(), 1);
        assert_eq!(order.plants[0].price, 15.0);
        assert_eq!(order.plants[0].pivot.price, 14.0);
        assert_eq!(order.plants[0].pivot.quantity, 2);
    }

    #[actix_web::test]
    async fn search_by_status_or_day() {
        let pool = memory_pool().await;
        let (_, order_id) = seed_order(&pool).await;

        let page = search(&pool, "pend", PageParams::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let page = search(&pool, &today, PageParams::default()).await.unwrap();
        assert_eq!(page.data[0].order.id, order_id);

        let page = search(&pool, "1999-01-01", PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[actix_web::test]
    async fn deleting_the_user_cascades_to_orders() {
        let pool = memory_pool().await;
        let (user_id, order_id) = seed_order(&pool).await;

        assert_eq!(owner(&pool, order_id).await.unwrap().unwrap().id, user_id);
        assert!(db::users::delete(&pool, user_id).await.unwrap());
        assert!(find(&pool, order_id).await.unwrap().is_none());
    }
}
