use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::{
    errors::{constraint_violation, AppResult},
    structs::{Page, PageParams, Plant, PlantFamily, PlantFamilyRow, PlantWithFamily},
    utils::{like_pattern, now},
};

const UNKNOWN_FAMILY: &str = "The selected plant family is invalid.";
const PLANT_IN_USE: &str = "The plant is referenced by existing orders.";

const SELECT_WITH_FAMILY: &str = "SELECT p.id, p.name, p.price, p.stock, p.plant_family_id, \
     p.created_at, p.updated_at, f.name AS family_name, \
     f.scientific_name AS family_scientific_name, f.description AS family_description, \
     f.created_at AS family_created_at, f.updated_at AS family_updated_at";

const FROM_WITH_FAMILY: &str =
    "FROM plants p JOIN plant_families f ON f.id = p.plant_family_id WHERE 1 = 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlantFilter {
    pub family: Option<i64>,
    pub sort: Option<PriceOrder>,
}

pub async fn list(
    pool: &SqlitePool,
    filter: PlantFilter,
    params: PageParams,
) -> AppResult<Page<PlantWithFamily>> {
    let order_by = match filter.sort {
        Some(PriceOrder::Asc) => "p.price ASC, p.id",
        Some(PriceOrder::Desc) => "p.price DESC, p.id",
        None => "p.id",
    };
    let page = super::paginate::<PlantFamilyRow, _>(
        pool,
        SELECT_WITH_FAMILY,
        FROM_WITH_FAMILY,
        order_by,
        params,
        |qb| {
            if let Some(family) = filter.family {
                qb.push(" AND p.plant_family_id = ").push_bind(family);
            }
        },
    )
    .await?;
    Ok(page.map(PlantWithFamily::from))
}

/// Name or family name containing `q`, or a price equal to `q`, optionally
/// narrowed to one family. An absent or empty `q` matches every plant.
pub async fn search(
    pool: &SqlitePool,
    q: Option<&str>,
    family: Option<i64>,
    params: PageParams,
) -> AppResult<Page<PlantWithFamily>> {
    let q = q.filter(|q| !q.is_empty());
    let pattern = q.map(like_pattern);
    let price: Option<f64> = q.and_then(|q| q.trim().parse().ok());
    let page = super::paginate::<PlantFamilyRow, _>(
        pool,
        SELECT_WITH_FAMILY,
        FROM_WITH_FAMILY,
        "p.id",
        params,
        |qb| {
            if let Some(pattern) = &pattern {
                qb.push(" AND (p.name LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.price = ")
                    .push_bind(price)
                    .push(" OR f.name LIKE ")
                    .push_bind(pattern.clone())
                    .push(")");
            }
            if let Some(family) = family {
                qb.push(" AND p.plant_family_id = ").push_bind(family);
            }
        },
    )
    .await?;
    Ok(page.map(PlantWithFamily::from))
}

pub async fn find<'e, E>(executor: E, id: i64) -> AppResult<Option<Plant>>
where
    E: SqliteExecutor<'e>,
{
    let plant = sqlx::query_as::<_, Plant>("SELECT * FROM plants WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(plant)
}

pub async fn find_with_family(pool: &SqlitePool, id: i64) -> AppResult<Option<PlantWithFamily>> {
    let query = format!("{SELECT_WITH_FAMILY} {FROM_WITH_FAMILY} AND p.id = $1");
    let row = sqlx::query_as::<_, PlantFamilyRow>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(PlantWithFamily::from))
}

pub async fn insert(
    pool: &SqlitePool,
    name: &str,
    price: f64,
    stock: i64,
    plant_family_id: i64,
) -> AppResult<Plant> {
    let created_at = now();
    let plant = sqlx::query_as::<_, Plant>(
        "INSERT INTO plants (name, price, stock, plant_family_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .bind(plant_family_id)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(pool)
    .await
    .map_err(|e| constraint_violation(e, UNKNOWN_FAMILY, UNKNOWN_FAMILY))?;
    log::info!("Plant created: {} ({})", plant.id, plant.name);
    Ok(plant)
}

#[derive(Debug, Default, Clone)]
pub struct PlantChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub plant_family_id: Option<i64>,
}

pub async fn update(pool: &SqlitePool, id: i64, changes: PlantChanges) -> AppResult<Option<Plant>> {
    let mut query = QueryBuilder::<Sqlite>::new("UPDATE plants SET updated_at = ");
    query.push_bind(now());
    if let Some(name) = changes.name {
        query.push(", name = ").push_bind(name);
    }
    if let Some(price) = changes.price {
        query.push(", price = ").push_bind(price);
    }
    if let Some(stock) = changes.stock {
        query.push(", stock = ").push_bind(stock);
    }
    if let Some(family) = changes.plant_family_id {
        query.push(", plant_family_id = ").push_bind(family);
    }
    query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

    let plant = query
        .build_query_as::<Plant>()
        .fetch_optional(pool)
        .await
        .map_err(|e| constraint_violation(e, UNKNOWN_FAMILY, UNKNOWN_FAMILY))?;
    if let Some(plant) = &plant {
        log::info!("Plant updated: {}", plant.id);
    }
    Ok(plant)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let result = sqlx::query("DELETE FROM plants WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| constraint_violation(e, PLANT_IN_USE, PLANT_IN_USE))?;
    if result.rows_affected() > 0 {
        log::info!("Plant with id {} deleted", id);
    }
    Ok(result.rows_affected() > 0)
}

/// Takes `amount` units out of stock only if that many are available.
/// Returns `false` when the guard fails, leaving the row untouched.
pub async fn decrement_stock(conn: &mut SqliteConnection, id: i64, amount: i64) -> AppResult<bool> {
    let result = sqlx::query(
        "UPDATE plants SET stock = stock - $1, updated_at = $2 WHERE id = $3 AND stock >= $4",
    )
    .bind(amount)
    .bind(now())
    .bind(id)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn families(pool: &SqlitePool) -> AppResult<Vec<PlantFamily>> {
    let families = sqlx::query_as::<_, PlantFamily>("SELECT * FROM plant_families ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(families)
}

pub async fn insert_family(
    pool: &SqlitePool,
    name: &str,
    scientific_name: Option<&str>,
    description: Option<&str>,
) -> AppResult<PlantFamily> {
    let created_at = now();
    let family = sqlx::query_as::<_, PlantFamily>(
        "INSERT INTO plant_families (name, scientific_name, description, created_at, updated_at) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(name)
    .bind(scientific_name)
    .bind(description)
    .bind(&created_at)
    .bind(&created_at)
    .fetch_one(pool)
    .await?;
    Ok(family)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::AppError, structs::Role, test_support::memory_pool};

    async fn catalog(pool: &SqlitePool) -> (PlantFamily, PlantFamily) {
        let roses = insert_family(pool, "Rosaceae", Some("Rosaceae"), None)
            .await
            .unwrap();
        let aroids = insert_family(pool, "Araceae", None, Some("Aroids"))
            .await
            .unwrap();
        insert(pool, "Rose Bush", 12.5, 4, roses.id).await.unwrap();
        insert(pool, "Monstera", 30.0, 2, aroids.id).await.unwrap();
        insert(pool, "Anthurium", 8.0, 9, aroids.id).await.unwrap();
        (roses, aroids)
    }

    #[actix_web::test]
    async fn list_filters_by_family_and_sorts_by_price() {
        let pool = memory_pool().await;
        let (_, aroids) = catalog(&pool).await;

        let filter = PlantFilter {
            family: Some(aroids.id),
            sort: Some(PriceOrder::Desc),
        };
        let page = list(&pool, filter, PageParams::default()).await.unwrap();
        let names: Vec<_> = page.data.iter().map(|p| p.plant.name.as_str()).collect();
        assert_eq!(names, ["Monstera", "Anthurium"]);
        assert!(page.data.iter().all(|p| p.plant_family.name == "Araceae"));

        let filter = PlantFilter {
            family: None,
            sort: Some(PriceOrder::Asc),
        };
        let page = list(&pool, filter, PageParams::new(Some(1), Some(2)).unwrap())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data[0].plant.name, "Anthurium");
    }

    #[actix_web::test]
    async fn search_matches_name_price_or_family_name() {
        let pool = memory_pool().await;
        let (roses, aroids) = catalog(&pool).await;

        let page = search(&pool, Some("Rose"), None, PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].plant.name, "Rose Bush");

        let page = search(&pool, Some("Araceae"), None, PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);

        let page = search(&pool, Some("30"), None, PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].plant.name, "Monstera");

        let page = search(&pool, Some("Rose"), Some(aroids.id), PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        let page = search(&pool, None, Some(roses.id), PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[actix_web::test]
    async fn unknown_family_is_rejected() {
        let pool = memory_pool().await;
        let err = insert(&pool, "Orphan", 1.0, 1, 42).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == UNKNOWN_FAMILY));
    }

    #[actix_web::test]
    async fn decrement_never_goes_below_zero() {
        let pool = memory_pool().await;
        catalog(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        assert!(decrement_stock(&mut conn, 2, 2).await.unwrap());
        assert!(!decrement_stock(&mut conn, 2, 1).await.unwrap());
        let plant = find(&mut *conn, 2).await.unwrap().unwrap();
        assert_eq!(plant.stock, 0);
    }

    #[actix_web::test]
    async fn plants_on_order_lines_cannot_be_deleted() {
        let pool = memory_pool().await;
        catalog(&pool).await;
        let user = crate::db::users::insert(&pool, "Ana", "ana@example.com", "h", Role::User)
            .await
            .unwrap();
        let stamp = now();
        let order_id: i64 = sqlx::query_scalar(
            "INSERT INTO orders (user_id, order_date, total_price, address, city, country, \
             phone_number, created_at, updated_at) \
             VALUES ($1, $2, 30.0, 'Calle Mayor 1', 'Madrid', 'ES', '600123123', $2, $2) \
             RETURNING id",
        )
        .bind(user.id)
        .bind(&stamp)
        .fetch_one(&pool)
        .await
        .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        crate::db::orders::insert_line(&mut conn, order_id, 2, 1, 30.0)
            .await
            .unwrap();
        drop(conn);

        let err = delete(&pool, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == PLANT_IN_USE));
        assert!(find(&pool, 2).await.unwrap().is_some());

        assert!(delete(&pool, 1).await.unwrap());
        assert!(!delete(&pool, 1).await.unwrap());
    }
}
