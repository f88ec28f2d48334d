use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    auth::Actor,
    db::{
        self,
        plants::{PlantChanges, PlantFilter, PriceOrder},
    },
    errors::{AppError, AppResult},
    structs::{Page, PageParams, Plant, PlantFamily, PlantWithFamily},
};

#[derive(Deserialize, Debug, Default)]
pub struct PlantListQuery {
    pub family: Option<i64>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "perPage")]
    pub per_page: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PlantSearchQuery {
    pub q: Option<String>,
    pub family: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct PlantInput {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub plant_family_id: Option<i64>,
}

impl PlantInput {
    /// Checks whatever fields are present. With `require_all`, every field
    /// must be present as well.
    fn validate(self, require_all: bool) -> AppResult<PlantChanges> {
        if require_all {
            let missing = [
                ("name", self.name.is_none()),
                ("price", self.price.is_none()),
                ("stock", self.stock.is_none()),
                ("plant_family_id", self.plant_family_id.is_none()),
            ];
            if let Some((field, _)) = missing.iter().find(|(_, absent)| *absent) {
                return Err(AppError::validation(format!("The {field} field is required.")));
            }
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("The name field is required."));
            }
            if name.len() > 255 {
                return Err(AppError::validation(
                    "The name may not be greater than 255 characters.",
                ));
            }
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(AppError::validation("The price must be at least 0."));
            }
        }
        if matches!(self.stock, Some(stock) if stock < 0) {
            return Err(AppError::validation("The stock must be at least 0."));
        }
        Ok(PlantChanges {
            name: self.name.map(|n| n.trim().to_owned()),
            price: self.price,
            stock: self.stock,
            plant_family_id: self.plant_family_id,
        })
    }
}

fn parse_sort(sort_by: Option<&str>) -> Option<PriceOrder> {
    match sort_by {
        Some("priceAsc") => Some(PriceOrder::Asc),
        Some("priceDesc") => Some(PriceOrder::Desc),
        _ => None,
    }
}

/// Any signed-in caller may browse the catalog. Unknown `sortBy` values
/// fall back to the default ordering.
pub async fn list(
    pool: &SqlitePool,
    _actor: &Actor,
    query: PlantListQuery,
) -> AppResult<Page<PlantWithFamily>> {
    let params = PageParams::new(query.page, query.per_page)?;
    let filter = PlantFilter {
        family: query.family,
        sort: parse_sort(query.sort_by.as_deref()),
    };
    db::plants::list(pool, filter, params).await
}

pub async fn create(pool: &SqlitePool, actor: &Actor, input: PlantInput) -> AppResult<Plant> {
    actor.require_admin()?;
    let changes = input.validate(true)?;
    match changes {
        PlantChanges {
            name: Some(name),
            price: Some(price),
            stock: Some(stock),
            plant_family_id: Some(family),
        } => db::plants::insert(pool, &name, price, stock, family).await,
        _ => Err(AppError::validation("All fields are required.")),
    }
}

pub async fn get(pool: &SqlitePool, actor: &Actor, id: i64) -> AppResult<PlantWithFamily> {
    actor.require_admin()?;
    db::plants::find_with_family(pool, id)
        .await?
        .ok_or(AppError::NotFound("Plant"))
}

pub async fn update(
    pool: &SqlitePool,
    actor: &Actor,
    id: i64,
    input: PlantInput,
) -> AppResult<Plant> {
    actor.require_admin()?;
    let changes = input.validate(false)?;
    db::plants::update(pool, id, changes)
        .await?
        .ok_or(AppError::NotFound("Plant"))
}

pub async fn delete(pool: &SqlitePool, actor: &Actor, id: i64) -> AppResult<()> {
    actor.require_admin()?;
    if db::plants::delete(pool, id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Plant"))
    }
}

pub async fn search(
    pool: &SqlitePool,
    actor: &Actor,
    query: PlantSearchQuery,
) -> AppResult<Page<PlantWithFamily>> {
    actor.require_admin()?;
    let params = PageParams::new(query.page, None)?;
    db::plants::search(pool, query.q.as_deref(), query.family, params).await
}

pub async fn families(pool: &SqlitePool, actor: &Actor) -> AppResult<Vec<PlantFamily>> {
    actor.require_admin()?;
    db::plants::families(pool).await
}
