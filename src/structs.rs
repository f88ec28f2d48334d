use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::errors::AppError;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(AppError::validation("The selected status is invalid.")),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub pwd_hash: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct PlantFamily {
    pub id: i64,
    pub name: String,
    pub scientific_name: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Plant {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub plant_family_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A plant with its family eagerly attached.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlantWithFamily {
    #[serde(flatten)]
    pub plant: Plant,
    pub plant_family: PlantFamily,
}

/// Flat row of `plants JOIN plant_families`, folded into [`PlantWithFamily`].
#[derive(Debug, FromRow)]
pub struct PlantFamilyRow {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub plant_family_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub family_name: String,
    pub family_scientific_name: Option<String>,
    pub family_description: Option<String>,
    pub family_created_at: String,
    pub family_updated_at: String,
}

impl From<PlantFamilyRow> for PlantWithFamily {
    fn from(row: PlantFamilyRow) -> Self {
        PlantWithFamily {
            plant_family: PlantFamily {
                id: row.plant_family_id,
                name: row.family_name,
                scientific_name: row.family_scientific_name,
                description: row.family_description,
                created_at: row.family_created_at,
                updated_at: row.family_updated_at,
            },
            plant: Plant {
                id: row.id,
                name: row.name,
                price: row.price,
                stock: row.stock,
                plant_family_id: row.plant_family_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub order_date: String,
    pub status: OrderStatus,
    pub total_price: f64,
    pub address: String,
    pub city: String,
    pub country: String,
    pub phone_number: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Quantity and snapshot price recorded on the `order_plant` line.
#[derive(Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct Pivot {
    #[serde(skip_serializing)]
    #[sqlx(rename = "pivot_order_id")]
    pub order_id: i64,
    #[sqlx(rename = "pivot_quantity")]
    pub quantity: i64,
    #[sqlx(rename = "pivot_price")]
    pub price: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq, FromRow)]
pub struct OrderedPlant {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub plant_family_id: i64,
    #[sqlx(flatten)]
    pub pivot: Pivot,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OrderWithPlants {
    #[serde(flatten)]
    pub order: Order,
    pub plants: Vec<OrderedPlant>,
}

/// One page of a listing, shaped like the store's frontend expects.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub current_page: i64,
    pub data: Vec<T>,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, params: PageParams, total: i64) -> Self {
        let last_page = ((total + params.per_page - 1) / params.per_page).max(1);
        Page {
            current_page: params.page,
            data,
            per_page: params.per_page,
            total,
            last_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            current_page: self.current_page,
            data: self.data.into_iter().map(f).collect(),
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
        }
    }
}

pub const DEFAULT_PER_PAGE: i64 = 8;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub per_page: i64,
}

impl PageParams {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::validation("The page must be at least 1."));
        }
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(AppError::validation(format!(
                "The per page value must be between 1 and {MAX_PER_PAGE}."
            )));
        }
        Ok(PageParams { page, per_page })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}
