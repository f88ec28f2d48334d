use sqlx::SqlitePool;

use crate::{errors::AppResult, structs::Role, utils::hash_password};

const DEMO_PASSWORD: &str = "12341234";

/// Fills an empty database with two accounts and a starter catalog.
/// Does nothing once any user exists.
pub async fn run(pool: &SqlitePool) -> AppResult<bool> {
    if super::users::count(pool).await? > 0 {
        log::info!("Database already populated, skipping seed");
        return Ok(false);
    }

    let pwd_hash = hash_password(DEMO_PASSWORD)?;
    super::users::insert(pool, "User", "user@gmail.com", &pwd_hash, Role::User).await?;
    super::users::insert(pool, "Admin", "admin@gmail.com", &pwd_hash, Role::Admin).await?;

    let catalog: [(&str, &str, &str, &[(&str, f64, i64)]); 3] = [
        (
            "Cactus",
            "Cactaceae",
            "Succulents adapted to arid climates",
            &[("Echinocactus grusonii", 12.5, 20), ("Opuntia", 9.0, 35)],
        ),
        (
            "Aroids",
            "Araceae",
            "Tropical foliage plants",
            &[("Monstera deliciosa", 29.9, 12), ("Anthurium", 18.0, 8)],
        ),
        (
            "Roses",
            "Rosaceae",
            "Flowering shrubs",
            &[("Rose 'Peace'", 15.0, 25)],
        ),
    ];

    for (name, scientific_name, description, plants) in catalog {
        let family =
            super::plants::insert_family(pool, name, Some(scientific_name), Some(description))
                .await?;
        for &(plant, price, stock) in plants {
            super::plants::insert(pool, plant, price, stock, family.id).await?;
        }
    }

    log::info!("Seeded demo accounts and catalog");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, structs::PageParams, test_support::memory_pool, utils::verify_password};

    #[actix_web::test]
    async fn seeds_once() {
        let pool = memory_pool().await;
        assert!(run(&pool).await.unwrap());
        assert!(!run(&pool).await.unwrap());

        let admin = db::users::find_by_email(&pool, "admin@gmail.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(verify_password(DEMO_PASSWORD, &admin.pwd_hash).unwrap());

        let plants = db::plants::list(&pool, Default::default(), PageParams::default())
            .await
            .unwrap();
        assert_eq!(plants.total, 5);
    }
}
