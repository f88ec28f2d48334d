use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode},
    QueryBuilder, Sqlite, SqlitePool,
};

use crate::{
    errors::AppResult,
    structs::{Page, PageParams},
};

pub mod orders;
pub mod plants;
pub mod seed;
pub mod users;

pub async fn connect(database_url: &str) -> AppResult<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .read_only(false)
        .busy_timeout(Duration::from_secs(5));

    let db_pool = SqlitePool::connect_with(opts).await?;
    migrate(&db_pool).await?;
    log::info!("Database migrated successfully");
    Ok(db_pool)
}

pub async fn migrate(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!().run(pool).await?;
    Ok(())
}

/// Runs a filtered listing twice: once as `COUNT(*)` and once for the
/// requested page. `from` is everything from `FROM` up to (not including)
/// the `WHERE`; `filter` appends the conditions to both builders.
pub(crate) async fn paginate<T, F>(
    pool: &SqlitePool,
    select: &str,
    from: &str,
    order_by: &str,
    params: PageParams,
    filter: F,
) -> AppResult<Page<T>>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    F: Fn(&mut QueryBuilder<'_, Sqlite>),
{
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) ");
    count.push(from);
    filter(&mut count);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Sqlite>::new(select);
    query.push(" ");
    query.push(from);
    filter(&mut query);
    query.push(" ORDER BY ");
    query.push(order_by);
    query.push(" LIMIT ");
    query.push_bind(params.per_page);
    query.push(" OFFSET ");
    query.push_bind(params.offset());
    let rows: Vec<T> = query.build_query_as().fetch_all(pool).await?;

    Ok(Page::new(rows, params, total))
}
