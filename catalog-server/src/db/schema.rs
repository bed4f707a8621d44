//! Products table bootstrap
//!
//! Only the local fallback store is bootstrapped automatically. Durable
//! candidates are expected to carry the table already.

use sqlx::AnyConnection;

use super::driver::Driver;

/// Create the products table when it doesn't exist yet.
pub async fn ensure_products_table(conn: &mut AnyConnection, driver: Driver) -> Result<(), sqlx::Error> {
    sqlx::query(driver.products_ddl()).execute(&mut *conn).await?;
    tracing::debug!(%driver, "products table ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Connection, Row};

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        sqlx::any::install_default_drivers();
        let mut conn = AnyConnection::connect("sqlite::memory:").await.unwrap();

        ensure_products_table(&mut conn, Driver::Sqlite).await.unwrap();
        ensure_products_table(&mut conn, Driver::Sqlite).await.unwrap();

        let row = sqlx::query("SELECT COUNT(*) AS n FROM products")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        assert_eq!(row.try_get::<i64, _>("n").unwrap(), 0);
    }
}
