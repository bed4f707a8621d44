//! Product repository
//!
//! Five operations over one borrowed connection:
//! - create: INSERT, then re-read by generated id
//! - get_all / get_by_id: plain SELECTs, absence is `None` or empty
//! - update: full replace, `false` when no row matched
//! - update_partial: read, merge, full replace
//! - delete: `false` when no row matched
//!
//! Every store failure is logged with its operation and returned unchanged in
//! kind. Nothing is retried here.

use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Row};

use crate::db::driver::{Driver, KeyStrategy};
use crate::models::{Product, ProductInput, ProductPatch};

/// Store-level failure during a repository operation
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("{operation} failed: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("{operation} integrity check failed: {reason}")]
    Integrity {
        operation: &'static str,
        reason: &'static str,
    },

    #[error("cannot map column '{column}': {reason}")]
    Mapping { column: &'static str, reason: String },
}

fn db_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> PersistenceError {
    move |source| {
        tracing::error!(operation, error = %source, "product store operation failed");
        PersistenceError::Database { operation, source }
    }
}

fn integrity(operation: &'static str, reason: &'static str) -> PersistenceError {
    tracing::error!(operation, reason, "product store integrity check failed");
    PersistenceError::Integrity { operation, reason }
}

fn mapping(column: &'static str, reason: impl ToString) -> PersistenceError {
    let reason = reason.to_string();
    tracing::error!(column, reason = %reason, "cannot map product row");
    PersistenceError::Mapping { column, reason }
}

/// Product repository over a borrowed connection
pub struct ProductRepo<'c> {
    conn: &'c mut AnyConnection,
    driver: Driver,
}

impl<'c> ProductRepo<'c> {
    pub fn new(conn: &'c mut AnyConnection, driver: Driver) -> Self {
        Self { conn, driver }
    }

    /// Insert a product and return the stored row.
    ///
    /// Zero affected rows or a missing generated key are integrity failures.
    /// If the re-read by generated id comes back empty, the locally built
    /// product is returned instead (without `created_at`).
    pub async fn create(&mut self, input: &ProductInput) -> Result<Product, PersistenceError> {
        const OP: &str = "create";
        let query = sqlx::query(&self.driver.statements().insert)
            .bind(input.name.clone())
            .bind(input.description.clone())
            .bind(input.price.to_string())
            .bind(input.quantity);

        let id = match self.driver.key_strategy() {
            KeyStrategy::Returning => {
                let row = query
                    .fetch_optional(&mut *self.conn)
                    .await
                    .map_err(db_err(OP))?
                    .ok_or_else(|| integrity(OP, "no rows affected"))?;
                generated_key(OP, row.try_get::<i64, _>("id").ok())?
            }
            KeyStrategy::LastInsertId => {
                let result = query.execute(&mut *self.conn).await.map_err(db_err(OP))?;
                if result.rows_affected() == 0 {
                    return Err(integrity(OP, "no rows affected"));
                }
                generated_key(OP, result.last_insert_id())?
            }
        };

        tracing::info!(product_id = id, "product created");

        match self.get_by_id(id).await? {
            Some(product) => Ok(product),
            None => {
                tracing::warn!(product_id = id, "created product not found on re-read");
                Ok(Product::from_input(id, input.clone()))
            }
        }
    }

    /// All products; an empty store gives an empty vector.
    pub async fn get_all(&mut self) -> Result<Vec<Product>, PersistenceError> {
        let rows = sqlx::query(&self.driver.statements().select_all)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(db_err("get_all"))?;

        rows.iter().map(map_product).collect()
    }

    pub async fn get_by_id(&mut self, id: i64) -> Result<Option<Product>, PersistenceError> {
        let row = sqlx::query(&self.driver.statements().select_by_id)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(db_err("get_by_id"))?;

        row.as_ref().map(map_product).transpose()
    }

    /// Replace every writable field of the row matching `product.id`.
    ///
    /// Returns `false` when no row matched. `created_at` is never written.
    pub async fn update(&mut self, product: &Product) -> Result<bool, PersistenceError> {
        let result = sqlx::query(&self.driver.statements().update)
            .bind(product.name.clone())
            .bind(product.description.clone())
            .bind(product.price.to_string())
            .bind(product.quantity)
            .bind(product.id)
            .execute(&mut *self.conn)
            .await
            .map_err(db_err("update"))?;

        let rows_affected = result.rows_affected();
        tracing::debug!(product_id = product.id, rows_affected, "product update applied");
        Ok(rows_affected > 0)
    }

    /// Merge `patch` over the stored row and write it back.
    ///
    /// Returns `false` without writing when the row doesn't exist.
    pub async fn update_partial(&mut self, id: i64, patch: &ProductPatch) -> Result<bool, PersistenceError> {
        let Some(current) = self.get_by_id(id).await? else {
            return Ok(false);
        };

        let merged = patch.apply_to(current);
        self.update(&merged).await
    }

    pub async fn delete(&mut self, id: i64) -> Result<bool, PersistenceError> {
        let result = sqlx::query(&self.driver.statements().delete)
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(db_err("delete"))?;

        let rows_affected = result.rows_affected();
        tracing::debug!(product_id = id, rows_affected, "product delete applied");
        Ok(rows_affected > 0)
    }
}

/// Only a positive id counts as generated; MySQL reports 0 when it made none.
fn generated_key(operation: &'static str, key: Option<i64>) -> Result<i64, PersistenceError> {
    key.filter(|id| *id > 0)
        .ok_or_else(|| integrity(operation, "no generated key returned"))
}

fn map_product(row: &AnyRow) -> Result<Product, PersistenceError> {
    let id: i64 = row.try_get("id").map_err(|e| mapping("id", e))?;
    let name: String = row.try_get("name").map_err(|e| mapping("name", e))?;
    let description: Option<String> = row
        .try_get("description")
        .map_err(|e| mapping("description", e))?;
    let price: String = row.try_get("price").map_err(|e| mapping("price", e))?;
    let quantity: i64 = row.try_get("quantity").map_err(|e| mapping("quantity", e))?;
    let created_at: Option<String> = row
        .try_get("created_at")
        .map_err(|e| mapping("created_at", e))?;

    Ok(Product {
        id,
        name,
        description,
        price: parse_price(&price)?,
        quantity: i32::try_from(quantity).map_err(|e| mapping("quantity", e))?,
        created_at: created_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_price(raw: &str) -> Result<Decimal, PersistenceError> {
    let raw = raw.trim();
    raw.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| mapping("price", e))
}

/// Timestamps arrive as text in the store's default rendering.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, PersistenceError> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    // Zone-qualified renderings, e.g. a TIMESTAMPTZ column
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .map(|ts| ts.naive_utc())
        .map_err(|e| mapping("created_at", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::supplier::{AcquiredConnection, ConnectionSupplier};
    use std::str::FromStr;

    async fn local_store() -> AcquiredConnection {
        ConnectionSupplier::local_only()
            .acquire()
            .await
            .expect("in-memory store should always connect")
    }

    fn widget() -> ProductInput {
        ProductInput {
            name: "Widget".into(),
            description: Some("A blue widget".into()),
            price: Decimal::from_str("19.99").unwrap(),
            quantity: 10,
        }
    }

    #[tokio::test]
    async fn create_then_get_by_id_round_trips() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        let created = repo.create(&widget()).await.unwrap();
        assert!(created.id > 0);
        assert!(created.created_at.is_some());
        assert_eq!(created.price, Decimal::from_str("19.99").unwrap());

        let fetched = repo.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn create_with_no_row_inserted_is_an_integrity_error() {
        let mut store = local_store().await;
        sqlx::query("CREATE TRIGGER swallow BEFORE INSERT ON products BEGIN SELECT RAISE(IGNORE); END")
            .execute(&mut store.connection)
            .await
            .unwrap();

        let mut repo = ProductRepo::new(&mut store.connection, store.driver);
        let err = repo.create(&widget()).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Integrity {
                operation: "create",
                reason: "no rows affected"
            }
        ));
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_falls_back_to_input_when_reread_is_empty() {
        let mut store = local_store().await;
        sqlx::query("CREATE TRIGGER vanish AFTER INSERT ON products BEGIN DELETE FROM products WHERE id = NEW.id; END")
            .execute(&mut store.connection)
            .await
            .unwrap();

        let mut repo = ProductRepo::new(&mut store.connection, store.driver);
        let created = repo.create(&widget()).await.unwrap();

        assert!(created.id > 0);
        assert_eq!(created.name, "Widget");
        assert_eq!(created.quantity, 10);
        assert_eq!(created.created_at, None);
    }

    #[test]
    fn generated_key_must_be_positive() {
        assert_eq!(generated_key("create", Some(7)).unwrap(), 7);

        for missing in [None, Some(0), Some(-1)] {
            assert!(matches!(
                generated_key("create", missing),
                Err(PersistenceError::Integrity {
                    reason: "no generated key returned",
                    ..
                })
            ));
        }
    }

    #[tokio::test]
    async fn create_keeps_absent_description() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        let input = ProductInput {
            description: None,
            ..widget()
        };
        let created = repo.create(&input).await.unwrap();
        assert_eq!(created.description, None);
    }

    #[tokio::test]
    async fn unknown_id_is_absent() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        assert_eq!(repo.get_by_id(424242).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_store_lists_nothing() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_all_returns_every_row() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        repo.create(&widget()).await.unwrap();
        repo.create(&ProductInput {
            name: "Gadget".into(),
            ..widget()
        })
        .await
        .unwrap();

        let names: Vec<_> = repo
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Gadget".to_string()));
    }

    #[tokio::test]
    async fn update_of_missing_row_writes_nothing() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        repo.create(&widget()).await.unwrap();
        let ghost = Product::from_input(9999, widget());

        assert!(!repo.update(&ghost).await.unwrap());
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_all_fields_but_created_at() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        let created = repo.create(&widget()).await.unwrap();
        let replacement = Product::from_input(
            created.id,
            ProductInput {
                name: "Widget Pro".into(),
                description: None,
                price: Decimal::from_str("25.00").unwrap(),
                quantity: 4,
            },
        );

        assert!(repo.update(&replacement).await.unwrap());

        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Widget Pro");
        assert_eq!(stored.description, None);
        assert_eq!(stored.price, Decimal::from_str("25").unwrap());
        assert_eq!(stored.quantity, 4);
        assert_eq!(stored.created_at, created.created_at);
    }

    #[tokio::test]
    async fn partial_update_ignores_non_positive_quantity() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);
        let created = repo.create(&widget()).await.unwrap();

        let zero = ProductPatch {
            quantity: Some(0),
            ..Default::default()
        };
        assert!(repo.update_partial(created.id, &zero).await.unwrap());
        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);

        let five = ProductPatch {
            quantity: Some(5),
            ..Default::default()
        };
        assert!(repo.update_partial(created.id, &five).await.unwrap());
        let stored = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 5);
        assert_eq!(stored.name, "Widget");
    }

    #[tokio::test]
    async fn partial_update_of_missing_row_is_false() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);

        let patch = ProductPatch {
            name: Some("Nope".into()),
            ..Default::default()
        };
        assert!(!repo.update_partial(77, &patch).await.unwrap());
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_true_once() {
        let mut store = local_store().await;
        let mut repo = ProductRepo::new(&mut store.connection, store.driver);
        let created = repo.create(&widget()).await.unwrap();

        assert!(repo.delete(created.id).await.unwrap());
        assert_eq!(repo.get_by_id(created.id).await.unwrap(), None);
        assert!(!repo.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn unparseable_price_is_a_mapping_error() {
        let mut store = local_store().await;
        sqlx::query("INSERT INTO products (name, price, quantity) VALUES ('Broken', 'abc', 1)")
            .execute(&mut store.connection)
            .await
            .unwrap();

        let mut repo = ProductRepo::new(&mut store.connection, store.driver);
        let err = repo.get_all().await.unwrap_err();
        assert!(matches!(err, PersistenceError::Mapping { column: "price", .. }));
    }

    #[tokio::test]
    async fn missing_table_is_a_database_error() {
        let mut store = local_store().await;
        sqlx::query("DROP TABLE products")
            .execute(&mut store.connection)
            .await
            .unwrap();

        let mut repo = ProductRepo::new(&mut store.connection, store.driver);
        let err = repo.get_by_id(1).await.unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Database {
                operation: "get_by_id",
                ..
            }
        ));
    }

    #[test]
    fn timestamps_parse_in_store_renderings() {
        let expected = NaiveDateTime::parse_from_str("2024-03-01 08:30:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(parse_timestamp("2024-03-01 08:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01T08:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-01 08:30:00+00").unwrap(), expected);
        assert!(parse_timestamp("2024-03-01 08:30:00.250").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn prices_parse_exactly() {
        assert_eq!(parse_price("19.99").unwrap(), Decimal::new(1999, 2));
        assert_eq!(parse_price(" 5 ").unwrap(), Decimal::new(5, 0));
        assert!(parse_price("").is_err());
    }
}
