//! Product service over the shared connection
//!
//! Holds the lock for one repository call sequence per method. Each method
//! runs in its own span and reports how long it took at debug level.

use std::time::Instant;

use tracing::{debug, instrument};

use crate::db::{Driver, PersistenceError, ProductRepo, SharedConnection};
use crate::models::{Product, ProductInput, ProductPatch};

/// Entry point for the five product operations
#[derive(Clone)]
pub struct ProductService {
    conn: SharedConnection,
    driver: Driver,
}

impl ProductService {
    pub fn new(conn: SharedConnection, driver: Driver) -> Self {
        Self { conn, driver }
    }

    #[instrument(skip_all)]
    pub async fn list(&self) -> Result<Vec<Product>, PersistenceError> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let products = ProductRepo::new(&mut conn, self.driver).get_all().await?;
        debug!(count = products.len(), elapsed_ms = started.elapsed().as_millis() as u64, "listed products");
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, product_id: i64) -> Result<Option<Product>, PersistenceError> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let product = ProductRepo::new(&mut conn, self.driver).get_by_id(product_id).await?;
        debug!(found = product.is_some(), elapsed_ms = started.elapsed().as_millis() as u64, "fetched product");
        Ok(product)
    }

    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, PersistenceError> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let product = ProductRepo::new(&mut conn, self.driver).create(input).await?;
        debug!(product_id = product.id, elapsed_ms = started.elapsed().as_millis() as u64, "created product");
        Ok(product)
    }

    /// Full replace; `false` when `product_id` doesn't exist.
    #[instrument(skip(self, input))]
    pub async fn update(&self, product_id: i64, input: ProductInput) -> Result<bool, PersistenceError> {
        let started = Instant::now();
        let product = Product::from_input(product_id, input);
        let mut conn = self.conn.lock().await;
        let updated = ProductRepo::new(&mut conn, self.driver).update(&product).await?;
        debug!(updated, elapsed_ms = started.elapsed().as_millis() as u64, "updated product");
        Ok(updated)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_partial(&self, product_id: i64, patch: &ProductPatch) -> Result<bool, PersistenceError> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let updated = ProductRepo::new(&mut conn, self.driver)
            .update_partial(product_id, patch)
            .await?;
        debug!(updated, elapsed_ms = started.elapsed().as_millis() as u64, "patched product");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: i64) -> Result<bool, PersistenceError> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let deleted = ProductRepo::new(&mut conn, self.driver).delete(product_id).await?;
        debug!(deleted, elapsed_ms = started.elapsed().as_millis() as u64, "deleted product");
        Ok(deleted)
    }

    /// Round-trip to the store; used by the health check.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        use sqlx::Connection;

        let mut conn = self.conn.lock().await;
        conn.ping().await
    }
}
