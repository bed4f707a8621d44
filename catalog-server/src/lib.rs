//! catalog-server: product catalog over a fallback chain of stores
//!
//! A [`ConnectionSupplier`](db::ConnectionSupplier) tries configured
//! candidate databases in order and ends with an in-memory SQLite store.
//! The connection it yields is shared by a REST API for product CRUD.

pub mod config;
pub mod db;
pub mod http;
pub mod models;
pub mod service;
pub mod state;

pub use config::{CatalogConfig, ConfigError};
pub use db::{AcquiredConnection, ConnectionError, ConnectionSupplier, ConnectionTier, PersistenceError};
pub use http::{run_server, ServerConfig, ServerError};
pub use service::ProductService;
pub use state::AppState;
