//! Repository implementations for database access
//!
//! Repositories borrow a connection for the length of one operation sequence.
//! Absence is `None`/`false`, store failures are `PersistenceError`.

pub mod products;

pub use products::{PersistenceError, ProductRepo};
