//! Database layer - connection supplier and repositories
//!
//! # Design Principles
//!
//! - One live connection per process, shared as `Arc<Mutex<AnyConnection>>`
//! - Candidates tried in order, local in-memory store last
//! - Repositories borrow the connection, they never own it
//! - SQL text per driver, built once

pub mod driver;
pub mod repos;
pub mod schema;
pub mod supplier;

use std::sync::Arc;

use sqlx::AnyConnection;
use tokio::sync::Mutex;

pub use driver::{Driver, KeyStrategy, ProductStatements, UnknownDriver};
pub use repos::*;
pub use supplier::{
    AcquiredConnection, AttemptFailure, AttemptOutcome, AttemptRecord, CandidateTarget,
    ConnectionError, ConnectionSupplier, ConnectionTier, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_LOCAL_FALLBACK,
};

/// The process-wide connection handle
pub type SharedConnection = Arc<Mutex<AnyConnection>>;
