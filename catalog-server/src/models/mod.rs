//! Domain models with validation at the edge
//!
//! Request payloads are validated before they reach the repository.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod product;

pub use validation::ValidationError;
pub use product::{Product, ProductInput, ProductPatch, MAX_PRODUCT_NAME_LEN};
