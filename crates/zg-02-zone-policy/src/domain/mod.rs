//! # Domain Layer
//!
//! Pure zone policy logic. No I/O; the service applies the commits the
//! engine asks for through the `ZoneStore` port.

pub mod engine;
pub mod entities;
pub mod errors;

pub use engine::evaluate;
pub use entities::*;
pub use errors::*;
