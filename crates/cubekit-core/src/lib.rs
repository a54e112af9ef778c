//! cubekit core library
//!
//! This crate provides the vector types, the error taxonomy and the logging
//! setup shared by the geometry, animation and export crates.

pub mod error;
pub mod logging;
pub mod types;

pub use error::{Diagnosed, Error, IdentifierKind, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Diagnosed, Error, Result, ResultExt};
    pub use crate::types::*;
}
