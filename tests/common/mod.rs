//! Common test infrastructure
//!
//! Fixtures build file-backed performer databases at a given schema version; helpers
//! read the resulting rows back.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{create_v1_db, migrate};
//!
//! #[test]
//! fn test_upgrade() {
//!     let (_dir, path) = create_v1_db(&[(1, "Alice", None)]).unwrap();
//!     migrate(&path, 1000).unwrap();
//! }
//! ```

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::*;
