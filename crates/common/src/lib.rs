//! Common crate
//!
//! Stream description model and error handling shared by the Streamcat crates.
//!
//! # Example
//! ```rust
//! use streamcat_common::SchemaTableName;
//! let name = SchemaTableName::parse("prod.test_table", "default").unwrap();
//! assert_eq!(name.schema(), "prod");
//! ```

pub mod catalog;
pub mod error;

pub use catalog::{FieldDescription, FieldGroup, SchemaTableName, StreamDescription};
pub use error::{Error, Result};
