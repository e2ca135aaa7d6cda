//! Converter Common Types
//!
//! This crate contains the data model shared by the converter crates:
//! currencies, exchange-rate tables and the rows shown to the user.

pub mod catalog;
pub mod monetary;
pub mod rows;
pub mod error;
pub mod time;

pub use monetary::*;
pub use rows::*;
pub use error::*;
pub use time::*;
