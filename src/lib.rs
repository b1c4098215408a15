//! Grid connection calculator for small solar installations
//!
//! Resolves the utility category, minimum breaker and maximum generation
//! power for an installation from three reference tables: location voltage,
//! load schedule and generation ceilings.

pub mod advisory;
pub mod calculator;
pub mod db;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod parse;
pub mod tables;

pub use calculator::{limit_for, resolve, resolve_category, validate_kit};
pub use error::LoadError;
pub use tables::ReferenceTables;
