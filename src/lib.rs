#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod cache;
pub mod database;
pub mod error;
mod log;
pub mod model;
pub mod query;
pub mod schema;
pub mod types;

pub use {
    database::{Config, Registry},
    error::Error,
    model::{Model, Record},
    relmap_macros as macros,
    relmap_macros::Record,
    types::{Row, Value},
};

/// Builds a [`Row`] from `column => value` pairs.
///
/// ```
/// let row = relmap::row!("id" => 1, "name" => "x");
/// assert_eq!(row.columns().collect::<Vec<_>>(), ["id", "name"]);
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::types::Row::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::types::Row::new();
        $(
            row.insert($column, $value);
        )+
        row
    }};
}
