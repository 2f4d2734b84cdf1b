#![forbid(unsafe_code)]
//! Persistent record store for both stock kinds, plus the atomic
//! quantity-adjustment engine layered on SQLite's conditional UPDATE.

mod sqlite;

pub use sqlite::{Store, BUSY_TIMEOUT_MS, SCHEMA_VERSION};

pub const CRATE_NAME: &str = "larder-store";

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    NotFound,
    InsufficientQuantity,
    Sql(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => f.write_str("no row with the requested id"),
            Self::InsufficientQuantity => {
                f.write_str("adjustment would drive quantity negative")
            }
            Self::Sql(msg) => write!(f, "sql error: {msg}"),
        }
    }
}
impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => Self::NotFound,
            other => Self::Sql(other.to_string()),
        }
    }
}
