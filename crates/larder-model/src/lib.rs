#![forbid(unsafe_code)]
//! Larder model SSOT: stock record shapes, input validation, roles.

mod item;
mod role;
mod timestamp;

pub use item::{
    CategoryLabel, FoodItem, FoodQuantity, ItemName, NewFoodItem, NewRawMaterial, ParseError,
    RawMaterial, RawQuantity, UnitLabel, CATEGORY_MAX_LEN, NAME_MAX_LEN, UNIT_MAX_LEN,
};
pub use role::Role;
pub use timestamp::{now_timestamp, validate_timestamp, TIMESTAMP_FORMAT};

pub const CRATE_NAME: &str = "larder-model";
