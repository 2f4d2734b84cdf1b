// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const NAME_MAX_LEN: usize = 100;
pub const UNIT_MAX_LEN: usize = 20;
pub const CATEGORY_MAX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    Empty(&'static str),
    Trimmed(&'static str),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(name) => write!(f, "{name} must not be empty"),
            Self::Trimmed(name) => {
                write!(f, "{name} must not contain leading/trailing whitespace")
            }
            Self::TooLong(name, max) => write!(f, "{name} exceeds max length {max}"),
            Self::InvalidFormat(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct ItemName(String);

impl ItemName {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("name"));
        }
        if input.trim() != input {
            return Err(ParseError::Trimmed("name"));
        }
        if input.len() > NAME_MAX_LEN {
            return Err(ParseError::TooLong("name", NAME_MAX_LEN));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct UnitLabel(String);

impl UnitLabel {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("unit"));
        }
        if input.trim() != input {
            return Err(ParseError::Trimmed("unit"));
        }
        if input.len() > UNIT_MAX_LEN {
            return Err(ParseError::TooLong("unit", UNIT_MAX_LEN));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct CategoryLabel(String);

impl CategoryLabel {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        if input.is_empty() {
            return Err(ParseError::Empty("category"));
        }
        if input.trim() != input {
            return Err(ParseError::Trimmed("category"));
        }
        if input.len() > CATEGORY_MAX_LEN {
            return Err(ParseError::TooLong("category", CATEGORY_MAX_LEN));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Raw-material quantities are continuous (weights, volumes) and must stay
/// finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawQuantity(f64);

impl RawQuantity {
    pub fn parse(value: f64) -> Result<Self, ParseError> {
        if !value.is_finite() {
            return Err(ParseError::InvalidFormat("quantity must be a finite number"));
        }
        if value < 0.0 {
            return Err(ParseError::InvalidFormat("quantity must not be negative"));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }
}

/// Food-item quantities are discrete unit counts. Bounded to the storage
/// integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct FoodQuantity(u64);

impl FoodQuantity {
    pub fn parse(value: u64) -> Result<Self, ParseError> {
        if value > i64::MAX as u64 {
            return Err(ParseError::InvalidFormat("quantity exceeds supported range"));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0 as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct NewRawMaterial {
    pub name: ItemName,
    pub quantity: RawQuantity,
    pub unit: UnitLabel,
}

impl NewRawMaterial {
    #[must_use]
    pub fn new(name: ItemName, quantity: RawQuantity, unit: UnitLabel) -> Self {
        Self {
            name,
            quantity,
            unit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct NewFoodItem {
    pub name: ItemName,
    pub quantity: FoodQuantity,
    pub category: CategoryLabel,
}

impl NewFoodItem {
    #[must_use]
    pub fn new(name: ItemName, quantity: FoodQuantity, category: CategoryLabel) -> Self {
        Self {
            name,
            quantity,
            category,
        }
    }
}

/// Persisted raw-material row. Field values come from the store, which only
/// accepts validated input, so the row carries plain types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct RawMaterial {
    pub id: i64,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub last_updated: String,
}

impl RawMaterial {
    #[must_use]
    pub fn new(id: i64, name: String, quantity: f64, unit: String, last_updated: String) -> Self {
        Self {
            id,
            name,
            quantity,
            unit,
            last_updated,
        }
    }
}

/// Persisted food-item row. Quantity is kept as the storage integer; the
/// conditional-write guard keeps it non-negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[non_exhaustive]
pub struct FoodItem {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub category: String,
    pub last_updated: String,
}

impl FoodItem {
    #[must_use]
    pub fn new(id: i64, name: String, quantity: i64, category: String, last_updated: String) -> Self {
        Self {
            id,
            name,
            quantity,
            category,
            last_updated,
        }
    }
}
