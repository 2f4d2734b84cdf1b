// SPDX-License-Identifier: Apache-2.0

use crate::item::ParseError;
use chrono::{NaiveDateTime, Utc};

/// Second-precision UTC, the row and wire format for `last_updated`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn validate_timestamp(input: &str) -> Result<(), ParseError> {
    NaiveDateTime::parse_from_str(input, TIMESTAMP_FORMAT)
        .map(|_| ())
        .map_err(|_| ParseError::InvalidFormat("timestamp must use YYYY-MM-DD HH:MM:SS"))
}
