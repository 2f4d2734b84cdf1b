#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "larder-api";

/// Wire message for successful deletes, shared by handlers and tests.
pub const DELETE_SUCCESS_MESSAGE: &str = "Deleted successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    Unauthorized,
    NotFound,
    InsufficientQuantity,
    ValidationFailed,
    InvalidBody,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn unauthorized() -> Self {
        Self {
            code: ApiErrorCode::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self {
            code: ApiErrorCode::NotFound,
            message: "Item not found".to_string(),
        }
    }

    #[must_use]
    pub fn insufficient_quantity() -> Self {
        Self {
            code: ApiErrorCode::InsufficientQuantity,
            message: "Insufficient quantity".to_string(),
        }
    }

    #[must_use]
    pub fn missing_field(name: &str) -> Self {
        Self {
            code: ApiErrorCode::ValidationFailed,
            message: format!("{name} is required"),
        }
    }

    #[must_use]
    pub fn invalid_field(name: &str, requirement: &str) -> Self {
        Self {
            code: ApiErrorCode::ValidationFailed,
            message: format!("{name} {requirement}"),
        }
    }

    #[must_use]
    pub fn invalid_body(message: &str) -> Self {
        Self {
            code: ApiErrorCode::InvalidBody,
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self {
            code: ApiErrorCode::Internal,
            message: "internal error".to_string(),
        }
    }
}

impl From<larder_model::ParseError> for ApiError {
    fn from(err: larder_model::ParseError) -> Self {
        Self {
            code: ApiErrorCode::ValidationFailed,
            message: err.to_string(),
        }
    }
}

#[must_use]
pub fn map_error_status(error: &ApiError) -> u16 {
    match error.code {
        ApiErrorCode::ValidationFailed
        | ApiErrorCode::InvalidBody
        | ApiErrorCode::InsufficientQuantity => 400,
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::Internal => 500,
    }
}

pub mod body {
    use super::ApiError;
    use larder_model::{
        CategoryLabel, FoodQuantity, ItemName, NewFoodItem, NewRawMaterial, RawQuantity, UnitLabel,
    };
    use serde_json::Value;

    pub fn parse_json_object(raw: &[u8]) -> Result<Value, ApiError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|_| ApiError::invalid_body("request body must be valid JSON"))?;
        if !value.is_object() {
            return Err(ApiError::invalid_body("request body must be a JSON object"));
        }
        Ok(value)
    }

    fn string_field<'a>(body: &'a Value, name: &'static str) -> Result<&'a str, ApiError> {
        let field = body.get(name).ok_or_else(|| ApiError::missing_field(name))?;
        field
            .as_str()
            .ok_or_else(|| ApiError::invalid_field(name, "must be a string"))
    }

    fn number_field(body: &Value, name: &'static str) -> Result<f64, ApiError> {
        let field = body.get(name).ok_or_else(|| ApiError::missing_field(name))?;
        field
            .as_f64()
            .ok_or_else(|| ApiError::invalid_field(name, "must be a number"))
    }

    fn integer_field(body: &Value, name: &'static str) -> Result<i64, ApiError> {
        let field = body.get(name).ok_or_else(|| ApiError::missing_field(name))?;
        field
            .as_i64()
            .ok_or_else(|| ApiError::invalid_field(name, "must be an integer"))
    }

    pub fn parse_new_raw_material(body: &Value) -> Result<NewRawMaterial, ApiError> {
        let name = ItemName::parse(string_field(body, "name")?)?;
        let quantity = RawQuantity::parse(number_field(body, "quantity")?)?;
        let unit = UnitLabel::parse(string_field(body, "unit")?)?;
        Ok(NewRawMaterial::new(name, quantity, unit))
    }

    pub fn parse_new_food_item(body: &Value) -> Result<NewFoodItem, ApiError> {
        let name = ItemName::parse(string_field(body, "name")?)?;
        let raw_quantity = integer_field(body, "quantity")?;
        let value = u64::try_from(raw_quantity)
            .map_err(|_| ApiError::invalid_field("quantity", "must not be negative"))?;
        let quantity = FoodQuantity::parse(value)?;
        let category = CategoryLabel::parse(string_field(body, "category")?)?;
        Ok(NewFoodItem::new(name, quantity, category))
    }

    pub fn parse_raw_adjustment(body: &Value) -> Result<f64, ApiError> {
        let delta = number_field(body, "adjustment")?;
        if !delta.is_finite() {
            return Err(ApiError::invalid_field("adjustment", "must be a finite number"));
        }
        Ok(delta)
    }

    pub fn parse_food_adjustment(body: &Value) -> Result<i64, ApiError> {
        integer_field(body, "adjustment")
    }

    pub fn parse_raw_replacement(body: &Value) -> Result<RawQuantity, ApiError> {
        Ok(RawQuantity::parse(number_field(body, "quantity")?)?)
    }

    pub fn parse_food_replacement(body: &Value) -> Result<FoodQuantity, ApiError> {
        let raw = integer_field(body, "quantity")?;
        let value = u64::try_from(raw)
            .map_err(|_| ApiError::invalid_field("quantity", "must not be negative"))?;
        Ok(FoodQuantity::parse(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::body::{
        parse_food_adjustment, parse_food_replacement, parse_json_object, parse_new_food_item,
        parse_new_raw_material, parse_raw_adjustment,
    };
    use super::{map_error_status, ApiError, ApiErrorCode};
    use serde_json::json;

    #[test]
    fn parse_new_raw_material_success() {
        let body = json!({"name": "Flour", "quantity": 50, "unit": "kg"});
        let parsed = parse_new_raw_material(&body).expect("body parse");
        assert_eq!(parsed.name.as_str(), "Flour");
        assert_eq!(parsed.quantity.value(), 50.0);
        assert_eq!(parsed.unit.as_str(), "kg");
    }

    #[test]
    fn parse_new_raw_material_reports_the_missing_field() {
        let body = json!({"quantity": 50, "unit": "kg"});
        let err = parse_new_raw_material(&body).expect_err("missing name");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed);
        assert_eq!(err.message, "name is required");

        let body = json!({"name": "Flour", "unit": "kg"});
        let err = parse_new_raw_material(&body).expect_err("missing quantity");
        assert_eq!(err.message, "quantity is required");
    }

    #[test]
    fn parse_new_raw_material_rejects_wrong_types_and_negatives() {
        let body = json!({"name": "Flour", "quantity": "50", "unit": "kg"});
        let err = parse_new_raw_material(&body).expect_err("string quantity");
        assert_eq!(err.message, "quantity must be a number");

        let body = json!({"name": "Flour", "quantity": -1.5, "unit": "kg"});
        let err = parse_new_raw_material(&body).expect_err("negative quantity");
        assert_eq!(err.code, ApiErrorCode::ValidationFailed);
    }

    #[test]
    fn parse_new_food_item_requires_a_non_negative_integer_count() {
        let body = json!({"name": "Beans", "quantity": 12, "category": "canned"});
        let parsed = parse_new_food_item(&body).expect("body parse");
        assert_eq!(parsed.quantity.value(), 12);

        let body = json!({"name": "Beans", "quantity": 2.5, "category": "canned"});
        let err = parse_new_food_item(&body).expect_err("fractional count");
        assert_eq!(err.message, "quantity must be an integer");

        let body = json!({"name": "Beans", "quantity": -2, "category": "canned"});
        let err = parse_new_food_item(&body).expect_err("negative count");
        assert_eq!(err.message, "quantity must not be negative");
    }

    #[test]
    fn adjustment_parsing_keeps_sign_but_rejects_non_numbers() {
        let body = json!({"adjustment": -7.5});
        assert_eq!(parse_raw_adjustment(&body).expect("delta"), -7.5);

        let body = json!({"adjustment": -7});
        assert_eq!(parse_food_adjustment(&body).expect("delta"), -7);

        let body = json!({});
        let err = parse_raw_adjustment(&body).expect_err("missing delta");
        assert_eq!(err.message, "adjustment is required");

        let body = json!({"adjustment": "lots"});
        assert!(parse_food_adjustment(&body).is_err());
    }

    #[test]
    fn replacement_quantity_honors_the_field_domain() {
        let body = json!({"quantity": 0});
        assert_eq!(parse_food_replacement(&body).expect("quantity").value(), 0);

        let body = json!({"quantity": -4});
        let err = parse_food_replacement(&body).expect_err("negative");
        assert_eq!(err.message, "quantity must not be negative");
    }

    #[test]
    fn parse_json_object_rejects_non_objects() {
        assert!(parse_json_object(b"[1,2]").is_err());
        assert!(parse_json_object(b"not json").is_err());
        assert!(parse_json_object(b"{\"a\":1}").is_ok());
    }

    #[test]
    fn error_status_mapping_is_stable() {
        assert_eq!(map_error_status(&ApiError::unauthorized()), 401);
        assert_eq!(map_error_status(&ApiError::not_found()), 404);
        assert_eq!(map_error_status(&ApiError::insufficient_quantity()), 400);
        assert_eq!(map_error_status(&ApiError::missing_field("name")), 400);
        assert_eq!(map_error_status(&ApiError::invalid_body("bad json")), 400);
        assert_eq!(map_error_status(&ApiError::internal()), 500);
    }

    #[test]
    fn canonical_wire_messages_match_the_clients() {
        assert_eq!(ApiError::unauthorized().message, "Unauthorized");
        assert_eq!(ApiError::not_found().message, "Item not found");
        assert_eq!(
            ApiError::insufficient_quantity().message,
            "Insufficient quantity"
        );
    }
}
