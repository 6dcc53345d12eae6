//! Input parsing helpers for endpoint handlers.
//!
//! Every failure here is a client error with a fixed message format.

use serde_json::{Map, Value};

use crate::http::request::ApiRequest;
use crate::http::response::ApiError;

/// Parse the body as a JSON object.
pub fn parse_json_object(request: &ApiRequest) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(request.body()) {
        Ok(Value::Object(object)) => Ok(object),
        _ => Err(ApiError::bad_request("Invalid Json Input")),
    }
}

/// A query parameter that must be present.
pub fn required_query_param<'a>(request: &'a ApiRequest, name: &str) -> Result<&'a str, ApiError> {
    optional_query_param(request, name)
        .ok_or_else(|| ApiError::bad_request(format!("Field name '{name}' is missing in GET request")))
}

pub fn optional_query_param<'a>(request: &'a ApiRequest, name: &str) -> Option<&'a str> {
    request.query().get(name).map(String::as_str)
}

/// A string field that must be present in a JSON object.
pub fn required_json_string(object: &Map<String, Value>, name: &str) -> Result<String, ApiError> {
    object
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(format!("Field name '{name}' is invalid in JSON input")))
}
