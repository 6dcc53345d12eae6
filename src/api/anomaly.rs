//! `/recipe/anomaly/ip`: read and append a user's IP address history.
//!
//! ```text
//! GET  ?userId=<id>                 → {"status":"OK","ip":"<last or empty>"}
//! POST {"userId":"<id>","ip":"..."} → {"status":"OK"}
//! ```

use serde_json::json;

use crate::anomaly;
use crate::http::input::{parse_json_object, required_json_string, required_query_param};
use crate::http::{ApiRequest, ApiResponse, ApiResult};
use crate::routing::Endpoint;

pub const PATH: &str = "/recipe/anomaly/ip";

pub fn endpoint() -> Endpoint {
    Endpoint::new(PATH).get(last_ip).post(record_ip)
}

fn last_ip(request: &ApiRequest) -> ApiResult {
    let user_id = required_query_param(request, "userId")?;
    let app = request.app_storage()?;
    let ip = anomaly::get_last_ip_address(&app, user_id)?;
    Ok(ApiResponse::json(json!({ "status": "OK", "ip": ip })))
}

fn record_ip(request: &ApiRequest) -> ApiResult {
    let input = parse_json_object(request)?;
    let user_id = required_json_string(&input, "userId")?;
    let ip = required_json_string(&input, "ip")?;
    let app = request.app_storage()?;
    anomaly::insert_new_ip_address(&app, &user_id, &ip)?;
    Ok(ApiResponse::json(json!({ "status": "OK" })))
}
