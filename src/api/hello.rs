//! `/hello`: liveness check that also proves tenant storage is reachable.

use crate::http::{ApiRequest, ApiResponse, ApiResult};
use crate::routing::Endpoint;

pub const PATH: &str = "/hello";

pub fn endpoint() -> Endpoint {
    Endpoint::new(PATH).any(hello)
}

fn hello(request: &ApiRequest) -> ApiResult {
    request.tenant_storage()?.storage().ping()?;
    Ok(ApiResponse::text("Hello"))
}
