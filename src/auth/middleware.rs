use actix_web::{web, HttpRequest, HttpResponse};

use crate::ErrorResponse;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY: &str = "api_key";

/// Extract the shared secret from the `x-api-key` header or `api_key` query parameter.
fn extract_api_key(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|key| key.to_string())
        .or_else(|| {
            web::Query::<Vec<(String, String)>>::from_query(req.query_string())
                .ok()
                .and_then(|query| {
                    query
                        .into_inner()
                        .into_iter()
                        .find(|(name, _)| name == API_KEY_QUERY)
                        .map(|(_, value)| value)
                })
        })
}

/// Check the request against the configured shared secret.
///
/// With no secret configured every request passes.
pub fn validate_api_key(req: &HttpRequest, expected: Option<&str>) -> Result<(), HttpResponse> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match extract_api_key(req) {
        Some(supplied) if supplied == expected => Ok(()),
        Some(_) => {
            log::warn!("Rejected request to {} with wrong API key", req.path());
            Err(HttpResponse::Unauthorized().json(ErrorResponse::unauthorized("Unauthorized")))
        }
        None => {
            log::warn!("Rejected request to {} without API key", req.path());
            Err(HttpResponse::Unauthorized().json(ErrorResponse::unauthorized("Unauthorized")))
        }
    }
}
