//! Health check endpoint handler.

use crate::models::HealthResponse;
use actix_web::{web, Error, Result};
use paperclip::actix::api_v2_operation;

/// Health check endpoint
///
/// Used by load balancers and container health checks; does no analysis work.
#[api_v2_operation(
    summary = "Health Check Endpoint",
    description = "Returns the current health status of the service in JSON format.",
    tags("Health"),
    responses(
        (status = 200, description = "Successful response", body = HealthResponse)
    )
)]
pub async fn health() -> Result<web::Json<HealthResponse>, Error> {
    Ok(web::Json(HealthResponse {
        status: "healthy".to_string(),
    }))
}
