//! Metrics endpoint handler.

use crate::{
    config::MetricsConfig,
    services::AppMetrics,
};
use actix_web::{web, Error, HttpRequest, HttpResponse, Result};
use paperclip::actix::api_v2_operation;

/// Prometheus metrics endpoint, scraped by the monitoring stack
#[api_v2_operation(
    summary = "Prometheus Metrics Endpoint",
    description = "Returns HTTP traffic and event analysis metrics in Prometheus text format.",
    tags("Metrics"),
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 503, description = "Metrics collection disabled")
    )
)]
pub async fn get_metrics(req: HttpRequest) -> Result<HttpResponse, Error> {
    if let Some(config) = req.app_data::<web::Data<MetricsConfig>>()
        && !config.enabled
    {
        return Ok(HttpResponse::ServiceUnavailable()
            .content_type("text/plain")
            .body("Metrics collection is disabled"));
    }

    let metrics = req
        .app_data::<web::Data<AppMetrics>>()
        .ok_or_else(|| actix_web::error::ErrorServiceUnavailable("Metrics not available"))?;

    metrics.update_uptime();
    let output = metrics.render().map_err(|e| {
        actix_web::error::ErrorInternalServerError(format!("Failed to render metrics: {e}"))
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(output))
}
