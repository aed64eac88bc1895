//! Event analysis endpoint handlers.
//!
//! Every endpoint is stateless: the CSV sources travel in the request body and
//! the statistics are recomputed for each call.

use crate::{
    config::{AnalysisConfig, SummarizerConfig},
    middleware::RequestId,
    models::{
        AnalysisResponse, EventSet, EventsRequest, NarrativeMetadata, NarrativePayload,
        NarrativeResponse, SummaryStatistics,
    },
    services::{
        AnalysisKind, AnalysisOptions, AppMetrics, EventAggregator, Ingested, IngestError,
        NarrativeSummarizer, PayloadLimits, ReportError, SimpleRateLimiter, SummarizerError,
        build_event_set, build_report, build_summary_table, enforce_rate_limit,
        summary_table_csv,
    },
    utils::http::{extract_client_ip, is_internal_request},
};
use actix_web::{
    Error, HttpRequest, HttpResponse, Result, error::InternalError, http::header, web,
};
use chrono::{Local, Utc};
use paperclip::actix::api_v2_operation;
use tracing::{error, info, warn};

struct Analysis {
    ingested: Ingested,
    statistics: SummaryStatistics,
}

impl Analysis {
    fn events(&self) -> &EventSet {
        &self.ingested.event_set
    }
}

fn analysis_config(req: &HttpRequest) -> AnalysisConfig {
    req.app_data::<web::Data<AnalysisConfig>>()
        .map(|config| config.get_ref().clone())
        .unwrap_or_default()
}

fn ingest_error(err: IngestError) -> Error {
    let message = match &err {
        IngestError::NoData { rejected } if !rejected.is_empty() => {
            let reasons: Vec<String> = rejected
                .iter()
                .map(|r| format!("{}: {}", r.name, r.reason))
                .collect();
            format!("{err} ({})", reasons.join("; "))
        }
        _ => err.to_string(),
    };
    actix_web::error::ErrorBadRequest(message)
}

fn report_error(err: ReportError) -> Error {
    match err {
        ReportError::NothingToReport => actix_web::error::ErrorBadRequest(err.to_string()),
        other => {
            error!(error = %other, "Failed to render analysis output");
            actix_web::error::ErrorInternalServerError("Failed to render analysis output")
        }
    }
}

fn summarizer_error(err: SummarizerError) -> Error {
    error!(error = %err, transient = err.is_transient(), "Narrative generation failed");
    match err {
        SummarizerError::Payload(_) => {
            actix_web::error::ErrorInternalServerError("Failed to build narrative payload")
        }
        other => actix_web::error::ErrorBadGateway(format!("Narrative generation failed: {other}")),
    }
}

/// Ingest the request's sources and aggregate them
fn run_analysis(
    req: &HttpRequest,
    body: &EventsRequest,
    kind: AnalysisKind,
) -> Result<Analysis, Error> {
    if body.options.top_hosts == Some(0) || body.options.top_descriptions == Some(0) {
        return Err(actix_web::error::ErrorBadRequest(
            "top_hosts and top_descriptions must be at least 1",
        ));
    }

    let config = analysis_config(req);
    let ingested = build_event_set(
        body.sources
            .iter()
            .map(|source| (source.name.as_str(), source.content.as_bytes())),
    )
    .map_err(ingest_error)?;

    let options = AnalysisOptions::for_request(&config, &body.options);
    let statistics = EventAggregator::new(options).aggregate(&ingested.event_set);

    if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
        metrics.record_analysis(kind, statistics.total_events);
    }

    info!(
        request_id = %RequestId::of(req),
        kind = kind.as_str(),
        sources = ingested.sources.len(),
        rejected = ingested.rejected.len(),
        total_events = statistics.total_events,
        "Event analysis completed"
    );

    Ok(Analysis {
        ingested,
        statistics,
    })
}

fn attachment(prefix: &str, extension: &str) -> header::ContentDisposition {
    let filename = format!("{prefix}_{}.{extension}", Local::now().format("%Y%m%d_%H%M%S"));
    header::ContentDisposition {
        disposition: header::DispositionType::Attachment,
        parameters: vec![header::DispositionParam::Filename(filename)],
    }
}

/// Event statistics endpoint
///
/// Ingests the uploaded CSV exports and returns the statistics snapshot with
/// a summary of each source.
#[api_v2_operation(
    summary = "Analyze Events",
    description = "Aggregates uploaded ITO/Zabbix event exports into severity, host, time, issue and duration statistics.",
    tags("Events"),
    responses(
        (status = 200, description = "Statistics computed", body = AnalysisResponse),
        (status = 400, description = "No usable event data or invalid options")
    )
)]
pub async fn analyze_events(
    req: HttpRequest,
    body: web::Json<EventsRequest>,
) -> Result<web::Json<AnalysisResponse>, Error> {
    let analysis = run_analysis(&req, &body, AnalysisKind::Statistics)?;

    Ok(web::Json(AnalysisResponse {
        generated_at: Utc::now().to_rfc3339(),
        sources: analysis.ingested.sources,
        rejected: analysis.ingested.rejected,
        statistics: analysis.statistics,
    }))
}

/// Text report endpoint
#[api_v2_operation(
    summary = "Event Report",
    description = "Renders the uploaded events as a plain-text report for download.",
    tags("Events"),
    responses(
        (status = 200, description = "Report as a text attachment", content_type = "text/plain"),
        (status = 400, description = "No usable event data or nothing to report")
    )
)]
pub async fn event_report(
    req: HttpRequest,
    body: web::Json<EventsRequest>,
) -> Result<HttpResponse, Error> {
    let analysis = run_analysis(&req, &body, AnalysisKind::Report)?;
    let report = build_report(
        analysis.events(),
        &analysis.statistics,
        Local::now().naive_local(),
    )
    .map_err(report_error)?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header(attachment("ito_report", "txt"))
        .body(report))
}

/// Summary table endpoint
#[api_v2_operation(
    summary = "Event Summary Table",
    description = "Returns the headline metrics as a CSV table (UTF-8 with BOM).",
    tags("Events"),
    responses(
        (status = 200, description = "Summary table as a CSV attachment", content_type = "text/csv"),
        (status = 400, description = "No usable event data")
    )
)]
pub async fn event_summary(
    req: HttpRequest,
    body: web::Json<EventsRequest>,
) -> Result<HttpResponse, Error> {
    let analysis = run_analysis(&req, &body, AnalysisKind::Summary)?;
    let rows = build_summary_table(&analysis.statistics);
    let csv = summary_table_csv(&rows).map_err(report_error)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(attachment("ito_summary", "csv"))
        .body(csv))
}

/// Narrative summary endpoint
///
/// Internal endpoint: sends a bounded payload built from the statistics and a
/// sample of rows to the configured language-model provider.
#[api_v2_operation(
    summary = "Event Narrative",
    description = "Generates a narrative analysis of the uploaded events. Internal use only, rate limited per client.",
    tags("Events"),
    responses(
        (status = 200, description = "Narrative generated", body = NarrativeResponse),
        (status = 400, description = "No usable event data or invalid options"),
        (status = 403, description = "Access forbidden - internal use only"),
        (status = 429, description = "Too Many Requests"),
        (status = 502, description = "Language model request failed"),
        (status = 503, description = "Narrative summarizer unavailable")
    )
)]
pub async fn event_narrative(
    req: HttpRequest,
    body: web::Json<EventsRequest>,
) -> Result<web::Json<NarrativeResponse>, Error> {
    let ip_address = extract_client_ip(&req);

    if !is_internal_request(&req) {
        warn!(
            ip = %ip_address,
            "Unauthorized access attempt to narrative endpoint"
        );
        return Err(actix_web::error::ErrorForbidden(
            "This endpoint is for internal use only",
        ));
    }

    if let Some(limiter) = req.app_data::<web::Data<SimpleRateLimiter>>()
        && let Err(response) = enforce_rate_limit(&req, limiter)
    {
        return Err(InternalError::from_response("Rate limit exceeded", response).into());
    }

    let summarizer = req
        .app_data::<web::Data<NarrativeSummarizer>>()
        .ok_or_else(|| {
            actix_web::error::ErrorServiceUnavailable("Narrative summarizer unavailable")
        })?;

    let analysis = run_analysis(&req, &body, AnalysisKind::Narrative)?;
    let limits = PayloadLimits::from(&analysis_config(&req));
    let payload = NarrativePayload::build(analysis.events(), &analysis.statistics, limits)
        .map_err(|e| summarizer_error(e.into()))?;
    let payload_bytes = payload
        .encoded_len()
        .map_err(|e| summarizer_error(e.into()))?;

    let narrative = summarizer
        .summarize(&payload)
        .await
        .map_err(summarizer_error)?;

    info!(
        request_id = %RequestId::of(&req),
        ip = %ip_address,
        provider = summarizer.provider_name(),
        payload_bytes,
        "Narrative generated"
    );

    Ok(web::Json(NarrativeResponse {
        narrative,
        statistics: analysis.statistics,
        metadata: NarrativeMetadata {
            generated_at: Utc::now().to_rfc3339(),
            provider: summarizer.provider_name().to_string(),
            payload_bytes: payload_bytes as u64,
            sample_rows: payload.sample_events.len() as u64,
        },
    }))
}

/// Build the summarizer for app data, or `None` when it cannot be created
pub fn narrative_summarizer(config: SummarizerConfig) -> Option<NarrativeSummarizer> {
    match NarrativeSummarizer::new(config) {
        Ok(summarizer) => Some(summarizer),
        Err(e) => {
            error!(error = %e, "Failed to initialize narrative summarizer");
            None
        }
    }
}
