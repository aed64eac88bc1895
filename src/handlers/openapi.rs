//! OpenAPI specification generation and app factory.

use crate::{
    config::{AnalysisConfig, MetricsConfig, ProxyConfig, RateLimitConfig, SummarizerConfig},
    handlers::{
        analyze_events, event_narrative, event_report, event_summary, get_metrics, health,
        narrative_summarizer, version,
    },
    middleware::TelemetryMiddleware,
    services::{rate_limit::SimpleRateLimiter, AppMetrics},
};
use actix_web::App;
use paperclip::actix::{web, OpenApiExt};
use paperclip::v2::models::{DefaultApiRaw, Info};

/// Creates the shared OpenAPI specification for the service
pub fn create_openapi_spec() -> DefaultApiRaw {
    DefaultApiRaw {
        info: Info {
            title: "ITO Insight".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: Some(
                "Analytics for ITO/Zabbix event-log exports.\n\n\
                ## Event endpoints\n\
                All `/api/events/*` endpoints take the same JSON body:\n\
                ```json\n\
                {\n\
                  \"sources\": [{ \"name\": \"export.csv\", \"content\": \"Time,Host,Severity,...\" }],\n\
                  \"options\": { \"top_hosts\": 10, \"top_descriptions\": 15, \"locale\": \"en\",\n\
                               \"severity_overrides\": { \"p1\": \"critical\" } }\n\
                }\n\
                ```\n\
                Columns are matched case-insensitively against alias lists (for example \
                `Severity`, `Level` or `심각도`). Missing columns degrade the statistics that \
                depend on them instead of failing the request.\n\
                \n\
                ## Narrative endpoint\n\
                `/api/events/narrative` is internal: callers must send `X-Internal-API-Key` \
                or come from a private network. It is rate limited per client address.".into(),
            ),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// State shared by every worker of one server.
///
/// `HttpServer` calls the app factory once per worker; the limiter and the
/// metrics registry are created once and cloned into each app so that
/// budgets and counters cover the whole process.
#[derive(Clone)]
pub struct SharedState {
    pub limiter: web::Data<SimpleRateLimiter>,
    pub metrics: web::Data<AppMetrics>,
}

impl SharedState {
    /// Build the shared state from environment configuration
    pub fn from_env() -> Result<Self, prometheus::Error> {
        Ok(Self {
            limiter: web::Data::new(SimpleRateLimiter::new(RateLimitConfig::from_env())),
            metrics: web::Data::new(AppMetrics::new()?),
        })
    }
}

/// Creates a standalone application with its own shared state.
///
/// Used by the integration tests; servers use [`create_app`].
pub fn create_base_app() -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    create_app(SharedState::from_env().expect("Failed to create metrics"))
}

/// Creates the application with routes, middleware and shared state.
///
/// Per-worker configuration is read from the environment.
pub fn create_app(
    shared: SharedState,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let analysis_config = AnalysisConfig::from_env();
    let metrics_config = MetricsConfig::from_env();
    let json_config = actix_web::web::JsonConfig::default().limit(analysis_config.max_upload_bytes);

    let mut app = App::new()
        .wrap(TelemetryMiddleware)
        .wrap_api_with_spec(create_openapi_spec())
        .app_data(json_config)
        .app_data(web::Data::new(analysis_config))
        .app_data(web::Data::new(ProxyConfig::from_env()))
        .app_data(shared.limiter)
        .app_data(web::Data::new(metrics_config))
        .app_data(shared.metrics);

    if let Some(summarizer) = narrative_summarizer(SummarizerConfig::from_env()) {
        app = app.app_data(web::Data::new(summarizer));
    }

    app.service(web::resource("/api/health").route(web::get().to(health)))
        .service(web::resource("/api/version").route(web::get().to(version)))
        .service(web::resource("/api/metrics").route(web::get().to(get_metrics)))
        .service(web::resource("/api/events/analyze").route(web::post().to(analyze_events)))
        .service(web::resource("/api/events/report").route(web::post().to(event_report)))
        .service(web::resource("/api/events/summary").route(web::post().to(event_summary)))
        .service(
            web::resource("/api/events/narrative").route(web::post().to(event_narrative)),
        )
        .with_json_spec_at("/api/spec/v2")
        .build()
}
