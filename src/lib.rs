//! ITO Insight - analytics for ITO/Zabbix event-log exports
//!
//! The service ingests CSV event exports and turns them into:
//! - a statistics snapshot (severity bands, hosts, time patterns, durations)
//! - a plain-text report and a CSV summary table
//! - a narrative summary from a language model or a local mock
//!
//! ## Architecture
//!
//! - `models/` - Event records, statistics snapshot and API models
//! - `services/` - Duration codec, ingestion, aggregation, reports, narratives
//! - `handlers/` - HTTP request handlers and the app factory
//! - `middleware/` - Request telemetry
//! - `config/` - Configuration structures and environment loading
//! - `utils/` - Request helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use ito_insight::{EventAggregator, build_event_set, build_report};
//!
//! let csv = b"Time,Host,Severity\n2024-05-01 09:00:00,web-01,High\n";
//! let ingested = build_event_set([("export.csv", &csv[..])]).unwrap();
//! let stats = EventAggregator::default().aggregate(&ingested.event_set);
//! let report = build_report(
//!     &ingested.event_set,
//!     &stats,
//!     chrono::Local::now().naive_local(),
//! )
//! .unwrap();
//! println!("{report}");
//! ```

pub mod config;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{
    AnalysisConfig, MetricsConfig, ProxyConfig, RateLimitConfig, ServerConfig, SummarizerConfig,
};
pub use handlers::{
    SharedState, analyze_events, create_app, create_base_app, create_openapi_spec,
    event_narrative, event_report, event_summary, get_metrics, health, version,
};
pub use middleware::{RequestId, TelemetryMiddleware};
pub use models::{
    AnalysisResponse, EventRecord, EventSet, EventsRequest, HealthResponse, NarrativeResponse,
    SeverityBand, SeverityBanding, SummaryRow, SummaryStatistics, VersionResponse,
};
pub use services::{
    AnalysisOptions, AppMetrics, EventAggregator, Locale, NarrativeSummarizer, SimpleRateLimiter,
    build_event_set, build_report, build_summary_table, format_seconds, parse_duration,
    parse_to_seconds, summary_table_csv,
};
pub use utils::extract_client_ip;
