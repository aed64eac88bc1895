//! Prometheus metrics for HTTP traffic and event analyses.

use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::{Duration, Instant};

const METRICS_ROUTE: &str = "/api/metrics";

/// Kind of analysis product served, used as the `kind` label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    Statistics,
    Report,
    Summary,
    Narrative,
}

impl AnalysisKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statistics => "statistics",
            Self::Report => "report",
            Self::Summary => "summary",
            Self::Narrative => "narrative",
        }
    }
}

/// Application metrics collector for Prometheus integration
#[derive(Clone)]
pub struct AppMetrics {
    pub registry: Registry,
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub app_uptime_seconds: Gauge,
    pub app_info: CounterVec,
    pub events_ingested_total: IntCounter,
    pub analyses_total: IntCounterVec,
    pub start_time: Instant,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "status", "route"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ]),
            &["method", "route"],
        )?;

        let app_uptime_seconds = Gauge::new("app_uptime_seconds", "Application uptime in seconds")?;

        let app_info = CounterVec::new(
            Opts::new("app_info", "Application information"),
            &["version", "commit", "build_time"],
        )?;

        let events_ingested_total = IntCounter::new(
            "events_ingested_total",
            "Event rows loaded from uploaded sources",
        )?;

        let analyses_total = IntCounterVec::new(
            Opts::new("analyses_total", "Completed analyses by product"),
            &["kind"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(app_uptime_seconds.clone()))?;
        registry.register(Box::new(app_info.clone()))?;
        registry.register(Box::new(events_ingested_total.clone()))?;
        registry.register(Box::new(analyses_total.clone()))?;

        app_info
            .with_label_values(&[
                env!("CARGO_PKG_VERSION"),
                env!("VERGEN_GIT_SHA"),
                env!("VERGEN_BUILD_TIMESTAMP"),
            ])
            .inc();

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            app_uptime_seconds,
            app_info,
            events_ingested_total,
            analyses_total,
            start_time: Instant::now(),
        })
    }

    /// Record an HTTP request with method, route, status, and duration
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        // scrapes would drown out real traffic
        if route == METRICS_ROUTE {
            return;
        }

        self.http_requests_total
            .with_label_values(&[method, &status.to_string(), route])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration.as_secs_f64());
    }

    /// Count one completed analysis over `events` rows
    pub fn record_analysis(&self, kind: AnalysisKind, events: u64) {
        self.events_ingested_total.inc_by(events);
        self.analyses_total.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn update_uptime(&self) {
        self.app_uptime_seconds
            .set(self.start_time.elapsed().as_secs_f64());
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_analysis() {
        let metrics = AppMetrics::new().unwrap();
        metrics.record_analysis(AnalysisKind::Report, 12);
        metrics.record_analysis(AnalysisKind::Report, 3);

        assert_eq!(metrics.events_ingested_total.get(), 15);
        assert_eq!(metrics.analyses_total.with_label_values(&["report"]).get(), 2);
        assert!(metrics.render().unwrap().contains("analyses_total{kind=\"report\"} 2"));
    }

    #[test]
    fn test_metrics_route_is_not_recorded() {
        let metrics = AppMetrics::new().unwrap();
        metrics.record_request("GET", "/api/metrics", 200, Duration::from_millis(3));
        metrics.record_request("POST", "/api/events/analyze", 200, Duration::from_millis(3));

        let rendered = metrics.render().unwrap();
        assert!(!rendered.contains("route=\"/api/metrics\""));
        assert!(rendered.contains("route=\"/api/events/analyze\""));
    }
}
