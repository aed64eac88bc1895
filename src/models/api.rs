//! Request and response models for the HTTP endpoints.

use crate::models::events::{SeverityBand, SummaryStatistics};
use crate::services::duration::Locale;
use chrono::NaiveDateTime;
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response model for the health check endpoint
#[derive(Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response model for the version information endpoint
#[derive(Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct VersionResponse {
    pub version: String,
    pub commit: String,
    pub build_time: String,
}

/// One uploaded CSV export
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct EventSource {
    /// File name as uploaded (e.g., "zabbix_2024-05.csv")
    pub name: String,
    /// Raw CSV text including the header row
    pub content: String,
}

/// Per-request analysis tuning; omitted fields use the server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Apiv2Schema)]
pub struct AnalysisOptionsRequest {
    pub top_hosts: Option<usize>,
    pub top_descriptions: Option<usize>,
    pub locale: Option<Locale>,
    /// Extra severity labels mapped to a band (e.g., {"p1": "critical"})
    #[serde(default)]
    pub severity_overrides: HashMap<String, SeverityBand>,
}

/// Body shared by all event endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct EventsRequest {
    pub sources: Vec<EventSource>,
    #[serde(default)]
    pub options: AnalysisOptionsRequest,
}

/// What was loaded from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct SourceSummary {
    pub name: String,
    /// SHA-256 of the raw bytes, hex encoded
    pub fingerprint: String,
    pub rows: u64,
    /// Records the CSV reader could not decode
    pub skipped_rows: u64,
    pub hosts: u64,
    pub first_seen: Option<NaiveDateTime>,
    pub last_seen: Option<NaiveDateTime>,
}

/// A source that contributed no rows, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct RejectedSource {
    pub name: String,
    pub reason: String,
}

/// Response of the analyze endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct AnalysisResponse {
    /// When the snapshot was computed (ISO 8601 format)
    pub generated_at: String,
    pub sources: Vec<SourceSummary>,
    pub rejected: Vec<RejectedSource>,
    pub statistics: SummaryStatistics,
}

/// One headline metric of the summary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct SummaryRow {
    pub label: String,
    pub value: String,
    /// Share of all events, "-" when not a proportion, "N/A" for an empty set
    pub percentage: String,
}

/// Metadata about the narrative generation
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct NarrativeMetadata {
    /// When the narrative was generated (ISO 8601 format)
    pub generated_at: String,
    pub provider: String,
    /// Serialized size of the payload sent to the provider
    pub payload_bytes: u64,
    pub sample_rows: u64,
}

/// Narrative summary with the statistics it was derived from
#[derive(Debug, Clone, Serialize, Deserialize, Apiv2Schema)]
pub struct NarrativeResponse {
    pub narrative: String,
    pub statistics: SummaryStatistics,
    pub metadata: NarrativeMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_request_defaults_options() {
        let body = r#"{"sources":[{"name":"a.csv","content":"Host\nweb-01\n"}]}"#;
        let request: EventsRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.sources.len(), 1);
        assert!(request.options.top_hosts.is_none());
        assert!(request.options.severity_overrides.is_empty());
    }

    #[test]
    fn test_options_parse_locale_and_overrides() {
        let body = r#"{"sources":[],"options":{"locale":"ko","severity_overrides":{"P1":"critical"}}}"#;
        let request: EventsRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.options.locale, Some(Locale::Ko));
        assert_eq!(
            request.options.severity_overrides.get("P1"),
            Some(&SeverityBand::Critical)
        );
    }
}
