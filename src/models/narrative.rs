//! Bounded summary handed to the language-model provider.

use crate::models::events::{EventRecord, HourCount, RankedCount, SeverityBand, Trend};
use serde::{Deserialize, Serialize};

/// Count and share of one severity band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandShare {
    pub band: SeverityBand,
    pub count: u64,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAnalysis {
    pub peak_hours: Vec<HourCount>,
    pub recent_24h: u64,
    pub previous_24h: u64,
    pub trend: Trend,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostAnalysis {
    pub top_hosts: Vec<RankedCount>,
    pub avg_events_per_host: Option<f64>,
    pub problem_hosts: Vec<RankedCount>,
}

/// JSON-serializable request payload for a narrative summary.
///
/// Built from a statistics snapshot plus the first rows of the event set;
/// sample rows are dropped from the end until the payload fits its byte bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativePayload {
    pub total_events: u64,
    pub severity: Vec<BandShare>,
    pub distinct_hosts: u64,
    pub time_analysis: Option<TimeAnalysis>,
    pub host_analysis: Option<HostAnalysis>,
    pub top_issues: Vec<RankedCount>,
    pub sample_events: Vec<EventRecord>,
}
