//! Event records, severity banding and the statistics snapshot.

use chrono::{NaiveDate, NaiveDateTime};
use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder shown for any statistic that cannot be computed
pub const NOT_APPLICABLE: &str = "N/A";

const CRITICAL_LABELS: &[&str] = &["disaster", "high", "fatal", "critical", "error"];
const WARNING_LABELS: &[&str] = &["average", "warning", "major", "medium"];
const INFORMATIONAL_LABELS: &[&str] = &[
    "information",
    "informational",
    "info",
    "low",
    "minor",
    "not classified",
    "notice",
    "ok",
];

/// A single row from an event export. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,
    /// Time cell as written, kept when it could not be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// Which semantic columns were found in at least one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Apiv2Schema)]
pub struct ColumnPresence {
    pub timestamp: bool,
    pub host: bool,
    pub severity: bool,
    pub status: bool,
    pub description: bool,
    pub duration: bool,
}

impl ColumnPresence {
    pub fn merge(self, other: ColumnPresence) -> Self {
        Self {
            timestamp: self.timestamp || other.timestamp,
            host: self.host || other.host,
            severity: self.severity || other.severity,
            status: self.status || other.status,
            description: self.description || other.description,
            duration: self.duration || other.duration,
        }
    }
}

/// Events under analysis, in arrival order across all sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSet {
    records: Vec<EventRecord>,
    columns: ColumnPresence,
}

impl EventSet {
    pub fn new(records: Vec<EventRecord>, columns: ColumnPresence) -> Self {
        Self { records, columns }
    }

    /// Append the rows of another source, widening the known columns
    pub fn append(&mut self, records: Vec<EventRecord>, columns: ColumnPresence) {
        self.records.extend(records);
        self.columns = self.columns.merge(columns);
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn columns(&self) -> ColumnPresence {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Coarse risk tier derived from a raw severity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "lowercase")]
pub enum SeverityBand {
    Critical,
    Warning,
    Informational,
    Unclassified,
}

impl SeverityBand {
    pub const ALL: [SeverityBand; 4] = [
        SeverityBand::Critical,
        SeverityBand::Warning,
        SeverityBand::Informational,
        SeverityBand::Unclassified,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SeverityBand::Critical => "Critical",
            SeverityBand::Warning => "Warning",
            SeverityBand::Informational => "Informational",
            SeverityBand::Unclassified => "Unclassified",
        }
    }
}

/// Maps lower-cased severity labels to bands.
///
/// The default is the canonical Zabbix/ITO mapping; requests may add or
/// replace individual labels.
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityBanding {
    bands: HashMap<String, SeverityBand>,
}

impl Default for SeverityBanding {
    fn default() -> Self {
        let mut bands = HashMap::new();
        for (labels, band) in [
            (CRITICAL_LABELS, SeverityBand::Critical),
            (WARNING_LABELS, SeverityBand::Warning),
            (INFORMATIONAL_LABELS, SeverityBand::Informational),
        ] {
            for label in labels {
                bands.insert((*label).to_string(), band);
            }
        }
        Self { bands }
    }
}

impl SeverityBanding {
    /// Map `label` to `band`, replacing any existing mapping
    pub fn with_override(mut self, label: &str, band: SeverityBand) -> Self {
        let key = label.trim().to_lowercase();
        if !key.is_empty() {
            self.bands.insert(key, band);
        }
        self
    }

    /// Apply several overrides in label order.
    ///
    /// Labels that collide once lower-cased resolve deterministically: the
    /// one sorting last wins (`"p1"` over `"P1"`).
    pub fn with_overrides<'a, I>(self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a SeverityBand)>,
    {
        let mut overrides: Vec<_> = overrides.into_iter().collect();
        overrides.sort_by(|a, b| a.0.cmp(b.0));
        overrides
            .into_iter()
            .fold(self, |banding, (label, band)| banding.with_override(label, *band))
    }

    /// Band for a raw label; absent, empty or unknown labels are unclassified
    pub fn classify(&self, label: Option<&str>) -> SeverityBand {
        label
            .map(|l| l.trim().to_lowercase())
            .and_then(|key| self.bands.get(&key).copied())
            .unwrap_or(SeverityBand::Unclassified)
    }
}

/// Row counts per severity band. The four bands always sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct SeverityBreakdown {
    pub critical: u64,
    pub warning: u64,
    pub informational: u64,
    pub unclassified: u64,
}

impl SeverityBreakdown {
    pub fn add(&mut self, band: SeverityBand) {
        match band {
            SeverityBand::Critical => self.critical += 1,
            SeverityBand::Warning => self.warning += 1,
            SeverityBand::Informational => self.informational += 1,
            SeverityBand::Unclassified => self.unclassified += 1,
        }
    }

    pub fn count(&self, band: SeverityBand) -> u64 {
        match band {
            SeverityBand::Critical => self.critical,
            SeverityBand::Warning => self.warning,
            SeverityBand::Informational => self.informational,
            SeverityBand::Unclassified => self.unclassified,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical + self.warning + self.informational + self.unclassified
    }

    /// Share of `band` in percent; `None` when there are no events
    pub fn share(&self, band: SeverityBand) -> Option<f64> {
        percentage(self.count(band), self.total())
    }
}

/// `count` as a percentage of `total`, undefined for an empty total
pub fn percentage(count: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| count as f64 / total as f64 * 100.0)
}

/// Raw label with its number of occurrences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct CategoryCount {
    pub label: String,
    pub count: u64,
}

/// Ranked label with its count and percentage of all events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct RankedCount {
    pub label: String,
    pub count: u64,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct StatusBreakdown {
    /// Rows whose status is `PROBLEM`
    pub problem: u64,
    /// Rows whose status is `OK` or `RESOLVED`
    pub resolved: u64,
    pub distribution: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct HostStatistics {
    pub distinct_hosts: u64,
    pub top_hosts: Vec<RankedCount>,
    /// Total events divided by distinct hosts
    pub avg_events_per_host: Option<f64>,
    /// Hosts ranked by `PROBLEM` rows only
    pub problem_hosts: Vec<RankedCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Apiv2Schema)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Steady,
}

/// Last 24 hours before the latest event against the 24 hours before that
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct WindowComparison {
    pub recent: u64,
    pub previous: u64,
    /// Percent change; 0 when the previous window is empty
    pub change_pct: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct TimeStatistics {
    pub first_event: NaiveDateTime,
    pub last_event: NaiveDateTime,
    /// Calendar days covered, counting both ends
    pub span_days: i64,
    /// 24 buckets, index = hour of day
    pub hourly: Vec<u64>,
    pub daily: Vec<DailyCount>,
    pub busiest_day: Option<DailyCount>,
    pub quietest_day: Option<DailyCount>,
    pub mean_per_day: f64,
    pub peak_hour: u32,
    pub busiest_hours: Vec<HourCount>,
    pub unparseable_timestamps: u64,
    pub recent_window: WindowComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct DurationStatistics {
    pub measured_events: u64,
    pub average_seconds: Option<u64>,
    pub max_seconds: Option<u64>,
    pub average: String,
    pub max: String,
}

impl Default for DurationStatistics {
    fn default() -> Self {
        Self {
            measured_events: 0,
            average_seconds: None,
            max_seconds: None,
            average: NOT_APPLICABLE.to_string(),
            max: NOT_APPLICABLE.to_string(),
        }
    }
}

/// Aggregate snapshot of one event set at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Apiv2Schema)]
pub struct SummaryStatistics {
    pub total_events: u64,
    pub columns: ColumnPresence,
    pub severity: SeverityBreakdown,
    pub severity_distribution: Vec<CategoryCount>,
    pub status: StatusBreakdown,
    pub hosts: HostStatistics,
    pub time: Option<TimeStatistics>,
    pub top_descriptions: Vec<RankedCount>,
    pub durations: DurationStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_banding() {
        let banding = SeverityBanding::default();
        assert_eq!(banding.classify(Some("Disaster")), SeverityBand::Critical);
        assert_eq!(banding.classify(Some(" ERROR ")), SeverityBand::Critical);
        assert_eq!(banding.classify(Some("Average")), SeverityBand::Warning);
        assert_eq!(banding.classify(Some("Not classified")), SeverityBand::Informational);
        assert_eq!(banding.classify(Some("whatever")), SeverityBand::Unclassified);
        assert_eq!(banding.classify(Some("")), SeverityBand::Unclassified);
        assert_eq!(banding.classify(None), SeverityBand::Unclassified);
    }

    #[test]
    fn test_banding_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert("P1".to_string(), SeverityBand::Critical);
        overrides.insert("average".to_string(), SeverityBand::Informational);

        let banding = SeverityBanding::default().with_overrides(&overrides);
        assert_eq!(banding.classify(Some("p1")), SeverityBand::Critical);
        assert_eq!(banding.classify(Some("Average")), SeverityBand::Informational);
        assert_eq!(banding.classify(Some("High")), SeverityBand::Critical);
    }

    #[test]
    fn test_case_colliding_overrides_are_deterministic() {
        for _ in 0..20 {
            let mut overrides = HashMap::new();
            overrides.insert("P1".to_string(), SeverityBand::Critical);
            overrides.insert("p1".to_string(), SeverityBand::Warning);
            overrides.insert("Sev3".to_string(), SeverityBand::Informational);

            let banding = SeverityBanding::default().with_overrides(&overrides);
            assert_eq!(banding.classify(Some("P1")), SeverityBand::Warning);
            assert_eq!(banding.classify(Some("sev3")), SeverityBand::Informational);
        }
    }

    #[test]
    fn test_breakdown_shares() {
        let mut breakdown = SeverityBreakdown::default();
        for band in [
            SeverityBand::Critical,
            SeverityBand::Warning,
            SeverityBand::Warning,
            SeverityBand::Informational,
        ] {
            breakdown.add(band);
        }
        assert_eq!(breakdown.total(), 4);
        assert_eq!(breakdown.share(SeverityBand::Warning), Some(50.0));
        assert_eq!(breakdown.share(SeverityBand::Unclassified), Some(0.0));
        assert_eq!(SeverityBreakdown::default().share(SeverityBand::Critical), None);
    }

    #[test]
    fn test_event_set_append_merges_columns() {
        let mut set = EventSet::new(
            vec![EventRecord::default()],
            ColumnPresence {
                host: true,
                ..Default::default()
            },
        );
        set.append(
            vec![EventRecord::default()],
            ColumnPresence {
                severity: true,
                ..Default::default()
            },
        );
        assert_eq!(set.len(), 2);
        assert!(set.columns().host && set.columns().severity);
        assert!(!set.columns().timestamp);
    }

    #[test]
    fn test_statistics_serialization() {
        let stats = SummaryStatistics {
            total_events: 0,
            columns: ColumnPresence::default(),
            severity: SeverityBreakdown::default(),
            severity_distribution: vec![],
            status: StatusBreakdown::default(),
            hosts: HostStatistics::default(),
            time: None,
            top_descriptions: vec![],
            durations: DurationStatistics::default(),
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["durations"]["average"], "N/A");
        let _deserialized: SummaryStatistics = serde_json::from_value(json).unwrap();
    }
}
