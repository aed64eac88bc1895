//! Event aggregation into summary statistics.

use crate::config::AnalysisConfig;
use crate::models::events::{
    percentage, CategoryCount, DailyCount, DurationStatistics, EventRecord, EventSet,
    HostStatistics, HourCount, RankedCount, SeverityBand, SeverityBanding, SeverityBreakdown,
    StatusBreakdown, SummaryStatistics, TimeStatistics, Trend, WindowComparison, NOT_APPLICABLE,
};
use crate::models::AnalysisOptionsRequest;
use crate::services::duration::{format_seconds, parse_duration, Locale};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

const HOURS_PER_DAY: usize = 24;
const BUSIEST_HOURS: usize = 5;

/// Knobs for one aggregation run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub banding: SeverityBanding,
    pub top_hosts: usize,
    pub top_descriptions: usize,
    pub problem_hosts: usize,
    pub locale: Locale,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for AnalysisOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            banding: SeverityBanding::default(),
            top_hosts: config.top_hosts,
            top_descriptions: config.top_descriptions,
            problem_hosts: config.problem_hosts,
            locale: config.locale,
        }
    }
}

impl AnalysisOptions {
    /// Server defaults with a request's overrides applied
    pub fn for_request(config: &AnalysisConfig, request: &AnalysisOptionsRequest) -> Self {
        let defaults = Self::from(config);

        Self {
            banding: defaults.banding.with_overrides(&request.severity_overrides),
            top_hosts: request.top_hosts.unwrap_or(defaults.top_hosts),
            top_descriptions: request.top_descriptions.unwrap_or(defaults.top_descriptions),
            problem_hosts: defaults.problem_hosts,
            locale: request.locale.unwrap_or(defaults.locale),
        }
    }
}

/// Occurrence counter that remembers first-seen order for tie breaking
#[derive(Debug, Default)]
struct Tally {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl Tally {
    fn add(&mut self, label: &str) {
        self.add_keyed(label.to_string(), label);
    }

    /// Group case-insensitively, keeping the first spelling seen
    fn add_folded(&mut self, label: &str) {
        self.add_keyed(label.to_lowercase(), label);
    }

    fn add_keyed(&mut self, key: String, label: &str) {
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 += 1,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((label.to_string(), 1));
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries by descending count; equal counts keep first-seen order
    fn ranked(mut self) -> Vec<(String, u64)> {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries
    }

    fn top(self, limit: usize, total: u64) -> Vec<RankedCount> {
        self.ranked()
            .into_iter()
            .take(limit)
            .map(|(label, count)| RankedCount {
                label,
                count,
                share: percentage(count, total),
            })
            .collect()
    }

    fn distribution(self) -> Vec<CategoryCount> {
        self.ranked()
            .into_iter()
            .map(|(label, count)| CategoryCount { label, count })
            .collect()
    }
}

fn is_problem(record: &EventRecord) -> bool {
    record
        .status
        .as_deref()
        .is_some_and(|status| status.eq_ignore_ascii_case("problem"))
}

fn is_resolved(record: &EventRecord) -> bool {
    record.status.as_deref().is_some_and(|status| {
        status.eq_ignore_ascii_case("ok") || status.eq_ignore_ascii_case("resolved")
    })
}

/// Computes [`SummaryStatistics`] snapshots from event sets
pub struct EventAggregator {
    options: AnalysisOptions,
}

impl EventAggregator {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Aggregate `set` into an immutable snapshot.
    ///
    /// Missing columns degrade the dependent statistics to empty results;
    /// this never fails.
    pub fn aggregate(&self, set: &EventSet) -> SummaryStatistics {
        let total_events = set.len() as u64;

        let statistics = SummaryStatistics {
            total_events,
            columns: set.columns(),
            severity: self.severity_breakdown(set),
            severity_distribution: Self::label_distribution(set, |r| r.severity.as_deref()),
            status: Self::status_breakdown(set),
            hosts: self.host_statistics(set),
            time: Self::time_statistics(set),
            top_descriptions: self.top_descriptions(set),
            durations: self.duration_statistics(set),
        };

        info!(
            total_events,
            critical = statistics.severity.critical,
            warning = statistics.severity.warning,
            distinct_hosts = statistics.hosts.distinct_hosts,
            has_time = statistics.time.is_some(),
            "Event aggregation completed"
        );

        statistics
    }

    /// Partition every row into exactly one severity band
    pub fn severity_breakdown(&self, set: &EventSet) -> SeverityBreakdown {
        let mut breakdown = SeverityBreakdown::default();
        let has_column = set.columns().severity;

        for record in set.records() {
            let band = if has_column {
                self.options.banding.classify(record.severity.as_deref())
            } else {
                SeverityBand::Unclassified
            };
            breakdown.add(band);
        }

        breakdown
    }

    fn label_distribution<F>(set: &EventSet, field: F) -> Vec<CategoryCount>
    where
        F: Fn(&EventRecord) -> Option<&str>,
    {
        let mut tally = Tally::default();
        for label in set.records().iter().filter_map(field) {
            tally.add_folded(label);
        }
        tally.distribution()
    }

    fn status_breakdown(set: &EventSet) -> StatusBreakdown {
        let records = set.records();

        StatusBreakdown {
            problem: records.iter().filter(|r| is_problem(r)).count() as u64,
            resolved: records.iter().filter(|r| is_resolved(r)).count() as u64,
            distribution: Self::label_distribution(set, |r| r.status.as_deref()),
        }
    }

    pub fn host_statistics(&self, set: &EventSet) -> HostStatistics {
        let total = set.len() as u64;
        let mut hosts = Tally::default();
        let mut problem_hosts = Tally::default();

        for record in set.records() {
            if let Some(host) = record.host.as_deref() {
                hosts.add(host);
                if is_problem(record) {
                    problem_hosts.add(host);
                }
            }
        }

        let distinct_hosts = hosts.len() as u64;
        let avg_events_per_host =
            (distinct_hosts > 0).then(|| total as f64 / distinct_hosts as f64);

        HostStatistics {
            distinct_hosts,
            top_hosts: hosts.top(self.options.top_hosts, total),
            avg_events_per_host,
            problem_hosts: problem_hosts.top(self.options.problem_hosts, total),
        }
    }

    /// Hour, day and recent-window statistics over the parseable timestamps.
    ///
    /// `None` when the set has no timestamp column or no value parsed.
    pub fn time_statistics(set: &EventSet) -> Option<TimeStatistics> {
        if !set.columns().timestamp {
            return None;
        }

        let mut stamps: Vec<NaiveDateTime> = Vec::with_capacity(set.len());
        let mut unparseable_timestamps = 0u64;
        for record in set.records() {
            match (record.timestamp, &record.raw_time) {
                (Some(timestamp), _) => stamps.push(timestamp),
                (None, Some(_)) => unparseable_timestamps += 1,
                (None, None) => {}
            }
        }

        let first_event = stamps.iter().min().copied()?;
        let last_event = stamps.iter().max().copied()?;

        let mut hourly = vec![0u64; HOURS_PER_DAY];
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for stamp in &stamps {
            hourly[stamp.hour() as usize] += 1;
            *per_day.entry(stamp.date()).or_insert(0) += 1;
        }

        let daily: Vec<DailyCount> = per_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect();

        // strict comparisons keep the earliest day on ties
        let mut busiest_day: Option<&DailyCount> = None;
        let mut quietest_day: Option<&DailyCount> = None;
        for day in &daily {
            if busiest_day.is_none_or(|best| day.count > best.count) {
                busiest_day = Some(day);
            }
            if quietest_day.is_none_or(|best| day.count < best.count) {
                quietest_day = Some(day);
            }
        }
        let busiest_day = busiest_day.cloned();
        let quietest_day = quietest_day.cloned();

        let mean_per_day = stamps.len() as f64 / daily.len() as f64;

        let mut peak_hour = 0u32;
        for (hour, count) in hourly.iter().enumerate() {
            if *count > hourly[peak_hour as usize] {
                peak_hour = hour as u32;
            }
        }

        let mut busiest_hours: Vec<HourCount> = hourly
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(hour, count)| HourCount {
                hour: hour as u32,
                count: *count,
            })
            .collect();
        busiest_hours.sort_by(|a, b| b.count.cmp(&a.count));
        busiest_hours.truncate(BUSIEST_HOURS);

        let recent_window = Self::recent_window(&stamps, last_event);

        debug!(
            days = daily.len(),
            peak_hour,
            unparseable_timestamps,
            "Time statistics computed"
        );

        Some(TimeStatistics {
            first_event,
            last_event,
            span_days: (last_event - first_event).num_days() + 1,
            hourly,
            daily,
            busiest_day,
            quietest_day,
            mean_per_day,
            peak_hour,
            busiest_hours,
            unparseable_timestamps,
            recent_window,
        })
    }

    /// Compare `[latest - 24h, latest]` with `[latest - 48h, latest - 24h)`
    pub fn recent_window(stamps: &[NaiveDateTime], latest: NaiveDateTime) -> WindowComparison {
        let recent_start = latest - Duration::hours(24);
        let previous_start = latest - Duration::hours(48);

        let recent = stamps.iter().filter(|t| **t >= recent_start).count() as u64;
        let previous = stamps
            .iter()
            .filter(|t| **t >= previous_start && **t < recent_start)
            .count() as u64;

        let change_pct = if previous > 0 {
            (recent as f64 - previous as f64) / previous as f64 * 100.0
        } else {
            0.0
        };

        let trend = match recent.cmp(&previous) {
            std::cmp::Ordering::Greater => Trend::Increasing,
            std::cmp::Ordering::Less => Trend::Decreasing,
            std::cmp::Ordering::Equal => Trend::Steady,
        };

        WindowComparison {
            recent,
            previous,
            change_pct,
            trend,
        }
    }

    pub fn top_descriptions(&self, set: &EventSet) -> Vec<RankedCount> {
        let mut tally = Tally::default();
        for description in set.records().iter().filter_map(|r| r.description.as_deref()) {
            tally.add(description);
        }
        tally.top(self.options.top_descriptions, set.len() as u64)
    }

    /// Average and maximum over rows with a present, positive duration
    pub fn duration_statistics(&self, set: &EventSet) -> DurationStatistics {
        let measured: Vec<u64> = set
            .records()
            .iter()
            .filter_map(|r| r.duration.as_deref())
            .filter_map(parse_duration)
            .filter(|seconds| *seconds > 0)
            .collect();

        if measured.is_empty() {
            return DurationStatistics::default();
        }

        let total: u128 = measured.iter().map(|s| u128::from(*s)).sum();
        let average_seconds = (total / measured.len() as u128) as u64;
        let max_seconds = measured.iter().max().copied();
        let locale = self.options.locale;

        DurationStatistics {
            measured_events: measured.len() as u64,
            average_seconds: Some(average_seconds),
            max_seconds,
            average: format_seconds(average_seconds, locale),
            max: max_seconds
                .map(|s| format_seconds(s, locale))
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        }
    }
}

impl Default for EventAggregator {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}
