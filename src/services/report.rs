//! Text report and summary table rendering.
//!
//! Both outputs are pure functions of the event set and its statistics
//! snapshot; the generation time is passed in so that identical input always
//! renders identical text.

use crate::models::events::{
    percentage, EventSet, SeverityBand, SummaryStatistics, TimeStatistics, NOT_APPLICABLE,
};
use crate::models::SummaryRow;
use chrono::NaiveDateTime;
use std::fmt::{self, Write};
use thiserror::Error;
use tracing::debug;

/// Longest description shown before it is cut and marked with an ellipsis
pub const MAX_ISSUE_CHARS: usize = 100;

const RULE: &str =
    "================================================================================";
const NOT_A_SHARE: &str = "-";
const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("the event set is empty, nothing to report")]
    NothingToReport,

    #[error("failed to write summary table: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to render report: {0}")]
    Format(#[from] fmt::Error),

    #[error("summary table is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Format a count with comma thousands separators (`12345` -> `12,345`)
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Cut `text` to at most `max_chars` characters, appending `...` when cut
pub fn truncate_label(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

fn format_share(share: Option<f64>) -> String {
    share
        .map(|s| format!("{s:.1}%"))
        .unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

fn format_hour(hour: u32) -> String {
    format!("{hour:02}:00")
}

fn observed_period(time: Option<&TimeStatistics>) -> (String, String) {
    match time {
        Some(time) => (
            format!(
                "{} ~ {}",
                time.first_event.format("%Y-%m-%d %H:%M"),
                time.last_event.format("%Y-%m-%d %H:%M")
            ),
            time.span_days.to_string(),
        ),
        None => (NOT_APPLICABLE.to_string(), NOT_APPLICABLE.to_string()),
    }
}

/// Render the full text report.
///
/// Fails with [`ReportError::NothingToReport`] for an empty set rather than
/// printing a page of zero percentages.
pub fn build_report(
    set: &EventSet,
    stats: &SummaryStatistics,
    generated_at: NaiveDateTime,
) -> Result<String, ReportError> {
    if set.is_empty() || stats.total_events == 0 {
        return Err(ReportError::NothingToReport);
    }

    let total = stats.total_events;
    let time = stats.time.as_ref();
    let (period, days) = observed_period(time);
    let mut out = String::new();

    writeln!(out, "ITO Event Report")?;
    writeln!(out)?;
    writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "Period: {period}")?;
    writeln!(out, "Days covered: {days}")?;
    writeln!(out)?;
    writeln!(out, "{RULE}")?;

    writeln!(out)?;
    writeln!(out, "## Overall Summary")?;
    writeln!(out, "- Total events: {}", group_thousands(total))?;
    match time {
        Some(time) => {
            writeln!(out, "- Daily average: {:.1}", time.mean_per_day)?;
            if let Some(day) = &time.busiest_day {
                writeln!(out, "- Busiest day: {} ({})", day.date, group_thousands(day.count))?;
            }
            if let Some(day) = &time.quietest_day {
                writeln!(out, "- Quietest day: {} ({})", day.date, group_thousands(day.count))?;
            }
        }
        None => writeln!(out, "- Daily average: {NOT_APPLICABLE}")?,
    }

    writeln!(out)?;
    writeln!(out, "## Severity")?;
    for band in SeverityBand::ALL {
        writeln!(
            out,
            "- {}: {} ({})",
            band.label(),
            group_thousands(stats.severity.count(band)),
            format_share(stats.severity.share(band))
        )?;
    }
    writeln!(out, "- Problem: {}", group_thousands(stats.status.problem))?;
    writeln!(out, "- Resolved: {}", group_thousands(stats.status.resolved))?;

    writeln!(out)?;
    writeln!(out, "## Hosts")?;
    writeln!(out, "- Affected hosts: {}", group_thousands(stats.hosts.distinct_hosts))?;
    match stats.hosts.avg_events_per_host {
        Some(avg) => writeln!(out, "- Average events per host: {avg:.1}")?,
        None => writeln!(out, "- Average events per host: {NOT_APPLICABLE}")?,
    }
    if !stats.hosts.top_hosts.is_empty() {
        writeln!(out)?;
        writeln!(out, "### Top {} hosts", stats.hosts.top_hosts.len())?;
        for (rank, host) in stats.hosts.top_hosts.iter().enumerate() {
            writeln!(
                out,
                "  {:2}. {}: {} ({})",
                rank + 1,
                host.label,
                group_thousands(host.count),
                format_share(host.share)
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "## Time")?;
    match time {
        Some(time) => {
            writeln!(out, "- Peak hour: {}", format_hour(time.peak_hour))?;
            if time.unparseable_timestamps > 0 {
                writeln!(
                    out,
                    "- Unparseable timestamps: {}",
                    group_thousands(time.unparseable_timestamps)
                )?;
            }
            let window = &time.recent_window;
            writeln!(
                out,
                "- Last 24h: {} (previous 24h: {}, change {:+.1}%)",
                group_thousands(window.recent),
                group_thousands(window.previous),
                window.change_pct
            )?;
            if !time.busiest_hours.is_empty() {
                writeln!(out)?;
                writeln!(out, "### Busiest hours")?;
                for hour in &time.busiest_hours {
                    writeln!(
                        out,
                        "  - {}: {}",
                        format_hour(hour.hour),
                        group_thousands(hour.count)
                    )?;
                }
            }
        }
        None => writeln!(out, "- Peak hour: {NOT_APPLICABLE}")?,
    }

    writeln!(out)?;
    writeln!(out, "## Durations")?;
    writeln!(out, "- Average duration: {}", stats.durations.average)?;
    writeln!(out, "- Longest duration: {}", stats.durations.max)?;

    writeln!(out)?;
    writeln!(out, "## Top Issues")?;
    if stats.top_descriptions.is_empty() {
        writeln!(out, "- {NOT_APPLICABLE}")?;
    }
    for (rank, issue) in stats.top_descriptions.iter().enumerate() {
        writeln!(
            out,
            "{:2}. {}",
            rank + 1,
            truncate_label(&issue.label, MAX_ISSUE_CHARS)
        )?;
        writeln!(
            out,
            "    - Occurrences: {} ({})",
            group_thousands(issue.count),
            format_share(issue.share)
        )?;
    }

    writeln!(out)?;
    writeln!(out, "{RULE}")?;

    debug!(total_events = total, bytes = out.len(), "Report rendered");
    Ok(out)
}

fn row(label: &str, value: String, percentage: String) -> SummaryRow {
    SummaryRow {
        label: label.to_string(),
        value,
        percentage,
    }
}

/// Headline metrics as `(label, value, percentage)` rows
pub fn build_summary_table(stats: &SummaryStatistics) -> Vec<SummaryRow> {
    let total = stats.total_events;
    let time = stats.time.as_ref();
    let not_a_share = || NOT_A_SHARE.to_string();

    let mut rows = vec![
        row("Total events", group_thousands(total), not_a_share()),
        row(
            "Daily average events",
            time.map(|t| format!("{:.1}", t.mean_per_day))
                .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
            not_a_share(),
        ),
    ];

    for band in SeverityBand::ALL {
        let count = stats.severity.count(band);
        rows.push(row(
            band.label(),
            group_thousands(count),
            format_share(percentage(count, total)),
        ));
    }

    rows.push(row(
        "Affected hosts",
        group_thousands(stats.hosts.distinct_hosts),
        not_a_share(),
    ));
    rows.push(row(
        "Average duration",
        stats.durations.average.clone(),
        not_a_share(),
    ));
    rows.push(row("Longest duration", stats.durations.max.clone(), not_a_share()));
    rows.push(row(
        "Peak hour",
        time.map(|t| format_hour(t.peak_hour))
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        not_a_share(),
    ));

    rows
}

/// Serialize summary rows as CSV with a UTF-8 byte order mark, so that
/// spreadsheet applications pick the right encoding
pub fn summary_table_csv(rows: &[SummaryRow]) -> Result<String, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Item", "Value", "Share"])?;
    for row in rows {
        writer.write_record([&row.label, &row.value, &row.percentage])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Csv(e.into_error().into()))?;

    let mut csv = String::with_capacity(bytes.len() + UTF8_BOM.len_utf8());
    csv.push(UTF8_BOM);
    csv.push_str(&String::from_utf8(bytes)?);
    Ok(csv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::events::{ColumnPresence, EventRecord};
    use crate::services::aggregator::EventAggregator;

    fn at(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn sample_set() -> EventSet {
        let rows = [
            ("2024-05-01 09:10:00", "web-01", "Disaster", "PROBLEM", "Disk full on /var", "1h"),
            ("2024-05-01 09:40:00", "web-01", "Warning", "OK", "CPU load high", "30m"),
            ("2024-05-02 14:00:00", "db-01", "Warning", "PROBLEM", "Disk full on /var", ""),
            ("2024-05-03 09:00:00", "web-02", "Information", "OK", "Agent restarted", "2h 15m"),
        ];
        let records = rows
            .iter()
            .map(|(time, host, severity, status, description, duration)| EventRecord {
                timestamp: Some(at(time)),
                raw_time: None,
                host: Some(host.to_string()),
                severity: Some(severity.to_string()),
                status: Some(status.to_string()),
                description: Some(description.to_string()),
                duration: (!duration.is_empty()).then(|| duration.to_string()),
            })
            .collect();
        EventSet::new(
            records,
            ColumnPresence {
                timestamp: true,
                host: true,
                severity: true,
                status: true,
                description: true,
                duration: true,
            },
        )
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("short", 100), "short");
        let exact = "a".repeat(100);
        assert_eq!(truncate_label(&exact, 100), exact);
        let long = "b".repeat(130);
        assert_eq!(truncate_label(&long, 100), format!("{}...", "b".repeat(100)));
        let korean = "디스크".repeat(40);
        assert_eq!(truncate_label(&korean, 100).chars().count(), 103);
    }

    #[test]
    fn test_report_sections() {
        let set = sample_set();
        let stats = EventAggregator::default().aggregate(&set);
        let report = build_report(&set, &stats, at("2024-05-04 08:00:00")).unwrap();

        assert!(report.starts_with("ITO Event Report"));
        assert!(report.contains("Generated: 2024-05-04 08:00:00"));
        assert!(report.contains("Period: 2024-05-01 09:10 ~ 2024-05-03 09:00"));
        assert!(report.contains("Days covered: 2"));
        assert!(report.contains("- Total events: 4"));
        assert!(report.contains("- Critical: 1 (25.0%)"));
        assert!(report.contains("- Warning: 2 (50.0%)"));
        assert!(report.contains("- Informational: 1 (25.0%)"));
        assert!(report.contains("- Unclassified: 0 (0.0%)"));
        assert!(report.contains("   1. web-01: 2 (50.0%)"));
        assert!(report.contains("- Peak hour: 09:00"));
        assert!(report.contains("  - 09:00: 3"));
        assert!(report.contains("- Average duration: 1h 15m"));
        assert!(report.contains("- Longest duration: 2h 15m"));
        assert!(report.contains(" 1. Disk full on /var\n    - Occurrences: 2 (50.0%)"));
    }

    #[test]
    fn test_report_truncates_long_issues() {
        let long = "x".repeat(150);
        let mut set = sample_set();
        set.append(
            vec![EventRecord {
                description: Some(long),
                ..Default::default()
            }],
            ColumnPresence::default(),
        );
        let stats = EventAggregator::default().aggregate(&set);
        let report = build_report(&set, &stats, at("2024-05-04 08:00:00")).unwrap();

        assert!(report.contains(&format!("{}...", "x".repeat(100))));
        assert!(!report.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_report_is_reproducible() {
        let set = sample_set();
        let stats = EventAggregator::default().aggregate(&set);
        let generated_at = at("2024-05-04 08:00:00");
        assert_eq!(
            build_report(&set, &stats, generated_at).unwrap(),
            build_report(&set, &stats, generated_at).unwrap()
        );
    }

    #[test]
    fn test_report_without_time_column() {
        let records = vec![EventRecord {
            severity: Some("High".to_string()),
            ..Default::default()
        }];
        let set = EventSet::new(
            records,
            ColumnPresence {
                severity: true,
                ..Default::default()
            },
        );
        let stats = EventAggregator::default().aggregate(&set);
        let report = build_report(&set, &stats, at("2024-05-04 08:00:00")).unwrap();

        assert!(report.contains("Period: N/A"));
        assert!(report.contains("- Peak hour: N/A"));
        assert!(report.contains("- Average events per host: N/A"));
        assert!(report.contains("- Average duration: N/A"));
    }

    #[test]
    fn test_empty_set_has_nothing_to_report() {
        let set = EventSet::default();
        let stats = EventAggregator::default().aggregate(&set);
        let result = build_report(&set, &stats, at("2024-05-04 08:00:00"));
        assert!(matches!(result, Err(ReportError::NothingToReport)));
    }

    #[test]
    fn test_summary_table_rows() {
        let set = sample_set();
        let stats = EventAggregator::default().aggregate(&set);
        let rows = build_summary_table(&stats);

        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Total events",
                "Daily average events",
                "Critical",
                "Warning",
                "Informational",
                "Unclassified",
                "Affected hosts",
                "Average duration",
                "Longest duration",
                "Peak hour",
            ]
        );
        assert_eq!(rows[0].value, "4");
        assert_eq!(rows[0].percentage, "-");
        assert_eq!(rows[1].value, "1.3");
        assert_eq!(rows[3].percentage, "50.0%");
        assert_eq!(rows[6].value, "3");
        assert_eq!(rows[7].value, "1h 15m");
        assert_eq!(rows[9].value, "09:00");
    }

    #[test]
    fn test_summary_table_for_empty_set() {
        let stats = EventAggregator::default().aggregate(&EventSet::default());
        let rows = build_summary_table(&stats);
        assert_eq!(rows[1].value, "N/A");
        assert_eq!(rows[2].percentage, "N/A");
        assert_eq!(rows[9].value, "N/A");
    }

    #[test]
    fn test_summary_table_csv() {
        let rows = vec![
            row("Total events", "1,234".to_string(), "-".to_string()),
            row("Critical", "12".to_string(), "1.0%".to_string()),
        ];
        let csv = summary_table_csv(&rows).unwrap();

        assert!(csv.starts_with('\u{feff}'));
        let mut lines = csv.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next(), Some("Item,Value,Share"));
        assert_eq!(lines.next(), Some("Total events,\"1,234\",-"));
        assert_eq!(lines.next(), Some("Critical,12,1.0%"));
        assert_eq!(lines.next(), None);
    }
}
