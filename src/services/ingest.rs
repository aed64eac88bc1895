//! CSV ingestion for event-log exports.
//!
//! Column names differ between Zabbix versions, ITO tooling and localized
//! exports, so each semantic field has one ordered alias list that is resolved
//! once per header row. Rows are read leniently: unreadable records are counted
//! and skipped, unparseable timestamps become absent.

use crate::models::{
    ColumnPresence, EventRecord, EventSet, RejectedSource, SourceSummary,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const TIMESTAMP_ALIASES: &[&str] = &["time", "timestamp", "date", "clock", "시간", "발생시간"];
const HOST_ALIASES: &[&str] = &["host", "hostname", "host name", "호스트"];
const SEVERITY_ALIASES: &[&str] = &["severity", "level", "심각도"];
const STATUS_ALIASES: &[&str] = &["status", "state", "상태"];
const DESCRIPTION_ALIASES: &[&str] = &["description", "problem", "message", "name", "설명", "문제"];
const DURATION_ALIASES: &[&str] = &["duration", "지속시간"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source '{0}' has no header row")]
    MissingHeader(String),

    #[error("source '{0}' contains no event rows")]
    EmptySource(String),

    #[error("source '{0}' duplicates an earlier upload")]
    DuplicateSource(String),

    #[error("failed to read source '{name}': {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    #[error("no usable event data in {} source(s)", .rejected.len())]
    NoData { rejected: Vec<RejectedSource> },
}

/// Header positions of the semantic columns in one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub timestamp: Option<usize>,
    pub host: Option<usize>,
    pub severity: Option<usize>,
    pub status: Option<usize>,
    pub description: Option<usize>,
    pub duration: Option<usize>,
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

impl ColumnMap {
    /// Resolve every field against its alias list; earlier aliases win
    pub fn resolve(headers: &StringRecord) -> Self {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|header| header.as_str() == *alias))
        };

        Self {
            timestamp: find(TIMESTAMP_ALIASES),
            host: find(HOST_ALIASES),
            severity: find(SEVERITY_ALIASES),
            status: find(STATUS_ALIASES),
            description: find(DESCRIPTION_ALIASES),
            duration: find(DURATION_ALIASES),
        }
    }

    pub fn presence(&self) -> ColumnPresence {
        ColumnPresence {
            timestamp: self.timestamp.is_some(),
            host: self.host.is_some(),
            severity: self.severity.is_some(),
            status: self.status.is_some(),
            description: self.description.is_some(),
            duration: self.duration.is_some(),
        }
    }

    fn record(&self, row: &StringRecord) -> EventRecord {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let raw_time = cell(self.timestamp);
        let timestamp = raw_time.as_deref().and_then(parse_timestamp);

        EventRecord {
            raw_time: if timestamp.is_none() { raw_time } else { None },
            timestamp,
            host: cell(self.host),
            severity: cell(self.severity),
            status: cell(self.status),
            description: cell(self.description),
            duration: cell(self.duration),
        }
    }
}

/// Parse an export timestamp as naive local time
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn decode<'a>(name: &str, bytes: &'a [u8]) -> Cow<'a, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        warn!(source = %name, "Source is not valid UTF-8, invalid sequences replaced");
    }
    text
}

/// One successfully parsed source
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub summary: SourceSummary,
    pub records: Vec<EventRecord>,
    pub columns: ColumnPresence,
}

/// Parse one CSV export into event records
pub fn parse_source(name: &str, bytes: &[u8]) -> Result<ParsedSource, IngestError> {
    let fingerprint = hex::encode(Sha256::digest(bytes));
    let text = decode(name, bytes);

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| IngestError::Csv {
            name: name.to_string(),
            source,
        })?
        .clone();

    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(IngestError::MissingHeader(name.to_string()));
    }

    let columns = ColumnMap::resolve(&headers);
    debug!(source = %name, columns = ?columns, "Resolved column aliases");

    let mut records = Vec::new();
    let mut skipped_rows = 0u64;
    for result in reader.records() {
        match result {
            Ok(row) => records.push(columns.record(&row)),
            Err(e) => {
                skipped_rows += 1;
                debug!(source = %name, error = %e, "Skipping unreadable record");
            }
        }
    }

    if records.is_empty() {
        return Err(IngestError::EmptySource(name.to_string()));
    }

    let hosts: HashSet<&str> = records.iter().filter_map(|r| r.host.as_deref()).collect();
    let first_seen = records.iter().filter_map(|r| r.timestamp).min();
    let last_seen = records.iter().filter_map(|r| r.timestamp).max();

    let summary = SourceSummary {
        name: name.to_string(),
        fingerprint,
        rows: records.len() as u64,
        skipped_rows,
        hosts: hosts.len() as u64,
        first_seen,
        last_seen,
    };

    Ok(ParsedSource {
        summary,
        records,
        columns: columns.presence(),
    })
}

/// Sources merged into one event set
#[derive(Debug, Clone)]
pub struct Ingested {
    pub event_set: EventSet,
    pub sources: Vec<SourceSummary>,
    pub rejected: Vec<RejectedSource>,
}

/// Parse every source in order and concatenate the usable ones.
///
/// A source that fails to parse, or whose bytes repeat an earlier source, is
/// reported in `rejected` and does not stop the others from loading.
pub fn build_event_set<'a, I>(sources: I) -> Result<Ingested, IngestError>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut event_set = EventSet::default();
    let mut summaries = Vec::new();
    let mut rejected = Vec::new();
    let mut fingerprints = HashSet::new();

    for (name, bytes) in sources {
        let outcome = parse_source(name, bytes).and_then(|parsed| {
            if fingerprints.contains(&parsed.summary.fingerprint) {
                Err(IngestError::DuplicateSource(name.to_string()))
            } else {
                Ok(parsed)
            }
        });

        match outcome {
            Ok(parsed) => {
                fingerprints.insert(parsed.summary.fingerprint.clone());
                event_set.append(parsed.records, parsed.columns);
                summaries.push(parsed.summary);
            }
            Err(e) => {
                warn!(source = %name, error = %e, "Source rejected");
                rejected.push(RejectedSource {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if event_set.is_empty() {
        return Err(IngestError::NoData { rejected });
    }

    info!(
        sources = summaries.len(),
        rejected = rejected.len(),
        events = event_set.len(),
        "Event set assembled"
    );

    Ok(Ingested {
        event_set,
        sources: summaries,
        rejected,
    })
}
