//! Narrative summaries of an analysis.
//!
//! A [`NarrativePayload`] condenses a statistics snapshot and a handful of raw
//! rows into a bounded JSON document. [`NarrativeSummarizer`] turns that
//! payload into prose, either locally (mock provider) or through an
//! OpenAI-compatible or Azure OpenAI chat-completions endpoint.

use crate::config::{AnalysisConfig, SummarizerConfig, SummarizerProvider};
use crate::models::events::{
    EventRecord, EventSet, RankedCount, SeverityBand, SummaryStatistics, Trend,
};
use crate::models::narrative::{BandShare, HostAnalysis, NarrativePayload, TimeAnalysis};
use crate::services::report::{truncate_label, MAX_ISSUE_CHARS};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, info, warn};
use url::Url;

const PAYLOAD_TOP_HOSTS: usize = 5;
const PAYLOAD_TOP_ISSUES: usize = 10;
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const RETRY_INITIAL_DELAY_MS: u64 = 100;
const RETRY_MAX_DELAY: Duration = Duration::from_secs(5);

pub const DISABLED_NOTICE: &str =
    "Narrative summarization is disabled. The statistics in this response are complete.";

const SYSTEM_PROMPT: &str = "You are an IT operations analyst. Summarize monitoring event \
    statistics for an operations team: overall assessment, key issues, affected hosts, \
    time patterns and recommended actions.";

/// Size limits for a narrative payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub sample_rows: usize,
    pub max_payload_bytes: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for PayloadLimits {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            sample_rows: config.sample_rows,
            max_payload_bytes: config.max_payload_bytes,
        }
    }
}

fn clip(text: &str) -> String {
    truncate_label(text, MAX_ISSUE_CHARS)
}

fn clip_ranked<'a, I>(items: I, limit: usize) -> Vec<RankedCount>
where
    I: IntoIterator<Item = &'a RankedCount>,
{
    items
        .into_iter()
        .take(limit)
        .map(|item| RankedCount {
            label: clip(&item.label),
            count: item.count,
            share: item.share,
        })
        .collect()
}

fn clip_record(record: &EventRecord) -> EventRecord {
    let clip_field = |field: &Option<String>| field.as_deref().map(clip);
    EventRecord {
        timestamp: record.timestamp,
        raw_time: clip_field(&record.raw_time),
        host: clip_field(&record.host),
        severity: clip_field(&record.severity),
        status: clip_field(&record.status),
        description: clip_field(&record.description),
        duration: clip_field(&record.duration),
    }
}

impl NarrativePayload {
    /// Build a payload from `stats` and the first rows of `set`.
    ///
    /// Every label and sample field is cut to [`MAX_ISSUE_CHARS`]. While the
    /// serialized payload exceeds `limits.max_payload_bytes`, entries are
    /// dropped from the tail: sample rows first, then top issues, then
    /// problem hosts and top hosts. Counts and shares are never cut.
    pub fn build(
        set: &EventSet,
        stats: &SummaryStatistics,
        limits: PayloadLimits,
    ) -> Result<Self, serde_json::Error> {
        let severity = SeverityBand::ALL
            .into_iter()
            .map(|band| BandShare {
                band,
                count: stats.severity.count(band),
                share: stats.severity.share(band),
            })
            .collect();

        let time_analysis = stats.time.as_ref().map(|time| TimeAnalysis {
            peak_hours: time.busiest_hours.clone(),
            recent_24h: time.recent_window.recent,
            previous_24h: time.recent_window.previous,
            trend: time.recent_window.trend,
            change_pct: time.recent_window.change_pct,
        });

        let host_analysis = (stats.hosts.distinct_hosts > 0).then(|| HostAnalysis {
            top_hosts: clip_ranked(&stats.hosts.top_hosts, PAYLOAD_TOP_HOSTS),
            avg_events_per_host: stats.hosts.avg_events_per_host,
            problem_hosts: clip_ranked(&stats.hosts.problem_hosts, usize::MAX),
        });

        let mut payload = Self {
            total_events: stats.total_events,
            severity,
            distinct_hosts: stats.hosts.distinct_hosts,
            time_analysis,
            host_analysis,
            top_issues: clip_ranked(&stats.top_descriptions, PAYLOAD_TOP_ISSUES),
            sample_events: set
                .records()
                .iter()
                .take(limits.sample_rows)
                .map(clip_record)
                .collect(),
        };

        let mut size = payload.encoded_len()?;
        while size > limits.max_payload_bytes && payload.drop_tail_entry() {
            size = payload.encoded_len()?;
        }

        if size > limits.max_payload_bytes {
            warn!(
                size,
                limit = limits.max_payload_bytes,
                "Narrative payload exceeds its bound with only aggregate counts left"
            );
        }

        debug!(
            size,
            sample_rows = payload.sample_events.len(),
            "Narrative payload built"
        );
        Ok(payload)
    }

    /// Remove the least important list entry; `false` when none is left
    fn drop_tail_entry(&mut self) -> bool {
        if self.sample_events.pop().is_some() || self.top_issues.pop().is_some() {
            return true;
        }
        self.host_analysis.as_mut().is_some_and(|hosts| {
            hosts.problem_hosts.pop().is_some() || hosts.top_hosts.pop().is_some()
        })
    }

    /// Size of the payload serialized as compact JSON
    pub fn encoded_len(&self) -> Result<usize, serde_json::Error> {
        serde_json::to_vec(self).map(|bytes| bytes.len())
    }
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("summarizer is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("invalid summarizer endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to serialize narrative payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("language model request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("language model response contained no text")]
    EmptyResponse,
}

impl SummarizerError {
    /// Whether another attempt may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_connect() || e.is_timeout(),
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Produces narrative text from a [`NarrativePayload`]
pub struct NarrativeSummarizer {
    config: SummarizerConfig,
    client: Option<Client>,
}

impl NarrativeSummarizer {
    pub fn new(config: SummarizerConfig) -> Result<Self, SummarizerError> {
        let client = if config.enabled && config.provider != SummarizerProvider::Mock {
            Some(
                Client::builder()
                    .timeout(Duration::from_secs(config.timeout_seconds))
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self { config, client })
    }

    /// Provider name reported in response metadata
    pub fn provider_name(&self) -> &'static str {
        if self.config.enabled {
            self.config.provider.as_str()
        } else {
            "disabled"
        }
    }

    pub async fn summarize(&self, payload: &NarrativePayload) -> Result<String, SummarizerError> {
        info!(
            provider = self.provider_name(),
            total_events = payload.total_events,
            sample_rows = payload.sample_events.len(),
            "Generating narrative summary"
        );

        if !self.config.enabled {
            return Ok(DISABLED_NOTICE.to_string());
        }

        match self.config.provider {
            SummarizerProvider::Mock => Ok(mock_narrative(payload)),
            SummarizerProvider::OpenAi | SummarizerProvider::Azure => self.complete(payload).await,
        }
    }

    /// Chat-completions URL for the configured provider
    pub fn endpoint(&self) -> Result<Url, SummarizerError> {
        match self.config.provider {
            SummarizerProvider::OpenAi => {
                let base = self.config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
                Ok(Url::parse(&format!(
                    "{}/chat/completions",
                    base.trim_end_matches('/')
                ))?)
            }
            SummarizerProvider::Azure => {
                let base = self
                    .config
                    .base_url
                    .as_deref()
                    .ok_or(SummarizerError::NotConfigured("azure endpoint is missing"))?;
                let mut url = Url::parse(&format!(
                    "{}/openai/deployments/{}/chat/completions",
                    base.trim_end_matches('/'),
                    self.config.model
                ))?;
                url.query_pairs_mut()
                    .append_pair("api-version", &self.config.api_version);
                Ok(url)
            }
            SummarizerProvider::Mock => Err(SummarizerError::NotConfigured(
                "mock provider has no endpoint",
            )),
        }
    }

    fn request_body(&self, payload: &NarrativePayload) -> Result<Value, SummarizerError> {
        let data = serde_json::to_string(payload)?;
        let mut body = json!({
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Analyze the following ITO event data:\n\n{data}")
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });
        if self.config.provider == SummarizerProvider::OpenAi {
            body["model"] = Value::String(self.config.model.clone());
        }
        Ok(body)
    }

    async fn complete(&self, payload: &NarrativePayload) -> Result<String, SummarizerError> {
        let client = self
            .client
            .as_ref()
            .ok_or(SummarizerError::NotConfigured("HTTP client is not initialized"))?;
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SummarizerError::NotConfigured("API key is missing"))?;
        let url = self.endpoint()?;
        let body = self.request_body(payload)?;

        let strategy = ExponentialBackoff::from_millis(RETRY_INITIAL_DELAY_MS)
            .max_delay(RETRY_MAX_DELAY)
            .map(jitter)
            .take(self.config.max_retries);

        RetryIf::spawn(
            strategy,
            || self.send(client, api_key, &url, &body),
            SummarizerError::is_transient,
        )
        .await
    }

    async fn send(
        &self,
        client: &Client,
        api_key: &str,
        url: &Url,
        body: &Value,
    ) -> Result<String, SummarizerError> {
        let request = client.post(url.clone()).json(body);
        let request = match self.config.provider {
            SummarizerProvider::Azure => request.header("api-key", api_key),
            _ => request.bearer_auth(api_key),
        };

        let response = request.send().await.inspect_err(|e| {
            warn!(
                host = url.host_str().unwrap_or("unknown"),
                error = %e,
                "Language model request failed"
            );
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                host = url.host_str().unwrap_or("unknown"),
                status = status.as_u16(),
                "Language model returned an error status"
            );
            return Err(SummarizerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;
        data.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or(SummarizerError::EmptyResponse)
    }
}

fn assessment(critical_share: f64) -> &'static str {
    if critical_share >= 20.0 {
        "high"
    } else if critical_share >= 5.0 {
        "elevated"
    } else {
        "low"
    }
}

/// Deterministic narrative rendered from the payload alone
pub fn mock_narrative(payload: &NarrativePayload) -> String {
    if payload.total_events == 0 {
        return "No events were available for analysis.".to_string();
    }

    let band_share = |band: SeverityBand| payload.severity.iter().find(|b| b.band == band);
    let critical = band_share(SeverityBand::Critical);
    let warning = band_share(SeverityBand::Warning);
    let critical_share = critical.and_then(|b| b.share).unwrap_or(0.0);

    let mut lines = vec![format!(
        "Overall assessment: {} risk. {} events were recorded across {} hosts; {} critical ({:.1}%) and {} warning ({:.1}%).",
        assessment(critical_share),
        payload.total_events,
        payload.distinct_hosts,
        critical.map(|b| b.count).unwrap_or(0),
        critical_share,
        warning.map(|b| b.count).unwrap_or(0),
        warning.and_then(|b| b.share).unwrap_or(0.0),
    )];

    if let Some(issue) = payload.top_issues.first() {
        lines.push(format!(
            "Key issue: \"{}\" occurred {} times.",
            issue.label, issue.count
        ));
    }

    if let Some(time) = &payload.time_analysis {
        if let Some(peak) = time.peak_hours.first() {
            lines.push(format!(
                "Time pattern: activity peaks at {:02}:00 with {} events.",
                peak.hour, peak.count
            ));
        }
        let trend = match time.trend {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Steady => "steady",
        };
        lines.push(format!(
            "The last 24 hours saw {} events against {} in the previous 24 hours ({trend}, {:+.1}%).",
            time.recent_24h, time.previous_24h, time.change_pct
        ));
    }

    if let Some(hosts) = &payload.host_analysis {
        match hosts.problem_hosts.first().or(hosts.top_hosts.first()) {
            Some(host) => lines.push(format!(
                "Recommendation: review {} first ({} events).",
                host.label, host.count
            )),
            None => lines.push("Recommendation: no single host stands out.".to_string()),
        }
    }

    lines.join("\n")
}
