//! Analysis and report configuration.

use crate::services::duration::Locale;
use std::env;

/// Defaults applied to every analysis request
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Hosts listed in the ranked host block
    pub top_hosts: usize,
    /// Descriptions listed in the top-issues block
    pub top_descriptions: usize,
    /// Hosts listed among `PROBLEM` rows
    pub problem_hosts: usize,
    pub locale: Locale,
    /// Upper bound for a JSON request body carrying CSV sources
    pub max_upload_bytes: usize,
    /// Raw rows offered to the narrative provider
    pub sample_rows: usize,
    /// Serialized size bound of the narrative payload
    pub max_payload_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_hosts: 10,
            top_descriptions: 15,
            problem_hosts: 5,
            locale: Locale::En,
            max_upload_bytes: 20 * 1024 * 1024,
            sample_rows: 50,
            max_payload_bytes: 16 * 1024,
        }
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl AnalysisConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            top_hosts: env_usize("ANALYSIS_TOP_HOSTS", defaults.top_hosts),
            top_descriptions: env_usize("ANALYSIS_TOP_DESCRIPTIONS", defaults.top_descriptions),
            problem_hosts: env_usize("ANALYSIS_PROBLEM_HOSTS", defaults.problem_hosts),
            locale: env::var("REPORT_LOCALE")
                .ok()
                .and_then(|v| Locale::from_tag(&v))
                .unwrap_or(defaults.locale),
            max_upload_bytes: env_usize("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            sample_rows: env_usize("NARRATIVE_SAMPLE_ROWS", defaults.sample_rows),
            max_payload_bytes: env_usize("NARRATIVE_MAX_PAYLOAD_BYTES", defaults.max_payload_bytes),
        }
    }
}
