use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::agents::DEFAULT_MAX_TOOL_ITERATIONS;
use crate::jsearch::{self, JSearchConfig};
use crate::llm_client::ANTHROPIC_API_URL;
use crate::pipeline::{PipelineSettings, Stage};
use crate::web_search::{self, WebSearchConfig};

const DEFAULT_LOCATION: &str = "Bangladesh";
const DEFAULT_COUNTRY: &str = "bd";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_WEB_RESULTS: usize = 5;

/// Application configuration loaded from environment variables.
/// Start-up fails if the model key is missing; everything else has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_api_url: String,
    /// `None` leaves model calls unbounded.
    pub llm_timeout: Option<Duration>,
    pub jsearch: JSearchConfig,
    pub web_search: WebSearchConfig,
    pub pipeline: PipelineSettings,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let default_location = or("DEFAULT_LOCATION", DEFAULT_LOCATION);

        let stages = match var("PIPELINE_STAGES") {
            Some(list) => parse_stages(&list)?,
            None => Stage::ALL.to_vec(),
        };

        let listing_sites = match var("LISTING_SITES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => web_search::DEFAULT_LISTING_SITES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Ok(Config {
            anthropic_api_key: var("ANTHROPIC_API_KEY").with_context(|| {
                "Required environment variable 'ANTHROPIC_API_KEY' is not set".to_string()
            })?,
            anthropic_api_url: or("ANTHROPIC_API_URL", ANTHROPIC_API_URL),
            llm_timeout: var("LLM_TIMEOUT_SECS")
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?
                .map(Duration::from_secs),
            jsearch: JSearchConfig {
                api_key: var("RAPIDAPI_KEY"),
                host: or("RAPIDAPI_HOST", jsearch::DEFAULT_HOST),
                base_url: or("JSEARCH_BASE_URL", jsearch::DEFAULT_BASE_URL),
                default_location: default_location.clone(),
                default_country: or("DEFAULT_COUNTRY", DEFAULT_COUNTRY),
            },
            web_search: WebSearchConfig {
                base_url: web_search::DEFAULT_BASE_URL.to_string(),
                listing_sites,
                max_results: DEFAULT_WEB_RESULTS,
            },
            pipeline: PipelineSettings {
                stages,
                max_tool_iterations: parse_or(
                    var("MAX_TOOL_ITERATIONS"),
                    DEFAULT_MAX_TOOL_ITERATIONS,
                    "MAX_TOOL_ITERATIONS must be a non-negative integer",
                )?,
                strict_json: parse_or(
                    var("STRICT_JSON"),
                    false,
                    "STRICT_JSON must be 'true' or 'false'",
                )?,
                location: default_location,
            },
            max_upload_bytes: parse_or(
                var("MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
                "MAX_UPLOAD_BYTES must be a byte count",
            )?,
            port: parse_or(var("PORT"), 8080, "PORT must be a valid port number")?,
            rust_log: or("RUST_LOG", "info"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, msg: &'static str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v.to_ascii_lowercase().parse::<T>().context(msg),
        None => Ok(default),
    }
}

fn parse_stages(list: &str) -> Result<Vec<Stage>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Stage>().map_err(|e| anyhow!(e)))
        .collect::<Result<Vec<_>>>()
        .context("PIPELINE_STAGES must be a comma-separated list of stage names")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_only_model_key() {
        let config = config(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.anthropic_api_url, ANTHROPIC_API_URL);
        assert_eq!(config.llm_timeout, None);
        assert_eq!(config.jsearch.api_key, None);
        assert_eq!(config.jsearch.host, jsearch::DEFAULT_HOST);
        assert_eq!(config.jsearch.default_location, "Bangladesh");
        assert_eq!(config.jsearch.default_country, "bd");
        assert_eq!(config.web_search.listing_sites.len(), 3);
        assert_eq!(config.pipeline.stages, Stage::ALL.to_vec());
        assert_eq!(config.pipeline.max_tool_iterations, DEFAULT_MAX_TOOL_ITERATIONS);
        assert!(!config.pipeline.strict_json);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_missing_model_key_fails_start_up() {
        let err = config(&[("RAPIDAPI_KEY", "rk")]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = config(&[("ANTHROPIC_API_KEY", "   ")]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_overrides_are_read() {
        let config = config(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("LLM_TIMEOUT_SECS", "90"),
            ("RAPIDAPI_KEY", "rk"),
            ("DEFAULT_LOCATION", "Dhaka"),
            ("LISTING_SITES", "bdjobs.com, ,glassdoor.com"),
            ("PIPELINE_STAGES", "roles, skills,salary"),
            ("MAX_TOOL_ITERATIONS", "2"),
            ("STRICT_JSON", "TRUE"),
            ("PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(config.llm_timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.jsearch.api_key.as_deref(), Some("rk"));
        assert_eq!(config.pipeline.location, "Dhaka");
        assert_eq!(config.jsearch.default_location, "Dhaka");
        assert_eq!(config.web_search.listing_sites, vec!["bdjobs.com", "glassdoor.com"]);
        assert_eq!(
            config.pipeline.stages,
            vec![Stage::Roles, Stage::Skills, Stage::Salary]
        );
        assert_eq!(config.pipeline.max_tool_iterations, 2);
        assert!(config.pipeline.strict_json);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = config(&[("ANTHROPIC_API_KEY", "k"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        let err = config(&[("ANTHROPIC_API_KEY", "k"), ("PIPELINE_STAGES", "skills,payroll")])
            .unwrap_err();
        assert!(err.to_string().contains("PIPELINE_STAGES"));
    }
}
