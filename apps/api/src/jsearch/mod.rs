//! JSearch client (RapidAPI): salary estimates and live job listings.
//!
//! Every failure mode (missing key, non-200, transport error, timeout, bad body)
//! is folded into an error record. Nothing here returns `Err` to callers of the
//! public operations; the agents that call these tools present partial results.

pub mod handlers;
pub mod types;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

pub use types::{JobRecord, JobSearchParams, SalaryEstimate};
use types::{SalaryBody, SalaryFigures, SearchBody};

pub const DEFAULT_HOST: &str = "jsearch.p.rapidapi.com";
pub const DEFAULT_BASE_URL: &str = "https://jsearch.p.rapidapi.com";
const SALARY_TIMEOUT: Duration = Duration::from_secs(10);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum JSearchError {
    #[error("RAPIDAPI_KEY not configured")]
    MissingCredential,

    /// Displays as the raw response body; that is what the error record carries.
    #[error("{body}")]
    Status { status: u16, body: String },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct JSearchConfig {
    pub api_key: Option<String>,
    pub host: String,
    pub base_url: String,
    pub default_location: String,
    pub default_country: String,
}

#[derive(Clone)]
pub struct JSearchClient {
    http: Client,
    config: JSearchConfig,
}

impl JSearchClient {
    pub fn new(http: Client, config: JSearchConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &JSearchConfig {
        &self.config
    }

    /// Estimated salary range for a title. `None` or a blank location uses the
    /// configured default region.
    pub async fn estimate_salary(&self, job_title: &str, location: Option<&str>) -> SalaryEstimate {
        let location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.config.default_location);

        match self.fetch_salary(job_title, location).await {
            Ok(figures) => SalaryEstimate {
                job_title: job_title.to_string(),
                location: Some(location.to_string()),
                min: figures.min,
                max: figures.max,
                currency: figures.currency,
                error: None,
            },
            Err(e) => {
                warn!("Salary estimate for '{job_title}' failed: {e}");
                SalaryEstimate::error(job_title, e.to_string())
            }
        }
    }

    /// Job listings for a free-text query. On failure returns a single error record.
    pub async fn search_jobs(&self, params: &JobSearchParams) -> Vec<JobRecord> {
        match self.fetch_jobs(params).await {
            Ok(records) => {
                debug!("Job search '{}' returned {} records", params.query, records.len());
                records
            }
            Err(e) => {
                warn!("Job search '{}' failed: {e}", params.query);
                vec![JobRecord::error(e.to_string())]
            }
        }
    }

    async fn fetch_salary(
        &self,
        job_title: &str,
        location: &str,
    ) -> Result<SalaryFigures, JSearchError> {
        let query = [
            ("job_title", job_title.to_string()),
            ("location", location.to_string()),
            ("location_type", "ANY".to_string()),
            ("years_of_experience", "ALL".to_string()),
        ];
        let body = self.get("estimated-salary", &query, SALARY_TIMEOUT).await?;
        Ok(parse_salary(&body)?)
    }

    async fn fetch_jobs(&self, params: &JobSearchParams) -> Result<Vec<JobRecord>, JSearchError> {
        let country = params
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.config.default_country);
        let query = [
            ("query", params.query.clone()),
            ("page", params.page.max(1).to_string()),
            ("num_pages", params.num_pages.max(1).to_string()),
            ("country", country.to_string()),
            ("date_posted", params.date_posted.as_str().to_string()),
        ];
        let body = self.get("search", &query, SEARCH_TIMEOUT).await?;
        Ok(parse_jobs(&body)?)
    }

    /// Authenticated GET. Checks the credential before touching the network.
    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<String, JSearchError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(JSearchError::MissingCredential)?;

        let url = format!("{}/{path}", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .get(url)
            .header("x-rapidapi-host", &self.config.host)
            .header("x-rapidapi-key", key)
            .query(query)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(JSearchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

fn parse_salary(body: &str) -> Result<SalaryFigures, serde_json::Error> {
    let parsed: SalaryBody = serde_json::from_str(body)?;
    Ok(parsed.estimated_salary.unwrap_or_default())
}

fn parse_jobs(body: &str) -> Result<Vec<JobRecord>, serde_json::Error> {
    let parsed: SearchBody = serde_json::from_str(body)?;
    Ok(parsed.data.into_iter().map(JobRecord::from).collect())
}
