use serde::{Deserialize, Serialize};

/// A normalized job listing. Every field is optional because the upstream API
/// omits fields freely. `error` is set only on error records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub url: Option<String>,
    pub posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryEstimate {
    pub job_title: String,
    pub location: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SalaryEstimate {
    pub fn error(job_title: &str, message: impl Into<String>) -> Self {
        Self {
            job_title: job_title.to_string(),
            location: None,
            min: None,
            max: None,
            currency: None,
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// `date_posted` filter accepted by the search endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePosted {
    #[default]
    All,
    Today,
    #[serde(rename = "3days")]
    ThreeDays,
    Week,
    Month,
}

impl DatePosted {
    pub fn as_str(self) -> &'static str {
        match self {
            DatePosted::All => "all",
            DatePosted::Today => "today",
            DatePosted::ThreeDays => "3days",
            DatePosted::Week => "week",
            DatePosted::Month => "month",
        }
    }
}

/// Parameters for `search_jobs`. `country` falls back to the configured default.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSearchParams {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page")]
    pub num_pages: u32,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub date_posted: DatePosted,
}

fn default_page() -> u32 {
    1
}

#[cfg(test)]
impl JobSearchParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
            num_pages: 1,
            country: None,
            date_posted: DatePosted::All,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Upstream wire shapes (lenient: every field may be missing)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SalaryBody {
    #[serde(default)]
    pub estimated_salary: Option<SalaryFigures>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SalaryFigures {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchBody {
    #[serde(default)]
    pub data: Vec<RawJob>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawJob {
    pub job_title: Option<String>,
    pub employer_name: Option<String>,
    pub job_city: Option<String>,
    pub job_apply_link: Option<String>,
    pub job_posted_at_datetime_utc: Option<String>,
}

impl From<RawJob> for JobRecord {
    fn from(raw: RawJob) -> Self {
        Self {
            title: raw.job_title,
            company: raw.employer_name,
            location: raw.job_city,
            url: raw.job_apply_link,
            posted: raw.job_posted_at_datetime_utc,
            error: None,
        }
    }
}
