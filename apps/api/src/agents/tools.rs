//! Locally executed tools that completion units may call mid-generation.
//!
//! A tool never fails: bad arguments and upstream failures come back as
//! `{"error": ...}` records so the model can carry on with partial data.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::jsearch::{JSearchClient, JobSearchParams};
use crate::llm_client::ToolSpec;
use crate::web_search::WebSearchClient;

pub const ESTIMATE_SALARY: &str = "estimate_salary";
pub const SEARCH_JOBS: &str = "search_jobs";
pub const WEB_SEARCH: &str = "web_search";

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;
    async fn call(&self, input: Value) -> Value;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

fn error_record(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

fn decode<T: DeserializeOwned>(input: Value) -> Result<T, Value> {
    serde_json::from_value(input).map_err(|e| error_record(format!("invalid arguments: {e}")))
}

fn to_value<T: Serialize>(result: &T) -> Value {
    serde_json::to_value(result).unwrap_or_else(|e| error_record(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// estimate_salary
// ────────────────────────────────────────────────────────────────────────────

pub struct EstimateSalaryTool {
    client: JSearchClient,
}

impl EstimateSalaryTool {
    pub fn new(client: JSearchClient) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct SalaryArgs {
    job_title: String,
    #[serde(default)]
    location: Option<String>,
}

#[async_trait]
impl Tool for EstimateSalaryTool {
    fn name(&self) -> &'static str {
        ESTIMATE_SALARY
    }

    fn description(&self) -> &'static str {
        "Estimate the salary range (min, max, currency) for a job title in a location."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "job_title": {"type": "string", "description": "Job title, e.g. \"Data Analyst\""},
                "location": {
                    "type": "string",
                    "description": format!(
                        "Country or city. Defaults to {}.",
                        self.client.config().default_location
                    )
                }
            },
            "required": ["job_title"]
        })
    }

    async fn call(&self, input: Value) -> Value {
        let args: SalaryArgs = match decode(input) {
            Ok(args) => args,
            Err(record) => return record,
        };
        let estimate = self
            .client
            .estimate_salary(&args.job_title, args.location.as_deref())
            .await;
        if estimate.is_error() {
            debug!("No salary estimate for {}", args.job_title);
        }
        to_value(&estimate)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// search_jobs
// ────────────────────────────────────────────────────────────────────────────

pub struct SearchJobsTool {
    client: JSearchClient,
}

impl SearchJobsTool {
    pub fn new(client: JSearchClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchJobsTool {
    fn name(&self) -> &'static str {
        SEARCH_JOBS
    }

    fn description(&self) -> &'static str {
        "Search live job listings. Returns title, company, location, apply link and post date."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text query, e.g. \"python developer jobs in Dhaka\""
                },
                "page": {"type": "integer", "minimum": 1},
                "num_pages": {"type": "integer", "minimum": 1},
                "country": {
                    "type": "string",
                    "description": format!(
                        "Two-letter country code. Defaults to {}.",
                        self.client.config().default_country
                    )
                },
                "date_posted": {
                    "type": "string",
                    "enum": ["all", "today", "3days", "week", "month"]
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, input: Value) -> Value {
        let params: JobSearchParams = match decode(input) {
            Ok(params) => params,
            Err(record) => return record,
        };
        let records = self.client.search_jobs(&params).await;
        if records.iter().any(|r| r.is_error()) {
            debug!("Job search for {:?} returned an error record", params.query);
        }
        to_value(&records)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// web_search
// ────────────────────────────────────────────────────────────────────────────

pub struct WebSearchTool {
    client: WebSearchClient,
}

impl WebSearchTool {
    pub fn new(client: WebSearchClient) -> Self {
        Self { client }
    }
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &'static str {
        WEB_SEARCH
    }

    fn description(&self) -> &'static str {
        "Search the web for recent job openings on the supported job listing sites."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "e.g. \"Junior Python Developer site:bdjobs.com OR site:linkedin.com OR site:indeed.com\""
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, input: Value) -> Value {
        let args: WebSearchArgs = match decode(input) {
            Ok(args) => args,
            Err(record) => return record,
        };
        match self.client.search(&args.query).await {
            Ok(results) => to_value(&results),
            Err(e) => error_record(e.to_string()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// All tools available to the process, looked up by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the three production tools.
    pub fn standard(jsearch: JSearchClient, web: WebSearchClient) -> Self {
        Self::new()
            .with(EstimateSalaryTool::new(jsearch.clone()))
            .with(SearchJobsTool::new(jsearch))
            .with(WebSearchTool::new(web))
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.insert(tool.name(), Arc::new(tool));
        self
    }

    /// The subset named by a profile. Unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> ToolSet {
        ToolSet {
            tools: names
                .iter()
                .filter_map(|n| self.tools.get(*n).cloned())
                .collect(),
        }
    }
}

/// The tools attached to one completion unit.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }
}
