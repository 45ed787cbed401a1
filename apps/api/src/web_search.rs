//! Web search over the DuckDuckGo HTML endpoint, scoped to job listing sites.

use std::time::Duration;

use reqwest::{Client, Url};
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";
pub const DEFAULT_LISTING_SITES: [&str; 3] = ["bdjobs.com", "linkedin.com", "indeed.com"];
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum WebSearchError {
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search engine returned HTTP {0}")]
    Status(u16),

    #[error("invalid result selector: {0}")]
    Selector(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    pub base_url: String,
    pub listing_sites: Vec<String>,
    pub max_results: usize,
}

#[derive(Clone)]
pub struct WebSearchClient {
    http: Client,
    config: WebSearchConfig,
}

impl WebSearchClient {
    pub fn new(http: Client, config: WebSearchConfig) -> Self {
        Self { http, config }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<WebResult>, WebSearchError> {
        let scoped = scope_to_sites(query, &self.config.listing_sites);
        debug!("Web search: {scoped}");

        let response = self
            .http
            .get(&self.config.base_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("q", scoped.as_str())])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Web search returned {}", response.status());
            return Err(WebSearchError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        parse_results(&html, self.config.max_results)
    }
}

/// Appends `site:` operators for the listing sites unless the caller already
/// scoped the query.
pub fn scope_to_sites(query: &str, sites: &[String]) -> String {
    let query = query.trim();
    if sites.is_empty() || query.contains("site:") {
        return query.to_string();
    }
    let scope = sites
        .iter()
        .map(|s| format!("site:{s}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{query} {scope}")
}

fn selector(css: &str) -> Result<Selector, WebSearchError> {
    Selector::parse(css).map_err(|e| WebSearchError::Selector(e.to_string()))
}

fn parse_results(html: &str, limit: usize) -> Result<Vec<WebResult>, WebSearchError> {
    let document = Html::parse_document(html);
    let result_sel = selector("div.result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let title = collapse_whitespace(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .filter(|s| !s.is_empty());

        results.push(WebResult {
            title,
            url: unwrap_redirect(href),
            snippet,
        });
        if results.len() >= limit {
            break;
        }
    }
    Ok(results)
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`.
fn unwrap_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
