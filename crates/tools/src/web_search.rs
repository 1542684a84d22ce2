//! Web search tool backed by the Exa search API.
//!
//! The action input is used verbatim as the search query. Results are
//! rendered as `Title` / `Author` / `Text` blocks for the model to read.

use async_trait::async_trait;
use parley_core::error::ToolError;
use parley_core::tool::Tool;
use parley_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TOOL_NAME: &str = "Exa Search API";
const TIMEOUT_SECS: u64 = 30;

pub struct WebSearchTool {
    api_key: String,
    api_url: String,
    num_results: u32,
    client: reqwest::Client,
}

impl WebSearchTool {
    /// Fails with a configuration error when the API key is missing.
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config(
                "web search needs an Exa API key (set tools.exa_api_key or EXA_API_KEY)",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::config(format!("HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            api_url: api_url.into(),
            num_results: 10,
            client,
        })
    }

    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results.max(1);
        self
    }

    fn request_body(&self, query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            use_autoprompt: true,
            search_type: "auto".into(),
            num_results: self.num_results,
            contents: SearchContents { text: true },
        }
    }

    fn failed(reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web with an Exa prompt-engineered query."
    }

    async fn execute(&self, input: &str) -> std::result::Result<String, ToolError> {
        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("empty search query".into()));
        }

        debug!(query, "Running web search");

        let response = self
            .client
            .post(&self.api_url)
            .header("accept", "application/json")
            .header("x-api-key", &self.api_key)
            .json(&self.request_body(query))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool_name: TOOL_NAME.into(),
                        timeout_secs: TIMEOUT_SECS,
                    }
                } else {
                    Self::failed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::failed(format!(
                "request failed with status code {}",
                status.as_u16()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| Self::failed(format!("unreadable response: {e}")))?;

        Ok(render_results(&body))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    query: String,
    use_autoprompt: bool,
    #[serde(rename = "type")]
    search_type: String,
    num_results: u32,
    contents: SearchContents,
}

#[derive(Debug, Serialize)]
struct SearchContents {
    text: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

fn render_results(response: &SearchResponse) -> String {
    response
        .results
        .iter()
        .map(|hit| {
            format!(
                "Title: {}\nAuthor: {}\nText: {}\n\n",
                hit.title.as_deref().unwrap_or_default(),
                hit.author.as_deref().unwrap_or_default(),
                hit.text.as_deref().unwrap_or_default(),
            )
        })
        .collect()
}
