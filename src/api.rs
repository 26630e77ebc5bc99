use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::extract::{self, blocks::Block, BlockFetcher, ExtractionResult};

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Client for the public Notion REST API (bearer API key).
pub struct ApiClient {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct ChildrenResponse {
    #[serde(default)]
    results: Vec<Block>,
}

impl ApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Fetch a page's title. Unlike child fetches, a failure here is fatal:
    /// the title is structurally required and has no fallback call.
    pub async fn page_title(&self, page_id: &str) -> Result<String> {
        let response = self
            .get(&format!("/pages/{}", page_id))
            .send()
            .await
            .with_context(|| format!("Failed to fetch page {}", page_id))?
            .error_for_status()
            .with_context(|| format!("Page lookup for {} was rejected", page_id))?;
        let page: Value = response.json().await?;
        Ok(title_from_page(&page))
    }

    /// Title plus a categorized summary of the page's block tree.
    pub async fn page_content(&self, page_id: &str, max_depth: u32) -> Result<ExtractionResult> {
        let title = self.page_title(page_id).await?;
        Ok(extract::extract(self, page_id, title, max_depth).await)
    }
}

impl BlockFetcher for ApiClient {
    /// First page of up to 100 children. A non-2xx response degrades to an
    /// empty list so one bad subtree never aborts an extraction; pagination
    /// past the first page is not handled.
    async fn fetch_children(&self, block_id: &str) -> Result<Vec<Block>> {
        let response = self
            .get(&format!("/blocks/{}/children", block_id))
            .query(&[("page_size", "100")])
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(
                "Child fetch for {} returned {}; treating as no children",
                block_id,
                response.status()
            );
            return Ok(Vec::new());
        }

        let body: ChildrenResponse = response.json().await?;
        Ok(body.results)
    }
}

/// First title run's plain text, or "Untitled" when absent or empty.
fn title_from_page(page: &Value) -> String {
    page.pointer("/properties/title/title/0/plain_text")
        .and_then(Value::as_str)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Untitled".to_string())
}
