//! Web search used to fill profile gaps.

use crate::error::AiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A web search provider.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Runs a query and returns ranked results.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, AiError>;
}

/// Search provider that always answers with the same three results.
#[derive(Debug, Clone, Default)]
pub struct FixtureWebSearch;

#[async_trait]
impl WebSearch for FixtureWebSearch {
    async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, AiError> {
        Ok(vec![
            SearchResult {
                title: "Talk: Next.js Performance Optimization".to_string(),
                url: "https://example.com/jsconf-2023-nextjs-talk".to_string(),
                snippet: "Speaker at JSConf 2023, discussing advanced Next.js optimization techniques..."
                    .to_string(),
            },
            SearchResult {
                title: "Open-source Project: data-utils".to_string(),
                url: "https://github.com/mock/data-utils".to_string(),
                snippet: "TypeScript utilities for ETL pipelines with 150+ stars. Active maintainer."
                    .to_string(),
            },
            SearchResult {
                title: "Conference Presentation: Real-time Features in React".to_string(),
                url: "https://example.com/reactconf-2022".to_string(),
                snippet: "Presented at ReactConf 2022 on building real-time collaboration features..."
                    .to_string(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_returns_distinct_urls() {
        let results = FixtureWebSearch.search("anything").await.expect("search");
        assert_eq!(results.len(), 3);
        let mut urls: Vec<_> = results.iter().map(|r| r.url.as_str()).collect();
        urls.dedup();
        assert_eq!(urls.len(), 3);
    }
}
