//! Source connectors: resume uploads, LinkedIn pages and GitHub READMEs.

use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where to find a candidate's raw material. Every locator is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocators {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_in_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

impl SourceLocators {
    /// Returns true if at least one locator is set and non-blank.
    #[must_use]
    pub fn any(&self) -> bool {
        [&self.upload_url, &self.linked_in_url, &self.github_url]
            .into_iter()
            .any(|url| url.as_deref().is_some_and(|u| !u.trim().is_empty()))
    }
}

/// Raw text per source channel. Missing channels are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSources {
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub linked_in_html: Option<String>,
    #[serde(default)]
    pub github_readme: Option<String>,
}

/// Fetches raw source material for a candidate.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetches every channel whose locator is present.
    ///
    /// # Errors
    ///
    /// Returns an error if a present channel cannot be fetched.
    async fn fetch(&self, locators: &SourceLocators) -> Result<RawSources, ConnectorError>;
}

/// Returns fixed sample material for all three channels, whatever the
/// locators say.
#[derive(Debug, Clone, Default)]
pub struct FixtureSources;

impl FixtureSources {
    /// Sample resume text.
    #[must_use]
    pub fn resume_text() -> &'static str {
        "Taylor Doe
Senior Full-Stack Engineer
taylor@example.com | New York, NY

EXPERIENCE
Acme Inc. | Senior Full-Stack Engineer | 2021–present
• Led migration of legacy monolith to Next.js 14, improving performance by 60%
• Built real-time collaboration features using WebSockets and Redis
• Mentored 3 junior engineers and established code review practices

Globex Corporation | Software Engineer | 2018–2021
• Built ETL pipelines processing 10M+ records daily using Node.js and PostgreSQL
• Developed REST APIs serving 500K+ monthly active users
• Implemented comprehensive test coverage achieving 85%+ code coverage

EDUCATION
State University | BS Computer Science | 2014–2018
• Dean's List, GPA 3.8/4.0

SKILLS
TypeScript, React, Node.js, PostgreSQL, Next.js, Docker, AWS, Redis, GraphQL"
    }

    /// Sample LinkedIn profile page.
    #[must_use]
    pub fn linked_in_html() -> &'static str {
        r#"<html>
<body>
  <h1>Taylor Doe</h1>
  <p class="headline">Senior Full-Stack Engineer at Acme Inc.</p>
  <div class="location">New York, NY</div>
  <div class="experience">
    <h2>Experience</h2>
    <div class="job">
      <h3>Senior Full-Stack Engineer</h3>
      <p>Acme Inc. • 2021–present</p>
      <p>Leading development of cloud-native applications</p>
    </div>
    <div class="job">
      <h3>Software Engineer</h3>
      <p>Globex Corporation • 2018–2021</p>
      <p>Built data pipelines and APIs</p>
    </div>
  </div>
  <div class="skills">
    <span>TypeScript</span>
    <span>React</span>
    <span>Node.js</span>
    <span>Next.js</span>
  </div>
</body>
</html>"#
    }

    /// Sample GitHub profile README.
    #[must_use]
    pub fn github_readme() -> &'static str {
        "# taylor-doe

Senior Full-Stack Engineer passionate about building scalable web applications.

## Tech Stack
- **Frontend:** React, Next.js, TypeScript
- **Backend:** Node.js, Express, NestJS
- **Database:** PostgreSQL, Redis, MongoDB
- **Cloud:** AWS (EC2, S3, Lambda), Docker

## Notable Projects
- **data-utils:** TypeScript utilities for ETL pipelines (150+ stars)
- **next-realtime:** Real-time collaboration framework for Next.js (80+ stars)

## Speaking
- JSConf 2023: \"Optimizing Next.js Performance\"
- ReactConf 2022: \"Building Real-time Features\""
    }
}

#[async_trait]
impl SourceFetcher for FixtureSources {
    async fn fetch(&self, _locators: &SourceLocators) -> Result<RawSources, ConnectorError> {
        Ok(RawSources {
            resume_text: Some(Self::resume_text().to_string()),
            linked_in_html: Some(Self::linked_in_html().to_string()),
            github_readme: Some(Self::github_readme().to_string()),
        })
    }
}

/// Fetches each present locator over HTTP.
///
/// Resume uploads are expected to be served as extracted text.
#[derive(Debug, Clone, Default)]
pub struct HttpSourceFetcher {
    client: reqwest::Client,
}

impl HttpSourceFetcher {
    /// Creates a fetcher using the given HTTP client.
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_text(&self, url: &str) -> Result<String, ConnectorError> {
        debug!(url, "fetching source");
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| ConnectorError::ConnectionFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectorError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ConnectorError::BodyUnreadable {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_optional(&self, url: Option<&str>) -> Result<Option<String>, ConnectorError> {
        match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => self.get_text(url).await.map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch(&self, locators: &SourceLocators) -> Result<RawSources, ConnectorError> {
        Ok(RawSources {
            resume_text: self.fetch_optional(locators.upload_url.as_deref()).await?,
            linked_in_html: self
                .fetch_optional(locators.linked_in_url.as_deref())
                .await?,
            github_readme: self.fetch_optional(locators.github_url.as_deref()).await?,
        })
    }
}
