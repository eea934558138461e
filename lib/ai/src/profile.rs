//! Candidate profile types and extraction.
//!
//! Extraction produces a [`ProfileDraft`], the loosely-typed shape an LLM
//! hands back. Drafts become a [`CanonicalProfile`] only through
//! [`schema_check`](crate::schema::schema_check).

use crate::backend::{LlmBackend, LlmRequest};
use crate::error::{AiError, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;
use tracing::debug;

/// One position held by the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullets: Option<Vec<String>>,
}

/// One education record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<String>,
}

/// Structured candidate facts.
///
/// List fields are always present (possibly empty); every experience entry
/// has a company and a title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
}

/// A category of information missing from a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileGap {
    Email,
    Skills,
    Experience,
    Location,
    Education,
}

impl ProfileGap {
    /// Returns the wire name of the gap.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Skills => "skills",
            Self::Experience => "experience",
            Self::Location => "location",
            Self::Education => "education",
        }
    }
}

impl fmt::Display for ProfileGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CanonicalProfile {
    /// Lists the categories of information this profile lacks, in a fixed
    /// order: email, skills, experience, location, education.
    #[must_use]
    pub fn gaps(&self) -> Vec<ProfileGap> {
        let mut gaps = Vec::new();
        if self.emails.is_empty() {
            gaps.push(ProfileGap::Email);
        }
        if self.skills.is_empty() {
            gaps.push(ProfileGap::Skills);
        }
        if self.experience.is_empty() {
            gaps.push(ProfileGap::Experience);
        }
        if self.location.as_deref().is_none_or(str::is_empty) {
            gaps.push(ProfileGap::Location);
        }
        if self.education.is_empty() {
            gaps.push(ProfileGap::Education);
        }
        gaps
    }

    /// Appends URLs not already present, preserving order.
    pub fn merge_urls<I, S>(&mut self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for url in urls {
            let url = url.into();
            if !self.urls.contains(&url) {
                self.urls.push(url);
            }
        }
    }
}

/// An experience entry as returned by extraction, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceDraft {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
    #[serde(default)]
    pub bullets: Option<Vec<String>>,
}

/// An education entry as returned by extraction, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationDraft {
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub dates: Option<String>,
}

/// Unvalidated profile: every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub emails: Option<Vec<String>>,
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub experience: Option<Vec<ExperienceDraft>>,
    #[serde(default)]
    pub education: Option<Vec<EducationDraft>>,
}

impl From<CanonicalProfile> for ProfileDraft {
    fn from(profile: CanonicalProfile) -> Self {
        Self {
            name: profile.name,
            headline: profile.headline,
            location: profile.location,
            emails: Some(profile.emails),
            urls: Some(profile.urls),
            skills: Some(profile.skills),
            experience: Some(
                profile
                    .experience
                    .into_iter()
                    .map(|e| ExperienceDraft {
                        company: Some(e.company),
                        title: Some(e.title),
                        dates: e.dates,
                        bullets: e.bullets,
                    })
                    .collect(),
            ),
            education: Some(
                profile
                    .education
                    .into_iter()
                    .map(|e| EducationDraft {
                        school: e.school,
                        degree: e.degree,
                        dates: e.dates,
                    })
                    .collect(),
            ),
        }
    }
}

/// Turns normalized candidate text into a profile draft.
#[async_trait]
pub trait ProfileExtractor: Send + Sync {
    /// Extracts a structured draft from free text.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying model call fails.
    async fn extract(&self, text: &str) -> Result<ProfileDraft, AiError>;
}

/// Deterministic extractor returning a fixed profile, for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct FixtureProfileExtractor;

impl FixtureProfileExtractor {
    /// The profile every call returns.
    #[must_use]
    pub fn fixture() -> CanonicalProfile {
        let strings = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
        CanonicalProfile {
            name: Some("Taylor Doe".to_string()),
            headline: Some("Senior Full-Stack Engineer".to_string()),
            location: Some("New York, NY".to_string()),
            emails: strings(&["taylor@example.com"]),
            urls: strings(&[
                "https://github.com/mock-user",
                "https://linkedin.com/in/mock-user",
            ]),
            skills: strings(&[
                "TypeScript",
                "React",
                "Node.js",
                "PostgreSQL",
                "Next.js",
                "Docker",
                "AWS",
                "Redis",
            ]),
            experience: vec![
                ExperienceEntry {
                    company: "Acme Inc.".to_string(),
                    title: "Senior Full-Stack Engineer".to_string(),
                    dates: Some("2021–present".to_string()),
                    bullets: Some(strings(&[
                        "Led migration to Next.js, improving performance by 60%",
                        "Built real-time collaboration features",
                        "Mentored 3 junior engineers",
                    ])),
                },
                ExperienceEntry {
                    company: "Globex Corporation".to_string(),
                    title: "Software Engineer".to_string(),
                    dates: Some("2018–2021".to_string()),
                    bullets: Some(strings(&[
                        "Built ETL pipelines processing 10M+ records daily",
                        "Developed REST APIs serving 500K+ users",
                    ])),
                },
            ],
            education: vec![EducationEntry {
                school: Some("State University".to_string()),
                degree: Some("BS Computer Science".to_string()),
                dates: Some("2014–2018".to_string()),
            }],
        }
    }
}

#[async_trait]
impl ProfileExtractor for FixtureProfileExtractor {
    async fn extract(&self, text: &str) -> Result<ProfileDraft, AiError> {
        debug!(chars = text.len(), "returning fixture profile");
        Ok(Self::fixture().into())
    }
}

const EXTRACTION_SYSTEM_PROMPT: &str =
    "You extract structured candidate profiles from resumes and public profiles.";

/// Extractor backed by an [`LlmBackend`] with structured output.
pub struct LlmProfileExtractor<B: LlmBackend> {
    backend: B,
}

impl<B: LlmBackend> LlmProfileExtractor<B> {
    /// Creates an extractor over the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// JSON schema requested from the model.
    #[must_use]
    pub fn output_schema() -> JsonValue {
        let string_list = json!({"type": "array", "items": {"type": "string"}});
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "headline": {"type": "string"},
                "location": {"type": "string"},
                "emails": string_list,
                "urls": string_list,
                "skills": string_list,
                "experience": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "company": {"type": "string"},
                            "title": {"type": "string"},
                            "dates": {"type": "string"},
                            "bullets": string_list,
                        },
                        "required": ["company", "title"],
                    },
                },
                "education": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "school": {"type": "string"},
                            "degree": {"type": "string"},
                            "dates": {"type": "string"},
                        },
                    },
                },
            },
        })
    }

    fn prompt(text: &str) -> String {
        format!(
            "Extract a structured candidate profile from the following resume/profile text.\n\n\
             Include:\n\
             - Name, headline, location\n\
             - Contact emails\n\
             - URLs (LinkedIn, GitHub, portfolio, etc.)\n\
             - Technical skills\n\
             - Work experience with company, title, dates, and key accomplishments\n\
             - Education with school, degree, and dates\n\n\
             Resume text:\n{text}"
        )
    }
}

#[async_trait]
impl<B: LlmBackend> ProfileExtractor for LlmProfileExtractor<B> {
    async fn extract(&self, text: &str) -> Result<ProfileDraft, AiError> {
        let request = LlmRequest::structured(Self::prompt(text), Self::output_schema())
            .with_system(EXTRACTION_SYSTEM_PROMPT);

        let response = self.backend.generate(&request).await?;
        debug!(
            model = %response.model,
            tokens = response.usage.total(),
            "profile extraction complete"
        );

        serde_json::from_value(response.into_json()?).map_err(|e| {
            LlmError::ResponseParseFailed {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmResponse, TokenUsage};

    struct CannedBackend {
        structured: Option<JsonValue>,
        content: String,
    }

    #[async_trait]
    impl LlmBackend for CannedBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            assert_eq!(request.output_schema["type"], "object");
            assert!(request.prompt.contains("Resume text:"));
            Ok(LlmResponse {
                content: self.content.clone(),
                structured_output: self.structured.clone(),
                usage: TokenUsage::default(),
                model: "canned".to_string(),
            })
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn gaps_follow_fixed_order() {
        let profile = CanonicalProfile::default();
        let gaps: Vec<_> = profile.gaps().iter().map(ProfileGap::as_str).collect();
        assert_eq!(
            gaps,
            vec!["email", "skills", "experience", "location", "education"]
        );
    }

    #[test]
    fn fixture_has_no_gaps() {
        assert!(FixtureProfileExtractor::fixture().gaps().is_empty());
    }

    #[test]
    fn blank_location_is_a_gap() {
        let mut profile = FixtureProfileExtractor::fixture();
        profile.location = Some(String::new());
        assert_eq!(profile.gaps(), vec![ProfileGap::Location]);
    }

    #[test]
    fn merge_urls_skips_duplicates() {
        let mut profile = FixtureProfileExtractor::fixture();
        profile.merge_urls(["https://github.com/mock-user", "https://example.com/talk"]);
        assert_eq!(profile.urls.len(), 3);
        assert_eq!(profile.urls[2], "https://example.com/talk");
    }

    #[test]
    fn canonical_profile_defaults_missing_lists() {
        let profile: CanonicalProfile =
            serde_json::from_value(json!({"name": "Sam"})).expect("deserialize");
        assert!(profile.skills.is_empty());
        assert!(profile.experience.is_empty());
    }

    #[tokio::test]
    async fn llm_extractor_prefers_structured_output() {
        let extractor = LlmProfileExtractor::new(CannedBackend {
            structured: Some(json!({"name": "Sam", "skills": ["Rust"]})),
            content: "ignored".to_string(),
        });

        let draft = extractor.extract("Sam, Rust developer").await.expect("extract");
        assert_eq!(draft.name.as_deref(), Some("Sam"));
        assert_eq!(draft.skills, Some(vec!["Rust".to_string()]));
        assert_eq!(draft.emails, None);
    }

    #[tokio::test]
    async fn llm_extractor_falls_back_to_content() {
        let extractor = LlmProfileExtractor::new(CannedBackend {
            structured: None,
            content: r#"{"headline": "Engineer"}"#.to_string(),
        });

        let draft = extractor.extract("text").await.expect("extract");
        assert_eq!(draft.headline.as_deref(), Some("Engineer"));
    }

    #[tokio::test]
    async fn llm_extractor_reports_unparseable_output() {
        let extractor = LlmProfileExtractor::new(CannedBackend {
            structured: None,
            content: "not json".to_string(),
        });

        let err = extractor.extract("text").await.unwrap_err();
        assert!(matches!(
            err,
            AiError::Llm(LlmError::ResponseParseFailed { .. })
        ));
    }
}
