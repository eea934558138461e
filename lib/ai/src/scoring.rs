//! Candidate scoring against job requirements.

use crate::error::AiError;
use crate::profile::CanonicalProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Skills assumed when the caller supplies no job context.
pub const DEFAULT_TARGET_SKILLS: [&str; 3] = ["typescript", "react", "node.js"];

/// The role a candidate is being evaluated for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
}

/// A concern raised while scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    LimitedExperience,
    MissingContactInfo,
    PotentialJobHopping,
}

impl RiskFlag {
    /// Returns the wire name of the flag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LimitedExperience => "limited_experience",
            Self::MissingContactInfo => "missing_contact_info",
            Self::PotentialJobHopping => "potential_job_hopping",
        }
    }
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    /// Overall fit, 0 to 100 inclusive.
    pub score: u8,
    pub rationale: String,
    pub risk_flags: Vec<RiskFlag>,
}

/// Scores a canonical profile against a job.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Evaluates the profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the evaluation cannot be performed.
    async fn score(
        &self,
        profile: &CanonicalProfile,
        job: Option<&JobContext>,
    ) -> Result<ScoringResult, AiError>;
}

/// Deterministic skill-match rubric.
///
/// Skill overlap sets the base score; three or more positions add 10 and
/// five or more add another 5; each risk flag subtracts 5.
#[derive(Debug, Clone, Default)]
pub struct RubricScorer;

impl RubricScorer {
    /// Scores synchronously; the [`Scorer`] impl delegates here.
    #[must_use]
    pub fn evaluate(profile: &CanonicalProfile, job: Option<&JobContext>) -> ScoringResult {
        let targets: Vec<String> = match job.and_then(|j| j.skills.as_ref()) {
            Some(skills) => skills.iter().map(|s| s.to_lowercase()).collect(),
            None => DEFAULT_TARGET_SKILLS.iter().map(|s| (*s).to_string()).collect(),
        };
        let mut seen = HashSet::new();
        let needed: Vec<String> = targets
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();

        let has: HashSet<String> = profile.skills.iter().map(|s| s.to_lowercase()).collect();
        let matched = needed.iter().filter(|s| has.contains(*s)).count();
        let skill_score =
            ((matched as f64 / needed.len().max(1) as f64) * 100.0).round() as i64;

        let positions = profile.experience.len();
        let mut risk_flags = Vec::new();
        if positions < 2 {
            risk_flags.push(RiskFlag::LimitedExperience);
        }
        if profile.emails.is_empty() {
            risk_flags.push(RiskFlag::MissingContactInfo);
        }
        if positions >= 3 {
            let average_tenure = 3.0 / positions as f64;
            if average_tenure < 1.5 {
                risk_flags.push(RiskFlag::PotentialJobHopping);
            }
        }

        let mut score = skill_score;
        if positions >= 3 {
            score = (score + 10).min(100);
        }
        if positions >= 5 {
            score = (score + 5).min(100);
        }
        if !risk_flags.is_empty() {
            score = (score - 5 * risk_flags.len() as i64).max(0);
        }

        let flags_line = if risk_flags.is_empty() {
            "No significant risk flags.".to_string()
        } else {
            let names: Vec<_> = risk_flags.iter().map(RiskFlag::as_str).collect();
            format!("Risk flags: {}.", names.join(", "))
        };
        let rationale = format!(
            "Matched {matched}/{} target skills ({}). \nExperience: {positions} positions. \n{flags_line}",
            needed.len(),
            needed.join(", "),
        );

        ScoringResult {
            score: score.clamp(0, 100) as u8,
            rationale: rationale.trim().to_string(),
            risk_flags,
        }
    }
}

#[async_trait]
impl Scorer for RubricScorer {
    async fn score(
        &self,
        profile: &CanonicalProfile,
        job: Option<&JobContext>,
    ) -> Result<ScoringResult, AiError> {
        Ok(Self::evaluate(profile, job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ExperienceEntry, FixtureProfileExtractor};

    fn job(skills: &[&str]) -> JobContext {
        JobContext {
            role: Some("Eng".to_string()),
            seniority: None,
            skills: Some(skills.iter().map(|s| (*s).to_string()).collect()),
        }
    }

    fn position(company: &str) -> ExperienceEntry {
        ExperienceEntry {
            company: company.to_string(),
            title: "Engineer".to_string(),
            dates: None,
            bullets: None,
        }
    }

    #[test]
    fn full_match_with_two_positions_scores_100() {
        let result = RubricScorer::evaluate(
            &FixtureProfileExtractor::fixture(),
            Some(&job(&["TypeScript", "React"])),
        );
        assert_eq!(result.score, 100);
        assert!(result.risk_flags.is_empty());
        assert!(result.rationale.starts_with("Matched 2/2 target skills (typescript, react)."));
        assert!(result.rationale.ends_with("No significant risk flags."));
    }

    #[test]
    fn defaults_apply_without_job_context() {
        let result = RubricScorer::evaluate(&FixtureProfileExtractor::fixture(), None);
        assert!(result.rationale.contains("(typescript, react, node.js)"));
        assert_eq!(result.score, 100);
    }

    #[test]
    fn empty_profile_collects_flags_and_floors_at_zero() {
        let result = RubricScorer::evaluate(&CanonicalProfile::default(), Some(&job(&["Rust"])));
        assert_eq!(
            result.risk_flags,
            vec![RiskFlag::LimitedExperience, RiskFlag::MissingContactInfo]
        );
        assert_eq!(result.score, 0);
        assert!(result.rationale.contains("Risk flags: limited_experience, missing_contact_info."));
    }

    #[test]
    fn many_positions_trigger_job_hopping_and_bonus() {
        let mut profile = FixtureProfileExtractor::fixture();
        profile.experience = (0..5).map(|i| position(&format!("Co {i}"))).collect();

        let result = RubricScorer::evaluate(&profile, Some(&job(&["typescript", "go"])));
        assert_eq!(result.risk_flags, vec![RiskFlag::PotentialJobHopping]);
        // 50 + 10 + 5 - 5
        assert_eq!(result.score, 60);
    }

    #[test]
    fn duplicate_targets_count_once() {
        let result = RubricScorer::evaluate(
            &FixtureProfileExtractor::fixture(),
            Some(&job(&["React", "react", "Elixir"])),
        );
        assert!(result.rationale.starts_with("Matched 1/2"));
        assert_eq!(result.score, 50);
    }

    #[test]
    fn risk_flags_serialize_as_snake_case() {
        let json = serde_json::to_string(&RiskFlag::PotentialJobHopping).expect("serialize");
        assert_eq!(json, "\"potential_job_hopping\"");
    }
}
