//! Profile schema validation.
//!
//! Normalizes a [`ProfileDraft`] into a [`CanonicalProfile`]: absent lists
//! become empty, and experience entries without a company or title are
//! rejected. Education entries pass through as extracted.

use crate::error::SchemaError;
use crate::profile::{CanonicalProfile, EducationEntry, ExperienceEntry, ProfileDraft};
use tracing::debug;

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Validates a draft and fills list defaults.
///
/// Running the check on a draft produced from an already-canonical profile
/// returns that profile unchanged.
///
/// # Errors
///
/// Returns [`SchemaError::IncompleteExperience`] if an experience entry lacks
/// a company or title. Absent and empty strings count as missing.
pub fn schema_check(draft: ProfileDraft) -> Result<CanonicalProfile, SchemaError> {
    let experience = draft
        .experience
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            match (present(entry.company), present(entry.title)) {
                (Some(company), Some(title)) => Ok(ExperienceEntry {
                    company,
                    title,
                    dates: entry.dates,
                    bullets: entry.bullets,
                }),
                _ => Err(SchemaError::IncompleteExperience { index }),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    let education = draft
        .education
        .unwrap_or_default()
        .into_iter()
        .map(|entry| EducationEntry {
            school: entry.school,
            degree: entry.degree,
            dates: entry.dates,
        })
        .collect();

    let profile = CanonicalProfile {
        name: draft.name,
        headline: draft.headline,
        location: draft.location,
        emails: draft.emails.unwrap_or_default(),
        urls: draft.urls.unwrap_or_default(),
        skills: draft.skills.unwrap_or_default(),
        experience,
        education,
    };

    debug!(
        skills = profile.skills.len(),
        positions = profile.experience.len(),
        "profile validated"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{EducationDraft, ExperienceDraft, FixtureProfileExtractor};

    #[test]
    fn absent_lists_become_empty() {
        let profile = schema_check(ProfileDraft::default()).expect("valid");
        assert!(profile.emails.is_empty());
        assert!(profile.urls.is_empty());
        assert!(profile.skills.is_empty());
        assert!(profile.experience.is_empty());
        assert!(profile.education.is_empty());
    }

    #[test]
    fn check_is_idempotent() {
        let once = schema_check(FixtureProfileExtractor::fixture().into()).expect("valid");
        let twice = schema_check(once.clone().into()).expect("still valid");
        assert_eq!(once, twice);
        assert_eq!(once, FixtureProfileExtractor::fixture());
    }

    #[test]
    fn rejects_experience_without_title() {
        let draft = ProfileDraft {
            experience: Some(vec![
                ExperienceDraft {
                    company: Some("Acme".to_string()),
                    title: Some("Engineer".to_string()),
                    ..Default::default()
                },
                ExperienceDraft {
                    company: Some("Globex".to_string()),
                    title: None,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };

        assert_eq!(
            schema_check(draft),
            Err(SchemaError::IncompleteExperience { index: 1 })
        );
    }

    #[test]
    fn empty_company_counts_as_missing() {
        let draft = ProfileDraft {
            experience: Some(vec![ExperienceDraft {
                company: Some(String::new()),
                title: Some("Engineer".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        assert_eq!(
            schema_check(draft),
            Err(SchemaError::IncompleteExperience { index: 0 })
        );
    }

    #[test]
    fn whitespace_company_is_kept() {
        let draft = ProfileDraft {
            experience: Some(vec![ExperienceDraft {
                company: Some("  ".to_string()),
                title: Some("Engineer".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let profile = schema_check(draft).expect("valid");
        assert_eq!(profile.experience[0].company, "  ");
    }

    #[test]
    fn education_without_school_is_kept() {
        let draft = ProfileDraft {
            education: Some(vec![EducationDraft {
                school: None,
                degree: Some("BS".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let profile = schema_check(draft).expect("valid");
        assert_eq!(
            profile.education,
            vec![EducationEntry {
                school: None,
                degree: Some("BS".to_string()),
                dates: None,
            }]
        );
        assert_eq!(schema_check(profile.clone().into()), Ok(profile));
    }
}
