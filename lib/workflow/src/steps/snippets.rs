//! Marketing copy generation.

use crate::model::{EnrichedProfile, Snippets};

const FALLBACK_TITLE: &str = "Software Engineer";
const HEADLINE_SKILL_LIMIT: usize = 10;
const BIO_SKILL_LIMIT: usize = 8;
const HIGHLIGHT_LIMIT: usize = 3;

/// Builds headline, bio and highlights from an enriched profile.
#[must_use]
pub fn generate(enriched: &EnrichedProfile) -> Snippets {
    let profile = &enriched.canonical;
    let title = profile
        .headline
        .as_deref()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            profile
                .experience
                .first()
                .map(|e| e.title.as_str())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or(FALLBACK_TITLE);

    let skill_count = profile.skills.len().min(HEADLINE_SKILL_LIMIT);
    let headline = format!(
        "{title} • {skill_count} key skills • Score {}/100",
        enriched.overall_score
    );

    let top_skills = profile
        .skills
        .iter()
        .take(BIO_SKILL_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let bio = format!("Impact-focused {title}. Top skills: {top_skills}.");

    let highlights = profile
        .experience
        .iter()
        .take(HIGHLIGHT_LIMIT)
        .map(|e| format!("• {} @ {}", e.title, e.company))
        .collect();

    Snippets {
        headline,
        bio,
        highlights,
    }
}
