//! Skill tag normalization shared by signup, AI enrichment and matching

use std::collections::HashSet;

/// Comparison key for a skill tag
#[must_use]
pub fn skill_key(skill: &str) -> String {
    skill.trim().to_lowercase()
}

/// Trim, drop empties and de-duplicate case-insensitively, keeping the first
/// spelling and the original order
pub fn normalize_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .filter_map(|s| {
            let trimmed = s.as_ref().trim();
            (!trimmed.is_empty() && seen.insert(skill_key(trimmed))).then(|| trimmed.to_string())
        })
        .collect()
}

/// Number of skills in `a` that also appear in `b`, ignoring case
#[must_use]
pub fn overlap(a: &[String], b: &[String]) -> usize {
    let keys: HashSet<String> = b.iter().map(|s| skill_key(s)).collect();
    a.iter()
        .map(|s| skill_key(s))
        .collect::<HashSet<_>>()
        .intersection(&keys)
        .count()
}
