use super::{Analysis, Analyzer};
use crate::core::Priority;
use crate::error::Result;
use async_trait::async_trait;

/// Keyword table: any keyword in the text implies the skill
const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    ("React", &["react", "jsx", "component"]),
    ("CSS", &["css", "style", "layout", "blank screen"]),
    ("JavaScript", &["javascript", "frontend", "browser"]),
    ("Node.js", &["node", "express", "npm"]),
    ("API", &["api", "endpoint", "backend", "server", "500"]),
    ("Databases", &["database", "sql", "mongo", "postgres", "migration"]),
    ("Authentication", &["login", "password", "auth", "token", "session"]),
    ("DevOps", &["deploy", "docker", "kubernetes", "pipeline", "outage"]),
];

/// Offline analyzer based on keyword matching
#[derive(Debug, Clone, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn guess_priority(text: &str) -> Priority {
    match () {
        () if text.contains("critical") || text.contains("urgent") || text.contains("outage") => {
            Priority::Critical
        },
        () if text.contains("broken") || text.contains("error") || text.contains("crash") => {
            Priority::High
        },
        () if text.contains("minor") || text.contains("typo") || text.contains("cosmetic") => {
            Priority::Low
        },
        () => Priority::Medium,
    }
}

fn suggest_skills(text: &str) -> Vec<String> {
    SKILL_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(skill, _)| (*skill).to_string())
        .collect()
}

#[async_trait]
impl Analyzer for KeywordAnalyzer {
    async fn analyze(&self, title: &str, description: &str) -> Result<Analysis> {
        let text = format!("{} {}", title.to_lowercase(), description.to_lowercase());
        let required_skills = suggest_skills(&text);
        let helpful_notes = if required_skills.is_empty() {
            "No specific skill detected; route to a generalist.".to_string()
        } else {
            format!("Look at the {} side first.", required_skills.join(" / "))
        };

        Ok(Analysis {
            summary: title.trim().to_string(),
            required_skills,
            helpful_notes,
            priority: Some(guess_priority(&text)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_priority() {
        assert_eq!(guess_priority("urgent: checkout down"), Priority::Critical);
        assert_eq!(guess_priority("login broken"), Priority::High);
        assert_eq!(guess_priority("typo on pricing page"), Priority::Low);
        assert_eq!(guess_priority("add dark mode"), Priority::Medium);
    }

    #[tokio::test]
    async fn test_keyword_analysis() {
        let analysis = KeywordAnalyzer::new()
            .analyze("Login broken", "blank screen on login after React upgrade")
            .await
            .unwrap();
        assert!(analysis.required_skills.contains(&"React".to_string()));
        assert!(analysis.required_skills.contains(&"CSS".to_string()));
        assert!(analysis.required_skills.contains(&"Authentication".to_string()));
        assert_eq!(analysis.priority, Some(Priority::High));
        assert_eq!(analysis.summary, "Login broken");
    }
}
