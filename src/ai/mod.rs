//! AI labeling collaborator
//!
//! The triage worker only depends on [`Analyzer`]. Two implementations ship
//! with the crate: an HTTP client for a JSON labeling endpoint and an offline
//! keyword heuristic for development setups without an AI service.

mod heuristic;
mod http;

pub use heuristic::KeywordAnalyzer;
pub use http::HttpAnalyzer;

use crate::config::{AiConfig, AiProvider};
use crate::core::{Priority, skills};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;

/// Result of labeling a ticket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "relatedSkills")]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub helpful_notes: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Option<Priority>,
}

impl Analysis {
    /// Normalize skills and trim text fields
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            summary: self.summary.trim().to_string(),
            required_skills: skills::normalize_skills(&self.required_skills),
            helpful_notes: self.helpful_notes.trim().to_string(),
            priority: self.priority,
        }
    }
}

fn lenient_priority<'de, D>(deserializer: D) -> std::result::Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Priority::parse_lenient))
}

/// Labels a ticket from its title and description
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, title: &str, description: &str) -> Result<Analysis>;
}

/// Build the analyzer selected in configuration
pub fn from_config(config: &AiConfig) -> Result<Arc<dyn Analyzer>> {
    Ok(match config.provider {
        AiProvider::Heuristic => Arc::new(KeywordAnalyzer::new()),
        AiProvider::Http => Arc::new(HttpAnalyzer::from_config(config)?),
    })
}
