use super::{Analysis, Analyzer};
use crate::config::AiConfig;
use crate::error::{Result, TriageError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    title: &'a str,
    description: &'a str,
}

/// Client for a JSON labeling endpoint
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalyzer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, client: Client) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| TriageError::Config("ai.endpoint is not set".to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| TriageError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::new(endpoint, config.api_key.clone(), client))
    }
}

/// Strip a surrounding ```json fence, which language models like to add
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a labeling response body
pub(crate) fn parse_analysis(body: &str) -> Result<Analysis> {
    serde_json::from_str::<Analysis>(strip_code_fence(body))
        .map(Analysis::normalized)
        .map_err(|e| TriageError::UpstreamUnavailable(format!("malformed AI response: {e}")))
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(&self, title: &str, description: &str) -> Result<Analysis> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { title, description });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, bytes = body.len(), "AI labeling response");

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(TriageError::UpstreamUnavailable(format!(
                "AI service returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(TriageError::custom(format!(
                "AI service rejected the request with {status}"
            )));
        }

        parse_analysis(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;

    #[test]
    fn test_parse_plain_json() {
        let analysis = parse_analysis(
            r#"{"summary":"s","requiredSkills":["React","CSS"],"helpfulNotes":"n","priority":"medium"}"#,
        )
        .unwrap();
        assert_eq!(analysis.required_skills, vec!["React", "CSS"]);
        assert_eq!(analysis.priority, Some(Priority::Medium));
    }

    #[test]
    fn test_parse_fenced_json() {
        let body = "```json\n{\"summary\":\"s\",\"relatedSkills\":[\"Node\"],\"priority\":\"urgent\"}\n```";
        let analysis = parse_analysis(body).unwrap();
        assert_eq!(analysis.required_skills, vec!["Node"]);
        assert_eq!(analysis.priority, Some(Priority::Critical));
    }

    #[test]
    fn test_parse_garbage_is_recoverable() {
        let err = parse_analysis("I could not label this ticket").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_from_config_requires_endpoint() {
        assert!(HttpAnalyzer::from_config(&AiConfig::default()).is_err());
        let config = AiConfig {
            endpoint: Some("http://localhost:9/analyze".into()),
            ..AiConfig::default()
        };
        assert!(HttpAnalyzer::from_config(&config).is_ok());
    }
}
