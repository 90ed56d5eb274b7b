use super::LLMClient;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

fn text_content(text: &str, role: Option<&str>) -> Content {
    Content {
        parts: vec![Part {
            text: text.to_string(),
        }],
        role: role.map(str::to_string),
    }
}

/// Client for the Gemini `generateContent` REST endpoint
pub struct GeminiClient {
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn normalize_model(model: &str) -> String {
        let trimmed = model.trim();
        trimmed.strip_prefix("models/").unwrap_or(trimmed).to_string()
    }

    fn api_key(config: &LLMConfig) -> Result<&str> {
        config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::LLMError("Missing API key for Google provider".to_string()))
    }

    fn request(config: &LLMConfig, system: &str, user: &str) -> GenerateRequest {
        GenerateRequest {
            system_instruction: (!system.trim().is_empty()).then(|| text_content(system, None)),
            contents: vec![text_content(user, Some("user"))],
            generation_config: GenerationConfig {
                temperature: config.temperature.unwrap_or(0.1),
                max_output_tokens: config.max_tokens,
            },
        }
    }

    /// Text of the first candidate; a blocked or empty candidate is an error
    fn answer(response: GenerateResponse) -> Result<String> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLMError("Response has no candidates".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            return Err(AppError::LLMError(format!(
                "Empty answer (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            Self::normalize_model(&config.model)
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", Self::api_key(config)?)])
            .json(&Self::request(config, system, user))
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!("API error ({}): {}", status, text)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;
        Self::answer(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_model_strips_prefix() {
        assert_eq!(GeminiClient::normalize_model(" models/gemini-pro "), "gemini-pro");
        assert_eq!(GeminiClient::normalize_model("gemini-2.0-flash-exp"), "gemini-2.0-flash-exp");
    }

    #[test]
    fn test_request_serializes_camel_case_fields() {
        let config = LLMConfig::gemini(Some("key".to_string()));
        let json = serde_json::to_value(GeminiClient::request(&config, "  ", "hola")).unwrap();

        assert!(json.get("systemInstruction").is_none());
        assert!(json["generationConfig"].get("temperature").is_some());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hola");

        let json = serde_json::to_value(GeminiClient::request(&config, "Be brief", "hola")).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "Be brief");
    }

    #[test]
    fn test_answer_joins_parts() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Var"},{"text":"onil"}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(GeminiClient::answer(body).unwrap(), "Varonil");
    }

    #[test]
    fn test_blocked_answer_is_an_error() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        let err = GeminiClient::answer(body).unwrap_err();
        assert_eq!(err, AppError::LLMError("Empty answer (finish reason: SAFETY)".to_string()));

        let empty: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(GeminiClient::answer(empty).is_err());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let config = LLMConfig::gemini(None);
        assert!(matches!(GeminiClient::api_key(&config), Err(AppError::LLMError(_))));
    }
}
