use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Google,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LLMConfig {
    /// Gemini `generateContent` endpoint
    pub fn gemini(api_key: Option<String>) -> Self {
        Self {
            provider: LLMProvider::Google,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            api_key,
            max_tokens: Some(50),
            temperature: Some(0.1),
        }
    }

    /// OpenAI-compatible chat completions endpoint
    pub fn openai(api_key: Option<String>) -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key,
            max_tokens: Some(50),
            temperature: Some(0.1),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self::openai(None)
    }
}
