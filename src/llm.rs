//! LLM client abstraction and implementations.
//!
//! Defines the [`LlmClient`] trait and three concrete backends:
//! - **ollama** — local Ollama `/api/chat` endpoint.
//! - **openai** — any OpenAI-compatible `/chat/completions` endpoint with
//!   a bearer key read from the environment.
//! - **gemini** — Google `generativelanguage` `:generateContent`, with the
//!   system prompt folded into the user content.
//!
//! Structured output is layered on top of plain generation:
//! [`generate_json`](LlmClient::generate_json) appends a JSON instruction,
//! then salvages the first balanced `{...}` block when the model wraps its
//! answer in prose. [`generate_structured`] deserializes that into a typed
//! value and turns failures into [`Error::Parse`].

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::config::LlmConfig;
use crate::error::Error;
use crate::prompts::JSON_SYSTEM_PROMPT;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider/model identifier recorded alongside generated analyses.
    fn model_name(&self) -> String;

    /// One-shot text generation with an optional system prompt.
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String>;

    /// Generation constrained to JSON. The raw reply is parsed directly
    /// first; if that fails, the first balanced `{...}` block is tried.
    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value> {
        let full_prompt = format!(
            "{}\n\nReturn JSON only, with no surrounding text.",
            prompt
        );
        let reply = self.generate(&full_prompt, Some(JSON_SYSTEM_PROMPT)).await?;

        if let Ok(value) = serde_json::from_str(&reply) {
            return Ok(value);
        }
        if let Some(block) = extract_json_block(&reply) {
            if let Ok(value) = serde_json::from_str(block) {
                return Ok(value);
            }
        }
        bail!("Model did not return parseable JSON: {}", truncate(&reply, 200))
    }
}

/// Generate JSON and deserialize it into `T`. Shape mismatches surface as
/// [`Error::Parse`]; transport failures stay `Upstream`.
pub async fn generate_structured<T: DeserializeOwned>(
    client: &dyn LlmClient,
    prompt: &str,
) -> crate::error::Result<T> {
    let value = client.generate_json(prompt).await?;
    serde_json::from_value(value.clone())
        .map_err(|e| Error::Parse(format!("{} (in {})", e, truncate(&value.to_string(), 200))))
}

/// First balanced `{...}` block in the text, if any.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Create the client named by the configuration.
pub fn create_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(OllamaLlm::new(config)?)),
        "openai" => Ok(Box::new(OpenAiCompatLlm::new(config)?)),
        "gemini" => Ok(Box::new(GeminiLlm::new(config)?)),
        "disabled" => bail!("LLM provider is disabled. Set [llm] provider in config."),
        other => bail!("Unknown llm provider: {}", other),
    }
}

fn require_model(config: &LlmConfig) -> Result<String> {
    config
        .model
        .clone()
        .ok_or_else(|| anyhow::anyhow!("llm.model required for {} provider", config.provider))
}

fn require_api_key(config: &LlmConfig) -> Result<String> {
    std::env::var(&config.api_key_env)
        .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_env))
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

// ============ Ollama backend ============

/// Local Ollama chat endpoint, non-streaming.
pub struct OllamaLlm {
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OllamaLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: require_model(config)?,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaLlm {
    fn model_name(&self) -> String {
        format!("ollama/{}", self.model)
    }

    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let client = http_client(self.timeout_secs)?;

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
        });

        let response = client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama chat error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message content"))
    }
}

// ============ OpenAI-compatible backend ============

/// Chat completions against any OpenAI-compatible server (OpenAI itself,
/// vLLM, LiteLLM proxies, and the like).
pub struct OpenAiCompatLlm {
    base_url: String,
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiCompatLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            model: require_model(config)?,
            api_key: require_api_key(config)?,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatLlm {
    fn model_name(&self) -> String {
        format!("openai/{}", self.model)
    }

    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let client = http_client(self.timeout_secs)?;

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let response = client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chat completions error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid chat completions response: missing choices"))
    }
}

// ============ Gemini backend ============

/// Google Gemini `generateContent`. The API has no separate system role
/// here, so the system prompt is prepended to the user content.
pub struct GeminiLlm {
    model: String,
    api_key: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

impl GeminiLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: require_model(config)?,
            api_key: require_api_key(config)?,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiLlm {
    fn model_name(&self) -> String {
        format!("gemini/{}", self.model)
    }

    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String> {
        let client = http_client(self.timeout_secs)?;

        let full_prompt = match system_prompt {
            Some(system) => format!("{}\n\n{}", system, prompt),
            None => prompt.to_string(),
        };

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": full_prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        });

        let response = client
            .post(format!(
                "{}/{}:generateContent?key={}",
                GEMINI_BASE_URL, self.model, self.api_key
            ))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Gemini error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        json.get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidates"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedLlm {
        reply: String,
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        fn model_name(&self) -> String {
            "test/canned".to_string()
        }

        async fn generate(&self, _prompt: &str, _system: Option<&str>) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn extract_json_block_finds_first_balanced_object() {
        let text = "Sure! Here you go:\n{\"a\": {\"b\": 1}} trailing {\"c\": 2}";
        assert_eq!(extract_json_block(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn extract_json_block_ignores_braces_inside_strings() {
        let text = "{\"a\": \"has } brace\", \"b\": 2}";
        assert_eq!(extract_json_block(text), Some(text));
    }

    #[test]
    fn extract_json_block_none_when_unbalanced() {
        assert_eq!(extract_json_block("{\"a\": 1"), None);
        assert_eq!(extract_json_block("no json here"), None);
    }

    #[tokio::test]
    async fn generate_json_parses_direct_reply() {
        let llm = CannedLlm {
            reply: "{\"x\": 1}".to_string(),
        };
        let value = llm.generate_json("p").await.unwrap();
        assert_eq!(value["x"], 1);
    }

    #[tokio::test]
    async fn generate_json_salvages_wrapped_reply() {
        let llm = CannedLlm {
            reply: "Here is the JSON you asked for:\n{\"x\": [1, 2]}\nHope that helps!".to_string(),
        };
        let value = llm.generate_json("p").await.unwrap();
        assert_eq!(value["x"][1], 2);
    }

    #[tokio::test]
    async fn generate_json_fails_on_prose() {
        let llm = CannedLlm {
            reply: "I cannot produce JSON today.".to_string(),
        };
        assert!(llm.generate_json("p").await.is_err());
    }

    #[tokio::test]
    async fn generate_structured_reports_parse_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Shape {
            #[allow(dead_code)]
            required: String,
        }
        let llm = CannedLlm {
            reply: "{\"required\": 42}".to_string(),
        };
        let err = generate_structured::<Shape>(&llm, "p").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
