use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FormError;
use crate::fill::fill_model::TokenUsage;

// ============================================================================
// TextInference trait
// ============================================================================

/// Raw text returned by a completion service, plus what it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// A prompt-in, text-out model endpoint. Batches may be sent from several
/// threads at once.
pub trait TextInference: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<Completion, FormError>;
}

impl<T: TextInference + ?Sized> TextInference for Arc<T> {
    fn complete(&self, prompt: &str) -> Result<Completion, FormError> {
        (**self).complete(prompt)
    }
}

fn build_client(endpoint: &str, timeout: Duration) -> Result<reqwest::blocking::Client, FormError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| FormError::Http {
            endpoint: endpoint.to_string(),
            source,
        })
}

/// POST `body` and return the response text, failing on non-2xx.
fn post_json<T: Serialize>(
    request: reqwest::blocking::RequestBuilder,
    endpoint: &str,
    body: &T,
) -> Result<String, FormError> {
    let response = request.json(body).send().map_err(|source| {
        warn!(endpoint, error = %source, "completion request failed");
        FormError::Http {
            endpoint: endpoint.to_string(),
            source,
        }
    })?;

    let status = response.status();
    let text = response.text().map_err(|source| FormError::Http {
        endpoint: endpoint.to_string(),
        source,
    })?;

    if !status.is_success() {
        warn!(endpoint, status = %status, "completion service error");
        return Err(FormError::Backend(format!("{} returned {}: {}", endpoint, status, text)));
    }

    Ok(text)
}

// ============================================================================
// Ollama Backend
// ============================================================================

pub struct OllamaBackend {
    pub endpoint: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5:1.5b";

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self, FormError> {
        Ok(Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            client: build_client(endpoint, timeout)?,
        })
    }
}

impl TextInference for OllamaBackend {
    fn complete(&self, prompt: &str) -> Result<Completion, FormError> {
        let start = Instant::now();
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        let body = post_json(self.client.post(&self.endpoint), &self.endpoint, &request)?;
        let parsed: OllamaResponse = serde_json::from_str(&body).map_err(|source| FormError::JsonParse {
            context: "ollama response envelope".into(),
            source,
        })?;

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (p, c) => Some(TokenUsage::new(p.unwrap_or(0), c.unwrap_or(0))),
        };

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "ollama completion"
        );

        Ok(Completion {
            text: parsed.response,
            usage,
        })
    }
}

// ============================================================================
// OpenAI-compatible Backend
// ============================================================================

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT: &str =
    "You fill job application forms from a candidate's resume. You answer only with JSON.";

pub struct OpenAiBackend {
    pub base_url: String,
    pub model: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl OpenAiBackend {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self, FormError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client: build_client(base_url, timeout)?,
        })
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env(base_url: &str, model: &str, timeout: Duration) -> Result<Self, FormError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| FormError::Config("OPENAI_API_KEY not set".into()))?;
        Self::new(base_url, &api_key, model, timeout)
    }
}

impl TextInference for OpenAiBackend {
    fn complete(&self, prompt: &str) -> Result<Completion, FormError> {
        let start = Instant::now();
        let endpoint = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let builder = self.client.post(&endpoint).bearer_auth(&self.api_key);
        let body = post_json(builder, &endpoint, &request)?;
        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|source| FormError::JsonParse {
            context: "chat completion envelope".into(),
            source,
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FormError::Backend("no choices in chat completion".into()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );

        Ok(Completion {
            text,
            usage: parsed
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

// ============================================================================
// Mock Backend (for testing without a model)
// ============================================================================

type Responder = Box<dyn Fn(&str) -> Result<Completion, FormError> + Send + Sync>;

/// Canned or computed responses; records every prompt it receives.
pub struct MockTextInference {
    responder: Responder,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockTextInference {
    /// Answer every prompt with the same text.
    pub fn with_response(response: &str) -> Self {
        let response = response.to_string();
        Self::from_fn(move |_| Ok(Completion::text(response.clone())))
    }

    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<Completion, FormError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl TextInference for MockTextInference {
    fn complete(&self, prompt: &str) -> Result<Completion, FormError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        (self.responder)(prompt)
    }
}
