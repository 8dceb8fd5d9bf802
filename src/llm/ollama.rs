use super::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Error bodies longer than this are cut in log messages
const MAX_ERROR_BODY: usize = 200;

/// Local models served by Ollama's `/api/generate`
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    http: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String) -> LlmResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LlmError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model,
            http,
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl OllamaOptions {
    fn from_request(request: &GenerateRequest) -> Option<Self> {
        if request.max_tokens.is_none() && request.temperature.is_none() {
            return None;
        }
        Some(Self {
            num_predict: request.max_tokens,
            temperature: request.temperature,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
    /// Tokens generated
    #[serde(default)]
    eval_count: Option<u32>,
}

fn truncated(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let start = Instant::now();
        let model = request
            .model_override
            .clone()
            .unwrap_or_else(|| self.model.clone());
        let timeout = request.timeout;

        let body = OllamaGenerateRequest {
            model: model.clone(),
            options: OllamaOptions::from_request(&request),
            prompt: request.prompt,
            stream: false,
            system: request.system_prompt,
        };

        let call = async {
            let response = self
                .http
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::ApiError(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::ApiError(format!(
                    "Ollama answered {}: {}",
                    status,
                    truncated(&text)
                )));
            }

            response
                .json::<OllamaGenerateResponse>()
                .await
                .map_err(|e| LlmError::ParseError(e.to_string()))
        };

        let reply = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| LlmError::Timeout(timeout))??;

        Ok(GenerateResponse {
            text: reply.response.trim().to_string(),
            metadata: ResponseMetadata {
                provider: self.name().to_string(),
                model,
                tokens_used: reply.eval_count,
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
