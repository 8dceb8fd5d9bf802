use super::*;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::time::Instant;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant for an English classroom game. Answer briefly.";

/// Chat completions against the OpenAI API
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    fn messages(request: &GenerateRequest) -> LlmResult<Vec<ChatCompletionRequestMessage>> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(
                request
                    .system_prompt
                    .as_deref()
                    .unwrap_or(DEFAULT_SYSTEM_PROMPT),
            )
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;
        Ok(vec![system.into(), user.into()])
    }

    /// Chat request for `request`, with the model it will run on
    fn chat_request(
        &self,
        request: &GenerateRequest,
    ) -> LlmResult<(String, CreateChatCompletionRequest)> {
        let model = request
            .model_override
            .clone()
            .unwrap_or_else(|| self.model.clone());

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&model).messages(Self::messages(request)?);
        if let Some(max_tokens) = request.max_tokens {
            args.max_tokens(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            args.temperature(temperature);
        }

        let chat = args
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;
        Ok((model, chat))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        let start = Instant::now();
        let (model, chat) = self.chat_request(&request)?;

        let response = tokio::time::timeout(request.timeout, self.client.chat().create(chat))
            .await
            .map_err(|_| LlmError::Timeout(request.timeout))?
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::ParseError("Empty completion".to_string()))?;

        Ok(GenerateResponse {
            text: text.trim().to_string(),
            metadata: ResponseMetadata {
                provider: self.name().to_string(),
                model,
                tokens_used: response.usage.map(|u| u.total_tokens),
                latency_ms: start.elapsed().as_millis() as u64,
            },
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
