//! Spoken-solution judge.
//!
//! A judge turns recorded speech into text and compares it with the puzzle phrase. It never
//! fails from the caller's side: anything that goes wrong is a "no match".

use super::*;
use crate::session::solution_matches;
use async_openai::{
    config::OpenAIConfig,
    types::{AudioInput, CreateTranscriptionRequestArgs},
    Client,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Recorded answer as received from the host
#[derive(Debug, Clone)]
pub struct SpokenAudio {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl SpokenAudio {
    /// Decode a base64 payload. `None` for invalid or empty input.
    pub fn from_base64(payload: &str, mime: Option<&str>) -> Option<Self> {
        // Browsers hand out data URLs; keep only the payload
        let payload = payload
            .split_once(',')
            .filter(|(head, _)| head.starts_with("data:"))
            .map_or(payload, |(_, data)| data);
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        if bytes.is_empty() {
            return None;
        }
        Some(Self {
            bytes,
            mime: mime.unwrap_or("audio/webm").to_string(),
        })
    }

    /// Upload filename; the transcription API infers the codec from the extension
    pub fn file_name(&self) -> String {
        let ext = match self.mime.split(';').next().unwrap_or("").trim() {
            "audio/ogg" => "ogg",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => "m4a",
            _ => "webm",
        };
        format!("answer.{}", ext)
    }
}

#[async_trait]
pub trait SolutionJudge: Send + Sync {
    /// Speech to text
    async fn transcribe(&self, audio: &SpokenAudio) -> LlmResult<String>;

    /// Whether the recording says `target`. Failures count as no match.
    async fn check_spoken_solution(&self, audio: &SpokenAudio, target: &str) -> bool {
        match self.transcribe(audio).await {
            Ok(transcript) => {
                let matched = solution_matches(target, &transcript);
                tracing::info!("Spoken solve heard {:?}, match={}", transcript, matched);
                matched
            }
            Err(e) => {
                tracing::warn!("Spoken solve could not be judged: {}", e);
                false
            }
        }
    }
}

/// Whisper-backed judge
pub struct OpenAiJudge {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

impl OpenAiJudge {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
            timeout,
        }
    }
}

#[async_trait]
impl SolutionJudge for OpenAiJudge {
    async fn transcribe(&self, audio: &SpokenAudio) -> LlmResult<String> {
        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(audio.file_name(), audio.bytes.clone()))
            .model(&self.model)
            .language("en")
            .build()
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.audio().transcribe(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
            .map_err(|e| LlmError::ApiError(e.to_string()))?;

        Ok(response.text.trim().to_string())
    }
}
