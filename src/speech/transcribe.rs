use crate::config::TranscriptionConfig;
use crate::speech::wav::pcm_to_wav_bytes;
use anyhow::{Context, Result};
use reqwest::{multipart, Client, Url};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Markers Whisper-style services emit instead of speech.
const NON_SPEECH_MARKERS: &[&str] = &["BLANK_AUDIO", "INAUDIBLE", "NO_SPEECH", "SILENCE"];

const BODY_SNIPPET_LIMIT: usize = 200;

/// The two failure signals the rest of the app distinguishes. Both abandon
/// the current capture attempt; the outer loop keeps going.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("could not understand the audio")]
    Unintelligible,
    #[error("speech service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
}

impl From<reqwest::Error> for TranscribeError {
    fn from(err: reqwest::Error) -> Self {
        TranscribeError::ServiceUnavailable {
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Remote Whisper-compatible transcription endpoint. The service is an
/// opaque boundary: raw audio in, text or a failure signal out.
pub struct Transcriber {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

impl Transcriber {
    pub fn new(config: &TranscriptionConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid transcription endpoint: {}", config.endpoint))?;

        let api_key = env::var(&config.api_key_env).with_context(|| {
            format!("{} environment variable is not set", config.api_key_env)
        })?;

        let client = Client::builder()
            .user_agent("voxpense")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.request_timeout_secs.max(5)))
            .build()
            .context("Failed to build transcription HTTP client")?;

        info!("Transcription service ready (model: {})", config.model);

        Ok(Self {
            client,
            endpoint,
            api_key,
            model: config.model.clone(),
        })
    }

    pub async fn transcribe(
        &self,
        samples: Vec<f32>,
        sample_rate_hz: u32,
    ) -> Result<String, TranscribeError> {
        if samples.is_empty() {
            return Err(TranscribeError::Unintelligible);
        }

        let duration_secs = samples.len() as f32 / sample_rate_hz as f32;
        debug!("Transcribing {:.2}s of audio", duration_secs);

        let wav = pcm_to_wav_bytes(&samples, sample_rate_hz).map_err(|err| {
            TranscribeError::ServiceUnavailable {
                reason: err.to_string(),
            }
        })?;

        let form = multipart::Form::new()
            .part(
                "file",
                multipart::Part::bytes(wav)
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")?,
            )
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::ServiceUnavailable {
                reason: format!("HTTP {status}: {}", snippet(&body)),
            });
        }

        let payload: TranscriptionResponse = response.json().await?;
        let text = payload.text.trim().to_string();

        if text.is_empty() || contains_only_non_speech_markers(&text) {
            return Err(TranscribeError::Unintelligible);
        }

        Ok(text)
    }
}

fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(BODY_SNIPPET_LIMIT)
        .map_or(body.len(), |(idx, _)| idx);
    body[..end].trim_end()
}

/// True when the transcription consists solely of bracketed non-speech
/// markers like `[BLANK_AUDIO]`.
fn contains_only_non_speech_markers(transcription: &str) -> bool {
    let mut found_marker = false;

    for raw_token in transcription.split_whitespace() {
        let token = raw_token.trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | '"'));
        if token.is_empty() {
            continue;
        }

        if !token.starts_with('[') || !token.ends_with(']') {
            return false;
        }

        let inner = token[1..token.len() - 1].trim();
        if inner.is_empty() {
            return false;
        }

        let upper: String = inner
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();

        if !NON_SPEECH_MARKERS.contains(&upper.as_str()) {
            return false;
        }

        found_marker = true;
    }

    found_marker
}
