//! Recording download and speech-to-text
//!
//! Recordings live on the telephony provider's media store behind basic
//! auth; transcription goes through the OpenAI Whisper API.

use std::env;

use reqwest::Client;
use serde::Deserialize;

const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const WHISPER_MODEL: &str = "whisper-1";
// Callers speak Hindi; pinning the language improves Whisper accuracy
const WHISPER_LANGUAGE: &str = "hi";

const ENV_TWILIO_ACCOUNT_SID: &str = "MAITRI_TWILIO_ACCOUNT_SID";
const ENV_TWILIO_AUTH_TOKEN: &str = "MAITRI_TWILIO_AUTH_TOKEN";

#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Recording download failed with status {0}")]
    DownloadFailed(reqwest::StatusCode),

    #[error("Transcription failed with status {0}: {1}")]
    TranscriptionFailed(reqwest::StatusCode, String),
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Client for fetching call recordings and transcribing them
#[derive(Clone)]
pub struct TranscriptionClient {
    client: Client,
    openai_api_key: String,
    twilio_credentials: Option<(String, String)>,
}

impl TranscriptionClient {
    /// Build the client. Recording downloads authenticate with the Twilio
    /// account credentials when both are present in the environment;
    /// otherwise recordings are fetched unauthenticated.
    pub fn new(openai_api_key: &str) -> Self {
        let twilio_credentials = match (
            env::var(ENV_TWILIO_ACCOUNT_SID),
            env::var(ENV_TWILIO_AUTH_TOKEN),
        ) {
            (Ok(sid), Ok(token)) => Some((sid, token)),
            _ => {
                tracing::warn!("Twilio credentials not set, downloading recordings without auth");
                None
            }
        };

        Self {
            client: Client::new(),
            openai_api_key: openai_api_key.to_string(),
            twilio_credentials,
        }
    }

    /// Download a recording and return the Hindi transcription
    pub async fn transcribe_recording(&self, recording_url: &str) -> Result<String, TranscribeError> {
        let audio = self.download_recording(recording_url).await?;

        tracing::debug!(
            url = %recording_url,
            bytes = audio.len(),
            "Transcribing recording with Whisper"
        );

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", WHISPER_MODEL)
            .text("language", WHISPER_LANGUAGE);

        let response = self
            .client
            .post(WHISPER_API_URL)
            .bearer_auth(&self.openai_api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::TranscriptionFailed(status, body));
        }

        let whisper: WhisperResponse = response.json().await?;

        tracing::debug!(text = %whisper.text, "Transcription complete");

        Ok(whisper.text)
    }

    async fn download_recording(&self, url: &str) -> Result<Vec<u8>, TranscribeError> {
        tracing::debug!(url = %url, "Downloading recording");

        let mut request = self.client.get(url);
        if let Some((sid, token)) = &self.twilio_credentials {
            request = request.basic_auth(sid, Some(token));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(TranscribeError::DownloadFailed(response.status()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
