//! OpenAI client shared by the triage pipeline
//!
//! One client is constructed at startup together with the model choice, so
//! every extraction in the process runs against the same configuration.

use rig::providers::openai;

const ENV_TRIAGE_MODEL: &str = "MAITRI_TRIAGE_MODEL";

const DEFAULT_MODEL: &str = openai::GPT_4O;

/// OpenAI client plus the resolved triage model name
#[derive(Clone)]
pub struct LlmClient {
    client: openai::Client,
    model: String,
}

impl LlmClient {
    /// Build the client. The triage model defaults to GPT-4o and can be
    /// overridden with MAITRI_TRIAGE_MODEL.
    pub fn new(api_key: &str) -> Result<Self, String> {
        let client = openai::Client::new(api_key);

        let model = std::env::var(ENV_TRIAGE_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        tracing::info!(model = %model, "LLM client initialized");

        Ok(Self { client, model })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Use this to create extractors with custom configuration
    pub fn openai_client(&self) -> &openai::Client {
        &self.client
    }
}
