//! Triage analysis pipeline
//!
//! Transcribes the caller's recording, extracts a structured triage from
//! the LLM, then runs a local keyword fail-safe over the transcription.
//! The pipeline never fails upward: any collaborator outage degrades to a
//! fixed low-severity fallback so the caller always hears a response.

use crate::model::{Category, ExtractedTriage, TriageAnalysis, EMERGENCY_SEVERITY};
use crate::service::llm::LlmClient;
use crate::service::transcribe::TranscriptionClient;
use rig::client::CompletionClient;
/// Hindi emergency phrases that force escalation no matter what the model
/// scored. The model is advisory; this list is authoritative.
const EMERGENCY_KEYWORDS: &[&str] = &[
    // Severe bleeding
    "बहुत खून",
    "अधिक रक्तस्राव",
    "भारी रक्तस्राव",
    "खून बह रहा",
    // Severe pain
    "तेज दर्द",
    "असहनीय दर्द",
    "बहुत दर्द",
    "पेट में तेज दर्द",
    // Pregnancy complications
    "गर्भावस्था में समस्या",
    "बच्चा हिल नहीं रहा",
    "पेट में बच्चा",
    // Delivery complications
    "प्रसव",
    "बच्चा पैदा",
    "डिलीवरी",
    "जन्म",
    // Severe menstrual issues
    "माहवारी में समस्या",
    "पीरियड्स में दिक्कत",
    "मासिक धर्म",
    // Critical symptoms
    "बेहोशी",
    "सांस लेने में दिक्कत",
    "चक्कर आना",
    "उल्टी",
    // Emergency words
    "मदद चाहिए",
    "तुरंत",
    "जल्दी",
    "गंभीर",
];

/// Phrases that mean the caller is done
const END_KEYWORDS: &[&str] = &[
    "अलविदा",
    "अल्विदा",
    "alvida",
    "धन्यवाद",
    "समाप्त",
    "बंद",
    "खत्म",
    "रुको",
    "बाय",
    "bye",
    "goodbye",
    "thanks",
    "thank you",
    "end",
    "stop",
    "quit",
    "exit",
];

const TRIAGE_SYSTEM_PROMPT: &str = "\
Role: You are 'Maitri', a compassionate, non-medical older sister ('Didi') helping rural women in India.

Input: A transcription of a woman's health concern in Hindi or English.

Task:
1. Analyze the symptom severity on a scale of 1-5.
2. Assign the health category: Maternal, Infant, Menstrual or General.
3. Generate a brief, empathetic response (max 2 sentences) in Hindi. Do NOT diagnose. Suggest home care or visiting an ASHA worker.
4. If severity is 4 or 5, give a one-line emergency reason.

Severity Guidelines:
- 1-2: Minor concerns (tiredness, mild pain)
- 3: Moderate issues needing attention (strong pain, fever)
- 4-5: Emergency situations (heavy bleeding, breathing problems, delivery complications)

Response Style:
- Always respond with empathy and care
- Use simple Hindi that rural women can understand
- Never give medical diagnosis
- Always suggest ASHA worker for serious concerns
- Be culturally sensitive to Indian rural context";

/// Service running the full triage pipeline over one recording
pub struct TriageService {
    llm_client: Option<LlmClient>,
    transcriber: Option<TranscriptionClient>,
}

impl TriageService {
    /// Creates a new triage service
    ///
    /// Both collaborators are optional; without them every analysis is the
    /// fixed fallback.
    pub fn new(llm_client: Option<LlmClient>, transcriber: Option<TranscriptionClient>) -> Self {
        tracing::info!(
            llm_configured = llm_client.is_some(),
            speech_configured = transcriber.is_some(),
            "Triage service initialized"
        );

        Self {
            llm_client,
            transcriber,
        }
    }

    /// Run the full pipeline over one recording. Never fails; collaborator
    /// errors degrade to the fixed fallback analysis.
    pub async fn analyze_recording(&self, recording_url: &str) -> TriageAnalysis {
        let transcriber = match &self.transcriber {
            Some(t) => t,
            None => {
                tracing::info!("Speech collaborator not configured, using fallback analysis");
                return fallback_analysis();
            }
        };

        let transcription = match transcriber.transcribe_recording(recording_url).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(url = %recording_url, error = %e, "Transcription failed, using fallback analysis");
                return fallback_analysis();
            }
        };

        self.analyze_transcription(transcription).await
    }

    /// Analyze an already transcribed utterance
    pub async fn analyze_transcription(&self, transcription: String) -> TriageAnalysis {
        let mut analysis = match self.extract_triage(&transcription).await {
            Some(a) => a,
            None => {
                let mut fallback = fallback_analysis();
                fallback.transcription = Some(transcription.clone());
                fallback
            }
        };

        // Keyword fail-safe runs last and only ever raises severity
        if let Some(reason) = detect_emergency_keywords(&transcription) {
            tracing::warn!(reason = %reason, "Emergency keyword detected in transcription");
            analysis.severity = analysis.severity.max(EMERGENCY_SEVERITY);
            analysis.emergency_reason = Some(reason);
        }

        analysis
    }

    /// Transcribe the village-name recording, if the speech collaborator
    /// is available
    pub async fn transcribe_village(&self, recording_url: &str) -> Option<String> {
        let transcriber = self.transcriber.as_ref()?;
        match transcriber.transcribe_recording(recording_url).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!(url = %recording_url, error = %e, "Village transcription failed");
                None
            }
        }
    }

    async fn extract_triage(&self, transcription: &str) -> Option<TriageAnalysis> {
        let llm_client = self.llm_client.as_ref()?;
        let model = llm_client.model();

        let start_time = std::time::Instant::now();

        tracing::debug!(
            model = %model,
            transcription_length = transcription.len(),
            "Initiating OpenAI API call for triage extraction"
        );

        let extractor = llm_client
            .openai_client()
            .extractor::<ExtractedTriage>(model)
            .preamble(TRIAGE_SYSTEM_PROMPT)
            .build();

        match extractor.extract(transcription).await {
            Ok(extracted) => {
                let elapsed = start_time.elapsed();
                tracing::info!(
                    model = %model,
                    elapsed_ms = elapsed.as_millis(),
                    severity = extracted.severity,
                    "OpenAI API call for triage extraction completed successfully"
                );

                Some(TriageAnalysis {
                    severity: extracted.severity.clamp(1, 5),
                    category: Category::from(extracted.category),
                    response_text: extracted.response_text,
                    emergency_reason: extracted.emergency_reason,
                    transcription: Some(transcription.to_string()),
                })
            }
            Err(e) => {
                let elapsed = start_time.elapsed();
                tracing::error!(
                    model = %model,
                    elapsed_ms = elapsed.as_millis(),
                    error = %e,
                    "OpenAI API call for triage extraction failed"
                );
                None
            }
        }
    }
}

/// Fixed low-severity analysis used whenever a collaborator is missing or
/// fails. Deliberately severity 2 so an outage can never fabricate an
/// emergency.
pub fn fallback_analysis() -> TriageAnalysis {
    TriageAnalysis {
        severity: 2,
        category: Category::General,
        response_text: "आपने फोन किया इसके लिए धन्यवाद। अपने लक्षणों पर ध्यान दें। \
                        अगर बिगड़े तो तुरंत ASHA कार्यकर्ता से संपर्क करें।"
            .to_string(),
        emergency_reason: None,
        transcription: None,
    }
}

/// Scan a transcription for emergency phrases. Returns the reason string
/// for the first hit.
pub fn detect_emergency_keywords(transcription: &str) -> Option<String> {
    let lower = transcription.to_lowercase();
    EMERGENCY_KEYWORDS
        .iter()
        .find(|keyword| lower.contains(&keyword.to_lowercase()))
        .map(|keyword| {
            format!(
                "Emergency keyword detected: \"{}\" - requires immediate medical attention",
                keyword
            )
        })
}

/// True when the caller said any of the goodbye phrases
pub fn wants_to_end(transcription: &str) -> bool {
    let lower = transcription.to_lowercase();
    END_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(&keyword.to_lowercase()))
}
