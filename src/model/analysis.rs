//! Triage analysis domain model and the LLM extraction payload

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::call::Category;

/// Severity at or above which a call escalates to an emergency alert
pub const EMERGENCY_SEVERITY: i32 = 4;

/// Result of analysing one caller utterance. Produced by the triage
/// pipeline (model extraction plus the local keyword fail-safe) and
/// applied back onto the call log.
#[derive(Debug, Clone)]
pub struct TriageAnalysis {
    /// 1 (informational) to 5 (life-threatening)
    pub severity: i32,
    pub category: Category,
    /// Spoken back to the caller in Hindi
    pub response_text: String,
    /// Present when severity reaches the emergency threshold
    pub emergency_reason: Option<String>,
    pub transcription: Option<String>,
}

impl TriageAnalysis {
    pub fn is_emergency(&self) -> bool {
        self.severity >= EMERGENCY_SEVERITY
    }
}

/// Structured triage extracted by the LLM
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedTriage {
    /// Urgency of the health concern
    #[schemars(
        description = "Severity from 1 to 5. 1-2 routine questions, 3 needs follow-up, 4 urgent, 5 life-threatening emergency (heavy bleeding, unconsciousness, severe labour complications)"
    )]
    pub severity: i32,

    #[schemars(
        description = "Health topic of the call: Maternal, Infant, Menstrual or General"
    )]
    pub category: ExtractedCategory,

    /// Caring response in simple Hindi, spoken back over the phone
    #[schemars(
        description = "Short empathetic health guidance in simple Hindi (Devanagari script), at most three sentences, suitable for text-to-speech"
    )]
    pub response_text: String,

    /// Only for severity 4 and above
    #[schemars(
        description = "One-line reason the call is an emergency, in English, only when severity is 4 or 5"
    )]
    pub emergency_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub enum ExtractedCategory {
    Maternal,
    Infant,
    Menstrual,
    General,
}

impl From<ExtractedCategory> for Category {
    fn from(value: ExtractedCategory) -> Self {
        match value {
            ExtractedCategory::Maternal => Category::Maternal,
            ExtractedCategory::Infant => Category::Infant,
            ExtractedCategory::Menstrual => Category::Menstrual,
            ExtractedCategory::General => Category::General,
        }
    }
}
