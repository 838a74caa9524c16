//! Call log domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Topic label assigned to a call by the triage analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub enum Category {
    Maternal,
    Infant,
    Menstrual,
    #[default]
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Maternal => "Maternal",
            Category::Infant => "Infant",
            Category::Menstrual => "Menstrual",
            Category::General => "General",
        }
    }

    /// Parse a category label, defaulting to `General` for anything unknown
    /// (the analysis collaborator is not trusted to stay within the enum).
    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "Maternal" => Category::Maternal,
            "Infant" => Category::Infant,
            "Menstrual" => Category::Menstrual,
            _ => Category::General,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound phone call. Created anonymized at call start; analysis fields
/// are filled in after the speech/AI step.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CallLog {
    pub id: String,
    /// Salted one-way hash of the caller's phone number; correlation key only
    pub caller_hash: String,
    /// Reversible AES-256-GCM encryption of the phone number
    pub encrypted_phone: Option<String>,
    pub transcription: Option<String>,
    pub ai_response: Option<String>,
    /// 0 until the analysis step has run, then 1-5
    pub severity_level: i32,
    pub category: Category,
    /// True once the emergency de-anonymization flow has run
    pub is_break_glass: bool,
    pub village_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CallLog {
    /// A record read before the analysis step has completed
    pub fn is_pending_analysis(&self) -> bool {
        self.severity_level == 0
    }
}

/// Fields required to create a call log at call start
#[derive(Debug, Clone)]
pub struct NewCallLog {
    pub caller_hash: String,
    pub encrypted_phone: Option<String>,
}

/// Partial update applied after analysis or during break-glass
#[derive(Debug, Clone, Default)]
pub struct CallLogUpdate {
    pub transcription: Option<String>,
    pub ai_response: Option<String>,
    pub severity_level: Option<i32>,
    pub category: Option<Category>,
    pub is_break_glass: Option<bool>,
    pub village_location: Option<String>,
}
