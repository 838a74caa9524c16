//! Service layer: triage pipeline, privacy, escalation and call-flow
//! plumbing

pub mod analysis;
pub mod escalation;
pub mod llm;
pub mod privacy;
pub mod realtime;
pub mod session;
pub mod transcribe;
pub mod twiml;
pub mod webhook_auth;

pub use analysis::TriageService;
pub use escalation::EscalationService;
pub use llm::LlmClient;
pub use privacy::PhoneVault;
pub use realtime::AlertBroadcaster;
pub use session::SessionRegistry;
pub use transcribe::TranscriptionClient;
pub use webhook_auth::WebhookValidator;
