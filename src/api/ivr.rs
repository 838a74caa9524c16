//! Telephony webhook endpoints driving the voice flow
//!
//! Every handler answers 200 with a TwiML document, including on internal
//! failure: a webhook error must surface to the caller as a spoken apology,
//! never as a dead line. The only non-TwiML response is 403 for a bad
//! signature.

use std::collections::BTreeMap;

use actix_web::{post, web, HttpRequest, HttpResponse};

use crate::app::AppState;
use crate::model::CallLog;
use crate::model::NewCallLog;
use crate::service::analysis::wants_to_end;
use crate::service::twiml;

type WebhookForm = web::Form<BTreeMap<String, String>>;

fn twiml_response(document: String) -> HttpResponse {
    HttpResponse::Ok().content_type("text/xml").body(document)
}

fn signature_is_valid(state: &AppState, req: &HttpRequest, params: &BTreeMap<String, String>) -> bool {
    let signature = req
        .headers()
        .get("X-Twilio-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let conn = req.connection_info();
    let url = format!("{}://{}{}", conn.scheme(), conn.host(), req.uri());

    let valid = state.webhook_validator.validate(&url, params, signature);
    if !valid {
        tracing::error!(url = %url, "Invalid webhook signature");
    }
    valid
}

/// Resolve the call log for a webhook. The session registry is the
/// primary key; the caller-hash lookup only covers calls that started
/// before a restart.
async fn resolve_call(state: &AppState, call_sid: Option<&str>, from: Option<&str>) -> Option<CallLog> {
    if let Some(sid) = call_sid {
        if let Some(call_id) = state.sessions.call_id(sid) {
            match state.storage.get_call_log(&call_id).await {
                Ok(call) => return Some(call),
                Err(e) => {
                    tracing::error!(call_id = %call_id, error = %e, "Registered call log missing")
                }
            }
        }
    }

    let from = from?;
    let caller_hash = state.vault.hash_phone(from);
    match state.storage.latest_call_by_hash(&caller_hash).await {
        Ok(Some(call)) => {
            if let Some(sid) = call_sid {
                state.sessions.start(sid, &call.id);
            }
            Some(call)
        }
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %e, "Caller hash lookup failed");
            None
        }
    }
}

/// Call start: create the anonymized call log, register the session and
/// greet the caller
#[utoipa::path(
    post,
    path = "/ivr/incoming",
    responses(
        (status = 200, description = "Greeting TwiML document", content_type = "text/xml"),
        (status = 403, description = "Invalid webhook signature")
    ),
    tag = "ivr"
)]
#[post("/ivr/incoming")]
pub async fn incoming(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: WebhookForm,
) -> HttpResponse {
    if !signature_is_valid(&state, &req, &form) {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let Some(from) = form.get("From") else {
        tracing::error!("Incoming webhook without From parameter");
        return twiml_response(twiml::fallback());
    };

    tracing::info!(call_sid = form.get("CallSid").map(String::as_str), "Incoming call");

    let encrypted_phone = match state.vault.encrypt_phone(from) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::error!(error = %e, "Phone encryption failed");
            return twiml_response(twiml::fallback());
        }
    };

    let new_call = NewCallLog {
        caller_hash: state.vault.hash_phone(from),
        encrypted_phone,
    };

    let call = match state.storage.create_call_log(new_call).await {
        Ok(call) => call,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create call log");
            return twiml_response(twiml::fallback());
        }
    };

    if let Some(call_sid) = form.get("CallSid") {
        state.sessions.start(call_sid, &call.id);
    }

    twiml_response(twiml::greeting(state.config.ivr.initial_recording_secs))
}

/// First utterance: run the triage pipeline and branch on severity
#[utoipa::path(
    post,
    path = "/ivr/process-audio",
    responses(
        (status = 200, description = "Advice or village-request TwiML document", content_type = "text/xml"),
        (status = 403, description = "Invalid webhook signature")
    ),
    tag = "ivr"
)]
#[post("/ivr/process-audio")]
pub async fn process_audio(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: WebhookForm,
) -> HttpResponse {
    if !signature_is_valid(&state, &req, &form) {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let Some(recording_url) = form.get("RecordingUrl") else {
        tracing::error!("Process-audio webhook without RecordingUrl");
        return twiml_response(twiml::fallback());
    };

    let analysis = state.triage.analyze_recording(recording_url).await;

    tracing::info!(
        severity = analysis.severity,
        category = %analysis.category,
        "Triage analysis complete"
    );

    match resolve_call(
        &state,
        form.get("CallSid").map(String::as_str),
        form.get("From").map(String::as_str),
    )
    .await
    {
        Some(call) => {
            if let Err(e) = state
                .escalation
                .apply_analysis(&call.id, &analysis, recording_url)
                .await
            {
                tracing::error!(call_id = %call.id, error = %e, "Failed to apply analysis");
                return twiml_response(twiml::fallback());
            }
        }
        None => {
            tracing::warn!("No call log found for process-audio webhook");
        }
    }

    if analysis.is_emergency() {
        twiml_response(twiml::village_request(
            state.config.ivr.village_recording_secs,
        ))
    } else {
        twiml_response(twiml::advice(
            &analysis.response_text,
            state.config.ivr.followup_recording_secs,
        ))
    }
}

/// Follow-up turns: enforce the turn cap, honor goodbye phrases and watch
/// for new emergencies
#[utoipa::path(
    post,
    path = "/ivr/continue-conversation",
    responses(
        (status = 200, description = "Advice, goodbye or village-request TwiML document", content_type = "text/xml"),
        (status = 403, description = "Invalid webhook signature")
    ),
    tag = "ivr"
)]
#[post("/ivr/continue-conversation")]
pub async fn continue_conversation(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: WebhookForm,
) -> HttpResponse {
    if !signature_is_valid(&state, &req, &form) {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let call_sid = form.get("CallSid").map(String::as_str);
    let from = form.get("From").map(String::as_str);

    // Re-register sessions lost to a restart before spending a turn
    let call = resolve_call(&state, call_sid, from).await;

    let turn = call_sid.and_then(|sid| state.sessions.next_turn(sid, state.config.ivr.max_turns));

    let Some(turn) = turn else {
        tracing::info!(call_sid, "Conversation turn limit reached, ending call");
        if let Some(sid) = call_sid {
            state.sessions.finish(sid);
        }
        return twiml_response(twiml::turn_limit_reached());
    };

    let Some(recording_url) = form.get("RecordingUrl") else {
        tracing::error!("Continue-conversation webhook without RecordingUrl");
        return twiml_response(twiml::fallback());
    };

    let analysis = state.triage.analyze_recording(recording_url).await;

    let transcription = analysis.transcription.clone().unwrap_or_default();
    tracing::info!(turn, transcription = %transcription, "Follow-up turn transcribed");

    if wants_to_end(&transcription) {
        if let Some(sid) = call_sid {
            state.sessions.finish(sid);
        }
        return twiml_response(twiml::goodbye());
    }

    if analysis.is_emergency() {
        tracing::warn!(turn, "New emergency symptoms during conversation");

        if let Some(call) = call {
            if let Err(e) = state
                .escalation
                .apply_analysis(&call.id, &analysis, recording_url)
                .await
            {
                tracing::error!(call_id = %call.id, error = %e, "Failed to escalate follow-up turn");
                return twiml_response(twiml::fallback());
            }
        } else {
            tracing::warn!("Emergency follow-up with no call log to escalate");
        }

        return twiml_response(twiml::village_request(
            state.config.ivr.village_recording_secs,
        ));
    }

    twiml_response(twiml::advice(
        &analysis.response_text,
        state.config.ivr.followup_recording_secs,
    ))
}

/// Emergency village capture: de-anonymize the call and push the alert to
/// dashboards
#[utoipa::path(
    post,
    path = "/ivr/break-glass-confirm",
    responses(
        (status = 200, description = "Confirmation TwiML document", content_type = "text/xml"),
        (status = 403, description = "Invalid webhook signature")
    ),
    tag = "ivr"
)]
#[post("/ivr/break-glass-confirm")]
pub async fn break_glass_confirm(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: WebhookForm,
) -> HttpResponse {
    if !signature_is_valid(&state, &req, &form) {
        return HttpResponse::Forbidden().body("Forbidden");
    }

    let call_sid = form.get("CallSid").map(String::as_str);

    let village_name = match form.get("RecordingUrl") {
        Some(url) => match state.triage.transcribe_village(url).await {
            Some(name) => name,
            None => format!("Village Recording: {}", url),
        },
        None => {
            tracing::error!("Break-glass webhook without RecordingUrl");
            "Pending location capture".to_string()
        }
    };

    match resolve_call(&state, call_sid, form.get("From").map(String::as_str)).await {
        Some(call) => {
            if let Err(e) = state.escalation.break_glass(&call.id, village_name).await {
                // The caller still gets the confirmation; responders are
                // alerted through the dashboard pending list
                tracing::error!(call_id = %call.id, error = %e, "Break-glass workflow error");
            }
        }
        None => {
            tracing::warn!("No call log found for break-glass webhook");
        }
    }

    if let Some(sid) = call_sid {
        state.sessions.finish(sid);
    }

    twiml_response(twiml::emergency_confirmation())
}

/// Configure IVR webhook routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(incoming)
        .service(process_audio)
        .service(continue_conversation)
        .service(break_glass_confirm);
}
