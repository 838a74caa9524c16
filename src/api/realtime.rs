//! WebSocket endpoint pushing emergency alerts to open dashboards
//!
//! Delivery is best-effort. A session that falls behind the broadcast
//! channel skips the missed events and keeps going; the dashboard reconciles
//! through the REST alert listing.

use actix_web::{get, web, HttpRequest, HttpResponse};
use actix_ws::Message;
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::model::EmergencyAlertEvent;
use crate::service::AlertBroadcaster;

/// Frame sent to dashboard clients for each alert
#[derive(Debug, Serialize)]
struct WsEnvelope {
    event: &'static str,
    data: EmergencyAlertEvent,
}

impl WsEnvelope {
    fn emergency(data: EmergencyAlertEvent) -> Self {
        Self {
            event: "emergency_alert",
            data,
        }
    }
}

/// Upgrade to WebSocket and stream emergency alerts until the client leaves
#[get("/ws/alerts")]
pub async fn alerts_ws(
    req: HttpRequest,
    stream: web::Payload,
    broadcaster: web::Data<AlertBroadcaster>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let mut rx = broadcaster.subscribe();

    actix_web::rt::spawn(async move {
        tracing::info!("Dashboard websocket connected");

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(event) => {
                        let payload = match serde_json::to_string(&WsEnvelope::emergency(event)) {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to serialize alert event");
                                continue;
                            }
                        };
                        if session.text(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Websocket session lagged, alerts dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
                msg = msg_stream.next() => match msg {
                    Some(Ok(Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(reason))) => {
                        let _ = session.close(reason).await;
                        tracing::info!("Dashboard websocket closed by client");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                },
            }
        }

        let _ = session.close(None).await;
        tracing::info!("Dashboard websocket disconnected");
    });

    Ok(response)
}

/// Configure realtime routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(alerts_ws);
}
