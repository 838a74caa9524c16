//! Real-time alert fan-out to connected dashboards

use tokio::sync::broadcast;

use crate::model::EmergencyAlertEvent;

const CHANNEL_CAPACITY: usize = 32;

/// Broadcast channel carrying emergency alert events. Every websocket
/// session holds its own receiver; sends succeed whether or not anyone is
/// listening.
#[derive(Clone)]
pub struct AlertBroadcaster {
    sender: broadcast::Sender<EmergencyAlertEvent>,
}

impl AlertBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EmergencyAlertEvent> {
        self.sender.subscribe()
    }

    pub fn broadcast(&self, event: EmergencyAlertEvent) {
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::info!(receivers, "Emergency alert broadcast to dashboards");
            }
            Err(_) => {
                tracing::debug!("Emergency alert broadcast with no connected dashboards");
            }
        }
    }
}

impl Default for AlertBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> EmergencyAlertEvent {
        EmergencyAlertEvent {
            id: id.to_string(),
            phone_number: "****-****-0832".to_string(),
            village_name: "Rampur".to_string(),
            timestamp: "2:31 PM".to_string(),
            severity_level: 5,
            category: "Maternal".to_string(),
            emergency_reason: "Heavy bleeding reported".to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let broadcaster = AlertBroadcaster::new();
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(event("alert-1"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, "alert-1");
        assert_eq!(received.phone_number, "****-****-0832");
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_does_not_panic() {
        let broadcaster = AlertBroadcaster::new();
        broadcaster.broadcast(event("alert-1"));
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_copy() {
        let broadcaster = AlertBroadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();

        broadcaster.broadcast(event("alert-1"));

        assert_eq!(a.recv().await.unwrap().id, "alert-1");
        assert_eq!(b.recv().await.unwrap().id, "alert-1");
    }
}
