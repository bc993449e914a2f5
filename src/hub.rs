use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::article::Article;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HubMessage {
    Articles {
        articles: Vec<Article>,
    },
    Shutdown {
        #[serde(rename = "type")]
        kind: String,
        message: String,
    },
}

impl HubMessage {
    pub fn articles(articles: Vec<Article>) -> Self {
        Self::Articles { articles }
    }

    pub fn shutdown() -> Self {
        Self::Shutdown {
            kind: "shutdown".to_string(),
            message: "Server shutting down".to_string(),
        }
    }
}

/// Connected stream clients, each with its own unbounded queue.
#[derive(Debug, Default)]
pub struct ClientHub {
    clients: Mutex<HashMap<String, mpsc::UnboundedSender<HubMessage>>>,
}

impl ClientHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> (String, mpsc::UnboundedReceiver<HubMessage>) {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(8);

        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.lock().insert(id.clone(), tx);
        (id, rx)
    }

    pub fn unregister(&self, id: &str) {
        let remaining = {
            let mut clients = self.clients.lock();
            clients.remove(id);
            clients.len()
        };
        info!(
            "Client {} disconnected - {} clients remaining",
            id, remaining
        );
    }

    /// Queue `message` for every client, dropping clients whose receiver is
    /// gone. Returns how many clients it was delivered to.
    pub fn broadcast(&self, message: HubMessage) -> usize {
        let mut clients = self.clients.lock();

        let disconnected: Vec<String> = clients
            .iter()
            .filter(|(_, tx)| tx.send(message.clone()).is_err())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &disconnected {
            debug!("Dropping closed client {}", id);
            clients.remove(id);
        }

        clients.len()
    }

    /// Send the shutdown notice, then drop every queue so client streams end
    /// once they have drained it.
    pub fn shutdown(&self) {
        let notified = self.broadcast(HubMessage::shutdown());
        self.clients.lock().clear();
        info!("Notified {} clients of shutdown", notified);
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_ids_are_short_and_unique() {
        let hub = ClientHub::new();
        let (a, _rx_a) = hub.register();
        let (b, _rx_b) = hub.register();

        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
        assert_eq!(hub.len(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let hub = ClientHub::new();
        let (_, mut rx_a) = hub.register();
        let (_, mut rx_b) = hub.register();

        let delivered = hub.broadcast(HubMessage::articles(vec![]));

        assert_eq!(delivered, 2);
        assert_eq!(rx_a.recv().await, Some(HubMessage::articles(vec![])));
        assert_eq!(rx_b.recv().await, Some(HubMessage::articles(vec![])));
    }

    #[test]
    fn test_broadcast_prunes_closed_clients() {
        let hub = ClientHub::new();
        let (_, rx) = hub.register();
        let (_, _kept) = hub.register();
        drop(rx);

        assert_eq!(hub.broadcast(HubMessage::shutdown()), 1);
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let hub = ClientHub::new();
        let (id, _rx) = hub.register();
        hub.unregister(&id);
        assert!(hub.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_queues_after_notice() {
        let hub = ClientHub::new();
        let (_, mut rx) = hub.register();

        hub.shutdown();

        assert!(hub.is_empty());
        assert_eq!(rx.recv().await, Some(HubMessage::shutdown()));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_shutdown_message_shape() {
        let value = serde_json::to_value(HubMessage::shutdown()).unwrap();
        assert_eq!(
            value,
            json!({"type": "shutdown", "message": "Server shutting down"})
        );
    }
}
