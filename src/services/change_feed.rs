// src/services/change_feed.rs

use std::fmt;

use chrono::NaiveDate;
use tokio::sync::broadcast;

use crate::models::{calendar::month_id, reservations::ResourceKind};

pub const FEED_CAPACITY: usize = 256;

/// Qué vista ha cambiado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeTopic {
    // Mes del calendario, "YYYY-MM"
    Calendar(String),
    Reservations(ResourceKind, NaiveDate),
}

impl ChangeTopic {
    pub fn calendar(day: NaiveDate) -> Self {
        ChangeTopic::Calendar(month_id(day))
    }
}

impl fmt::Display for ChangeTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeTopic::Calendar(month) => f.write_str(month),
            ChangeTopic::Reservations(resource, day) => {
                write!(f, "{}:{}", resource.as_str(), day.format("%Y-%m-%d"))
            }
        }
    }
}

/// Canal de cambios en memoria del proceso. Cada suscriptor vive lo que su conexión.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeTopic>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, topic: ChangeTopic) {
        tracing::debug!("Cambio publicado en '{}'", topic);
        // Sin suscriptores el envío falla, y no pasa nada
        let _ = self.sender.send(topic);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeTopic> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_render_as_keys() {
        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        assert_eq!(ChangeTopic::calendar(day).to_string(), "2025-10");
        assert_eq!(
            ChangeTopic::Reservations(ResourceKind::Cart, day).to_string(),
            "cart:2025-10-14"
        );
    }

    #[tokio::test]
    async fn subscribers_receive_published_changes() {
        let feed = ChangeFeed::default();
        let mut rx = feed.subscribe();
        let day = NaiveDate::from_ymd_opt(2025, 10, 14).unwrap();
        feed.publish(ChangeTopic::calendar(day));
        assert_eq!(rx.recv().await.unwrap(), ChangeTopic::Calendar("2025-10".into()));
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = ChangeFeed::new(4);
        feed.publish(ChangeTopic::Calendar("2025-10".into()));
    }
}
