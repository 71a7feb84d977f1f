use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::{MarketEvent, Stock, StockMessage, StockResponse};

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out sink for realtime updates.
///
/// Messages are serialized once and handed to every subscriber. Sending never
/// blocks and never fails: subscribers that fall behind skip messages, and
/// closed subscribers simply stop receiving.
#[derive(Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<String>,
}

impl Broadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.sender.subscribe()
    }

    pub fn broadcast<T: Serialize>(&self, message: &T) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize broadcast message: {}", e);
                return;
            }
        };

        match self.sender.send(payload) {
            Ok(receivers) => debug!("Broadcast delivered to {} subscribers", receivers),
            Err(_) => debug!("No subscribers to broadcast to"),
        }
    }

    pub fn broadcast_stocks_update(&self, stocks: &[Stock]) {
        let stocks = stocks.iter().map(StockResponse::from).collect();
        self.broadcast(&StockMessage::StocksUpdate { stocks });
    }

    /// Sends each event as its own message, preserving order.
    pub fn broadcast_events(&self, events: &[MarketEvent]) {
        for event in events {
            self.broadcast(event);
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
