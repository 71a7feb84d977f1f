use serde::Serialize;

use crate::models::stock::StockResponse;

/// Notable happenings pushed to subscribers after a snapshot cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    NewLeader {
        ticker: String,
        previous_leader: String,
        price: f64,
    },
    AllTimeHigh {
        ticker: String,
        price: f64,
        previous_high: f64,
    },
    BigCrash {
        ticker: String,
        price: f64,
        previous_price: f64,
        change_percent: f64,
    },
    MarketOpen {
        market_day: i32,
    },
    MarketClose {
        market_day: i32,
        leader: Option<String>,
    },
}

/// Stock list updates pushed to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StockMessage {
    StocksUpdate { stocks: Vec<StockResponse> },
}
