use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A tradable stock in the game.
///
/// Prices are mutated by the price tick job, while ranks and the reference
/// baseline are owned by the snapshot job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Stock {
    pub ticker: String,
    pub price: f64,
    pub max_price: Option<f64>,
    pub min_price: Option<f64>,
    pub reference_price: Option<f64>,
    pub reference_price_at: Option<DateTime<Utc>>,
    pub rank: Option<i32>,
    pub change_rank: Option<i32>,
    pub previous_rank: Option<i32>,
    pub previous_change_rank: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Percentage change since the reference price.
    ///
    /// Undefined when no reference price has been recorded yet, or when the
    /// reference is zero.
    pub fn percentage_change(&self) -> Option<f64> {
        match self.reference_price {
            Some(reference) if reference > 0.0 => Some((self.price - reference) / reference * 100.0),
            _ => None,
        }
    }

    /// Records a new price, widening the session extremes when needed.
    pub fn set_price(&mut self, new_price: f64, now: DateTime<Utc>) {
        self.price = new_price;
        self.updated_at = now;

        if self.max_price.map_or(true, |max| new_price > max) {
            self.max_price = Some(new_price);
        }
        if self.min_price.map_or(true, |min| new_price < min) {
            self.min_price = Some(new_price);
        }
    }

    /// Starts a new market day for this stock: the current price becomes the
    /// baseline for percentage change and the extremes collapse onto it.
    pub fn reset_reference(&mut self, now: DateTime<Utc>) {
        self.reference_price = Some(self.price);
        self.reference_price_at = Some(now);
        self.max_price = Some(self.price);
        self.min_price = Some(self.price);
    }
}

/// What caused a price mutation. Only `Random` originates from the jobs; the
/// other kinds are written by user-facing actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    #[allow(dead_code)]
    Initial,
    Random,
    #[allow(dead_code)]
    Admin,
    #[allow(dead_code)]
    Swipe,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Initial => write!(f, "INITIAL"),
            ChangeType::Random => write!(f, "RANDOM"),
            ChangeType::Admin => write!(f, "ADMIN"),
            ChangeType::Swipe => write!(f, "SWIPE"),
        }
    }
}

/// Input for appending to the price history
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePriceEvent {
    pub ticker: String,
    pub price: f64,
    pub change_type: ChangeType,
}

/// Point-in-time price used for charts
#[derive(Debug, Clone, PartialEq)]
pub struct CreateStockSnapshot {
    pub ticker: String,
    pub price: f64,
}

/// Stock payload pushed to websocket subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct StockResponse {
    pub ticker: String,
    pub price: f64,
    pub max_price: Option<f64>,
    pub min_price: Option<f64>,
    pub reference_price: Option<f64>,
    pub percentage_change: Option<f64>,
    pub rank: Option<i32>,
    pub change_rank: Option<i32>,
    pub previous_rank: Option<i32>,
    pub previous_change_rank: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Stock> for StockResponse {
    fn from(stock: &Stock) -> Self {
        Self {
            ticker: stock.ticker.clone(),
            price: stock.price,
            max_price: stock.max_price,
            min_price: stock.min_price,
            reference_price: stock.reference_price,
            percentage_change: stock.percentage_change(),
            rank: stock.rank,
            change_rank: stock.change_rank,
            previous_rank: stock.previous_rank,
            previous_change_rank: stock.previous_change_rank,
            updated_at: stock.updated_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_stock(ticker: &str, price: f64) -> Stock {
    let now = Utc::now();
    Stock {
        ticker: ticker.to_string(),
        price,
        max_price: None,
        min_price: None,
        reference_price: None,
        reference_price_at: None,
        rank: None,
        change_rank: None,
        previous_rank: None,
        previous_change_rank: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_change_undefined_without_reference() {
        let stock = test_stock("ABCD", 120.0);
        assert_eq!(stock.percentage_change(), None);
    }

    #[test]
    fn test_percentage_change_undefined_for_zero_reference() {
        let mut stock = test_stock("ABCD", 120.0);
        stock.reference_price = Some(0.0);
        assert_eq!(stock.percentage_change(), None);
    }

    #[test]
    fn test_percentage_change_against_reference() {
        let mut stock = test_stock("ABCD", 110.0);
        stock.reference_price = Some(100.0);
        let change = stock.percentage_change().unwrap();
        assert!((change - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_price_tracks_extremes() {
        let now = Utc::now();
        let mut stock = test_stock("ABCD", 100.0);

        stock.set_price(105.0, now);
        assert_eq!(stock.max_price, Some(105.0));
        assert_eq!(stock.min_price, Some(105.0));

        stock.set_price(95.0, now);
        assert_eq!(stock.max_price, Some(105.0));
        assert_eq!(stock.min_price, Some(95.0));
    }

    #[test]
    fn test_reset_reference_collapses_extremes() {
        let now = Utc::now();
        let mut stock = test_stock("ABCD", 80.0);
        stock.max_price = Some(120.0);
        stock.min_price = Some(70.0);

        stock.reset_reference(now);

        assert_eq!(stock.reference_price, Some(80.0));
        assert_eq!(stock.reference_price_at, Some(now));
        assert_eq!(stock.max_price, Some(80.0));
        assert_eq!(stock.min_price, Some(80.0));
    }

    #[test]
    fn test_change_type_serializes_uppercase() {
        let json = serde_json::to_string(&ChangeType::Random).unwrap();
        assert_eq!(json, "\"RANDOM\"");
        assert_eq!(ChangeType::Random.to_string(), "RANDOM");
    }
}
