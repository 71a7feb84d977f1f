use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::models::{MarketEvent, MarketState, Stock};

pub const DEFAULT_CRASH_THRESHOLD_PERCENT: f64 = 10.0;

/// Turns the outcome of a snapshot cycle into events for subscribers.
pub trait EventDetector: Send + Sync {
    /// Per-stock events. `previous` holds the stocks as they were before the
    /// cycle mutated them, keyed by ticker.
    fn detect_events(
        &self,
        stocks: &[Stock],
        previous: &HashMap<String, Stock>,
        market_state: &MarketState,
    ) -> Vec<MarketEvent>;

    /// Market-day boundary events, close before open.
    fn market_day_events(
        &self,
        stocks: &[Stock],
        market_state: &MarketState,
        previous_state: &MarketState,
    ) -> Vec<MarketEvent>;
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    last_price: f64,
    highest_price: f64,
}

/// Default detector.
///
/// Keeps the last observed and highest observed price per ticker so that
/// price movement can be measured between snapshot cycles.
pub struct MarketEventDetector {
    crash_threshold_percent: f64,
    observations: Mutex<HashMap<String, Observation>>,
}

impl MarketEventDetector {
    pub fn new(crash_threshold_percent: f64) -> Self {
        Self {
            crash_threshold_percent,
            observations: Mutex::new(HashMap::new()),
        }
    }

    fn leader_of<'a>(stocks: impl Iterator<Item = &'a Stock>) -> Option<&'a Stock> {
        stocks.filter(|s| s.rank == Some(1)).min_by(|a, b| a.ticker.cmp(&b.ticker))
    }
}

impl Default for MarketEventDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CRASH_THRESHOLD_PERCENT)
    }
}

impl EventDetector for MarketEventDetector {
    fn detect_events(
        &self,
        stocks: &[Stock],
        previous: &HashMap<String, Stock>,
        market_state: &MarketState,
    ) -> Vec<MarketEvent> {
        let mut events = Vec::new();

        if let (Some(leader), Some(previous_leader)) = (
            Self::leader_of(stocks.iter()),
            Self::leader_of(previous.values()),
        ) {
            if leader.ticker != previous_leader.ticker {
                events.push(MarketEvent::NewLeader {
                    ticker: leader.ticker.clone(),
                    previous_leader: previous_leader.ticker.clone(),
                    price: leader.price,
                });
            }
        }

        let mut observations = self.observations.lock();
        for stock in stocks {
            let previous_max = previous.get(&stock.ticker).and_then(|p| p.max_price);

            let Some(seen) = observations.get_mut(&stock.ticker) else {
                observations.insert(
                    stock.ticker.clone(),
                    Observation { last_price: stock.price, highest_price: stock.price },
                );
                continue;
            };

            let previous_high = previous_max.map_or(seen.highest_price, |max| max.max(seen.highest_price));
            if stock.price > previous_high {
                events.push(MarketEvent::AllTimeHigh {
                    ticker: stock.ticker.clone(),
                    price: stock.price,
                    previous_high,
                });
            }

            if seen.last_price > 0.0 {
                let change_percent = (stock.price - seen.last_price) / seen.last_price * 100.0;
                if change_percent <= -self.crash_threshold_percent {
                    events.push(MarketEvent::BigCrash {
                        ticker: stock.ticker.clone(),
                        price: stock.price,
                        previous_price: seen.last_price,
                        change_percent,
                    });
                }
            }

            seen.last_price = stock.price;
            seen.highest_price = previous_high.max(stock.price);
        }

        if !events.is_empty() {
            debug!(
                "Detected {} stock events on market day {}",
                events.len(),
                market_state.market_day_count + 1
            );
        }
        events
    }

    fn market_day_events(
        &self,
        stocks: &[Stock],
        market_state: &MarketState,
        previous_state: &MarketState,
    ) -> Vec<MarketEvent> {
        let mut events = Vec::new();
        let day_completed = market_state.market_day_count > previous_state.market_day_count;

        if day_completed {
            events.push(MarketEvent::MarketClose {
                market_day: market_state.market_day_count,
                leader: Self::leader_of(stocks.iter()).map(|s| s.ticker.clone()),
            });
        }

        if market_state.is_open && (!previous_state.is_open || day_completed) {
            events.push(MarketEvent::MarketOpen {
                market_day: market_state.market_day_count + 1,
            });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stock::test_stock;
    use chrono::Utc;

    fn ranked(ticker: &str, price: f64, rank: i32) -> Stock {
        let mut stock = test_stock(ticker, price);
        stock.rank = Some(rank);
        stock
    }

    fn by_ticker(stocks: &[Stock]) -> HashMap<String, Stock> {
        stocks.iter().map(|s| (s.ticker.clone(), s.clone())).collect()
    }

    fn state(is_open: bool, market_day_count: i32) -> MarketState {
        MarketState {
            is_open,
            market_day_count,
            ..MarketState::initial(Utc::now())
        }
    }

    #[test]
    fn test_new_leader() {
        let detector = MarketEventDetector::default();
        let previous = by_ticker(&[ranked("AAAA", 100.0, 1), ranked("BBBB", 90.0, 2)]);
        let current = vec![ranked("AAAA", 100.0, 2), ranked("BBBB", 110.0, 1)];

        let events = detector.detect_events(&current, &previous, &state(true, 0));

        assert!(events.contains(&MarketEvent::NewLeader {
            ticker: "BBBB".to_string(),
            previous_leader: "AAAA".to_string(),
            price: 110.0,
        }));
    }

    #[test]
    fn test_no_leader_event_without_previous_ranks() {
        let detector = MarketEventDetector::default();
        let previous = by_ticker(&[test_stock("AAAA", 100.0)]);
        let current = vec![ranked("AAAA", 100.0, 1)];

        let events = detector.detect_events(&current, &previous, &state(true, 0));
        assert!(events.is_empty());
    }

    #[test]
    fn test_first_observation_only_seeds() {
        let detector = MarketEventDetector::default();
        let current = vec![test_stock("AAAA", 500.0)];

        let events = detector.detect_events(&current, &HashMap::new(), &state(true, 0));
        assert!(events.is_empty());
    }

    #[test]
    fn test_all_time_high() {
        let detector = MarketEventDetector::default();
        let open = state(true, 0);
        detector.detect_events(&[test_stock("AAAA", 100.0)], &HashMap::new(), &open);

        let events = detector.detect_events(&[test_stock("AAAA", 120.0)], &HashMap::new(), &open);
        assert_eq!(
            events,
            vec![MarketEvent::AllTimeHigh {
                ticker: "AAAA".to_string(),
                price: 120.0,
                previous_high: 100.0,
            }]
        );

        // Not a new high the second time around.
        let events = detector.detect_events(&[test_stock("AAAA", 115.0)], &HashMap::new(), &open);
        assert!(events.is_empty());
    }

    #[test]
    fn test_big_crash() {
        let detector = MarketEventDetector::default();
        let open = state(true, 0);
        detector.detect_events(&[test_stock("AAAA", 100.0)], &HashMap::new(), &open);

        let events = detector.detect_events(&[test_stock("AAAA", 85.0)], &HashMap::new(), &open);
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::BigCrash { ticker, previous_price, change_percent, .. } => {
                assert_eq!(ticker, "AAAA");
                assert_eq!(*previous_price, 100.0);
                assert!((*change_percent + 15.0).abs() < 1e-9);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_small_drop_is_not_a_crash() {
        let detector = MarketEventDetector::default();
        let open = state(true, 0);
        detector.detect_events(&[test_stock("AAAA", 100.0)], &HashMap::new(), &open);

        let events = detector.detect_events(&[test_stock("AAAA", 95.0)], &HashMap::new(), &open);
        assert!(events.is_empty());
    }

    #[test]
    fn test_bootstrap_opens_first_day() {
        let detector = MarketEventDetector::default();
        let events = detector.market_day_events(&[], &state(true, 0), &state(false, 0));
        assert_eq!(events, vec![MarketEvent::MarketOpen { market_day: 1 }]);
    }

    #[test]
    fn test_close_reports_leader() {
        let detector = MarketEventDetector::default();
        let stocks = vec![ranked("AAAA", 10.0, 2), ranked("BBBB", 20.0, 1)];

        let events = detector.market_day_events(&stocks, &state(false, 3), &state(true, 2));
        assert_eq!(
            events,
            vec![MarketEvent::MarketClose { market_day: 3, leader: Some("BBBB".to_string()) }]
        );
    }

    #[test]
    fn test_immediate_reopen_emits_close_then_open() {
        let detector = MarketEventDetector::default();
        let events = detector.market_day_events(&[], &state(true, 3), &state(true, 2));
        assert_eq!(
            events,
            vec![
                MarketEvent::MarketClose { market_day: 3, leader: None },
                MarketEvent::MarketOpen { market_day: 4 },
            ]
        );
    }

    #[test]
    fn test_quiet_cycle_has_no_market_events() {
        let detector = MarketEventDetector::default();
        assert!(detector.market_day_events(&[], &state(true, 2), &state(true, 2)).is_empty());
        assert!(detector.market_day_events(&[], &state(false, 2), &state(false, 2)).is_empty());
    }
}
