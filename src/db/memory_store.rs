//! In-memory [`MarketStore`] used to drive the jobs in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::db::query_stats;
use crate::db::store::MarketStore;
use crate::errors::AppError;
use crate::models::{AiTask, CreatePriceEvent, CreateStockSnapshot, MarketState, Stock};

#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub id: i64,
    pub ticker: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    stocks: BTreeMap<String, Stock>,
    market_state: Option<MarketState>,
    price_events: Vec<CreatePriceEvent>,
    snapshots: Vec<SnapshotRow>,
    next_snapshot_id: i64,
    ai_tasks: Vec<AiTask>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn with_stocks(stocks: Vec<Stock>) -> Self {
        let store = Self::default();
        {
            let mut tables = store.tables.lock();
            for stock in stocks {
                tables.stocks.insert(stock.ticker.clone(), stock);
            }
        }
        store
    }

    /// Makes every subsequent commit fail without writing anything.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn stock(&self, ticker: &str) -> Option<Stock> {
        self.tables.lock().stocks.get(ticker).cloned()
    }

    pub fn stocks(&self) -> Vec<Stock> {
        self.tables.lock().stocks.values().cloned().collect()
    }

    pub fn set_market_state(&self, state: MarketState) {
        self.tables.lock().market_state = Some(state);
    }

    pub fn market_state(&self) -> Option<MarketState> {
        self.tables.lock().market_state.clone()
    }

    pub fn price_events(&self) -> Vec<CreatePriceEvent> {
        self.tables.lock().price_events.clone()
    }

    pub fn insert_snapshot_at(&self, ticker: &str, price: f64, created_at: DateTime<Utc>) -> i64 {
        let mut tables = self.tables.lock();
        tables.next_snapshot_id += 1;
        let id = tables.next_snapshot_id;
        tables.snapshots.push(SnapshotRow { id, ticker: ticker.to_string(), price, created_at });
        id
    }

    pub fn snapshots_for(&self, ticker: &str) -> Vec<SnapshotRow> {
        self.tables
            .lock()
            .snapshots
            .iter()
            .filter(|s| s.ticker == ticker)
            .cloned()
            .collect()
    }

    pub fn insert_task(&self, task: AiTask) {
        self.tables.lock().ai_tasks.push(task);
    }

    pub fn task(&self, id: uuid::Uuid) -> Option<AiTask> {
        self.tables.lock().ai_tasks.iter().find(|t| t.id == id).cloned()
    }

    fn check_commit(&self) -> Result<(), AppError> {
        query_stats::record(Duration::ZERO);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn fetch_active_stocks(&self) -> Result<Vec<Stock>, AppError> {
        query_stats::record(Duration::ZERO);
        Ok(self.tables.lock().stocks.values().filter(|s| s.is_active).cloned().collect())
    }

    async fn get_or_create_market_state(&self) -> Result<MarketState, AppError> {
        query_stats::record(Duration::ZERO);
        let mut tables = self.tables.lock();
        let state = tables.market_state.get_or_insert_with(|| MarketState::initial(Utc::now()));
        Ok(state.clone())
    }

    async fn commit_price_tick(
        &self,
        stocks: &[Stock],
        events: &[CreatePriceEvent],
    ) -> Result<(), AppError> {
        self.check_commit()?;
        let mut tables = self.tables.lock();
        for stock in stocks {
            if let Some(row) = tables.stocks.get_mut(&stock.ticker) {
                row.price = stock.price;
                row.max_price = Some(row.max_price.map_or(stock.price, |max| max.max(stock.price)));
                row.min_price = Some(row.min_price.map_or(stock.price, |min| min.min(stock.price)));
                row.updated_at = stock.updated_at;
            }
        }
        tables.price_events.extend(events.iter().cloned());
        Ok(())
    }

    async fn commit_snapshot_cycle(
        &self,
        stocks: &[Stock],
        snapshots: &[CreateStockSnapshot],
        market_state: &MarketState,
        reset_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        self.check_commit()?;
        let mut tables = self.tables.lock();
        for stock in stocks {
            if let Some(row) = tables.stocks.get_mut(&stock.ticker) {
                row.rank = stock.rank;
                row.change_rank = stock.change_rank;
                row.previous_rank = stock.previous_rank;
                row.previous_change_rank = stock.previous_change_rank;
                if let Some(at) = reset_at {
                    row.reset_reference(at);
                }
            }
        }
        let now = Utc::now();
        for snapshot in snapshots {
            tables.next_snapshot_id += 1;
            let id = tables.next_snapshot_id;
            tables.snapshots.push(SnapshotRow {
                id,
                ticker: snapshot.ticker.clone(),
                price: snapshot.price,
                created_at: now,
            });
        }
        tables.market_state = Some(market_state.clone());
        Ok(())
    }

    async fn prune_snapshots(&self, retention: i64) -> Result<u64, AppError> {
        query_stats::record(Duration::ZERO);
        let mut tables = self.tables.lock();

        let mut by_ticker: BTreeMap<String, Vec<(DateTime<Utc>, i64)>> = BTreeMap::new();
        for row in &tables.snapshots {
            by_ticker.entry(row.ticker.clone()).or_default().push((row.created_at, row.id));
        }

        let mut doomed = Vec::new();
        for rows in by_ticker.values_mut() {
            rows.sort_by(|a, b| b.cmp(a));
            doomed.extend(rows.iter().skip(retention.max(0) as usize).map(|(_, id)| *id));
        }

        let before = tables.snapshots.len();
        tables.snapshots.retain(|row| !doomed.contains(&row.id));
        Ok((before - tables.snapshots.len()) as u64)
    }

    async fn fetch_open_ai_tasks(&self) -> Result<Vec<AiTask>, AppError> {
        query_stats::record(Duration::ZERO);
        let mut tasks: Vec<AiTask> = self
            .tables
            .lock()
            .ai_tasks
            .iter()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn save_ai_tasks(&self, tasks: &[AiTask]) -> Result<(), AppError> {
        self.check_commit()?;
        let mut tables = self.tables.lock();
        for task in tasks {
            if let Some(row) = tables.ai_tasks.iter_mut().find(|t| t.id == task.id) {
                *row = task.clone();
            }
        }
        Ok(())
    }
}
