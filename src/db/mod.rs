pub mod ai_task_queries;
pub mod market_state_queries;
pub mod pg_store;
pub mod query_stats;
pub mod stock_queries;
pub mod store;

#[cfg(test)]
pub mod memory_store;

pub use pg_store::PgStore;
pub use store::MarketStore;
