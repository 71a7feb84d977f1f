pub mod ai_task;
pub mod market_event;
pub mod market_state;
pub mod stock;

pub use ai_task::{AiTask, TaskArguments, TaskStatus, TaskType};
pub use market_event::{MarketEvent, StockMessage};
pub use market_state::MarketState;
pub use stock::{ChangeType, CreatePriceEvent, CreateStockSnapshot, Stock, StockResponse};
