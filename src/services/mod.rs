pub mod ai_service;
pub mod broadcast_service;
pub mod event_detection_service;
pub mod job_scheduler_service;
pub mod market_hours_service;
pub mod ranking_service;
