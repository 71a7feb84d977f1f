use crate::services::broadcast_service::Broadcaster;

#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Broadcaster,
}
