use std::sync::Arc;

use application::{ChatService, ConnectionRouter, StatsService};

#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ChatService>,
    pub stats_service: Arc<StatsService>,
    pub router: Arc<dyn ConnectionRouter>,
}

impl AppState {
    pub fn new(
        chat_service: Arc<ChatService>,
        stats_service: Arc<StatsService>,
        router: Arc<dyn ConnectionRouter>,
    ) -> Self {
        Self {
            chat_service,
            stats_service,
            router,
        }
    }
}
