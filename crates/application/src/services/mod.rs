mod chat_service;
mod stats_service;

pub use chat_service::{
    ChatService, ChatServiceDependencies, CreateRoomRequest, SendMessageRequest,
    SendVoiceMessageRequest, UpdatePolicyRequest,
};
pub use stats_service::StatsService;
