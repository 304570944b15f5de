//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：聊天协调器、统计聚合器、
//! 限流器、会话管理，以及对基础设施适配器（房间注册表、
//! 连接路由器）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod dto;
pub mod errors;
pub mod policy;
pub mod rate_limiter;
pub mod registry;
pub mod services;
pub mod sessions;

pub use broadcaster::{ConnectionRouter, RouteError};
pub use clock::{Clock, SystemClock};
pub use dto::RoomDto;
pub use errors::{ApplicationError, ApplicationResult};
pub use policy::ModerationPolicyHandle;
pub use rate_limiter::{MessageRateLimiter, RateLimitError};
pub use registry::{JoinSnapshot, LeaveSnapshot, RegistryStats, RoomRegistry};
pub use services::{
    ChatService, ChatServiceDependencies, CreateRoomRequest, SendMessageRequest,
    SendVoiceMessageRequest, StatsService, UpdatePolicyRequest,
};
pub use sessions::SessionManager;
