//! 聊天子系统核心领域模型
//!
//! 包含房间、消息、会话等核心实体，以及内容审核策略和对外广播事件。

pub mod entities;
pub mod errors;
pub mod events;
pub mod moderation;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use moderation::*;
