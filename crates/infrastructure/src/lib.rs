//! 基础设施层实现。
//!
//! 提供应用层抽象的内存实现：房间注册表和连接消息路由器。
//! 进程内状态是本子系统的全部持久化形态（刻意设计的短暂消息层）。

pub mod registry;
pub mod router;

pub use registry::InMemoryRoomRegistry;
pub use router::{InMemoryMessageRouter, RouterStats};
