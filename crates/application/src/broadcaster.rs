//! 连接路由器抽象
//!
//! 每条连接注册一个出站事件发送端；广播就是对目标列表的 O(N) 扇出。
//! 单个接收者的发送失败必须被隔离：既不中断对其他接收者的投递，
//! 也不回滚已提交的历史追加。

use async_trait::async_trait;
use domain::ChatEvent;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

/// 路由错误类型
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("connection not registered: {0}")]
    ConnectionNotRegistered(Uuid),

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// 连接路由器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionRouter: Send + Sync {
    /// 注册连接的出站发送端
    async fn register(&self, connection_id: Uuid, sender: mpsc::UnboundedSender<ChatEvent>);

    /// 注销连接
    async fn unregister(&self, connection_id: Uuid);

    /// 单播事件到指定连接
    async fn unicast(&self, connection_id: Uuid, event: ChatEvent) -> Result<(), RouteError>;

    /// 扇出事件到目标列表（逐个隔离失败）
    async fn send_to_many(&self, targets: Vec<Uuid>, event: ChatEvent);
}
