//! 内存消息路由器
//!
//! 为每条连接维护一个出站事件发送端。扇出是 O(N) 的逐连接投递，
//! 单个接收者的失败被隔离：记录日志、计入统计，不影响其他接收者。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use application::{ConnectionRouter, RouteError};
use domain::ChatEvent;

/// 路由统计信息
#[derive(Debug, Clone, Default)]
pub struct RouterStats {
    pub total_events: u64,
    pub successful_routes: u64,
    pub failed_routes: u64,
}

/// 内存消息路由器
pub struct InMemoryMessageRouter {
    /// 连接发送器映射
    senders: RwLock<HashMap<Uuid, mpsc::UnboundedSender<ChatEvent>>>,
    /// 统计信息
    stats: RwLock<RouterStats>,
}

impl Default for InMemoryMessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRouter {
    /// 创建新的内存消息路由器
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            stats: RwLock::new(RouterStats::default()),
        }
    }

    /// 获取统计信息
    pub async fn get_stats(&self) -> RouterStats {
        self.stats.read().await.clone()
    }

    /// 更新统计信息
    async fn update_stats(&self, f: impl FnOnce(&mut RouterStats)) {
        let mut stats = self.stats.write().await;
        f(&mut stats);
    }
}

#[async_trait]
impl ConnectionRouter for InMemoryMessageRouter {
    async fn register(&self, connection_id: Uuid, sender: mpsc::UnboundedSender<ChatEvent>) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id, sender);
        tracing::debug!(connection_id = %connection_id, "sender registered");
    }

    async fn unregister(&self, connection_id: Uuid) {
        let mut senders = self.senders.write().await;
        senders.remove(&connection_id);
        tracing::debug!(connection_id = %connection_id, "sender unregistered");
    }

    async fn unicast(&self, connection_id: Uuid, event: ChatEvent) -> Result<(), RouteError> {
        let senders = self.senders.read().await;
        let sender = senders
            .get(&connection_id)
            .ok_or(RouteError::ConnectionNotRegistered(connection_id))?;

        match sender.send(event) {
            Ok(()) => {
                self.update_stats(|stats| {
                    stats.total_events += 1;
                    stats.successful_routes += 1;
                })
                .await;
                Ok(())
            }
            Err(err) => {
                self.update_stats(|stats| {
                    stats.total_events += 1;
                    stats.failed_routes += 1;
                })
                .await;
                Err(RouteError::SendFailed(err.to_string()))
            }
        }
    }

    async fn send_to_many(&self, targets: Vec<Uuid>, event: ChatEvent) {
        let senders = self.senders.read().await;
        let mut failed_count = 0u64;
        let mut delivered = 0u64;

        for connection_id in &targets {
            match senders.get(connection_id) {
                Some(sender) => {
                    if sender.send(event.clone()).is_err() {
                        failed_count += 1;
                        tracing::warn!(
                            connection_id = %connection_id,
                            event_type = event.event_type(),
                            "failed to route event to connection"
                        );
                    } else {
                        delivered += 1;
                    }
                }
                None => {
                    // 连接已在注册表中但尚未（或不再）有发送端：跳过
                    failed_count += 1;
                }
            }
        }
        drop(senders);

        self.update_stats(|stats| {
            stats.total_events += targets.len() as u64;
            stats.successful_routes += delivered;
            stats.failed_routes += failed_count;
        })
        .await;
    }
}
