//! 统计服务
//!
//! 对房间注册表状态的只读计算。房间数量在本系统中是小规模的
//! （数十级别），每次调用 O(rooms) 重算即可，不做缓存；
//! 统计是参考性的，允许尽力而为的快照而非事务一致读。

use std::sync::Arc;

use crate::errors::ApplicationResult;
use crate::registry::{RegistryStats, RoomRegistry};

pub struct StatsService {
    registry: Arc<dyn RoomRegistry>,
}

impl StatsService {
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// 获取当前统计快照
    pub async fn get_stats(&self) -> ApplicationResult<RegistryStats> {
        Ok(self.registry.stats_snapshot().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MockRoomRegistry;

    #[tokio::test]
    async fn test_stats_passthrough() {
        let mut registry = MockRoomRegistry::new();
        registry.expect_stats_snapshot().times(1).returning(|| RegistryStats {
            total_rooms: 3,
            total_messages: 42,
            active_user_count: 7,
            most_active_room_code: Some("global".to_string()),
        });

        let service = StatsService::new(Arc::new(registry));
        let stats = service.get_stats().await.unwrap();

        assert_eq!(stats.total_rooms, 3);
        assert_eq!(stats.total_messages, 42);
        assert_eq!(stats.active_user_count, 7);
        assert_eq!(stats.most_active_room_code.as_deref(), Some("global"));
    }
}
