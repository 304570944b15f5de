//! 会话管理器
//!
//! 为每条传输层连接持有一个会话，连接断开时整体移除。

use std::collections::HashMap;

use domain::Session;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::{ApplicationError, ApplicationResult};

/// 内存中的会话管理器
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 注册新会话
    pub async fn register(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .insert(session.connection_id, session.clone())
            .is_some()
        {
            tracing::warn!(
                connection_id = %session.connection_id,
                "session replaced an existing registration"
            );
        }
        tracing::info!(
            connection_id = %session.connection_id,
            user_id = %session.user_id,
            "session registered"
        );
    }

    /// 移除会话，返回被移除的会话（幂等：不存在时返回 None）
    pub async fn remove(&self, connection_id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&connection_id)
    }

    /// 获取会话快照
    pub async fn get(&self, connection_id: Uuid) -> ApplicationResult<Session> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&connection_id)
            .cloned()
            .ok_or_else(|| ApplicationError::not_found(format!("session {}", connection_id)))
    }

    /// 记录会话加入房间
    pub async fn record_join(&self, connection_id: Uuid, room_code: &str) -> ApplicationResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&connection_id)
            .ok_or_else(|| ApplicationError::not_found(format!("session {}", connection_id)))?;
        session.join_room(room_code);
        Ok(())
    }

    /// 记录会话离开房间
    pub async fn record_leave(
        &self,
        connection_id: Uuid,
        room_code: &str,
    ) -> ApplicationResult<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&connection_id)
            .ok_or_else(|| ApplicationError::not_found(format!("session {}", connection_id)))?;
        session.leave_room(room_code);
        Ok(())
    }

    /// 当前会话数量
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_session(connection_id: Uuid) -> Session {
        Session::new(connection_id, Uuid::new_v4(), "alice", Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_remove() {
        let manager = SessionManager::new();
        let connection_id = Uuid::new_v4();

        manager.register(test_session(connection_id)).await;
        assert_eq!(manager.count().await, 1);
        assert!(manager.get(connection_id).await.is_ok());

        let removed = manager.remove(connection_id).await;
        assert!(removed.is_some());
        assert_eq!(manager.count().await, 0);

        // 重复移除是幂等的
        assert!(manager.remove(connection_id).await.is_none());
        assert!(manager.get(connection_id).await.is_err());
    }

    #[tokio::test]
    async fn test_join_leave_bookkeeping() {
        let manager = SessionManager::new();
        let connection_id = Uuid::new_v4();
        manager.register(test_session(connection_id)).await;

        manager.record_join(connection_id, "global").await.unwrap();
        manager.record_join(connection_id, "guild:1").await.unwrap();

        let session = manager.get(connection_id).await.unwrap();
        assert!(session.is_in_room("global"));
        assert!(session.is_in_room("guild:1"));

        manager
            .record_leave(connection_id, "guild:1")
            .await
            .unwrap();
        let session = manager.get(connection_id).await.unwrap();
        assert!(!session.is_in_room("guild:1"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let manager = SessionManager::new();
        let result = manager.record_join(Uuid::new_v4(), "global").await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
    }
}
