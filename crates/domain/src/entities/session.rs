//! 会话实体定义
//!
//! 会话把一条传输层连接绑定到一个已认证身份，并跟踪其加入的房间集合。
//! 身份解析由外部认证协作方完成，这里只接收结果。

use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// 连接会话实体
///
/// 一个连接可以同时加入多个房间；服务端不维护"当前房间"的概念，
/// 只维护集合。输入中的打字状态是瞬态的，由客户端负责过期。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// 连接唯一ID（服务端分配）
    pub connection_id: Uuid,
    /// 已认证的用户ID
    pub user_id: Uuid,
    /// 显示名称
    pub display_name: String,
    /// 已加入的房间代码集合
    pub joined_rooms: HashSet<String>,
    /// 默认目标房间（发送消息未指定房间时使用）
    pub default_room: Option<String>,
    /// 连接建立时间
    pub connected_at: DateTime<Utc>,
}

impl Session {
    /// 创建新会话
    pub fn new(
        connection_id: Uuid,
        user_id: Uuid,
        display_name: impl Into<String>,
        connected_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let display_name = display_name.into().trim().to_owned();
        if display_name.is_empty() {
            return Err(DomainError::validation_error(
                "display_name",
                "显示名称不能为空",
            ));
        }
        if display_name.len() > 50 {
            return Err(DomainError::validation_error(
                "display_name",
                "显示名称不能超过50个字符",
            ));
        }

        Ok(Self {
            connection_id,
            user_id,
            display_name,
            joined_rooms: HashSet::new(),
            default_room: None,
            connected_at,
        })
    }

    /// 记录加入房间
    pub fn join_room(&mut self, room_code: impl Into<String>) -> bool {
        let room_code = room_code.into();
        if self.default_room.is_none() {
            self.default_room = Some(room_code.clone());
        }
        self.joined_rooms.insert(room_code)
    }

    /// 记录离开房间
    pub fn leave_room(&mut self, room_code: &str) -> bool {
        self.joined_rooms.remove(room_code)
    }

    /// 检查是否已加入房间
    pub fn is_in_room(&self, room_code: &str) -> bool {
        self.joined_rooms.contains(room_code)
    }

    /// 已加入房间的快照
    pub fn joined_rooms_snapshot(&self) -> Vec<String> {
        self.joined_rooms.iter().cloned().collect()
    }

    /// 解析消息的目标房间：显式指定 → 会话默认 → "global"
    pub fn resolve_target_room(&self, explicit: Option<&str>) -> String {
        match explicit {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => self
                .default_room
                .clone()
                .unwrap_or_else(|| "global".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new(Uuid::new_v4(), Uuid::new_v4(), "alice", Utc::now()).unwrap()
    }

    #[test]
    fn test_session_creation() {
        let session = test_session();
        assert_eq!(session.display_name, "alice");
        assert!(session.joined_rooms.is_empty());
        assert!(session.default_room.is_none());
    }

    #[test]
    fn test_display_name_validation() {
        let id = Uuid::new_v4();
        let now = Utc::now();
        assert!(Session::new(id, id, "", now).is_err());
        assert!(Session::new(id, id, "   ", now).is_err());
        assert!(Session::new(id, id, "x".repeat(51), now).is_err());

        // 前后空格被去除
        let session = Session::new(id, id, "  alice  ", now).unwrap();
        assert_eq!(session.display_name, "alice");
    }

    #[test]
    fn test_room_membership_bookkeeping() {
        let mut session = test_session();

        assert!(session.join_room("global"));
        assert!(session.join_room("guild:1"));
        assert!(!session.join_room("global")); // 重复加入是空操作
        assert!(session.is_in_room("global"));
        assert_eq!(session.joined_rooms_snapshot().len(), 2);

        assert!(session.leave_room("global"));
        assert!(!session.leave_room("global")); // 幂等
        assert!(!session.is_in_room("global"));
    }

    #[test]
    fn test_target_room_resolution() {
        let mut session = test_session();

        // 未加入任何房间时回退到 global
        assert_eq!(session.resolve_target_room(None), "global");

        // 第一个加入的房间成为默认目标
        session.join_room("global");
        session.join_room("guild:1");
        assert_eq!(session.resolve_target_room(None), "global");

        // 显式指定优先
        assert_eq!(session.resolve_target_room(Some("guild:1")), "guild:1");
        assert_eq!(session.resolve_target_room(Some("")), "global");
    }
}
