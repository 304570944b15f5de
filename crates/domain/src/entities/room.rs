//! 房间实体定义
//!
//! 房间聚合了参与者集合和有界消息历史，是唯一被多个连接共享修改的实体。

use crate::entities::message::Message;
use crate::errors::{DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// 所有连接在建立时自动加入的全局房间代码
pub const GLOBAL_ROOM_CODE: &str = "global";

/// 每个房间保留的默认历史消息数
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 默认的单条消息最大长度
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 200;

/// 房间类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// 全局房间（所有连接自动加入）
    Global,
    /// 普通房间
    #[serde(rename = "room")]
    Standard,
    /// 公会房间
    Guild,
    /// 私有房间
    Private,
}

impl Default for RoomKind {
    fn default() -> Self {
        Self::Standard
    }
}

/// 房间设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// 是否允许语音消息
    pub allow_voice: bool,
    /// 是否允许表情消息
    pub allow_emojis: bool,
    /// 单条消息最大长度
    pub max_message_length: usize,
    /// 是否启用内容审核
    pub moderation_enabled: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            allow_voice: true,
            allow_emojis: true,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            moderation_enabled: true,
        }
    }
}

/// 房间实体
///
/// 参与者为集合语义（重复加入是幂等操作），历史按时间顺序保存并在
/// 超过上限时从最旧一端淘汰（FIFO，不是 LRU）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// 房间唯一代码
    pub code: String,
    /// 房间显示名称
    pub display_name: String,
    /// 房间类型
    pub kind: RoomKind,
    /// 房间设置
    pub settings: RoomSettings,
    /// 当前加入的连接ID集合
    pub participants: HashSet<Uuid>,
    /// 有界消息历史（按时间顺序）
    history: VecDeque<Message>,
    /// 历史消息上限
    history_limit: usize,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 最后活跃时间（每次存储消息时更新）
    pub last_activity_at: DateTime<Utc>,
}

impl Room {
    /// 创建新房间
    pub fn new(
        code: impl Into<String>,
        display_name: impl Into<String>,
        kind: RoomKind,
        settings: RoomSettings,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let code = code.into();
        let display_name = display_name.into();
        Self::validate_code(&code)?;
        Self::validate_name(&display_name)?;

        Ok(Self {
            code,
            display_name,
            kind,
            settings,
            participants: HashSet::new(),
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            created_at,
            last_activity_at: created_at,
        })
    }

    /// 以默认设置创建房间（隐式加入路径使用）
    pub fn with_defaults(code: impl Into<String>, created_at: DateTime<Utc>) -> DomainResult<Self> {
        let code = code.into();
        let display_name = code.clone();
        Self::new(code, display_name, RoomKind::Standard, RoomSettings::default(), created_at)
    }

    /// 覆盖历史上限（测试和配置装配使用）
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// 添加参与者
    ///
    /// 集合语义：重复加入返回 false 且无副作用。
    pub fn add_participant(&mut self, connection_id: Uuid) -> bool {
        self.participants.insert(connection_id)
    }

    /// 移除参与者
    ///
    /// 幂等：移除不存在的参与者返回 false 且无副作用。
    pub fn remove_participant(&mut self, connection_id: &Uuid) -> bool {
        self.participants.remove(connection_id)
    }

    /// 检查连接是否在房间内
    pub fn is_participant(&self, connection_id: &Uuid) -> bool {
        self.participants.contains(connection_id)
    }

    /// 当前参与者快照（供锁外广播使用）
    pub fn participant_ids(&self) -> Vec<Uuid> {
        self.participants.iter().copied().collect()
    }

    /// 参与者数量
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// 追加消息到历史
    ///
    /// 超过上限时从最旧一端逐条淘汰，直到长度恰好等于上限；
    /// 同时更新最后活跃时间。
    pub fn append_message(&mut self, message: Message) {
        self.last_activity_at = message.created_at;
        self.history.push_back(message);
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
    }

    /// 历史消息快照（按存储顺序）
    pub fn history_snapshot(&self) -> Vec<Message> {
        self.history.iter().cloned().collect()
    }

    /// 历史消息数量
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// 按 ID 屏蔽历史中的消息
    ///
    /// 返回是否找到并屏蔽了目标消息。
    pub fn moderate_message(&mut self, message_id: Uuid) -> bool {
        match self.history.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.redact();
                true
            }
            None => false,
        }
    }

    /// 验证房间代码
    fn validate_code(code: &str) -> DomainResult<()> {
        if code.is_empty() {
            return Err(DomainError::validation_error("room_code", "房间代码不能为空"));
        }

        if code.len() > 64 {
            return Err(DomainError::validation_error(
                "room_code",
                "房间代码不能超过64个字符",
            ));
        }

        if code.chars().any(|c| c.is_whitespace()) {
            return Err(DomainError::validation_error(
                "room_code",
                "房间代码不能包含空白字符",
            ));
        }

        Ok(())
    }

    /// 验证房间名称
    fn validate_name(name: &str) -> DomainResult<()> {
        if name.is_empty() {
            return Err(DomainError::validation_error("display_name", "房间名称不能为空"));
        }

        if name.len() > 100 {
            return Err(DomainError::validation_error(
                "display_name",
                "房间名称不能超过100个字符",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_room() -> Room {
        Room::with_defaults("global", Utc::now()).unwrap()
    }

    fn test_message(room: &Room, body: &str) -> Message {
        Message::new_text(
            room.code.clone(),
            Uuid::new_v4(),
            "alice",
            body,
            room.settings.max_message_length,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_room_creation_with_defaults() {
        let room = test_room();

        assert_eq!(room.code, "global");
        assert_eq!(room.display_name, "global");
        assert_eq!(room.kind, RoomKind::Standard);
        assert!(room.settings.allow_voice);
        assert!(room.settings.allow_emojis);
        assert_eq!(room.settings.max_message_length, 200);
        assert!(room.settings.moderation_enabled);
        assert_eq!(room.participant_count(), 0);
        assert_eq!(room.message_count(), 0);
        assert_eq!(room.created_at, room.last_activity_at);
    }

    #[test]
    fn test_room_code_validation() {
        let now = Utc::now();
        assert!(Room::with_defaults("guild:42", now).is_ok());

        // 无效代码
        assert!(Room::with_defaults("", now).is_err());
        assert!(Room::with_defaults("has space", now).is_err());
        assert!(Room::with_defaults("x".repeat(65), now).is_err());
    }

    #[test]
    fn test_participant_set_semantics() {
        let mut room = test_room();
        let alice = Uuid::new_v4();

        // 首次加入成功
        assert!(room.add_participant(alice));
        assert_eq!(room.participant_count(), 1);

        // 重复加入是无副作用的空操作
        assert!(!room.add_participant(alice));
        assert_eq!(room.participant_count(), 1);

        // 移除是幂等的
        assert!(room.remove_participant(&alice));
        assert!(!room.remove_participant(&alice));
        assert_eq!(room.participant_count(), 0);
    }

    #[test]
    fn test_history_fifo_eviction() {
        // 连续追加105条消息后，历史只保留最后100条，最早5条不可恢复
        let mut room = test_room();
        for i in 0..105 {
            let message = test_message(&room, &format!("message-{}", i));
            room.append_message(message);
        }

        assert_eq!(room.message_count(), 100);
        let history = room.history_snapshot();
        assert_eq!(history[0].body, "message-5");
        assert_eq!(history[99].body, "message-104");
        assert!(!history.iter().any(|m| m.body == "message-4"));
    }

    #[test]
    fn test_history_preserves_append_order() {
        let mut room = test_room();
        for i in 0..10 {
            room.append_message(test_message(&room, &format!("m{}", i)));
        }

        let history = room.history_snapshot();
        for (i, message) in history.iter().enumerate() {
            assert_eq!(message.body, format!("m{}", i));
        }
    }

    #[test]
    fn test_append_updates_last_activity() {
        let mut room = test_room();
        let created = room.created_at;

        let message = test_message(&room, "hello");
        let message_time = message.created_at;
        room.append_message(message);

        assert!(room.last_activity_at >= created);
        assert_eq!(room.last_activity_at, message_time);
    }

    #[test]
    fn test_moderate_message_by_id() {
        let mut room = test_room();
        let message = test_message(&room, "spam content");
        let target_id = message.id;
        room.append_message(message);
        room.append_message(test_message(&room, "innocent"));

        assert!(room.moderate_message(target_id));

        let history = room.history_snapshot();
        assert!(history[0].is_moderated);
        assert!(!history[0].body.contains("spam"));
        assert!(!history[1].is_moderated);

        // 不存在的ID返回false
        assert!(!room.moderate_message(Uuid::new_v4()));
    }

    #[test]
    fn test_custom_history_limit() {
        let mut room = test_room().with_history_limit(3);
        for i in 0..5 {
            room.append_message(test_message(&room, &format!("m{}", i)));
        }

        assert_eq!(room.message_count(), 3);
        assert_eq!(room.history_snapshot()[0].body, "m2");
    }
}
