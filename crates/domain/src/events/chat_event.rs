//! 聊天事件定义
//!
//! 定义系统中所有出站广播事件。事件是封闭的带标签变体集合，
//! 既作为进程内扇出的载体，也作为 WebSocket 线缆格式直接序列化。

use crate::entities::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 聊天事件枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// 房间历史（仅单播给刚加入的连接）
    RoomHistory {
        room_code: String,
        messages: Vec<Message>,
    },

    /// 文本/表情消息广播（包含发送者本身，作为回显确认）
    MessageSent { message: Message },

    /// 语音消息广播
    VoiceMessageSent { message: Message },

    /// 用户加入房间（只发给房间内其他参与者）
    UserJoined {
        room_code: String,
        connection_id: Uuid,
        display_name: String,
        timestamp: DateTime<Utc>,
    },

    /// 用户离开房间（发给剩余参与者）
    UserLeft {
        room_code: String,
        connection_id: Uuid,
        display_name: String,
        timestamp: DateTime<Utc>,
    },

    /// 正在输入通知（尽力而为，无序且可丢弃）
    Typing {
        room_code: String,
        connection_id: Uuid,
        display_name: String,
        is_typing: bool,
    },

    /// 消息被屏蔽（客户端按ID原地更新本地副本，而不是重新拉取历史）
    MessageModerated {
        room_code: String,
        message_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// 错误通知（仅单播给事件来源连接）
    Error { message: String },

    /// 心跳响应
    Pong,
}

impl ChatEvent {
    /// 获取事件关联的房间代码
    pub fn room_code(&self) -> Option<&str> {
        match self {
            ChatEvent::RoomHistory { room_code, .. } => Some(room_code),
            ChatEvent::MessageSent { message } => Some(&message.room_code),
            ChatEvent::VoiceMessageSent { message } => Some(&message.room_code),
            ChatEvent::UserJoined { room_code, .. } => Some(room_code),
            ChatEvent::UserLeft { room_code, .. } => Some(room_code),
            ChatEvent::Typing { room_code, .. } => Some(room_code),
            ChatEvent::MessageModerated { room_code, .. } => Some(room_code),
            ChatEvent::Error { .. } => None,
            ChatEvent::Pong => None,
        }
    }

    /// 获取事件类型名称（用于日志和监控）
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::RoomHistory { .. } => "room_history",
            ChatEvent::MessageSent { .. } => "message_sent",
            ChatEvent::VoiceMessageSent { .. } => "voice_message_sent",
            ChatEvent::UserJoined { .. } => "user_joined",
            ChatEvent::UserLeft { .. } => "user_left",
            ChatEvent::Typing { .. } => "typing",
            ChatEvent::MessageModerated { .. } => "message_moderated",
            ChatEvent::Error { .. } => "error",
            ChatEvent::Pong => "pong",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_event_serialization() {
        let message = Message::new_text(
            "global",
            Uuid::new_v4(),
            "alice",
            "Hello World",
            200,
            None,
            Utc::now(),
        )
        .unwrap();

        let event = ChatEvent::MessageSent {
            message: message.clone(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"message_sent\""));

        let deserialized: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_room_code_extraction() {
        let event = ChatEvent::UserJoined {
            room_code: "guild:1".to_string(),
            connection_id: Uuid::new_v4(),
            display_name: "alice".to_string(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.room_code(), Some("guild:1"));

        let error_event = ChatEvent::Error {
            message: "rate limited".to_string(),
        };
        assert_eq!(error_event.room_code(), None);
    }

    #[test]
    fn test_event_type_names() {
        let event = ChatEvent::Typing {
            room_code: "global".to_string(),
            connection_id: Uuid::new_v4(),
            display_name: "alice".to_string(),
            is_typing: true,
        };
        assert_eq!(event.event_type(), "typing");
        assert_eq!(ChatEvent::Pong.event_type(), "pong");
    }
}
