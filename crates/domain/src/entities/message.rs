//! 消息实体定义
//!
//! 消息只能由服务端构造：消息 ID、作者身份和时间戳均由服务端写入，
//! 客户端提交的任何身份或时间字段在边界层即被丢弃。

use crate::errors::{DomainError, DomainResult};
use crate::moderation::MODERATED_PLACEHOLDER;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 语音负载的最大时长（秒）
pub const MAX_VOICE_DURATION_SECONDS: f32 = 120.0;

/// 语音负载编码后的最大字节数（1 MiB）
pub const MAX_VOICE_PAYLOAD_BYTES: usize = 1024 * 1024;

/// 消息类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// 文本消息
    Text,
    /// 系统消息
    System,
    /// 语音消息
    Voice,
    /// 表情消息
    Emoji,
}

impl Default for MessageKind {
    fn default() -> Self {
        Self::Text
    }
}

/// 语音消息负载
///
/// 只承载不透明的编码音频和时长/波形元数据，不做任何编解码处理。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePayload {
    /// 编码后的音频数据（不透明字符串）
    pub data: String,
    /// 音频时长（秒）
    pub duration_seconds: f32,
    /// 波形采样（可选，用于客户端渲染）
    pub waveform: Option<Vec<f32>>,
}

impl VoicePayload {
    /// 创建新的语音负载
    pub fn new(
        data: impl Into<String>,
        duration_seconds: f32,
        waveform: Option<Vec<f32>>,
    ) -> DomainResult<Self> {
        let data = data.into();

        if data.is_empty() {
            return Err(DomainError::validation_error("voice_data", "语音数据不能为空"));
        }

        if data.len() > MAX_VOICE_PAYLOAD_BYTES {
            return Err(DomainError::validation_error(
                "voice_data",
                format!("语音数据不能超过{}字节", MAX_VOICE_PAYLOAD_BYTES),
            ));
        }

        if duration_seconds <= 0.0 {
            return Err(DomainError::validation_error(
                "duration_seconds",
                "语音时长必须大于0",
            ));
        }

        if duration_seconds > MAX_VOICE_DURATION_SECONDS {
            return Err(DomainError::validation_error(
                "duration_seconds",
                format!("语音时长不能超过{}秒", MAX_VOICE_DURATION_SECONDS),
            ));
        }

        Ok(Self {
            data,
            duration_seconds,
            waveform,
        })
    }
}

/// 消息实体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// 消息唯一ID
    pub id: Uuid,
    /// 房间代码
    pub room_code: String,
    /// 作者的连接ID
    pub author_connection_id: Uuid,
    /// 作者的显示名称
    pub author_display_name: String,
    /// 消息正文
    pub body: String,
    /// 消息类型
    pub kind: MessageKind,
    /// 语音负载（仅语音消息）
    pub voice: Option<VoicePayload>,
    /// 是否已被审核屏蔽
    pub is_moderated: bool,
    /// 回复的消息ID（可选）
    pub reply_to: Option<Uuid>,
    /// 发送时间（服务端时钟）
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// 创建新的文本消息
    pub fn new_text(
        room_code: impl Into<String>,
        author_connection_id: Uuid,
        author_display_name: impl Into<String>,
        body: impl Into<String>,
        max_length: usize,
        reply_to: Option<Uuid>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        Self::validate_body(&body, max_length)?;

        Ok(Self {
            id: Uuid::new_v4(),
            room_code: room_code.into(),
            author_connection_id,
            author_display_name: author_display_name.into(),
            body,
            kind: MessageKind::Text,
            voice: None,
            is_moderated: false,
            reply_to,
            created_at,
        })
    }

    /// 创建新的表情消息
    pub fn new_emoji(
        room_code: impl Into<String>,
        author_connection_id: Uuid,
        author_display_name: impl Into<String>,
        body: impl Into<String>,
        max_length: usize,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        Self::validate_body(&body, max_length)?;

        Ok(Self {
            id: Uuid::new_v4(),
            room_code: room_code.into(),
            author_connection_id,
            author_display_name: author_display_name.into(),
            body,
            kind: MessageKind::Emoji,
            voice: None,
            is_moderated: false,
            reply_to: None,
            created_at,
        })
    }

    /// 创建新的语音消息
    ///
    /// 语音消息正文为空，不参与关键词审核。
    pub fn new_voice(
        room_code: impl Into<String>,
        author_connection_id: Uuid,
        author_display_name: impl Into<String>,
        payload: VoicePayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_code: room_code.into(),
            author_connection_id,
            author_display_name: author_display_name.into(),
            body: String::new(),
            kind: MessageKind::Voice,
            voice: Some(payload),
            is_moderated: false,
            reply_to: None,
            created_at,
        }
    }

    /// 创建新的系统消息（如管理员公告）
    pub fn new_system(
        room_code: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation_error("body", "消息内容不能为空"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            room_code: room_code.into(),
            author_connection_id: Uuid::nil(),
            author_display_name: "system".to_string(),
            body,
            kind: MessageKind::System,
            voice: None,
            is_moderated: false,
            reply_to: None,
            created_at,
        })
    }

    /// 屏蔽消息正文
    ///
    /// 单向操作：原始正文被固定占位符覆盖后不可恢复。
    pub fn redact(&mut self) {
        if self.is_moderated {
            return;
        }
        self.body = MODERATED_PLACEHOLDER.to_string();
        self.is_moderated = true;
    }

    /// 检查是否为语音消息
    pub fn is_voice(&self) -> bool {
        self.kind == MessageKind::Voice
    }

    /// 验证消息正文
    fn validate_body(body: &str, max_length: usize) -> DomainResult<()> {
        if body.trim().is_empty() {
            return Err(DomainError::validation_error("body", "消息内容不能为空"));
        }

        if body.chars().count() > max_length {
            return Err(DomainError::validation_error(
                "body",
                format!("消息内容不能超过{}个字符", max_length),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_text_message_creation() {
        let author = Uuid::new_v4();
        let message =
            Message::new_text("global", author, "alice", "Hello World", 200, None, now()).unwrap();

        assert_eq!(message.room_code, "global");
        assert_eq!(message.author_connection_id, author);
        assert_eq!(message.author_display_name, "alice");
        assert_eq!(message.body, "Hello World");
        assert_eq!(message.kind, MessageKind::Text);
        assert!(message.voice.is_none());
        assert!(!message.is_moderated);
        assert!(message.reply_to.is_none());
    }

    #[test]
    fn test_body_validation() {
        let author = Uuid::new_v4();

        // 有效内容
        assert!(Message::new_text("global", author, "alice", "ok", 200, None, now()).is_ok());
        assert!(
            Message::new_text("global", author, "alice", "A".repeat(200), 200, None, now()).is_ok()
        );

        // 无效内容
        assert!(Message::new_text("global", author, "alice", "", 200, None, now()).is_err());
        assert!(Message::new_text("global", author, "alice", "   ", 200, None, now()).is_err());
        assert!(
            Message::new_text("global", author, "alice", "A".repeat(201), 200, None, now())
                .is_err()
        );
    }

    #[test]
    fn test_reply_message() {
        let author = Uuid::new_v4();
        let original =
            Message::new_text("global", author, "alice", "original", 200, None, now()).unwrap();
        let reply = Message::new_text(
            "global",
            author,
            "bob",
            "reply",
            200,
            Some(original.id),
            now(),
        )
        .unwrap();

        assert_eq!(reply.reply_to, Some(original.id));
    }

    #[test]
    fn test_redact_is_one_way() {
        let author = Uuid::new_v4();
        let mut message =
            Message::new_text("global", author, "alice", "secret text", 200, None, now()).unwrap();

        message.redact();

        // 原始正文不可恢复
        assert!(message.is_moderated);
        assert_eq!(message.body, MODERATED_PLACEHOLDER);
        assert!(!message.body.contains("secret"));

        // 重复屏蔽不改变状态
        message.redact();
        assert!(message.is_moderated);
        assert_eq!(message.body, MODERATED_PLACEHOLDER);
    }

    #[test]
    fn test_voice_message_creation() {
        let author = Uuid::new_v4();
        let payload = VoicePayload::new("b64audio", 3.5, Some(vec![0.1, 0.8, 0.4])).unwrap();
        let message = Message::new_voice("global", author, "alice", payload, now());

        assert_eq!(message.kind, MessageKind::Voice);
        assert!(message.body.is_empty());
        let voice = message.voice.unwrap();
        assert_eq!(voice.data, "b64audio");
        assert_eq!(voice.duration_seconds, 3.5);
        assert_eq!(voice.waveform.unwrap().len(), 3);
    }

    #[test]
    fn test_voice_payload_validation() {
        assert!(VoicePayload::new("audio", 1.0, None).is_ok());

        // 空数据
        assert!(VoicePayload::new("", 1.0, None).is_err());
        // 非正时长
        assert!(VoicePayload::new("audio", 0.0, None).is_err());
        assert!(VoicePayload::new("audio", -1.0, None).is_err());
        // 时长超限
        assert!(VoicePayload::new("audio", MAX_VOICE_DURATION_SECONDS + 1.0, None).is_err());
        // 数据超限
        let oversized = "x".repeat(MAX_VOICE_PAYLOAD_BYTES + 1);
        assert!(VoicePayload::new(oversized, 1.0, None).is_err());
    }

    #[test]
    fn test_system_message_creation() {
        let message = Message::new_system("global", "Server restart in 5 minutes", now()).unwrap();

        assert_eq!(message.kind, MessageKind::System);
        assert_eq!(message.author_connection_id, Uuid::nil());
        assert_eq!(message.author_display_name, "system");

        assert!(Message::new_system("global", "  ", now()).is_err());
    }

    #[test]
    fn test_message_serialization() {
        let author = Uuid::new_v4();
        let message =
            Message::new_text("global", author, "alice", "Test message", 200, None, now()).unwrap();

        let json = serde_json::to_string(&message).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, deserialized);
    }
}
