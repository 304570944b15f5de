//! WebSocket 入站协议
//!
//! 入站帧是封闭的带标签命令集合，在到达聊天协调器之前完成结构校验；
//! 未知标签或缺字段的帧在边界处即被拒绝。客户端不能携带消息 ID、
//! 作者身份或时间戳——规范消息始终由服务端构造。

use domain::MessageKind;
use serde::Deserialize;
use uuid::Uuid;

/// 客户端命令枚举
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// 发送文本/表情消息
    SendMessage {
        body: String,
        room_code: Option<String>,
        kind: Option<MessageKind>,
        reply_to: Option<Uuid>,
    },
    /// 发送语音消息
    SendVoiceMessage {
        data: String,
        duration_seconds: f32,
        waveform: Option<Vec<f32>>,
        room_code: Option<String>,
    },
    /// 加入房间
    JoinRoom { room_code: String },
    /// 离开房间
    LeaveRoom { room_code: String },
    /// 打字状态
    Typing { is_typing: bool },
    /// 心跳
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_message() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"type":"send_message","body":"hello","room_code":"global"}"#,
        )
        .unwrap();

        match command {
            ClientCommand::SendMessage {
                body,
                room_code,
                kind,
                reply_to,
            } => {
                assert_eq!(body, "hello");
                assert_eq!(room_code.as_deref(), Some("global"));
                assert!(kind.is_none());
                assert!(reply_to.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_voice_message() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"type":"send_voice_message","data":"b64","duration_seconds":2.5,"waveform":[0.1,0.9]}"#,
        )
        .unwrap();

        assert!(matches!(
            command,
            ClientCommand::SendVoiceMessage { duration_seconds, .. } if duration_seconds == 2.5
        ));
    }

    #[test]
    fn test_parse_emoji_kind() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"type":"send_message","body":"😀","kind":"emoji"}"#).unwrap();

        assert!(matches!(
            command,
            ClientCommand::SendMessage {
                kind: Some(MessageKind::Emoji),
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        // 未知标签
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"nuke_room"}"#).is_err());
        // 缺少必填字段
        assert!(serde_json::from_str::<ClientCommand>(r#"{"type":"join_room"}"#).is_err());
        // 非 JSON
        assert!(serde_json::from_str::<ClientCommand>("not json").is_err());
    }

    #[test]
    fn test_client_supplied_identity_fields_are_ignored() {
        // 命令结构里没有身份或时间戳字段：客户端多带的字段被丢弃，
        // 规范消息始终由服务端用已认证身份构造
        let command: ClientCommand = serde_json::from_str(
            r#"{"type":"send_message","body":"x","author_display_name":"admin","created_at":"2020-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(command, ClientCommand::SendMessage { .. }));
    }

    #[test]
    fn test_parse_typing_and_ping() {
        let typing: ClientCommand =
            serde_json::from_str(r#"{"type":"typing","is_typing":true}"#).unwrap();
        assert!(matches!(
            typing,
            ClientCommand::Typing { is_typing: true }
        ));

        let ping: ClientCommand = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(ping, ClientCommand::Ping));
    }
}
