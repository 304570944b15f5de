//! WebSocket 连接管理器
//!
//! 封装单条 WebSocket 连接的完整生命周期：
//! - 注册出站事件通道并建立会话（自动加入全局房间）
//! - 入站帧解析为类型化命令后分发给聊天协调器
//! - 任一方向结束时的资源清理（断开清理是幂等的）

use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::ChatEvent;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ClientCommand;
use crate::state::AppState;

/// WebSocket 连接
pub struct WebSocketConnection {
    state: AppState,
    connection_id: Uuid,
    user_id: Uuid,
    display_name: String,
}

impl WebSocketConnection {
    pub fn new(state: AppState, user_id: Uuid, display_name: String) -> Self {
        Self {
            state,
            connection_id: Uuid::new_v4(),
            user_id,
            display_name,
        }
    }

    /// 运行连接主循环
    pub async fn run(self, socket: WebSocket) {
        let connection_id = self.connection_id;
        let (mut sender, mut incoming) = socket.split();

        // 先注册出站通道，保证 connect 阶段的历史同步有投递路径
        let (tx, mut rx) = mpsc::unbounded_channel::<ChatEvent>();
        self.state.router.register(connection_id, tx).await;

        if let Err(err) = self
            .state
            .chat_service
            .connect(connection_id, self.user_id, &self.display_name)
            .await
        {
            tracing::warn!(
                connection_id = %connection_id,
                error = %err,
                "failed to establish chat session"
            );
            self.state.router.unregister(connection_id).await;
            return;
        }

        // 发送任务：把出站事件序列化后写入 WebSocket
        let mut send_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        });

        // 接收任务：解析入站帧并分发给协调器
        let recv_state = self.state.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(message) = incoming.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::debug!(
                            connection_id = %connection_id,
                            error = %err,
                            "websocket read error"
                        );
                        break;
                    }
                };

                match message {
                    WsMessage::Text(text) => {
                        Self::dispatch(&recv_state, connection_id, text.as_str()).await;
                    }
                    WsMessage::Close(_) => {
                        tracing::debug!(connection_id = %connection_id, "client requested close");
                        break;
                    }
                    // Ping/Pong 由 WebSocket 协议层自动应答
                    _ => {}
                }
            }
        });

        // 任一任务结束即认为连接终止
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        // 清理：离开所有房间、丢弃会话和限流窗口、注销出站通道
        if let Err(err) = self.state.chat_service.disconnect(connection_id).await {
            tracing::error!(
                connection_id = %connection_id,
                error = %err,
                "failed to clean up disconnected session"
            );
        }
        self.state.router.unregister(connection_id).await;

        tracing::info!(connection_id = %connection_id, "websocket connection closed");
    }

    /// 解析并分发一条入站帧
    ///
    /// 格式非法的帧在这里被拒绝：单播错误事件，不触碰任何共享状态。
    async fn dispatch(state: &AppState, connection_id: Uuid, text: &str) {
        let command = match serde_json::from_str::<ClientCommand>(text) {
            Ok(command) => command,
            Err(err) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %err,
                    "rejected malformed frame"
                );
                let _ = state
                    .router
                    .unicast(
                        connection_id,
                        ChatEvent::Error {
                            message: format!("malformed frame: {}", err),
                        },
                    )
                    .await;
                return;
            }
        };

        let result = match command {
            ClientCommand::SendMessage {
                body,
                room_code,
                kind,
                reply_to,
            } => {
                state
                    .chat_service
                    .send_message(
                        connection_id,
                        application::SendMessageRequest {
                            body,
                            room_code,
                            kind,
                            reply_to,
                        },
                    )
                    .await
            }
            ClientCommand::SendVoiceMessage {
                data,
                duration_seconds,
                waveform,
                room_code,
            } => {
                state
                    .chat_service
                    .send_voice_message(
                        connection_id,
                        application::SendVoiceMessageRequest {
                            data,
                            duration_seconds,
                            waveform,
                            room_code,
                        },
                    )
                    .await
            }
            ClientCommand::JoinRoom { room_code } => {
                state.chat_service.join_room(connection_id, &room_code).await
            }
            ClientCommand::LeaveRoom { room_code } => {
                state
                    .chat_service
                    .leave_room(connection_id, &room_code)
                    .await
            }
            ClientCommand::Typing { is_typing } => {
                state.chat_service.typing(connection_id, is_typing).await
            }
            ClientCommand::Ping => state
                .router
                .unicast(connection_id, ChatEvent::Pong)
                .await
                .map_err(|err| {
                    application::ApplicationError::infrastructure(err.to_string())
                }),
        };

        if let Err(err) = result {
            tracing::warn!(
                connection_id = %connection_id,
                error = %err,
                "command dispatch failed"
            );
        }
    }
}
