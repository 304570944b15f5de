//! 聊天协调器
//!
//! 接收入站事件（发消息、发语音、加入/离开房间、打字、断开），
//! 依次应用限流和内容审核，修改房间注册表，并向受影响房间的
//! 连接扇出出站事件。
//!
//! 失败语义：限流拒绝和审核屏蔽不是错误，而是通过正常事件通道
//! 反馈的业务结果；只有格式非法的输入会被直接拒绝（单播错误事件，
//! 不触碰注册表）。单个接收者的投递失败不会中断其他接收者，
//! 也不会回滚已提交的历史追加。

use std::sync::Arc;

use domain::{
    ChatEvent, Message, MessageKind, ModerationPolicy, RoomKind, Session, VoicePayload,
    GLOBAL_ROOM_CODE,
};
use uuid::Uuid;

use crate::{
    broadcaster::ConnectionRouter,
    clock::Clock,
    dto::RoomDto,
    errors::{ApplicationError, ApplicationResult},
    policy::ModerationPolicyHandle,
    rate_limiter::MessageRateLimiter,
    registry::RoomRegistry,
    sessions::SessionManager,
};

/// 创建房间请求（管理端）
#[derive(Debug, Clone)]
pub struct CreateRoomRequest {
    pub code: String,
    pub display_name: String,
    pub kind: RoomKind,
}

/// 发送消息请求
#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub body: String,
    pub room_code: Option<String>,
    pub kind: Option<MessageKind>,
    pub reply_to: Option<Uuid>,
}

/// 发送语音消息请求
#[derive(Debug, Clone)]
pub struct SendVoiceMessageRequest {
    pub data: String,
    pub duration_seconds: f32,
    pub waveform: Option<Vec<f32>>,
    pub room_code: Option<String>,
}

/// 更新审核策略请求（管理端）
#[derive(Debug, Clone)]
pub struct UpdatePolicyRequest {
    pub blocked_terms: Vec<String>,
    pub max_messages_per_minute: u32,
    pub mute_duration_minutes: u32,
    pub auto_moderation_enabled: bool,
}

pub struct ChatServiceDependencies {
    pub registry: Arc<dyn RoomRegistry>,
    pub router: Arc<dyn ConnectionRouter>,
    pub sessions: Arc<SessionManager>,
    pub rate_limiter: Arc<MessageRateLimiter>,
    pub policy: Arc<ModerationPolicyHandle>,
    pub clock: Arc<dyn Clock>,
}

pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 连接建立：注册会话并自动加入全局房间
    pub async fn connect(
        &self,
        connection_id: Uuid,
        user_id: Uuid,
        display_name: &str,
    ) -> ApplicationResult<()> {
        let session = Session::new(connection_id, user_id, display_name, self.deps.clock.now())?;
        self.deps.sessions.register(session).await;

        self.join_room(connection_id, GLOBAL_ROOM_CODE).await?;

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            "connection established"
        );
        Ok(())
    }

    /// 连接断开：离开所有房间，丢弃会话和限流窗口
    ///
    /// 幂等：对已断开的连接重复调用是空操作。
    pub async fn disconnect(&self, connection_id: Uuid) -> ApplicationResult<()> {
        let session = match self.deps.sessions.remove(connection_id).await {
            Some(session) => session,
            None => return Ok(()),
        };

        let affected = self.deps.registry.remove_connection(connection_id).await;
        let now = self.deps.clock.now();
        for (room_code, remaining) in affected {
            if remaining.is_empty() {
                continue;
            }
            self.deps
                .router
                .send_to_many(
                    remaining,
                    ChatEvent::UserLeft {
                        room_code,
                        connection_id,
                        display_name: session.display_name.clone(),
                        timestamp: now,
                    },
                )
                .await;
        }

        self.deps.rate_limiter.remove_user(session.user_id);

        tracing::info!(
            connection_id = %connection_id,
            user_id = %session.user_id,
            "connection closed, session cleaned up"
        );
        Ok(())
    }

    /// 加入房间：必要时以默认设置创建，单播历史，通知其他参与者
    pub async fn join_room(&self, connection_id: Uuid, room_code: &str) -> ApplicationResult<()> {
        let session = self.deps.sessions.get(connection_id).await?;

        let room = match self.deps.registry.get_or_create(room_code).await {
            Ok(room) => room,
            Err(ApplicationError::Domain(err)) => {
                return self.notify_error(connection_id, err.to_string()).await;
            }
            Err(err) => return Err(err),
        };

        let snapshot = self.deps.registry.join(&room.code, connection_id).await?;
        self.deps
            .sessions
            .record_join(connection_id, &room.code)
            .await?;

        // 先把当前历史单播给加入者（按存储顺序），再通知其他人
        if let Err(err) = self
            .deps
            .router
            .unicast(
                connection_id,
                ChatEvent::RoomHistory {
                    room_code: room.code.clone(),
                    messages: snapshot.history,
                },
            )
            .await
        {
            tracing::warn!(
                connection_id = %connection_id,
                error = %err,
                "failed to deliver room history"
            );
        }

        // 重复加入是空操作，不重复发加入通知
        if snapshot.newly_joined && !snapshot.others.is_empty() {
            self.deps
                .router
                .send_to_many(
                    snapshot.others,
                    ChatEvent::UserJoined {
                        room_code: room.code.clone(),
                        connection_id,
                        display_name: session.display_name.clone(),
                        timestamp: self.deps.clock.now(),
                    },
                )
                .await;
        }

        tracing::info!(
            connection_id = %connection_id,
            room_code = %room.code,
            "connection joined room"
        );
        Ok(())
    }

    /// 离开房间：通知剩余参与者
    pub async fn leave_room(&self, connection_id: Uuid, room_code: &str) -> ApplicationResult<()> {
        let session = self.deps.sessions.get(connection_id).await?;

        if room_code.is_empty() {
            return self
                .notify_error(connection_id, "room code is required")
                .await;
        }

        let snapshot = self.deps.registry.leave(room_code, connection_id).await?;
        self.deps
            .sessions
            .record_leave(connection_id, room_code)
            .await?;

        if snapshot.removed && !snapshot.remaining.is_empty() {
            self.deps
                .router
                .send_to_many(
                    snapshot.remaining,
                    ChatEvent::UserLeft {
                        room_code: room_code.to_string(),
                        connection_id,
                        display_name: session.display_name,
                        timestamp: self.deps.clock.now(),
                    },
                )
                .await;
        }

        tracing::info!(
            connection_id = %connection_id,
            room_code = %room_code,
            "connection left room"
        );
        Ok(())
    }

    /// 发送文本/表情消息
    ///
    /// 流程：解析目标房间 → 校验 → 限流 → 审核 → 追加历史 → 广播。
    /// 服务端负责写入消息 ID、作者身份和时间戳。
    pub async fn send_message(
        &self,
        connection_id: Uuid,
        request: SendMessageRequest,
    ) -> ApplicationResult<()> {
        let session = self.deps.sessions.get(connection_id).await?;
        let target = session.resolve_target_room(request.room_code.as_deref());

        let room = match self.deps.registry.get_or_create(&target).await {
            Ok(room) => room,
            Err(ApplicationError::Domain(err)) => {
                return self.notify_error(connection_id, err.to_string()).await;
            }
            Err(err) => return Err(err),
        };

        // 校验消息类型和正文；非法输入直接拒绝，不消耗限流配额
        let kind = request.kind.unwrap_or(MessageKind::Text);
        let constructed = match kind {
            MessageKind::Text => Message::new_text(
                &room.code,
                connection_id,
                &session.display_name,
                &request.body,
                room.settings.max_message_length,
                request.reply_to,
                self.deps.clock.now(),
            ),
            MessageKind::Emoji => {
                if !room.settings.allow_emojis {
                    return self
                        .notify_error(connection_id, "emoji messages are not allowed in this room")
                        .await;
                }
                Message::new_emoji(
                    &room.code,
                    connection_id,
                    &session.display_name,
                    &request.body,
                    room.settings.max_message_length,
                    self.deps.clock.now(),
                )
            }
            MessageKind::System | MessageKind::Voice => {
                return self
                    .notify_error(connection_id, "unsupported message kind")
                    .await;
            }
        };

        let mut message = match constructed {
            Ok(message) => message,
            Err(err) => return self.notify_error(connection_id, err.to_string()).await,
        };

        let policy = self.deps.policy.snapshot().await;
        if let Err(err) = self
            .deps
            .rate_limiter
            .check_message_rate(session.user_id, policy.max_messages_per_minute)
        {
            tracing::debug!(
                connection_id = %connection_id,
                user_id = %session.user_id,
                "message denied by rate limiter"
            );
            return self.notify_error(connection_id, err.to_string()).await;
        }

        // 审核屏蔽是单向的：原始正文被占位符覆盖后存储和广播
        if room.settings.moderation_enabled && policy.should_redact(&message.body) {
            message.redact();
            tracing::info!(
                message_id = %message.id,
                room_code = %room.code,
                "message redacted by moderation policy"
            );
        }

        // 在房间锁内追加并取参与者快照，锁外扇出（含发送者回显）
        let participants = self.deps.registry.append(&room.code, message.clone()).await?;
        self.deps
            .router
            .send_to_many(participants, ChatEvent::MessageSent { message })
            .await;

        Ok(())
    }

    /// 发送语音消息
    ///
    /// 与文本消息同一条管线，但不做关键词审核（语音正文不是文本），
    /// 并且与文本消息共用同一个限流窗口。
    pub async fn send_voice_message(
        &self,
        connection_id: Uuid,
        request: SendVoiceMessageRequest,
    ) -> ApplicationResult<()> {
        let session = self.deps.sessions.get(connection_id).await?;
        let target = session.resolve_target_room(request.room_code.as_deref());

        let room = match self.deps.registry.get_or_create(&target).await {
            Ok(room) => room,
            Err(ApplicationError::Domain(err)) => {
                return self.notify_error(connection_id, err.to_string()).await;
            }
            Err(err) => return Err(err),
        };

        if !room.settings.allow_voice {
            return self
                .notify_error(connection_id, "voice messages are not allowed in this room")
                .await;
        }

        let payload = match VoicePayload::new(
            request.data,
            request.duration_seconds,
            request.waveform,
        ) {
            Ok(payload) => payload,
            Err(err) => return self.notify_error(connection_id, err.to_string()).await,
        };

        let policy = self.deps.policy.snapshot().await;
        if let Err(err) = self
            .deps
            .rate_limiter
            .check_message_rate(session.user_id, policy.max_messages_per_minute)
        {
            tracing::debug!(
                connection_id = %connection_id,
                user_id = %session.user_id,
                "voice message denied by rate limiter"
            );
            return self.notify_error(connection_id, err.to_string()).await;
        }

        let message = Message::new_voice(
            &room.code,
            connection_id,
            &session.display_name,
            payload,
            self.deps.clock.now(),
        );

        let participants = self.deps.registry.append(&room.code, message.clone()).await?;
        self.deps
            .router
            .send_to_many(participants, ChatEvent::VoiceMessageSent { message })
            .await;

        Ok(())
    }

    /// 打字状态通知
    ///
    /// 对会话已加入的每个房间广播给其他参与者。服务端不持有计时器，
    /// 打字状态的过期由接收方客户端处理。
    pub async fn typing(&self, connection_id: Uuid, is_typing: bool) -> ApplicationResult<()> {
        let session = self.deps.sessions.get(connection_id).await?;

        for room_code in session.joined_rooms_snapshot() {
            let others: Vec<Uuid> = self
                .deps
                .registry
                .participants(&room_code)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();

            if others.is_empty() {
                continue;
            }

            self.deps
                .router
                .send_to_many(
                    others,
                    ChatEvent::Typing {
                        room_code,
                        connection_id,
                        display_name: session.display_name.clone(),
                        is_typing,
                    },
                )
                .await;
        }

        Ok(())
    }

    /// 创建房间（管理端）
    ///
    /// 只在代码不存在时创建；重复创建不会重置已有房间的设置。
    pub async fn create_room(&self, request: CreateRoomRequest) -> ApplicationResult<RoomDto> {
        let room = self
            .deps
            .registry
            .create_room(&request.code, &request.display_name, request.kind)
            .await?;

        tracing::info!(room_code = %room.code, "room created");
        Ok(room)
    }

    /// 发布系统公告到房间（管理端）
    pub async fn announce(&self, room_code: &str, body: &str) -> ApplicationResult<Message> {
        let room = self.deps.registry.get_or_create(room_code).await?;
        let message = Message::new_system(&room.code, body, self.deps.clock.now())?;

        let participants = self.deps.registry.append(&room.code, message.clone()).await?;
        self.deps
            .router
            .send_to_many(
                participants,
                ChatEvent::MessageSent {
                    message: message.clone(),
                },
            )
            .await;

        tracing::info!(room_code = %room.code, "system announcement published");
        Ok(message)
    }

    /// 事后屏蔽历史中的消息（管理端）
    ///
    /// 向房间广播屏蔽事件，客户端按 ID 原地更新本地副本。
    pub async fn moderate_message(
        &self,
        room_code: &str,
        message_id: Uuid,
    ) -> ApplicationResult<()> {
        let participants = self
            .deps
            .registry
            .moderate_message(room_code, message_id)
            .await?;

        self.deps
            .router
            .send_to_many(
                participants,
                ChatEvent::MessageModerated {
                    room_code: room_code.to_string(),
                    message_id,
                    timestamp: self.deps.clock.now(),
                },
            )
            .await;

        tracing::info!(
            room_code = %room_code,
            message_id = %message_id,
            "message retroactively moderated"
        );
        Ok(())
    }

    /// 查询房间历史（管理端）
    pub async fn room_history(&self, room_code: &str) -> ApplicationResult<Vec<Message>> {
        self.deps.registry.history(room_code).await
    }

    /// 获取当前审核策略快照
    pub async fn policy(&self) -> ModerationPolicy {
        self.deps.policy.snapshot().await
    }

    /// 更新审核策略（管理端），返回生效后的策略
    pub async fn update_policy(
        &self,
        request: UpdatePolicyRequest,
    ) -> ApplicationResult<ModerationPolicy> {
        if request.max_messages_per_minute == 0 {
            return Err(ApplicationError::validation(
                "max_messages_per_minute must be greater than 0",
            ));
        }

        let policy = ModerationPolicy::new(
            request.blocked_terms,
            request.max_messages_per_minute,
            request.mute_duration_minutes,
            request.auto_moderation_enabled,
        );
        self.deps.policy.update(policy.clone()).await;
        Ok(policy)
    }

    /// 单播错误通知给来源连接
    ///
    /// 投递失败只记录日志：错误通知本身是尽力而为的。
    async fn notify_error(
        &self,
        connection_id: Uuid,
        message: impl Into<String>,
    ) -> ApplicationResult<()> {
        let message = message.into();
        if let Err(err) = self
            .deps
            .router
            .unicast(connection_id, ChatEvent::Error { message })
            .await
        {
            tracing::warn!(
                connection_id = %connection_id,
                error = %err,
                "failed to deliver error notice"
            );
        }
        Ok(())
    }
}
