//! 主应用程序入口
//!
//! 装配聊天子系统并启动 Axum Web 服务。

use std::sync::Arc;

use application::{
    ChatService, ChatServiceDependencies, MessageRateLimiter, ModerationPolicyHandle,
    SessionManager, StatsService, SystemClock,
};
use config::AppConfig;
use domain::{ModerationPolicy, RoomSettings};
use infrastructure::{InMemoryMessageRouter, InMemoryRoomRegistry};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取并验证环境变量配置
    let app_config = AppConfig::from_env();
    app_config.validate()?;

    // 房间注册表：进程启动时构造一次，以句柄传给协调器
    let default_settings = RoomSettings {
        max_message_length: app_config.chat.default_max_message_length,
        ..RoomSettings::default()
    };
    let registry = Arc::new(InMemoryRoomRegistry::new(
        app_config.chat.history_limit,
        default_settings,
    ));
    let message_router = Arc::new(InMemoryMessageRouter::new());

    // 进程级审核策略，管理端可在运行时更新
    let policy = ModerationPolicy::new(
        app_config.moderation.blocked_terms.clone(),
        app_config.moderation.max_messages_per_minute,
        app_config.moderation.mute_duration_minutes,
        app_config.moderation.auto_moderation_enabled,
    );

    // 创建应用层服务
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        registry: registry.clone(),
        router: message_router.clone(),
        sessions: Arc::new(SessionManager::new()),
        rate_limiter: Arc::new(MessageRateLimiter::new()),
        policy: Arc::new(ModerationPolicyHandle::new(policy)),
        clock: Arc::new(SystemClock),
    }));
    let stats_service = Arc::new(StatsService::new(registry));

    // 创建应用状态并启动 Web 服务器
    let state = AppState::new(chat_service, stats_service, message_router);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind((
        app_config.server.host.as_str(),
        app_config.server.port,
    ))
    .await?;

    tracing::info!(
        "聊天服务器启动在 http://{}:{}",
        app_config.server.host,
        app_config.server.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
