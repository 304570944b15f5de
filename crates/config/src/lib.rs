//! 统一配置中心
//!
//! 提供聊天子系统的全局配置管理，包括：
//! - 服务监听地址
//! - 房间与消息历史设置
//! - 内容审核策略默认值

use serde::{Deserialize, Serialize};
use std::env;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 聊天室配置
    pub chat: ChatConfig,
    /// 内容审核配置
    pub moderation: ModerationConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 聊天室配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// 每个房间保留的最大历史消息数
    pub history_limit: usize,
    /// 默认的单条消息最大长度
    pub default_max_message_length: usize,
}

/// 内容审核配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// 屏蔽词列表（逗号分隔的环境变量）
    pub blocked_terms: Vec<String>,
    /// 每用户每分钟最大消息数
    pub max_messages_per_minute: u32,
    /// 禁言时长（分钟，仅作为信息透出，不驱动状态机）
    pub mute_duration_minutes: u32,
    /// 自动审核总开关
    pub auto_moderation_enabled: bool,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8080),
            },
            chat: ChatConfig {
                history_limit: env::var("CHAT_HISTORY_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
                default_max_message_length: env::var("CHAT_MAX_MESSAGE_LENGTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200),
            },
            moderation: ModerationConfig {
                blocked_terms: env::var("MODERATION_BLOCKED_TERMS")
                    .map(|raw| {
                        raw.split(',')
                            .map(|term| term.trim().to_lowercase())
                            .filter(|term| !term.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                max_messages_per_minute: env::var("MODERATION_MAX_MESSAGES_PER_MINUTE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                mute_duration_minutes: env::var("MODERATION_MUTE_DURATION_MINUTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
                auto_moderation_enabled: env::var("MODERATION_AUTO_ENABLED")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.history_limit == 0 {
            return Err(ConfigError::InvalidChatConfig(
                "history limit must be greater than 0".to_string(),
            ));
        }

        if self.chat.default_max_message_length == 0 {
            return Err(ConfigError::InvalidChatConfig(
                "max message length must be greater than 0".to_string(),
            ));
        }

        if self.moderation.max_messages_per_minute == 0 {
            return Err(ConfigError::InvalidModerationConfig(
                "max messages per minute must be greater than 0".to_string(),
            ));
        }

        // 匹配逻辑依赖屏蔽词全部为小写
        if self
            .moderation
            .blocked_terms
            .iter()
            .any(|term| term.chars().any(|c| c.is_uppercase()))
        {
            return Err(ConfigError::InvalidModerationConfig(
                "blocked terms must be lowercase".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid chat configuration: {0}")]
    InvalidChatConfig(String),
    #[error("Invalid moderation configuration: {0}")]
    InvalidModerationConfig(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
