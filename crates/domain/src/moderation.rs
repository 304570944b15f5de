//! 内容审核策略
//!
//! 基于子串匹配的关键词屏蔽。策略是进程级共享配置：管理端偶尔修改，
//! 每条消息的接收路径都会读取。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 被屏蔽消息的固定占位正文
pub const MODERATED_PLACEHOLDER: &str = "[message removed by moderator]";

/// 内容审核策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationPolicy {
    /// 屏蔽词集合（全部小写）
    pub blocked_terms: HashSet<String>,
    /// 每用户每分钟最大消息数
    pub max_messages_per_minute: u32,
    /// 禁言时长（分钟）。仅作为信息透出，限流之外不驱动独立的禁言状态机。
    pub mute_duration_minutes: u32,
    /// 自动审核总开关：关闭时命中屏蔽词的消息原样放行
    pub auto_moderation_enabled: bool,
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self {
            blocked_terms: HashSet::new(),
            max_messages_per_minute: 10,
            mute_duration_minutes: 5,
            auto_moderation_enabled: true,
        }
    }
}

impl ModerationPolicy {
    /// 创建新策略，屏蔽词统一转为小写
    pub fn new(
        blocked_terms: impl IntoIterator<Item = String>,
        max_messages_per_minute: u32,
        mute_duration_minutes: u32,
        auto_moderation_enabled: bool,
    ) -> Self {
        Self {
            blocked_terms: blocked_terms
                .into_iter()
                .map(|term| term.trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
            max_messages_per_minute,
            mute_duration_minutes,
            auto_moderation_enabled,
        }
    }

    /// 检查正文是否命中屏蔽词（大小写不敏感的子串匹配，命中一个即算）
    pub fn contains_blocked_term(&self, body: &str) -> bool {
        if self.blocked_terms.is_empty() {
            return false;
        }
        let lowered = body.to_lowercase();
        self.blocked_terms.iter().any(|term| lowered.contains(term))
    }

    /// 判断正文是否应被屏蔽（总开关关闭时恒为否）
    pub fn should_redact(&self, body: &str) -> bool {
        self.auto_moderation_enabled && self.contains_blocked_term(body)
    }

    /// 对正文应用审核策略
    ///
    /// 返回最终正文和是否被屏蔽。总开关关闭时命中也原样放行。
    pub fn apply(&self, body: &str) -> (String, bool) {
        if self.should_redact(body) {
            (MODERATED_PLACEHOLDER.to_string(), true)
        } else {
            (body.to_string(), false)
        }
    }
}
