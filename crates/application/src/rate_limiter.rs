//! 消息限流器
//!
//! 每用户固定60秒计数窗口。窗口到期后在下一条消息时惰性重置
//! （重置而非滑动）：窗口边界处的突发是刻意接受的取舍，不是缺陷。

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// 用户消息配额
#[derive(Debug, Clone)]
pub struct UserQuota {
    /// 当前时间窗口内的消息数量
    pub message_count: u32,
    /// 当前时间窗口的开始时间
    pub window_start: Instant,
}

impl Default for UserQuota {
    fn default() -> Self {
        Self::new()
    }
}

impl UserQuota {
    pub fn new() -> Self {
        Self {
            message_count: 0,
            window_start: Instant::now(),
        }
    }

    /// 重置时间窗口
    pub fn reset_window(&mut self) {
        self.message_count = 0;
        self.window_start = Instant::now();
    }

    /// 检查是否超过限制
    pub fn is_over_limit(&self, max_messages: u32) -> bool {
        self.message_count >= max_messages
    }

    /// 增加消息计数
    pub fn increment(&mut self) {
        self.message_count += 1;
    }
}

/// 限流错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded: {current}/{max} messages per minute")]
    RateLimitExceeded { current: u32, max: u32 },
}

/// 消息限流器
///
/// 文本和语音消息共用同一个用户窗口。拒绝不是异常：调用方把它
/// 转换成发给来源连接的错误事件。
pub struct MessageRateLimiter {
    /// 时间窗口大小
    window_duration: Duration,
    /// 用户配额存储
    user_quotas: RwLock<HashMap<Uuid, UserQuota>>,
}

impl Default for MessageRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRateLimiter {
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(60))
    }

    /// 指定窗口大小创建（测试使用）
    pub fn with_window(window_duration: Duration) -> Self {
        Self {
            window_duration,
            user_quotas: RwLock::new(HashMap::new()),
        }
    }

    /// 检查用户是否可以发送消息
    ///
    /// 上限来自进程级审核策略，因此按调用传入而不是在构造时固化。
    /// 拒绝时不增加计数。
    pub fn check_message_rate(
        &self,
        user_id: Uuid,
        max_messages_per_minute: u32,
    ) -> Result<(), RateLimitError> {
        let mut quotas = self
            .user_quotas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let quota = quotas.entry(user_id).or_insert_with(UserQuota::new);
        let now = Instant::now();

        // 窗口到期则惰性重置
        if now.duration_since(quota.window_start) >= self.window_duration {
            quota.reset_window();
        }

        if quota.is_over_limit(max_messages_per_minute) {
            return Err(RateLimitError::RateLimitExceeded {
                current: quota.message_count,
                max: max_messages_per_minute,
            });
        }

        quota.increment();
        Ok(())
    }

    /// 获取用户当前窗口内的消息数
    pub fn current_count(&self, user_id: Uuid) -> u32 {
        let quotas = self
            .user_quotas
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        quotas.get(&user_id).map(|q| q.message_count).unwrap_or(0)
    }

    /// 用户会话结束时丢弃其窗口
    pub fn remove_user(&self, user_id: Uuid) {
        let mut quotas = self
            .user_quotas
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        quotas.remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiting() {
        let limiter = MessageRateLimiter::new();
        let user_id = Uuid::new_v4();

        // 发送5条消息应该成功
        for i in 0..5 {
            let result = limiter.check_message_rate(user_id, 5);
            assert!(result.is_ok(), "Message {} should be allowed", i + 1);
        }

        // 第6条消息应该被限流，且计数不再增加
        let result = limiter.check_message_rate(user_id, 5);
        assert_eq!(
            result,
            Err(RateLimitError::RateLimitExceeded { current: 5, max: 5 })
        );
        assert_eq!(limiter.current_count(user_id), 5);
    }

    #[test]
    fn test_denial_is_per_user() {
        let limiter = MessageRateLimiter::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        for _ in 0..3 {
            limiter.check_message_rate(alice, 3).unwrap();
        }
        assert!(limiter.check_message_rate(alice, 3).is_err());

        // 其他用户不受影响
        assert!(limiter.check_message_rate(bob, 3).is_ok());
    }

    #[test]
    fn test_window_reset() {
        let limiter = MessageRateLimiter::with_window(Duration::from_millis(100));
        let user_id = Uuid::new_v4();

        assert!(limiter.check_message_rate(user_id, 2).is_ok());
        assert!(limiter.check_message_rate(user_id, 2).is_ok());
        assert!(limiter.check_message_rate(user_id, 2).is_err());

        // 等待时间窗口到期后惰性重置
        std::thread::sleep(Duration::from_millis(150));
        assert!(limiter.check_message_rate(user_id, 2).is_ok());
        assert_eq!(limiter.current_count(user_id), 1);
    }

    #[test]
    fn test_allows_burst_across_window_boundary() {
        // 固定窗口（而非滑动窗口）的已知取舍：窗口末尾的N条消息加上
        // 新窗口开头的N条消息，可以在远小于窗口长度的时间内全部放行。
        // 这是刻意保留的产品决策，不是缺陷。
        let limiter = MessageRateLimiter::with_window(Duration::from_millis(100));
        let user_id = Uuid::new_v4();

        for _ in 0..3 {
            assert!(limiter.check_message_rate(user_id, 3).is_ok());
        }
        assert!(limiter.check_message_rate(user_id, 3).is_err());

        std::thread::sleep(Duration::from_millis(110));

        // 新窗口立即放行整批配额
        for _ in 0..3 {
            assert!(limiter.check_message_rate(user_id, 3).is_ok());
        }
    }

    #[test]
    fn test_remove_user_discards_window() {
        let limiter = MessageRateLimiter::new();
        let user_id = Uuid::new_v4();

        for _ in 0..3 {
            limiter.check_message_rate(user_id, 3).unwrap();
        }
        assert!(limiter.check_message_rate(user_id, 3).is_err());

        // 会话结束后窗口被丢弃，重连即有新窗口
        limiter.remove_user(user_id);
        assert_eq!(limiter.current_count(user_id), 0);
        assert!(limiter.check_message_rate(user_id, 3).is_ok());
    }

    #[test]
    fn test_runtime_policy_change_applies_immediately() {
        // 上限按调用传入：管理端修改策略后下一条消息立即生效
        let limiter = MessageRateLimiter::new();
        let user_id = Uuid::new_v4();

        for _ in 0..5 {
            limiter.check_message_rate(user_id, 5).unwrap();
        }
        assert!(limiter.check_message_rate(user_id, 5).is_err());

        // 上调后同一窗口内继续放行
        assert!(limiter.check_message_rate(user_id, 8).is_ok());
    }
}
