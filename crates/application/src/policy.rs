//! 进程级审核策略句柄
//!
//! 策略由管理端偶尔修改、每条消息的接收路径频繁读取，
//! 用读多写少的读写锁持有，读取方拿到的是快照。

use domain::ModerationPolicy;
use tokio::sync::RwLock;

/// 审核策略句柄
pub struct ModerationPolicyHandle {
    inner: RwLock<ModerationPolicy>,
}

impl ModerationPolicyHandle {
    pub fn new(policy: ModerationPolicy) -> Self {
        Self {
            inner: RwLock::new(policy),
        }
    }

    /// 获取当前策略快照
    pub async fn snapshot(&self) -> ModerationPolicy {
        self.inner.read().await.clone()
    }

    /// 整体替换策略（管理端操作）
    pub async fn update(&self, policy: ModerationPolicy) {
        let mut guard = self.inner.write().await;
        *guard = policy;
        tracing::info!("moderation policy updated");
    }
}

impl Default for ModerationPolicyHandle {
    fn default() -> Self {
        Self::new(ModerationPolicy::default())
    }
}
