use chrono::{DateTime, Utc};

/// 服务端时钟抽象
///
/// 所有消息时间戳都来自这里，客户端提交的时间字段一律丢弃。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
