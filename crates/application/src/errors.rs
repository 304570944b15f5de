//! 应用层错误定义
//!
//! 限流拒绝和审核屏蔽不是错误：它们是业务结果，通过正常的
//! 事件通道反馈给发送者。这里只建模真正的失败。

use domain::errors::DomainError;
use thiserror::Error;

/// 应用层错误类型
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 领域层错误
    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    /// 未找到资源
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 验证错误
    #[error("验证失败: {0}")]
    Validation(String),

    /// 基础设施层错误
    #[error("基础设施错误: {0}")]
    Infrastructure(String),
}

impl ApplicationError {
    /// 创建未找到错误
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure(message.into())
    }
}

/// 应用层结果类型
pub type ApplicationResult<T> = Result<T, ApplicationError>;
