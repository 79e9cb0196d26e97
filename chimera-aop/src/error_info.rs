//! 错误信息结构
//!
//! 提供结构化的错误信息传递给异常通知

use crate::error::{AopConfigError, InvocationError};

/// 结构化的错误信息
///
/// 用于在 after_throwing 通知中记录更丰富的错误信息
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// 错误消息
    pub message: String,

    /// 错误类型名称
    pub error_type: String,

    /// 错误源链（cause chain）
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    /// 从拦截链传播的错误创建
    ///
    /// 引擎自身的错误类型可以识别，其余错误类型记为 `anyhow::Error`
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let error_type = if error.is::<InvocationError>() {
            std::any::type_name::<InvocationError>()
        } else if error.is::<AopConfigError>() {
            std::any::type_name::<AopConfigError>()
        } else {
            "anyhow::Error"
        };

        Self {
            message: error.to_string(),
            error_type: error_type.to_string(),
            source_chain: error.chain().skip(1).map(|cause| cause.to_string()).collect(),
        }
    }

    /// 获取完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            self.message.clone()
        } else {
            format!(
                "{}\nCaused by:\n  {}",
                self.message,
                self.source_chain.join("\n  ")
            )
        }
    }
}
