//! 容器边界的错误类型
//!
//! 容器本身不在本工作区内实现，这里只定义 BeanPostProcessor 钩子需要返回的错误。
//! 外部错误通过 `anyhow` 透传，并用 `.context()` 附加上下文信息。
//!
//! # 示例
//!
//! ```rust,ignore
//! use anyhow::Context;
//!
//! fn wrap(bean_name: &str) -> ContainerResult<()> {
//!     create_proxy().with_context(|| format!("Failed to proxy bean '{}'", bean_name))?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// 容器操作结果
pub type ContainerResult<T> = std::result::Result<T, ContainerError>;

/// 容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// BeanPostProcessor 处理失败
    #[error("BeanPostProcessor '{processor}' failed for bean '{bean_name}': {message}")]
    PostProcessorFailed {
        processor: String,
        bean_name: String,
        message: String,
    },

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
