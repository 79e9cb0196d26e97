// chimera-core: 容器边界契约
//
// AOP 引擎只通过这里定义的生命周期钩子与依赖注入容器交互：
// - BeanPostProcessor（Bean 初始化前后的扩展点）
// - 按优先级执行的处理器列表
// - 统一的容器错误类型

pub mod bean_post_processor;
pub mod error;

// 重新导出常用类型
pub use bean_post_processor::{BeanObject, BeanPostProcessor, BeanPostProcessors};
pub use error::{ContainerError, ContainerResult};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean_post_processor::{BeanObject, BeanPostProcessor, BeanPostProcessors};
    pub use crate::error::{ContainerError, ContainerResult};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
