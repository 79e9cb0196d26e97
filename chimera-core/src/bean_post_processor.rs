//! BeanPostProcessor - 容器生命周期扩展点
//!
//! 容器在 Bean 初始化前后调用这些钩子，钩子可以返回原始 Bean，也可以返回包装后的对象
//! （例如 AOP 代理）。本模块只定义契约以及按优先级执行钩子的有序列表，
//! Bean 的创建与装配由外部容器负责。

use crate::error::ContainerResult;
use parking_lot::RwLock;
use std::any::Any;
use std::sync::Arc;

/// 容器管理的对象
pub type BeanObject = Arc<dyn Any + Send + Sync>;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许替换 Bean 实例
///
/// 使用场景：
/// - AOP 代理创建
/// - Bean 包装
/// - 验证等
///
/// # 示例
///
/// ```ignore
/// use chimera_core::prelude::*;
///
/// pub struct LoggingBeanPostProcessor;
///
/// impl BeanPostProcessor for LoggingBeanPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: BeanObject,
///         bean_name: &str,
///     ) -> ContainerResult<BeanObject> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 在 Bean 初始化回调（init）之前调用
    fn post_process_before_initialization(
        &self,
        bean: BeanObject,
        _bean_name: &str,
    ) -> ContainerResult<BeanObject> {
        Ok(bean)
    }

    /// 在 Bean 初始化回调（init）之后调用
    ///
    /// # 典型用途
    /// - 创建 AOP 代理
    /// - 包装 Bean
    fn post_process_after_initialization(
        &self,
        bean: BeanObject,
        _bean_name: &str,
    ) -> ContainerResult<BeanObject> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小优先级越高）
    fn order(&self) -> i32 {
        1000
    }
}

/// 有序的 BeanPostProcessor 列表
///
/// 容器持有一个实例，在每个 Bean 初始化前后依次调用其中的处理器
#[derive(Default)]
pub struct BeanPostProcessors {
    processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
}

impl BeanPostProcessors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册处理器
    ///
    /// 按优先级排序（order 值越小越先执行），相同 order 保持注册顺序
    pub fn add(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.processors.write();
        tracing::debug!(
            "Registering BeanPostProcessor '{}' (order: {})",
            processor.name(),
            processor.order()
        );
        processors.push(processor);
        processors.sort_by_key(|p| p.order());
    }

    /// 已注册的处理器（按执行顺序）
    pub fn processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.processors.read().clone()
    }

    pub fn len(&self) -> usize {
        self.processors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.read().is_empty()
    }

    /// 应用 post_process_before_initialization
    pub fn apply_before_initialization(
        &self,
        bean: BeanObject,
        bean_name: &str,
    ) -> ContainerResult<BeanObject> {
        let processors = self.processors();
        let mut current_bean = bean;

        for processor in processors.iter() {
            current_bean = processor.post_process_before_initialization(current_bean, bean_name)?;
        }

        Ok(current_bean)
    }

    /// 应用 post_process_after_initialization
    pub fn apply_after_initialization(
        &self,
        bean: BeanObject,
        bean_name: &str,
    ) -> ContainerResult<BeanObject> {
        let processors = self.processors();
        let mut current_bean = bean;

        for processor in processors.iter() {
            tracing::trace!("Applying '{}' to bean '{}'", processor.name(), bean_name);
            current_bean = processor.post_process_after_initialization(current_bean, bean_name)?;
        }

        Ok(current_bean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContainerError;
    use parking_lot::Mutex;

    struct Recording {
        label: &'static str,
        order: i32,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl BeanPostProcessor for Recording {
        fn post_process_after_initialization(
            &self,
            bean: BeanObject,
            bean_name: &str,
        ) -> ContainerResult<BeanObject> {
            self.log.lock().push(format!("{}:{}", self.label, bean_name));
            Ok(bean)
        }

        fn name(&self) -> &str {
            self.label
        }

        fn order(&self) -> i32 {
            self.order
        }
    }

    struct Replacing;

    impl BeanPostProcessor for Replacing {
        fn post_process_after_initialization(
            &self,
            _bean: BeanObject,
            _bean_name: &str,
        ) -> ContainerResult<BeanObject> {
            Ok(Arc::new(String::from("replaced")))
        }
    }

    struct Failing;

    impl BeanPostProcessor for Failing {
        fn post_process_before_initialization(
            &self,
            _bean: BeanObject,
            bean_name: &str,
        ) -> ContainerResult<BeanObject> {
            Err(ContainerError::PostProcessorFailed {
                processor: "Failing".to_string(),
                bean_name: bean_name.to_string(),
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn test_processors_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let processors = BeanPostProcessors::new();
        processors.add(Arc::new(Recording { label: "late", order: 2000, log: log.clone() }));
        processors.add(Arc::new(Recording { label: "early", order: 10, log: log.clone() }));
        processors.add(Arc::new(Recording { label: "default", order: 1000, log: log.clone() }));

        processors
            .apply_after_initialization(Arc::new(1_u32), "counter")
            .unwrap();

        assert_eq!(
            *log.lock(),
            vec!["early:counter", "default:counter", "late:counter"]
        );
        assert_eq!(processors.len(), 3);
    }

    #[test]
    fn test_processor_can_replace_bean() {
        let processors = BeanPostProcessors::new();
        processors.add(Arc::new(Replacing));

        let bean = processors
            .apply_after_initialization(Arc::new(42_u32), "answer")
            .unwrap();

        assert_eq!(bean.downcast_ref::<String>().unwrap(), "replaced");
    }

    #[test]
    fn test_failure_stops_processing() {
        let processors = BeanPostProcessors::new();
        processors.add(Arc::new(Failing));

        let err = processors
            .apply_before_initialization(Arc::new(()), "broken")
            .unwrap_err();

        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_default_hooks_pass_through() {
        struct Noop;
        impl BeanPostProcessor for Noop {}

        let noop = Noop;
        let bean: BeanObject = Arc::new(7_i64);
        let same = noop.post_process_before_initialization(bean.clone(), "seven").unwrap();

        assert!(Arc::ptr_eq(&bean, &same));
        assert_eq!(noop.order(), 1000);
        assert_eq!(noop.name(), "BeanPostProcessor");
    }
}
