use chimera_aop::prelude::*;
use chimera_core::{BeanObject, BeanPostProcessors};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

// ==================== 错误 ====================

#[derive(Debug, Error)]
enum ShopError {
    #[error("out of stock: {item}")]
    OutOfStock { item: String },

    #[error("pricing backend unavailable")]
    PricingUnavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==================== 接口 ====================

#[proxy_interface]
trait OrderApi: Send + Sync {
    fn place_order(&self, item: String, quantity: u32) -> Result<u64, ShopError>;
}

#[proxy_interface]
trait Pricing: Send + Sync {
    fn quote(&self, item: String) -> Result<u32, ShopError>;
}

// ==================== 服务 ====================

struct OrderService {
    next_id: AtomicU32,
}

impl OrderApi for OrderService {
    fn place_order(&self, item: String, quantity: u32) -> Result<u64, ShopError> {
        if quantity == 0 {
            return Err(ShopError::OutOfStock { item });
        }
        Ok(u64::from(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

struct InventoryService {
    stock: AtomicU32,
}

#[aop_class]
impl InventoryService {
    pub fn reserve(&self, item: String, quantity: u32) -> Result<u32, ShopError> {
        let stock = self.stock.load(Ordering::SeqCst);
        if quantity > stock {
            return Err(ShopError::OutOfStock { item });
        }
        self.stock.store(stock - quantity, Ordering::SeqCst);
        Ok(stock - quantity)
    }
}

/// 偶尔失败的报价服务，由对象池提供
struct PricingClient {
    calls: AtomicUsize,
    base: u32,
}

impl Pricing for PricingClient {
    fn quote(&self, item: String) -> Result<u32, ShopError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            return Err(ShopError::PricingUnavailable);
        }
        Ok(self.base + item.len() as u32)
    }
}

// ==================== 类型注册 ====================

fn order_service_class() -> TargetClass {
    TargetClass::of::<OrderService>()
        .implements(OrderApiProxy::binding::<OrderService>())
        .build()
}

fn inventory_service_class() -> TargetClass {
    TargetClass::of_class::<InventoryService>().build()
}

chimera_aop::inventory::submit! {
    TargetClassRegistration::new("OrderService", order_service_class)
}

chimera_aop::inventory::submit! {
    TargetClassRegistration::new("InventoryService", inventory_service_class)
}

// ==================== 公共通知器 ====================

fn resolve_interceptor(name: &str) -> Option<Arc<dyn Advisor>> {
    let advice = match name {
        "trace" => Advice::interceptor(TraceInterceptor::new().with_args()),
        "slowCalls" => Advice::interceptor(PerformanceMonitorInterceptor::new(Duration::from_millis(50))),
        "exceptions" => Advice::AfterThrowing(Arc::new(ExceptionLoggingAdvice)),
        _ => return None,
    };
    Some(DefaultPointcutAdvisor::global(advice).with_name(name).into_advisor())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(env_filter).with_target(false).compact().try_init();
}

fn load_properties() -> anyhow::Result<AopProperties> {
    let config_paths = ["demos/aop-demo/application.toml", "application.toml"];
    match config_paths.iter().find(|path| std::path::Path::new(path).exists()) {
        Some(path) => Ok(AopProperties::from_file(path)?),
        None => {
            tracing::warn!("⚠️ application.toml not found, using default AOP properties");
            Ok(AopProperties::default())
        }
    }
}

fn auto_proxy_demo(properties: &AopProperties) -> anyhow::Result<()> {
    println!("\n── Auto proxy by bean name ──────────────────────────");

    let processors = BeanPostProcessors::new();
    processors.add(Arc::new(BeanNameAutoProxyCreator::from_properties(
        properties,
        resolve_interceptor,
    )?));

    let order_bean: BeanObject = Arc::new(OrderService {
        next_id: AtomicU32::new(1000),
    });
    let inventory_bean: BeanObject = Arc::new(InventoryService {
        stock: AtomicU32::new(10),
    });

    let order_bean = processors.apply_after_initialization(order_bean, "orderService")?;
    let inventory_bean = processors.apply_after_initialization(inventory_bean, "inventoryService")?;

    let orders = order_bean
        .downcast_ref::<Proxy>()
        .ok_or_else(|| anyhow::anyhow!("orderService was not proxied"))?
        .as_interface::<dyn OrderApi>()?;
    let inventory = inventory_bean
        .downcast_ref::<Proxy>()
        .ok_or_else(|| anyhow::anyhow!("inventoryService was not proxied"))?
        .as_class::<InventoryService>()?;

    println!("order id: {}", orders.place_order("keyboard".to_string(), 1)?);
    println!("stock left: {}", inventory.reserve("keyboard".to_string(), 3)?);

    if let Err(e) = inventory.reserve("keyboard".to_string(), 100) {
        println!("expected failure: {}", e);
    }
    Ok(())
}

fn pooled_retry_demo() -> anyhow::Result<()> {
    println!("\n── Pooled target with retry ─────────────────────────");

    let class = TargetClass::of::<PricingClient>()
        .implements(PricingProxy::binding::<PricingClient>())
        .build();
    let pool = Arc::new(PooledTargetSource::new(class, 2, || {
        Ok(PricingClient {
            calls: AtomicUsize::new(0),
            base: 100,
        })
    })?);

    let mut factory = ProxyFactory::new(pool.clone());
    factory.add_advice(Advice::interceptor(
        RetryInterceptor::new(3).retry_if(|e| e.to_string().contains("unavailable")),
    ))?;
    factory.add_advice(Advice::before(|jp| {
        tracing::info!("🔷 quoting {}", jp.arguments().get::<String>(0).map(String::as_str).unwrap_or("?"));
        Ok(())
    }))?;
    factory.freeze();

    let pricing = factory.get_interface_proxy::<dyn Pricing>()?;
    println!("quote: {}", pricing.quote("monitor".to_string())?);
    println!("pool idle={} active={}", pool.idle_count(), pool.active_count());
    Ok(())
}

fn hot_swap_demo() -> anyhow::Result<()> {
    println!("\n── Hot swappable target ─────────────────────────────");

    let source = Arc::new(HotSwappableTargetSource::new(
        Arc::new(OrderService {
            next_id: AtomicU32::new(1),
        }),
        order_service_class(),
    )?);
    let orders = ProxyFactory::new(source.clone()).get_interface_proxy::<dyn OrderApi>()?;
    println!("before swap: {}", orders.place_order("mouse".to_string(), 1)?);

    source.swap(Arc::new(OrderService {
        next_id: AtomicU32::new(5000),
    }))?;
    println!("after swap: {}", orders.place_order("mouse".to_string(), 1)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║          Chimera AOP - Interception Demo           ║");
    println!("╚════════════════════════════════════════════════════╝");

    let properties = load_properties()?;
    auto_proxy_demo(&properties)?;

    // 代理调用是同步的，放到阻塞线程池中执行
    tokio::task::spawn_blocking(pooled_retry_demo).await??;
    hot_swap_demo()?;

    println!("\n✅ Demo finished");
    Ok(())
}
