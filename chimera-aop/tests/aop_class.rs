//! 子类代理（`#[aop_class]`）的端到端测试

use chimera_aop::prelude::*;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: u64, requested: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[proxy_interface]
pub trait Auditable: Send + Sync {
    fn audit_id(&self) -> Result<String, BankError>;
}

pub struct AccountService {
    balance: AtomicU64,
}

#[aop_class]
impl AccountService {
    pub fn new(balance: u64) -> Self {
        Self {
            balance: AtomicU64::new(balance),
        }
    }

    /// 取款
    pub fn withdraw(&self, amount: u64) -> Result<u64, BankError> {
        let balance = self.balance.load(Ordering::SeqCst);
        if amount > balance {
            return Err(BankError::InsufficientFunds {
                balance,
                requested: amount,
            });
        }
        self.balance.store(balance - amount, Ordering::SeqCst);
        Ok(balance - amount)
    }

    pub fn balance(&self) -> Result<u64, BankError> {
        Ok(self.balance.load(Ordering::SeqCst))
    }

    pub fn describe(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.balance.load(Ordering::SeqCst))
    }

    fn internal(&self) -> Result<(), BankError> {
        Ok(())
    }
}

impl Auditable for AccountService {
    fn audit_id(&self) -> Result<String, BankError> {
        self.internal()?;
        Ok("account-1".to_string())
    }
}

pub struct VaultService;

#[aop_class(sealed)]
impl VaultService {
    pub fn open(&self) -> Result<bool, BankError> {
        Ok(true)
    }
}

impl Auditable for VaultService {
    fn audit_id(&self) -> Result<String, BankError> {
        Ok("vault".to_string())
    }
}

fn account_class() -> TargetClass {
    TargetClass::of_class::<AccountService>()
        .implements(AuditableProxy::binding::<AccountService>())
        .build()
}

#[test]
fn test_only_proxiable_methods_are_generated() {
    let names: Vec<_> = AccountServiceProxy::METHODS.iter().map(|m| m.name()).collect();

    assert_eq!(names, vec!["withdraw", "balance"]);
    assert_eq!(AccountServiceProxy::WITHDRAW.signature(), "AccountService::withdraw(u64)");
    assert!(!<VaultService as ProxyClass>::descriptor().methods().is_empty());
    assert!(<VaultService as ProxyClass>::descriptor().is_sealed());
}

#[test]
fn test_class_proxy_intercepts_public_methods() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut factory = ProxyFactory::for_target(Arc::new(AccountService::new(100)), account_class()).unwrap();
    factory.set_proxy_target_class(true).unwrap();

    let counter = calls.clone();
    factory
        .add_advisor(
            DefaultPointcutAdvisor::name_match(
                ["withdraw"],
                Advice::before(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .into_advisor(),
        )
        .unwrap();

    let account = factory.get_class_proxy::<AccountService>().unwrap();
    assert_eq!(account.aop_proxy().strategy(), ProxyStrategy::SubclassGeneration);

    assert_eq!(account.withdraw(30).unwrap(), 70);
    assert_eq!(account.balance().unwrap(), 70);
    assert!(matches!(
        account.withdraw(500),
        Err(BankError::InsufficientFunds { balance: 70, requested: 500 })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_class_proxy_also_exposes_interfaces() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut factory = ProxyFactory::for_target(Arc::new(AccountService::new(5)), account_class()).unwrap();
    factory.set_optimize(true).unwrap();
    factory
        .add_advice(Advice::after_returning(|jp, value| {
            if let Some(id) = value.downcast_ref::<String>() {
                tracing::info!("{} returned {}", jp.signature(), id);
            }
            Ok(())
        }))
        .unwrap();

    let proxy = factory.get_proxy().unwrap();
    let auditable = proxy.as_interface::<dyn Auditable>().unwrap();

    assert_eq!(auditable.audit_id().unwrap(), "account-1");
    assert_eq!(proxy.as_class::<AccountService>().unwrap().balance().unwrap(), 5);
}

#[test]
fn test_interface_proxy_is_not_a_class_proxy() {
    let factory = ProxyFactory::for_target(Arc::new(AccountService::new(5)), account_class()).unwrap();
    let proxy = factory.get_proxy().unwrap();

    assert_eq!(proxy.strategy(), ProxyStrategy::InterfaceForwarding);
    assert!(matches!(
        proxy.as_class::<AccountService>(),
        Err(AopConfigError::NotAClassProxy { .. })
    ));
    assert!(matches!(
        proxy.invoke(&AccountServiceProxy::BALANCE, Arguments::new()),
        Err(ref e) if matches!(e.downcast_ref::<InvocationError>(), Some(InvocationError::MethodNotProxied { .. }))
    ));
}

#[test]
fn test_sealed_class_cannot_be_subclassed() {
    let class = TargetClass::of_class::<VaultService>()
        .implements(AuditableProxy::binding::<VaultService>())
        .build();

    let mut factory = ProxyFactory::for_target(Arc::new(VaultService), class).unwrap();
    let auditable = factory.get_interface_proxy::<dyn Auditable>().unwrap();
    assert_eq!(auditable.audit_id().unwrap(), "vault");

    factory.set_proxy_target_class(true).unwrap();
    assert!(matches!(
        factory.get_proxy(),
        Err(AopConfigError::NotSubclassable { type_name: "VaultService", .. })
    ));
}
