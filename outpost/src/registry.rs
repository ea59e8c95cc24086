//! The driver registry: one shared map from `(provider, runtime)` to a live
//! driver.
//!
//! The registry is an explicit object injected into dispatch, not process
//! globals. Registration happens during startup, lookups on every dispatch;
//! the mutex makes concurrent use safe regardless.

use std::collections::HashMap;
use std::sync::Arc;

use outpost_driver::{Config, Driver, Secrets, SetSecretsInput};
use parking_lot::Mutex;
use tokio::sync::OnceCell;

use crate::error::{DispatchError, RouterError};

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<Config, DriverHandle>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_tuple("Registry");
        for config in self.entries.lock().keys() {
            debug.field(&format_args!("{}/{}", config.provider, config.runtime));
        }
        debug.finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a driver for an environment. Re-registering replaces the
    /// entry (and resets its secrets latch).
    pub fn register(&self, config: Config, driver: Arc<dyn Driver>) {
        self.entries.lock().insert(config, DriverHandle::new(driver));
    }

    pub fn contains(&self, config: &Config) -> bool {
        self.entries.lock().contains_key(config)
    }

    /// Looks up the driver for an environment. A missing driver is a hard
    /// error surfaced at router-build time.
    pub fn get(&self, config: &Config) -> Result<DriverHandle, RouterError> {
        self.entries
            .lock()
            .get(config)
            .cloned()
            .ok_or_else(|| RouterError::DriverNotFound {
                provider: config.provider.clone(),
                runtime: config.runtime.clone(),
            })
    }
}

/// A registered driver plus its one-shot secrets latch.
#[derive(Clone)]
pub struct DriverHandle {
    driver: Arc<dyn Driver>,
    secrets_sent: Arc<OnceCell<Option<outpost_driver::Error>>>,
}

impl DriverHandle {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            secrets_sent: Arc::new(OnceCell::new()),
        }
    }

    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// Pushes the router's secrets to the driver exactly once, before the
    /// first dispatch call that reaches it. Concurrent callers wait for the
    /// single in-flight push.
    pub async fn ensure_secrets(&self, secrets: &Secrets) -> Result<(), DispatchError> {
        let driver = self.driver.clone();
        let secrets = secrets.clone();
        let result = self
            .secrets_sent
            .get_or_init(|| async move {
                driver
                    .set_secrets(SetSecretsInput { secrets })
                    .await
                    .error
            })
            .await;
        match result {
            None => Ok(()),
            Some(error) => Err(DispatchError::Secrets(error.message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use outpost_driver::*;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct CountingDriver {
        secrets_calls: AtomicUsize,
    }

    #[async_trait]
    impl Driver for CountingDriver {
        async fn set_secrets(&self, _input: SetSecretsInput) -> SetSecretsOutput {
            self.secrets_calls.fetch_add(1, Ordering::SeqCst);
            SetSecretsOutput { error: None }
        }

        async fn field_resolve(&self, _input: FieldResolveInput) -> FieldResolveOutput {
            FieldResolveOutput::default()
        }

        async fn interface_resolve_type(
            &self,
            _input: InterfaceResolveTypeInput,
        ) -> InterfaceResolveTypeOutput {
            InterfaceResolveTypeOutput::default()
        }

        async fn union_resolve_type(
            &self,
            _input: UnionResolveTypeInput,
        ) -> UnionResolveTypeOutput {
            UnionResolveTypeOutput::default()
        }

        async fn scalar_parse(&self, _input: ScalarParseInput) -> ScalarParseOutput {
            ScalarParseOutput::default()
        }

        async fn scalar_serialize(&self, _input: ScalarSerializeInput) -> ScalarSerializeOutput {
            ScalarSerializeOutput::default()
        }

        async fn authorize(&self, _input: AuthorizeInput) -> AuthorizeOutput {
            AuthorizeOutput::default()
        }

        async fn subscription_connection(
            &self,
            _input: SubscriptionConnectionInput,
        ) -> SubscriptionConnectionOutput {
            SubscriptionConnectionOutput::default()
        }

        async fn subscription_listen(
            &self,
            _input: SubscriptionListenInput,
        ) -> SubscriptionListenOutput {
            SubscriptionListenOutput::default()
        }

        async fn stream(&self, _input: StreamInput) -> StreamOutput {
            StreamOutput::default()
        }
    }

    #[tokio::test]
    async fn lookups_fail_for_unregistered_environments() {
        let registry = Registry::new();
        let err = registry
            .get(&Config::new("local", "grpc"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            crate::error::RouterError::DriverNotFound {
                provider: "local".to_string(),
                runtime: "grpc".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn secrets_are_pushed_once_per_driver() {
        let registry = Registry::new();
        let driver = Arc::new(CountingDriver::default());
        registry.register(Config::new("local", "grpc"), driver.clone());

        let handle = registry.get(&Config::new("local", "grpc")).unwrap();
        let secrets = Secrets::new();
        handle.ensure_secrets(&secrets).await.unwrap();
        handle.ensure_secrets(&secrets).await.unwrap();
        registry
            .get(&Config::new("local", "grpc"))
            .unwrap()
            .ensure_secrets(&secrets)
            .await
            .unwrap();
        assert_eq!(driver.secrets_calls.load(Ordering::SeqCst), 1);
    }
}
