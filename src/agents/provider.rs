//! Process-wide, lazily constructed generation capability.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use super::{CapabilityFactory, GenerationCapability, GenerationError};

/// Hands out the shared capability, constructing it on first use.
///
/// Construction is serialized so concurrent first requests connect once. A
/// failed attempt is remembered for `/health` and retried on the next access.
/// A capability whose credentials stop being accepted is dropped through
/// [`report_failure`](Self::report_failure) and rebuilt on the next access.
pub struct CapabilityProvider {
    factory: Box<dyn CapabilityFactory>,
    capability: RwLock<Option<Arc<dyn GenerationCapability>>>,
    init_lock: Mutex<()>,
    init_error: RwLock<Option<String>>,
}

/// Readiness snapshot for health reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStatus {
    pub ready: bool,
    pub init_error: Option<String>,
}

impl CapabilityProvider {
    pub fn new(factory: Box<dyn CapabilityFactory>) -> Self {
        Self {
            factory,
            capability: RwLock::new(None),
            init_lock: Mutex::new(()),
            init_error: RwLock::new(None),
        }
    }

    /// Provider around an already constructed capability.
    pub fn ready(capability: Arc<dyn GenerationCapability>) -> Self {
        let provider = Self::new(Box::new(FixedFactory(capability.clone())));
        *provider.capability.write() = Some(capability);
        provider
    }

    pub async fn get(&self) -> Result<Arc<dyn GenerationCapability>, GenerationError> {
        if let Some(capability) = self.capability.read().clone() {
            return Ok(capability);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(capability) = self.capability.read().clone() {
            return Ok(capability);
        }

        match self.factory.connect().await {
            Ok(capability) => {
                log::info!("Generation capability initialised");
                *self.capability.write() = Some(capability.clone());
                *self.init_error.write() = None;
                Ok(capability)
            }
            Err(e) => {
                let message = e.to_string();
                log::error!("Generation capability initialisation failed: {}", message);
                *self.init_error.write() = Some(message.clone());
                Err(GenerationError::Unavailable(message))
            }
        }
    }

    /// Forget the shared capability if `error` shows its credentials were
    /// refused. Other errors leave it in place.
    pub fn report_failure(&self, error: &GenerationError) {
        if !error.is_auth_failure() {
            return;
        }
        if self.capability.write().take().is_some() {
            log::warn!("Dropping generation capability after auth failure: {}", error);
        }
        *self.init_error.write() = Some(error.to_string());
    }

    pub fn status(&self) -> ProviderStatus {
        ProviderStatus {
            ready: self.capability.read().is_some(),
            init_error: self.init_error.read().clone(),
        }
    }
}

struct FixedFactory(Arc<dyn GenerationCapability>);

#[async_trait]
impl CapabilityFactory for FixedFactory {
    async fn connect(&self) -> Result<Arc<dyn GenerationCapability>, GenerationError> {
        Ok(self.0.clone())
    }
}
