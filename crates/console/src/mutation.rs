//! Create/update dispatch and list invalidation.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use backoffice_core::ResourceFamily;

use crate::api::{ApiError, ConsoleApi};
use crate::family::Family;

const BUS_CAPACITY: usize = 16;

/// Publish/subscribe channel announcing that a family's server state changed.
///
/// Mounted list controllers subscribe and refetch with their current query
/// when their own family is announced.
#[derive(Debug, Clone)]
pub struct InvalidationBus {
    sender: broadcast::Sender<ResourceFamily>,
}

impl InvalidationBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Mark every list of `family` stale.
    pub fn publish(&self, family: ResourceFamily) {
        match self.sender.send(family) {
            Ok(listeners) => debug!(%family, listeners, "Invalidated list data"),
            Err(_) => debug!(%family, "Invalidated list data with no mounted list"),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceFamily> {
        self.sender.subscribe()
    }
}

impl Default for InvalidationBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Performs writes for one family and invalidates its lists on success.
///
/// No local list data is touched; the refetch triggered by the invalidation
/// is the only source of updated list contents.
pub struct MutationCoordinator<F: Family, A: ConsoleApi> {
    api: Arc<A>,
    bus: InvalidationBus,
    _family: PhantomData<fn() -> F>,
}

impl<F: Family, A: ConsoleApi> Clone for MutationCoordinator<F, A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            bus: self.bus.clone(),
            _family: PhantomData,
        }
    }
}

impl<F: Family, A: ConsoleApi> MutationCoordinator<F, A> {
    #[must_use]
    pub const fn new(api: Arc<A>, bus: InvalidationBus) -> Self {
        Self {
            api,
            bus,
            _family: PhantomData,
        }
    }

    /// Create a record. Lists are invalidated only when the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged; nothing is invalidated.
    #[instrument(skip_all, fields(family = F::FAMILY.as_str()))]
    pub async fn create(&self, payload: &F::Payload) -> Result<F::Record, ApiError> {
        let record = F::create(self.api.as_ref(), payload).await?;
        info!(id = %F::record_id(&record), "Record created");
        self.bus.publish(F::FAMILY);
        Ok(record)
    }

    /// Update record `id`. Lists are invalidated only when the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns the API error unchanged; nothing is invalidated.
    #[instrument(skip(self, payload), fields(family = F::FAMILY.as_str()))]
    pub async fn update(&self, id: F::Id, payload: &F::Payload) -> Result<F::Record, ApiError> {
        let record = F::update(self.api.as_ref(), id, payload).await?;
        info!("Record updated");
        self.bus.publish(F::FAMILY);
        Ok(record)
    }
}
