use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use collegium::config::AppConfig;
use collegium::workflows::identity::{
    ConsoleMailer, IdentityService, InMemoryDirectory, InMemoryTokenVault, TokenKeys,
};
use collegium::workflows::listings::{InMemoryListingStore, ListingService};
use collegium::workflows::media::FsImageStore;
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type PortalIdentityService =
    IdentityService<InMemoryDirectory, InMemoryTokenVault, ConsoleMailer>;
pub(crate) type PortalListingService =
    ListingService<InMemoryListingStore, InMemoryDirectory, FsImageStore>;

pub(crate) struct PortalServices {
    pub(crate) identity: Arc<PortalIdentityService>,
    pub(crate) listings: Arc<PortalListingService>,
    pub(crate) keys: TokenKeys,
}

/// Wires both workflow services over in-memory stores, sharing one
/// principal directory so listings can resolve submitters.
pub(crate) fn build_services(config: &AppConfig) -> PortalServices {
    let keys = TokenKeys::new(&config.auth);
    let directory = Arc::new(InMemoryDirectory::default());

    let identity = Arc::new(IdentityService::new(
        directory.clone(),
        Arc::new(InMemoryTokenVault::default()),
        Arc::new(ConsoleMailer),
        keys.clone(),
    ));
    let listings = Arc::new(ListingService::new(
        Arc::new(InMemoryListingStore::default()),
        directory,
        Arc::new(FsImageStore::new(&config.uploads)),
        config.review.clone(),
    ));

    PortalServices {
        identity,
        listings,
        keys,
    }
}
