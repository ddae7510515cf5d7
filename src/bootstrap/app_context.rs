use std::sync::Arc;

use futures_util::{StreamExt, stream::BoxStream};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::application::ports::document_store::DocumentStore;
use crate::application::ports::object_store::ObjectStore;
use crate::application::ports::revalidation_port::{RevalidationPort, RevalidationSignal};
use crate::application::ports::user_directory::UserDirectory;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

#[derive(Clone)]
pub struct AppServices {
    document_store: Arc<dyn DocumentStore>,
    object_store: Arc<dyn ObjectStore>,
    user_directory: Arc<dyn UserDirectory>,
    revalidator: Arc<dyn RevalidationPort>,
    revalidation_events: broadcast::Sender<RevalidationSignal>,
}

impl AppServices {
    pub fn new(
        document_store: Arc<dyn DocumentStore>,
        object_store: Arc<dyn ObjectStore>,
        user_directory: Arc<dyn UserDirectory>,
        revalidator: Arc<dyn RevalidationPort>,
        revalidation_events: broadcast::Sender<RevalidationSignal>,
    ) -> Self {
        Self {
            document_store,
            object_store,
            user_directory,
            revalidator,
            revalidation_events,
        }
    }
}

impl AppContext {
    pub fn new(cfg: Config, services: AppServices) -> Self {
        Self {
            cfg,
            services: Arc::new(services),
        }
    }

    pub fn document_store(&self) -> Arc<dyn DocumentStore> {
        self.services.document_store.clone()
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.services.object_store.clone()
    }

    pub fn user_directory(&self) -> Arc<dyn UserDirectory> {
        self.services.user_directory.clone()
    }

    pub fn revalidator(&self) -> Arc<dyn RevalidationPort> {
        self.services.revalidator.clone()
    }

    /// Revalidation signals published after this call. Lagged receivers skip
    /// what they missed.
    pub fn subscribe_revalidation(&self) -> BoxStream<'static, RevalidationSignal> {
        BroadcastStream::new(self.services.revalidation_events.subscribe())
            .filter_map(|res| async move { res.ok() })
            .boxed()
    }
}
