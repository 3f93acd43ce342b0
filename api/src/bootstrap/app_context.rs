use std::sync::Arc;

use crate::application::ports::blob_storage::BlobStorage;
use crate::application::services::attachments::AttachmentResolver;
use crate::bootstrap::config::Config;

#[derive(Clone)]
pub struct AppContext {
    pub cfg: Config,
    services: Arc<AppServices>,
}

pub struct AppServices {
    attachments: AttachmentResolver,
    blob_storage: Arc<dyn BlobStorage>,
}

impl AppServices {
    pub fn new(attachments: AttachmentResolver, blob_storage: Arc<dyn BlobStorage>) -> Self {
        Self {
            attachments,
            blob_storage,
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

    pub fn attachments(&self) -> &AttachmentResolver {
        &self.services.attachments
    }

    pub fn blob_storage(&self) -> Arc<dyn BlobStorage> {
        self.services.blob_storage.clone()
    }
}
