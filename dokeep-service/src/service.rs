mod catalog;
mod documents;
mod ingestion;
mod pipeline;
mod queue;
mod state;
mod taxonomy;
mod training;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::{CatalogPage, CatalogQuery};
pub use ingestion::{Upload, UploadOutcome};
pub use pipeline::ProcessingReport;
pub use queue::QueueView;
pub use state::{Clock, OwnerId, SystemClock};

use std::sync::Arc;

use tracing::info;

use crate::config::ServiceConfig;
use crate::db::Database;
use crate::error::ServiceResult;
use crate::i18n::I18n;
use crate::processing::{ProcessingBackend, ProcessingClient};
use crate::storage::FileStore;

/// Main service coordinator
pub struct DokeepService {
    pub config: Arc<ServiceConfig>,
    pub db: Arc<Database>,
    pub files: Arc<FileStore>,
    pub backend: Arc<dyn ProcessingBackend>,
    pub clock: Arc<dyn Clock>,
    pub i18n: Arc<I18n>,
}

impl DokeepService {
    /// Create a service talking to the configured processing services
    pub fn new(config: ServiceConfig, db: Arc<Database>) -> ServiceResult<Self> {
        let files = Arc::new(FileStore::new(&config.storage.uploads_dir)?);
        let backend = Arc::new(ProcessingClient::new(&config.services)?);

        info!(
            processing_url = %config.services.processing_url(),
            llm_url = %config.services.llm_url(),
            shape = ?config.pipeline.shape,
            ai_enabled = config.pipeline.ai_enabled,
            "Processing services configured"
        );

        Ok(Self::with_parts(
            config,
            db,
            files,
            backend,
            Arc::new(SystemClock),
        ))
    }

    /// Assemble a service from explicit collaborators
    pub fn with_parts(
        config: ServiceConfig,
        db: Arc<Database>,
        files: Arc<FileStore>,
        backend: Arc<dyn ProcessingBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db,
            files,
            backend,
            clock,
            i18n: Arc::new(I18n::new()),
        }
    }
}
