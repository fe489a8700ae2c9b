//! Fakes shared by the service tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;

use super::{Clock, DokeepService, OwnerId, Upload};
use crate::config::{PipelineShape, ServiceConfig};
use crate::db::{Database, DocumentId};
use crate::error::ExternalServiceError;
use crate::processing::{AnalysisResult, OcrResult, ProcessingBackend, Stage, TrainingSet};
use crate::storage::FileStore;

/// Canned stage responses, with failures injected per stage
#[derive(Default)]
pub(crate) struct FakeBackend {
    pub ocr: OcrResult,
    pub predicted: Vec<String>,
    pub analysis: AnalysisResult,
    pub failing: Vec<Stage>,
    pub calls: Mutex<Vec<Stage>>,
    pub submitted: Mutex<Vec<DocumentId>>,
    pub trained: Mutex<Vec<TrainingSet>>,
}

impl FakeBackend {
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<DocumentId> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn trained(&self) -> Vec<TrainingSet> {
        self.trained.lock().unwrap().clone()
    }

    fn record(&self, stage: Stage) -> Result<(), ExternalServiceError> {
        self.calls.lock().unwrap().push(stage);
        if self.failing.contains(&stage) {
            return Err(ExternalServiceError::Status {
                stage,
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessingBackend for FakeBackend {
    async fn process(
        &self,
        _filename: &str,
        _content: Vec<u8>,
    ) -> Result<OcrResult, ExternalServiceError> {
        self.record(Stage::Process)?;
        Ok(self.ocr.clone())
    }

    async fn submit(
        &self,
        _filename: &str,
        _content: Vec<u8>,
        document_id: DocumentId,
    ) -> Result<(), ExternalServiceError> {
        self.record(Stage::Process)?;
        self.submitted.lock().unwrap().push(document_id);
        Ok(())
    }

    async fn predict(&self, _document: &str) -> Result<Vec<String>, ExternalServiceError> {
        self.record(Stage::Predict)?;
        Ok(self.predicted.clone())
    }

    async fn analyze(
        &self,
        _content: &str,
        _initial_tags: &[String],
    ) -> Result<AnalysisResult, ExternalServiceError> {
        self.record(Stage::Analyze)?;
        Ok(self.analysis.clone())
    }

    async fn train(&self, set: &TrainingSet) -> Result<(), ExternalServiceError> {
        self.record(Stage::Train)?;
        self.trained.lock().unwrap().push(set.clone());
        Ok(())
    }
}

/// Starts at a fixed instant and advances one second per reading, so
/// ingestion timestamps are distinct and increasing
pub(crate) struct TickingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl TickingClock {
    pub fn new() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + Duration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

pub(crate) struct Harness {
    pub service: DokeepService,
    pub backend: Arc<FakeBackend>,
    pub uploads: TempDir,
}

impl Harness {
    pub fn new(shape: PipelineShape, backend: FakeBackend) -> Self {
        let uploads = TempDir::new().unwrap();
        let mut config = ServiceConfig::default();
        config.pipeline.shape = shape;
        config.storage.uploads_dir = uploads.path().to_path_buf();

        let backend = Arc::new(backend);
        let service = DokeepService::with_parts(
            config,
            Arc::new(Database::open_in_memory().unwrap()),
            Arc::new(FileStore::new(uploads.path()).unwrap()),
            backend.clone(),
            Arc::new(TickingClock::new()),
        );

        Self {
            service,
            backend,
            uploads,
        }
    }

    /// Files currently in the uploads root, sorted
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.uploads.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

pub(crate) fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

pub(crate) fn upload(filename: &str, content: &[u8]) -> Upload {
    Upload {
        filename: filename.to_string(),
        content: content.to_vec(),
        title: String::new(),
        summary: None,
        created_date: None,
    }
}

/// Backend whose stages all succeed with plausible results
pub(crate) fn working_backend() -> FakeBackend {
    FakeBackend {
        ocr: OcrResult {
            content: "Municipal water invoice dated 2022-01-01".to_string(),
            thumbnail_path: String::new(),
            extracted_date: "2022-01-01T00:00:00".to_string(),
            file_hash: String::new(),
        },
        predicted: vec!["Invoice".to_string()],
        analysis: AnalysisResult {
            extracted_date: "2023-06-01T00:00:00".to_string(),
            tags: vec!["  Invoice ".to_string(), "Utilities".to_string()],
            summary: "Water bill for Q4".to_string(),
        },
        ..FakeBackend::default()
    }
}
