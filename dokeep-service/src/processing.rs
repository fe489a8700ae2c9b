//! Client for the external processing services.
//!
//! The processing service provides OCR with thumbnails (`/process`), tag
//! prediction (`/predict`) and classifier training (`/train`); the LLM
//! service provides analysis (`/analyze`). Each stage has its own timeout.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::config::{ServicesConfig, StageTimeouts};
use crate::db::DocumentId;
use crate::error::{ExternalServiceError, ServiceError, ServiceResult};

/// One external processing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// OCR and thumbnail generation
    Process,
    Predict,
    Analyze,
    Train,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Process => "process",
            Stage::Predict => "predict",
            Stage::Analyze => "analyze",
            Stage::Train => "train",
        })
    }
}

/// Missing and null fields both become the type's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of a synchronous `/process` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OcrResult {
    #[serde(rename = "text", default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thumbnail_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extracted_date: String,
    /// Hash computed by the service; informational only
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_hash: String,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    document: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    content: &'a str,
    initial_tags: &'a [String],
}

/// Response of `/analyze`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub extracted_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
}

/// Body of `/train`: `tags[i]` are the labels of `documents[i]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrainingSet {
    pub documents: Vec<String>,
    pub tags: Vec<Vec<String>>,
}

/// The remote stages the pipeline depends on
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    /// OCR a file and render its thumbnail, waiting for the result
    async fn process(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<OcrResult, ExternalServiceError>;

    /// Hand a stored document to the processing service, which reports back
    /// through the processing callback
    async fn submit(
        &self,
        filename: &str,
        content: Vec<u8>,
        document_id: DocumentId,
    ) -> Result<(), ExternalServiceError>;

    /// Predict tags for extracted text
    async fn predict(&self, document: &str) -> Result<Vec<String>, ExternalServiceError>;

    /// Extract a date, refine tags and summarize
    async fn analyze(
        &self,
        content: &str,
        initial_tags: &[String],
    ) -> Result<AnalysisResult, ExternalServiceError>;

    async fn train(&self, set: &TrainingSet) -> Result<(), ExternalServiceError>;
}

/// HTTP implementation of [`ProcessingBackend`]
pub struct ProcessingClient {
    client: Client,
    processing_url: String,
    llm_url: String,
    timeouts: StageTimeouts,
}

impl ProcessingClient {
    pub fn new(config: &ServicesConfig) -> ServiceResult<Self> {
        // No client-wide timeout: every request sets its stage's own
        let client = Client::builder()
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            processing_url: config.processing_url(),
            llm_url: config.llm_url(),
            timeouts: config.timeouts.clone(),
        })
    }

    fn timeout_for(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Process => self.timeouts.process(),
            Stage::Predict => self.timeouts.predict(),
            Stage::Analyze => self.timeouts.analyze(),
            Stage::Train => self.timeouts.train(),
        }
    }

    fn url_for(&self, stage: Stage) -> String {
        let base = match stage {
            Stage::Analyze => &self.llm_url,
            _ => &self.processing_url,
        };
        format!("{}/{}", base, stage)
    }

    /// Send a stage request and require a 2xx status
    async fn send(
        &self,
        stage: Stage,
        build: impl FnOnce(&Client, &str) -> RequestBuilder,
    ) -> Result<Response, ExternalServiceError> {
        let url = self.url_for(stage);
        let after = self.timeout_for(stage);

        debug!(stage = %stage, url = %url, "Calling processing stage");

        let response = build(&self.client, &url)
            .timeout(after)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExternalServiceError::Timeout { stage, after }
                } else {
                    ExternalServiceError::Connection {
                        stage,
                        url: url.clone(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExternalServiceError::Status {
                stage,
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        stage: Stage,
        response: Response,
    ) -> Result<T, ExternalServiceError> {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                ExternalServiceError::Timeout {
                    stage,
                    after: self.timeout_for(stage),
                }
            } else {
                ExternalServiceError::InvalidResponse { stage, source: e }
            }
        })
    }
}

fn file_part(filename: &str, content: Vec<u8>) -> Part {
    Part::bytes(content).file_name(filename.to_string())
}

#[async_trait]
impl ProcessingBackend for ProcessingClient {
    async fn process(
        &self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<OcrResult, ExternalServiceError> {
        let form = Form::new().part("file", file_part(filename, content));
        let response = self
            .send(Stage::Process, |client, url| client.post(url).multipart(form))
            .await?;

        self.read_json(Stage::Process, response).await
    }

    async fn submit(
        &self,
        filename: &str,
        content: Vec<u8>,
        document_id: DocumentId,
    ) -> Result<(), ExternalServiceError> {
        let form = Form::new()
            .part("file", file_part(filename, content))
            .text("doc_id", document_id.to_string());
        self.send(Stage::Process, |client, url| client.post(url).multipart(form))
            .await?;

        Ok(())
    }

    async fn predict(&self, document: &str) -> Result<Vec<String>, ExternalServiceError> {
        let response = self
            .send(Stage::Predict, |client, url| {
                client.post(url).json(&PredictRequest { document })
            })
            .await?;

        let predicted: PredictResponse = self.read_json(Stage::Predict, response).await?;
        Ok(predicted.tags)
    }

    async fn analyze(
        &self,
        content: &str,
        initial_tags: &[String],
    ) -> Result<AnalysisResult, ExternalServiceError> {
        let response = self
            .send(Stage::Analyze, |client, url| {
                client.post(url).json(&AnalyzeRequest {
                    content,
                    initial_tags,
                })
            })
            .await?;

        self.read_json(Stage::Analyze, response).await
    }

    async fn train(&self, set: &TrainingSet) -> Result<(), ExternalServiceError> {
        self.send(Stage::Train, |client, url| client.post(url).json(set))
            .await?;

        Ok(())
    }
}
