//! Classifier training from the tagged corpus.

use std::collections::HashMap;

use tracing::{error, info};

use super::DokeepService;
use crate::error::{ServiceError, ServiceResult, format_error_chain};
use crate::processing::TrainingSet;

/// Group (content, tag) rows into one entry per distinct content, keeping
/// first-seen order
fn group_training_rows(rows: Vec<(String, String)>) -> TrainingSet {
    let mut set = TrainingSet::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (content, tag) in rows {
        match index.get(&content) {
            Some(&i) => {
                if !set.tags[i].contains(&tag) {
                    set.tags[i].push(tag);
                }
            }
            None => {
                index.insert(content.clone(), set.documents.len());
                set.documents.push(content);
                set.tags.push(vec![tag]);
            }
        }
    }

    set
}

impl DokeepService {
    /// Send every tagged document's content to the classifier. Uses the
    /// whole corpus, not one owner's. Returns the number of samples sent.
    pub async fn train(&self) -> ServiceResult<usize> {
        let set = group_training_rows(self.db.training_rows()?);
        if set.documents.is_empty() {
            return Err(ServiceError::InvalidRequest {
                message: "No tagged documents with content to train on".to_string(),
            });
        }

        if let Err(e) = self.backend.train(&set).await {
            error!(error = %format_error_chain(&e), "Classifier training failed");
            return Err(e.into());
        }

        info!(samples = set.documents.len(), "Classifier training initiated");
        Ok(set.documents.len())
    }
}
