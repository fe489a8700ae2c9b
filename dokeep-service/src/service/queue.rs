use serde::Serialize;

use super::{DokeepService, OwnerId};
use crate::db::{QueueRow, QueueStats};
use crate::error::ServiceResult;

/// Full queue page: pending rows plus counts
#[derive(Debug, Clone, Serialize)]
pub struct QueueView {
    pub rows: Vec<QueueRow>,
    pub stats: QueueStats,
}

impl DokeepService {
    pub fn queue(&self, owner: &OwnerId) -> ServiceResult<QueueView> {
        Ok(QueueView {
            rows: self.queue_rows(owner)?,
            stats: self.queue_stats(owner)?,
        })
    }

    /// Rows only, for polling
    pub fn queue_rows(&self, owner: &OwnerId) -> ServiceResult<Vec<QueueRow>> {
        self.db.queue_rows(owner.as_str())
    }

    pub fn queue_stats(&self, owner: &OwnerId) -> ServiceResult<QueueStats> {
        self.db.queue_stats(owner.as_str())
    }
}
