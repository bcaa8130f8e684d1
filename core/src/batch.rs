//! Batch queue: URIs accumulated between `batch_start` and `batch_end`.

use crate::error::{Result, WorkfrontError};
use crate::uri::Params;

/// Path of the server endpoint that executes a queued batch.
pub const PATH_BATCH: &str = "/batch";

/// Prepared URIs waiting to be flushed as one batch request.
///
/// The client holds `Option<BatchQueue>`: the queue exists exactly while
/// batch mode is active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchQueue {
    uris: Vec<String>,
    atomic: bool,
}

impl BatchQueue {
    pub fn new(atomic: bool) -> Self {
        Self {
            uris: Vec::new(),
            atomic,
        }
    }

    pub fn push(&mut self, uri: String) {
        self.uris.push(uri);
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    /// Parameters for the flush request: `atomic=true` when requested, then
    /// one `uri` pair per queued call in call order.
    pub fn into_params(self) -> Result<Params> {
        if self.uris.is_empty() {
            return Err(WorkfrontError::EmptyBatch);
        }
        let mut params = Params::new();
        if self.atomic {
            params.push("atomic", true);
        }
        params.push("uri", self.uris);
        Ok(params)
    }
}
