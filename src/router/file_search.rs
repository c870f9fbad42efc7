//! File search request router
//!
//! Always deferred: the scan runs behind the service boundary, off the event
//! thread, and resolves back through the correlation table.

use std::sync::Arc;

use super::{RouteFuture, RouteOutcome};
use crate::error::DomainError;
use crate::protocol::{FileSearchRequest, FileSearchResponse, ResponsePayload};
use crate::services::FileSearchService;

/// Result cap applied when the extension does not ask for one
const DEFAULT_MAX_RESULTS: usize = 100;

pub struct FileSearchRouter {
    files: Arc<dyn FileSearchService>,
}

impl FileSearchRouter {
    pub fn new(files: Arc<dyn FileSearchService>) -> Self {
        Self { files }
    }

    pub async fn route(&self, req: FileSearchRequest) -> Result<RouteOutcome, DomainError> {
        match req {
            FileSearchRequest::Search { query, max_results } => {
                if query.trim().is_empty() {
                    return Err(DomainError::invalid_argument("search query is empty"));
                }
                Ok(RouteOutcome::Deferred(self.search(
                    query,
                    max_results.unwrap_or(DEFAULT_MAX_RESULTS),
                )))
            }
        }
    }

    fn search(&self, query: String, max_results: usize) -> RouteFuture {
        let files = self.files.clone();
        Box::pin(async move {
            let files = files.search(&query, max_results).await;
            Ok(ResponsePayload::FileSearch(FileSearchResponse::Results {
                files,
            }))
        })
    }
}
