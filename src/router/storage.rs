//! Storage request router
//!
//! Key-value operations scoped to the owning extension's namespace. Reads on
//! absent keys answer `NotFound` rather than a null value, so extensions can
//! distinguish "unset" from "set to null".

use std::sync::Arc;

use super::RouteOutcome;
use crate::error::DomainError;
use crate::protocol::{ResponsePayload, StorageRequest, StorageResponse};
use crate::services::StorageBackend;

pub struct StorageRouter {
    storage: Arc<dyn StorageBackend>,
    namespace: String,
}

impl StorageRouter {
    pub fn new(storage: Arc<dyn StorageBackend>, extension_id: &str) -> Self {
        Self {
            storage,
            namespace: extension_id.to_string(),
        }
    }

    pub async fn route(&self, req: StorageRequest) -> Result<RouteOutcome, DomainError> {
        let response = match req {
            StorageRequest::Get { key } => match self.storage.get(&self.namespace, &key).await {
                Some(value) => StorageResponse::Value { value },
                None => {
                    return Err(DomainError::not_found(format!(
                        "no stored value for key '{key}'"
                    )))
                }
            },
            StorageRequest::Set { key, value } => {
                self.storage.set(&self.namespace, &key, value).await;
                StorageResponse::Ack
            }
            StorageRequest::Remove { key } => {
                let removed = self.storage.remove(&self.namespace, &key).await;
                StorageResponse::Removed { removed }
            }
            StorageRequest::Clear => {
                self.storage.clear(&self.namespace).await;
                StorageResponse::Ack
            }
            StorageRequest::List => {
                let mut keys = self.storage.keys(&self.namespace).await;
                keys.sort();
                StorageResponse::Keys { keys }
            }
        };

        RouteOutcome::immediate(ResponsePayload::Storage(response))
    }
}
