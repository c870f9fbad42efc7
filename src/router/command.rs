//! Command request router
//!
//! Operations scoped to the running command itself: metadata shown on its root
//! item, resolved preference values, and launching sibling commands.

use std::sync::Arc;

use super::RouteOutcome;
use crate::error::DomainError;
use crate::protocol::{CommandRequest, CommandResponse, ResponsePayload};
use crate::services::RootItemManager;

pub struct CommandRouter {
    root_items: Arc<dyn RootItemManager>,
    /// Root item id of the loaded command, `extension.{extension}.{command}`
    unique_id: String,
}

impl CommandRouter {
    pub fn new(root_items: Arc<dyn RootItemManager>, unique_id: String) -> Self {
        Self {
            root_items,
            unique_id,
        }
    }

    pub async fn route(&self, req: CommandRequest) -> Result<RouteOutcome, DomainError> {
        match req {
            CommandRequest::UpdateMetadata { subtitle } => {
                self.root_items
                    .set_subtitle_override(&self.unique_id, subtitle);
                RouteOutcome::immediate(ResponsePayload::Command(CommandResponse::Ack))
            }
            CommandRequest::GetPreferenceValues => {
                let values = self.root_items.preference_values(&self.unique_id);
                RouteOutcome::immediate(ResponsePayload::Command(
                    CommandResponse::PreferenceValues { values },
                ))
            }
            CommandRequest::Launch { command_id } => {
                if !self.root_items.launch(&command_id) {
                    return Err(DomainError::not_found(format!(
                        "no launchable command '{command_id}'"
                    )));
                }
                RouteOutcome::immediate(ResponsePayload::Command(CommandResponse::Ack))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::services::memory::MemoryRootItems;
    use serde_json::json;
    use std::collections::HashMap;

    fn router(root_items: Arc<MemoryRootItems>) -> CommandRouter {
        CommandRouter::new(root_items, "extension.demo.search".to_string())
    }

    #[tokio::test]
    async fn test_update_metadata_sets_subtitle_override() {
        let items = Arc::new(MemoryRootItems::default());
        let router = router(items.clone());

        router
            .route(CommandRequest::UpdateMetadata {
                subtitle: Some("3 open issues".into()),
            })
            .await
            .unwrap();
        assert_eq!(
            items.subtitle_override("extension.demo.search"),
            Some(Some("3 open issues".into()))
        );

        // A null subtitle clears the override rather than being ignored
        router
            .route(CommandRequest::UpdateMetadata { subtitle: None })
            .await
            .unwrap();
        assert_eq!(
            items.subtitle_override("extension.demo.search"),
            Some(None)
        );
    }

    #[tokio::test]
    async fn test_preference_values_resolve_by_unique_id() {
        let items = Arc::new(MemoryRootItems::default());
        items.set_preference_values(
            "extension.demo.search",
            HashMap::from([("token".to_string(), json!("abc"))]),
        );
        let router = router(items);

        match router
            .route(CommandRequest::GetPreferenceValues)
            .await
            .unwrap()
        {
            RouteOutcome::Immediate(ResponsePayload::Command(
                CommandResponse::PreferenceValues { values },
            )) => assert_eq!(values.get("token"), Some(&json!("abc"))),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_launch_unknown_command_is_not_found() {
        let items = Arc::new(MemoryRootItems::default());
        items.register_launchable("known");
        let router = router(items.clone());

        router
            .route(CommandRequest::Launch {
                command_id: "known".into(),
            })
            .await
            .unwrap();
        assert_eq!(items.launches(), vec!["known".to_string()]);

        let err = router
            .route(CommandRequest::Launch {
                command_id: "missing".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
