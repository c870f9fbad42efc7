//! Application request router

use std::sync::Arc;

use super::RouteOutcome;
use crate::error::DomainError;
use crate::protocol::{AppRequest, AppResponse, ResponsePayload};
use crate::services::AppService;

pub struct AppRouter {
    apps: Arc<dyn AppService>,
}

impl AppRouter {
    pub fn new(apps: Arc<dyn AppService>) -> Self {
        Self { apps }
    }

    pub async fn route(&self, req: AppRequest) -> Result<RouteOutcome, DomainError> {
        let response = match req {
            AppRequest::List { target } => {
                let apps = match target {
                    Some(target) => self.apps.find_openers(&target),
                    None => self.apps.list(),
                };
                AppResponse::List { apps }
            }
            AppRequest::GetDefault { target } => AppResponse::Default {
                app: self.apps.find_default_opener(&target),
            },
            AppRequest::Open { target, app_id } => {
                let app = match app_id {
                    Some(id) => self.apps.find_by_id(&id).ok_or_else(|| {
                        DomainError::not_found(format!("no application with id '{id}'"))
                    })?,
                    None => self.apps.find_default_opener(&target).ok_or_else(|| {
                        DomainError::not_found(format!("no application can open '{target}'"))
                    })?,
                };
                if !self.apps.launch(&app, &[target]) {
                    return Err(DomainError::internal(format!(
                        "failed to launch '{}'",
                        app.id
                    )));
                }
                AppResponse::Ack
            }
        };

        RouteOutcome::immediate(ResponsePayload::App(response))
    }
}
