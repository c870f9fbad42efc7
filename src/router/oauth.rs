//! OAuth request router
//!
//! Token storage is immediate; the consent flow is deferred since it waits on
//! the user and the provider redirect.

use std::sync::Arc;

use super::{RouteFuture, RouteOutcome};
use crate::error::DomainError;
use crate::protocol::{OauthRequest, OauthResponse, ResponsePayload};
use crate::services::{OauthAuthorizeRequest, OauthBroker};

pub struct OauthRouter {
    broker: Arc<dyn OauthBroker>,
    extension_id: String,
}

impl OauthRouter {
    pub fn new(broker: Arc<dyn OauthBroker>, extension_id: String) -> Self {
        Self {
            broker,
            extension_id,
        }
    }

    pub async fn route(&self, req: OauthRequest) -> Result<RouteOutcome, DomainError> {
        match req {
            OauthRequest::Authorize {
                provider_name,
                url,
                description,
            } => Ok(RouteOutcome::Deferred(self.authorize(
                OauthAuthorizeRequest {
                    provider_name,
                    url,
                    description,
                },
            ))),
            OauthRequest::GetTokens { provider_id } => {
                let tokens = self
                    .broker
                    .tokens(&self.extension_id, &provider_id)
                    .await
                    .ok_or_else(|| {
                        DomainError::not_found(format!("no tokens stored for '{provider_id}'"))
                    })?;
                RouteOutcome::immediate(ResponsePayload::Oauth(OauthResponse::Tokens { tokens }))
            }
            OauthRequest::SetTokens {
                provider_id,
                tokens,
            } => {
                self.broker
                    .set_tokens(&self.extension_id, &provider_id, tokens)
                    .await;
                RouteOutcome::immediate(ResponsePayload::Oauth(OauthResponse::Ack))
            }
            OauthRequest::RemoveTokens { provider_id } => {
                self.broker
                    .remove_tokens(&self.extension_id, &provider_id)
                    .await;
                RouteOutcome::immediate(ResponsePayload::Oauth(OauthResponse::Ack))
            }
        }
    }

    fn authorize(&self, request: OauthAuthorizeRequest) -> RouteFuture {
        let broker = self.broker.clone();
        Box::pin(async move {
            let code = broker.authorize(request).await?;
            Ok(ResponsePayload::Oauth(OauthResponse::Authorized { code }))
        })
    }
}
