use crate::config::StorefrontConfig;
use crate::services::notification_handler::{NotificationHandler, NotificationReply};
use crate::services::return_handler::{ReturnHandler, ReturnParams};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    /// Buyer browser coming back from the hosted checkout.
    Return,
    /// Server-to-server webhook, including the empty verification probe.
    Notification,
}

impl CallbackKind {
    pub fn classify(query: &HashMap<String, String>) -> Self {
        if query.contains_key("result") {
            CallbackKind::Return
        } else {
            CallbackKind::Notification
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResponse {
    Redirect(String),
    Body(String),
    Acknowledge,
    Unavailable,
}

/// Routes the single Viva callback URL to the return or notification flow.
#[derive(Clone)]
pub struct CallbackDispatcher {
    returns: Arc<ReturnHandler>,
    notifications: Arc<NotificationHandler>,
    storefront: StorefrontConfig,
}

impl CallbackDispatcher {
    pub fn new(
        returns: Arc<ReturnHandler>,
        notifications: Arc<NotificationHandler>,
        storefront: StorefrontConfig,
    ) -> Self {
        Self {
            returns,
            notifications,
            storefront,
        }
    }

    pub async fn dispatch(&self, query: &HashMap<String, String>, body: &str) -> CallbackResponse {
        match CallbackKind::classify(query) {
            CallbackKind::Return => {
                let outcome = self.returns.handle(&ReturnParams::from_query(query)).await;
                CallbackResponse::Redirect(outcome.redirect_url(&self.storefront))
            }
            CallbackKind::Notification => match self.notifications.handle(body).await {
                NotificationReply::Echo(raw) => CallbackResponse::Body(raw),
                NotificationReply::ProbeFailed => CallbackResponse::Unavailable,
                NotificationReply::Acknowledged(_) => CallbackResponse::Acknowledge,
            },
        }
    }
}
