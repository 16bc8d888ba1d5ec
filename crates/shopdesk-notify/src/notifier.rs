use std::sync::Arc;

use shopdesk_core::{BotGateway, Language, OrderStatus, OrderStore, StatusTransitionEvent};
use tracing::{error, info, warn};

use crate::labels::{admin_status_text, customer_status_text};

#[derive(Debug, Clone)]
pub enum NotifyOutcome {
    OrderNotFound,
    LookupFailed,
    NoRecipient(StatusTransitionEvent),
    Delivered(StatusTransitionEvent),
    DeliveryFailed(StatusTransitionEvent),
}

impl NotifyOutcome {
    pub fn event(&self) -> Option<&StatusTransitionEvent> {
        match self {
            Self::NoRecipient(event) | Self::Delivered(event) | Self::DeliveryFailed(event) => {
                Some(event)
            }
            Self::OrderNotFound | Self::LookupFailed => None,
        }
    }
}

/// Tells the customer (and admins) about a committed status change. Every
/// failure on this path is logged and absorbed: the status row stands on its
/// own and nothing is retried.
#[derive(Clone)]
pub struct StatusNotifier {
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn BotGateway>,
    default_language: Language,
    notify_admins: bool,
}

impl StatusNotifier {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn BotGateway>,
        default_language: Language,
    ) -> Self {
        Self {
            orders,
            gateway,
            default_language,
            notify_admins: true,
        }
    }

    pub fn with_admin_copies(mut self, enabled: bool) -> Self {
        self.notify_admins = enabled;
        self
    }

    pub async fn notify(
        &self,
        order_id: i64,
        new_status: &OrderStatus,
        previous_status: Option<OrderStatus>,
    ) -> NotifyOutcome {
        let found = match self.orders.get_order_with_owner(order_id).await {
            Ok(Some(found)) => found,
            Ok(None) => return NotifyOutcome::OrderNotFound,
            Err(err) => {
                error!("failed to load order {order_id} for notification: {err:#}");
                return NotifyOutcome::LookupFailed;
            }
        };

        let language = found.customer_language.unwrap_or(self.default_language);
        let event = StatusTransitionEvent {
            order_id,
            previous_status,
            new_status: new_status.clone(),
            recipient: found.recipient,
            text: customer_status_text(order_id, new_status, language),
        };

        let outcome = match event.recipient {
            None => {
                info!("order {order_id} has no reachable owner, skipping customer notification");
                NotifyOutcome::NoRecipient(event)
            }
            Some(chat_id) => match self.gateway.send_message(chat_id, &event.text).await {
                Ok(result) if result.ok => {
                    info!("notified chat {chat_id} about order {order_id} -> {new_status}");
                    NotifyOutcome::Delivered(event)
                }
                Ok(_) => {
                    warn!("bot api did not accept notification for order {order_id}");
                    NotifyOutcome::DeliveryFailed(event)
                }
                Err(err) => {
                    warn!("failed to notify chat {chat_id} about order {order_id}: {err}");
                    NotifyOutcome::DeliveryFailed(event)
                }
            },
        };

        if self.notify_admins {
            let text = admin_status_text(
                order_id,
                outcome.event().and_then(|e| e.previous_status.as_ref()),
                new_status,
                found.customer_name.as_deref(),
                self.default_language,
            );
            if let Err(err) = self.gateway.notify_admins(&text).await {
                warn!("failed to notify admins about order {order_id}: {err}");
            }
        }

        outcome
    }
}
