//! In-process event hub for real-time storefront updates.
//!
//! Events are fire-and-forget: there is no replay, and a receiver that falls
//! behind skips whatever it missed.

use futures::Stream;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use corner_shop_core::{OrderId, OrderStatus, ProductId, UserId};

use crate::models::Notification;

/// Buffered events per receiver before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Who an event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    /// One user's room.
    User(UserId),
}

/// Event payloads. The SSE event name is the camelCase variant name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    #[serde(rename_all = "camelCase")]
    ProductCreated { product_id: ProductId },
    #[serde(rename_all = "camelCase")]
    ProductUpdated { product_id: ProductId },
    #[serde(rename_all = "camelCase")]
    ProductRemoved { product_id: ProductId },
    #[serde(rename_all = "camelCase")]
    OrderUpdated {
        order_id: OrderId,
        status: OrderStatus,
    },
    CartUpdated,
    Notification { notification: Notification },
}

impl EventKind {
    /// SSE event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProductCreated { .. } => "productCreated",
            Self::ProductUpdated { .. } => "productUpdated",
            Self::ProductRemoved { .. } => "productRemoved",
            Self::OrderUpdated { .. } => "orderUpdated",
            Self::CartUpdated => "cartUpdated",
            Self::Notification { .. } => "notification",
        }
    }
}

/// A published event.
#[derive(Debug, Clone)]
pub struct Event {
    pub audience: Audience,
    pub kind: EventKind,
}

impl Event {
    /// Whether a subscriber (signed in or not) should see this event.
    #[must_use]
    pub fn visible_to(&self, user: Option<UserId>) -> bool {
        match self.audience {
            Audience::Everyone => true,
            Audience::User(target) => user == Some(target),
        }
    }
}

/// Broadcast hub shared through the app state.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<Event>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, audience: Audience, kind: EventKind) {
        let name = kind.name();
        if self.sender.send(Event { audience, kind }).is_err() {
            debug!(event = name, "No event subscribers");
        }
    }

    /// Shorthand for an event everyone sees.
    pub fn broadcast(&self, kind: EventKind) {
        self.publish(Audience::Everyone, kind);
    }

    /// Shorthand for an event in one user's room.
    pub fn to_user(&self, user_id: UserId, kind: EventKind) {
        self.publish(Audience::User(user_id), kind);
    }

    /// Stream of events visible to `user`, ending when the hub is dropped.
    pub fn subscribe(&self, user: Option<UserId>) -> impl Stream<Item = Event> + use<> {
        let mut receiver = self.sender.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if event.visible_to(user) {
                            yield event;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Event subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn test_event_names_are_camel_case() {
        let kind = EventKind::ProductUpdated {
            product_id: ProductId::new(3),
        };
        assert_eq!(kind.name(), "productUpdated");
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "productUpdated");
        assert_eq!(json["productId"], 3);
    }

    #[test]
    fn test_user_room_visibility() {
        let event = Event {
            audience: Audience::User(UserId::new(1)),
            kind: EventKind::CartUpdated,
        };
        assert!(event.visible_to(Some(UserId::new(1))));
        assert!(!event.visible_to(Some(UserId::new(2))));
        assert!(!event.visible_to(None));
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_its_room() {
        let hub = EventHub::new();
        let stream = hub.subscribe(None);
        futures::pin_mut!(stream);

        hub.to_user(UserId::new(1), EventKind::CartUpdated);
        hub.broadcast(EventKind::ProductRemoved {
            product_id: ProductId::new(9),
        });

        let event = stream.next().await.unwrap();
        assert_eq!(
            event.kind,
            EventKind::ProductRemoved {
                product_id: ProductId::new(9)
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let hub = EventHub::new();
        hub.broadcast(EventKind::CartUpdated);
    }
}
