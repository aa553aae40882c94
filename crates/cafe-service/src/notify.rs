//! # Order Notifications
//!
//! Best-effort fan-out of order events to live subscribers (kitchen screens,
//! waiter tablets).
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Notification Hub                                 │
//! │                                                                         │
//! │  OrderLifecycle::create ──publish()──► NotificationHub                 │
//! │                                             │                           │
//! │                          registry: id ──► (topic filter, mpsc::Sender)  │
//! │                                             │                           │
//! │                 ┌───────────────────────────┼──────────────────────┐    │
//! │                 ▼                           ▼                      ▼    │
//! │          ┌────────────┐             ┌────────────┐         ┌──────────┐ │
//! │          │ table "t1" │             │ all tables │         │ (closed) │ │
//! │          │ try_send ✓ │             │ Full: drop │         │ pruned   │ │
//! │          └────────────┘             └────────────┘         └──────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `publish` never awaits. A subscriber whose queue is full misses the event;
//! one whose receiver was dropped is removed from the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use cafe_core::Order;

// =============================================================================
// Events
// =============================================================================

/// An event about an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderEvent {
    #[serde(rename_all = "camelCase")]
    Created {
        order_id: String,
        table_id: String,
        at: DateTime<Utc>,
    },
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        OrderEvent::Created {
            order_id: order.id.clone(),
            table_id: order.table_id.clone(),
            at: order.created_at,
        }
    }

    /// Topic the event is published under: the table id.
    pub fn topic(&self) -> &str {
        match self {
            OrderEvent::Created { table_id, .. } => table_id,
        }
    }
}

/// Somewhere to publish order events.
///
/// Implementations must return promptly and must not fail the caller.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: OrderEvent);
}

// =============================================================================
// Hub
// =============================================================================

/// Registry handle of one subscriber.
pub type SubscriberId = u64;

struct Subscriber {
    topic: Option<String>,
    tx: mpsc::Sender<OrderEvent>,
}

impl Subscriber {
    fn wants(&self, event: &OrderEvent) -> bool {
        self.topic.as_deref().map_or(true, |t| t == event.topic())
    }
}

struct HubInner {
    buffer: usize,
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
}

/// In-process fan-out registry. Clones share the same registry.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

impl NotificationHub {
    /// Creates a hub whose subscribers each queue up to `buffer` events.
    pub fn new(buffer: usize) -> Self {
        NotificationHub {
            inner: Arc::new(HubInner {
                buffer: buffer.max(1),
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registers a subscriber. `topic = None` receives every table's events.
    pub fn subscribe(&self, topic: Option<&str>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.buffer);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.registry().insert(
            id,
            Subscriber {
                topic: topic.map(str::to_string),
                tx,
            },
        );
        debug!(subscriber = id, topic = ?topic, "Subscriber registered");

        Subscription { id, rx }
    }

    /// Removes a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.registry().remove(&id).is_some()
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    /// Offers `event` to every interested subscriber without waiting.
    ///
    /// Returns how many subscribers accepted it.
    pub fn broadcast(&self, event: &OrderEvent) -> usize {
        let mut delivered = 0;

        self.registry().retain(|id, subscriber| {
            if !subscriber.wants(event) {
                return true;
            }
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = id, "Subscriber queue full, event dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = id, "Subscriber gone, removing");
                    false
                }
            }
        });

        debug!(topic = event.topic(), delivered, "Event broadcast");
        delivered
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<SubscriberId, Subscriber>> {
        // A panic while holding the lock leaves the map itself intact.
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        NotificationHub::new(32)
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("buffer", &self.inner.buffer)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl NotificationSink for NotificationHub {
    fn publish(&self, event: OrderEvent) {
        self.broadcast(&event);
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Receiving end of a subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<OrderEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event. `None` once the subscriber was removed.
    pub async fn recv(&mut self) -> Option<OrderEvent> {
        self.rx.recv().await
    }

    /// Next queued event, if any.
    pub fn try_recv(&mut self) -> Option<OrderEvent> {
        self.rx.try_recv().ok()
    }

    /// Adapts the subscription to a `Stream` (e.g. for server-sent events).
    pub fn into_stream(self) -> ReceiverStream<OrderEvent> {
        ReceiverStream::new(self.rx)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
