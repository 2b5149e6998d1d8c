//! # Event Bus
//!
//! Topic-keyed publish/subscribe with fire-and-collect semantics.

use crate::events::{EventTopic, RelayEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Error returned by an individual handler.
///
/// Handlers report failure as text; the bus does not interpret it beyond
/// wrapping the first rejection into a [`HandlerFailure`].
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    /// Create a handler error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Result type handlers return to the bus.
pub type HandlerResult = Result<(), HandlerError>;

/// A subscriber rejected an event.
///
/// Propagated to the publisher's caller so request-scoped failures (e.g. a
/// failed delivery) can be reported to the original requester without taking
/// down the bus.
#[derive(Debug, Clone, Error)]
#[error("Event handler failed for topic {topic:?}: {message}")]
pub struct HandlerFailure {
    /// Topic of the event that failed.
    pub topic: EventTopic,
    /// Text of the first rejection, in handler registration order.
    pub message: String,
}

/// Trait for event subscribers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle one event. Runs concurrently with other handlers for the same
    /// publish; must not assume sequencing between them.
    async fn handle(&self, event: &RelayEvent) -> HandlerResult;
}

/// Boxed future returned by closure handlers.
pub type BoxedHandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Adapter so plain closures can subscribe without a named handler type.
struct FnHandler<F>(F);

#[async_trait]
impl<F> EventHandler for FnHandler<F>
where
    F: Fn(RelayEvent) -> BoxedHandlerFuture + Send + Sync,
{
    async fn handle(&self, event: &RelayEvent) -> HandlerResult {
        (self.0)(event.clone()).await
    }
}

/// In-process event bus.
///
/// Handlers are stored per topic in registration order. `publish` clones the
/// handler list out of the lock before invoking anything, so a handler that
/// publishes further events reenters freely.
pub struct EventBus {
    /// Registered handlers, keyed by topic, in registration order.
    handlers: RwLock<HashMap<EventTopic, Vec<Arc<dyn EventHandler>>>>,
    /// Total events published.
    events_published: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            events_published: AtomicU64::new(0),
        }
    }

    /// Register a handler for a topic.
    ///
    /// Multiple handlers per topic are allowed; there is no unsubscribe.
    pub fn subscribe(&self, topic: EventTopic, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(topic).or_default().push(handler);
        debug!(?topic, "Handler subscribed");
    }

    /// Register a closure for a topic.
    pub fn subscribe_fn<F>(&self, topic: EventTopic, handler: F)
    where
        F: Fn(RelayEvent) -> BoxedHandlerFuture + Send + Sync + 'static,
    {
        self.subscribe(topic, Arc::new(FnHandler(handler)));
    }

    /// Publish an event to every handler registered for its topic.
    ///
    /// Handlers are spawned concurrently in registration order and all are
    /// awaited before returning. An event with no handlers is dropped with a
    /// debug log.
    ///
    /// # Returns
    ///
    /// The number of handlers that completed successfully.
    ///
    /// # Errors
    ///
    /// [`HandlerFailure`] carrying the first rejection in registration
    /// order. Remaining handlers still run to completion.
    pub async fn publish(&self, event: RelayEvent) -> Result<usize, HandlerFailure> {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let handlers: Vec<Arc<dyn EventHandler>> = {
            let map = self.handlers.read().unwrap_or_else(|e| e.into_inner());
            map.get(&topic).cloned().unwrap_or_default()
        };

        if handlers.is_empty() {
            debug!(?topic, "Event dropped (no handlers)");
            return Ok(0);
        }

        let mut joins = Vec::with_capacity(handlers.len());
        for handler in handlers {
            let event = event.clone();
            joins.push(tokio::spawn(
                async move { handler.handle(&event).await },
            ));
        }

        let mut completed = 0;
        let mut first_failure: Option<HandlerFailure> = None;
        for join in joins {
            match join.await {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => {
                    warn!(?topic, error = %e, "Event handler rejected");
                    if first_failure.is_none() {
                        first_failure = Some(HandlerFailure {
                            topic,
                            message: e.to_string(),
                        });
                    }
                }
                Err(join_err) => {
                    warn!(?topic, error = %join_err, "Event handler panicked");
                    if first_failure.is_none() {
                        first_failure = Some(HandlerFailure {
                            topic,
                            message: join_err.to_string(),
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(failure) => Err(failure),
            None => {
                debug!(?topic, handlers = completed, "Event published");
                Ok(completed)
            }
        }
    }

    /// Total events published since startup.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
