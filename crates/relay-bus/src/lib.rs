//! # Relay Bus - Event Bus for Inter-Component Communication
//!
//! All cross-component flow in the relay goes through this bus: the
//! subscription store announces follow-set changes, the stream manager
//! announces verifications and matching content, and the messaging adapter
//! consumes both.
//!
//! ```text
//! ┌────────────────┐                      ┌────────────────┐
//! │ Subscription   │      publish()       │ Stream         │
//! │ Store          │ ───────┐             │ Manager        │
//! └────────────────┘        │             └────────────────┘
//!                           ▼                     ↑
//!                     ┌──────────────┐            │
//!                     │  Event Bus   │ ───────────┘
//!                     └──────────────┘  subscribe()
//! ```
//!
//! ## Contract
//!
//! - `publish` invokes every handler registered for the event's topic
//!   concurrently and completes once all handlers have, failing with
//!   [`HandlerFailure`] carrying the first rejection (in registration order).
//! - Handlers may publish further events from within their own invocation;
//!   the bus never holds a lock across handler execution, so reentrant
//!   publishes cannot deadlock.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod bus;
pub mod events;

pub use bus::{
    BoxedHandlerFuture, EventBus, EventHandler, HandlerError, HandlerFailure, HandlerResult,
};
pub use events::{EventTopic, RelayEvent};
