//! Hermes delivery engine.
//!
//! - [`dispatch`]: per-medium transports and the registry that maps a
//!   [`Medium`](hermes_core::medium::Medium) to its dispatcher.
//! - [`resolver`]: which verified subscribers follow a topic set.
//! - [`ledger`]: idempotency check and audit write over the message log.
//! - [`orchestrator`]: the publish state machine tying these together.

pub mod dispatch;
pub mod ledger;
pub mod orchestrator;
pub mod resolver;

pub use dispatch::{DeliveryError, Dispatcher, DispatcherRegistry, Outbound};
pub use ledger::Ledger;
pub use orchestrator::{
    DeliveryResult, DirectMessage, DirectSend, PublishEntry, PublishError, Publisher,
    PublisherConfig,
};
pub use resolver::{ResolutionStrategy, SubscriberResolver};
