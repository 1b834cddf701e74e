//! Ordering and fan-out core
//!
//! [`SubscriptionRegistry`] holds one bounded delivery channel per connected
//! subscriber. [`Broadcaster`] stamps each message with the shared
//! [`LamportClock`](chitty_core::LamportClock) and pushes it into every
//! channel. A [`SubscriberPump`] per connection drains its channel onto the
//! client's stream, and [`SubscriptionSession`] ties the three together for
//! the lifetime of one subscribe call.

pub mod broadcaster;
pub mod pump;
pub mod registry;
pub mod session;

pub use broadcaster::{Broadcaster, HubStats};
pub use pump::{DrainReason, MessageSink, PumpExit, PumpState, SubscriberPump};
pub use registry::{DeliveryReceiver, DeliverySender, Subscriber, SubscriberId, SubscriptionRegistry};
pub use session::{SessionSummary, SubscriptionSession};
