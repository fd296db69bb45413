pub mod postgres;

use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::error::Result;

/// The pub/sub bridge contract (spec.md §4.4): push database notifications on `channel_name` to
/// every connected subscriber whose `filter` matches the notification payload, with a listener
/// lifecycle that is reference-counted off the subscriber set rather than started eagerly.
pub trait PubSubNotifier
where
    Self: Send + Sync,
{
    /// Register a new subscriber against `channel_name`, matching future notifications whose
    /// payload string-equals `filter`. If this is the channel's first subscriber, a listener is
    /// started under the channel's mutex before this call returns. Returns the subscriber's id
    /// (needed by [`PubSubNotifier::unsubscribe`]) and the receiving half of its message queue.
    async fn subscribe(&self, channel_name: &str, filter: String)
        -> Result<(Uuid, UnboundedReceiver<String>)>;

    /// Remove a subscriber from `channel_name`. If it was the last remaining subscriber, the
    /// listener is torn down and the reference nil'd before this call returns.
    async fn unsubscribe(&self, channel_name: &str, subscriber_id: Uuid);

    /// Whether a listener is currently running for `channel_name`. Exposed for the liveness
    /// property in spec.md §8 ("after the first subscriber joins a channel, a listener exists;
    /// after the last leaves, no listener exists").
    async fn has_listener(&self, channel_name: &str) -> bool;
}
