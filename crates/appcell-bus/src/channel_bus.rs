//! Channel-bound view of a bus

use crate::bus::{BatchGuard, MessageBus, SendOptions};
use crate::channel::Channel;
use crate::error::BusError;
use crate::key::{Key, MessageKind};
use crate::listener::{Listen, ListenerId, MessageHandler, Reply};
use serde_json::Value;
use std::future::Future;

/// A [`MessageBus`] handle whose operations all target one channel
///
/// Handed to widgets so they can talk to their cell without knowing the
/// channel identity.
#[derive(Debug, Clone)]
pub struct ChannelBus {
    bus: MessageBus,
    channel: Channel,
    description: String,
}

impl ChannelBus {
    pub(crate) fn new(bus: MessageBus, channel: Channel, description: String) -> Self {
        Self {
            bus,
            channel,
            description,
        }
    }

    /// Channel this view is bound to
    #[inline]
    #[must_use]
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Free-form description given at creation
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The underlying bus
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Listen on this channel; any channel set on `spec` is overridden
    pub fn listen(&self, spec: Listen) -> ListenerId {
        self.bus.listen(spec.on_channel(self.channel.clone()))
    }

    /// Unregister a listener
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    /// Send a keyed message on this channel
    pub fn send(&self, message: Value, key: impl Into<Key>) {
        self.bus.send(message, self.options(key));
    }

    /// Send and retain a keyed message on this channel
    pub fn set(&self, message: Value, key: impl Into<Key>) {
        self.bus.set(message, self.options(key));
    }

    /// Listen for one kind of message on this channel
    pub fn on<H>(&self, kind: impl Into<MessageKind>, handler: H) -> ListenerId
    where
        H: Fn(&Value) + Send + Sync + 'static,
    {
        self.listen(Listen::key(Key::kind(kind), handler))
    }

    /// Listen with a shared handler
    pub fn on_shared(&self, kind: impl Into<MessageKind>, handler: MessageHandler) -> ListenerId {
        self.on(kind, move |message| handler(message))
    }

    /// Send one kind of message on this channel
    pub fn emit(&self, kind: impl Into<MessageKind>, payload: Value) {
        self.send(payload, Key::kind(kind));
    }

    /// Register a responder on this channel
    pub fn respond<H>(&self, key: impl Into<Key>, handler: H) -> ListenerId
    where
        H: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        self.bus
            .respond(crate::Respond::key(key, handler).on_channel(self.channel.clone()))
    }

    /// Request on this channel
    pub fn request(
        &self,
        message: Value,
        key: impl Into<Key>,
    ) -> impl Future<Output = Result<Value, BusError>> + Send + 'static {
        self.bus.request(message, self.options(key))
    }

    /// Defer dispatch on the whole bus
    #[must_use = "dispatch resumes when the guard is dropped"]
    pub fn batch(&self) -> BatchGuard {
        self.bus.batch()
    }

    /// Latest retained value on this channel
    #[must_use]
    pub fn retained(&self, key: &Key) -> Option<Value> {
        self.bus.retained(&self.channel, key)
    }

    fn options(&self, key: impl Into<Key>) -> SendOptions {
        SendOptions::keyed(key).on_channel(self.channel.clone())
    }
}
