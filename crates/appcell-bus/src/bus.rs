//! The message bus
//!
//! Dispatch is synchronous and run-to-completion:
//! - listeners matching one send are invoked in registration order
//! - a send issued while a dispatch is in progress is queued and delivered
//!   once the current dispatch has finished
//! - retained values are replayed to a new listener on the identical
//!   (channel, key) as soon as it registers

use crate::channel::Channel;
use crate::channel_bus::ChannelBus;
use crate::error::BusError;
use crate::key::{CorrelationId, Key, MessageKind};
use crate::listener::{
    Envelope, Handler, Listen, ListenerId, Matcher, Registration, Reply, ReplySlot, Respond,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Options of a send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Channel the message is sent on
    pub channel: Channel,
    /// Classification key
    pub key: Option<Key>,
    /// Retain the message for listeners registering later
    pub persistent: bool,
}

impl SendOptions {
    /// Unkeyed send on the default channel
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyed send on the default channel
    #[inline]
    pub fn keyed(key: impl Into<Key>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// With channel
    #[inline]
    #[must_use]
    pub fn on_channel(mut self, channel: impl Into<Channel>) -> Self {
        self.channel = channel.into();
        self
    }

    /// With key
    #[inline]
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Retain the message under its (channel, key)
    #[inline]
    #[must_use]
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

enum Delivery {
    Broadcast(Envelope),
    Direct(ListenerId, Envelope),
}

#[derive(Default)]
struct BusState {
    listeners: HashMap<Channel, Vec<Registration>>,
    index: HashMap<ListenerId, Channel>,
    retained: HashMap<(Channel, Key), Value>,
    queue: VecDeque<Delivery>,
    dispatching: bool,
}

impl BusState {
    fn insert(&mut self, channel: Channel, registration: Registration) {
        self.index.insert(registration.id, channel.clone());
        self.listeners.entry(channel).or_default().push(registration);
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let Some(channel) = self.index.remove(&id) else {
            return false;
        };
        if let Some(registrations) = self.listeners.get_mut(&channel) {
            registrations.retain(|r| r.id != id);
            if registrations.is_empty() {
                self.listeners.remove(&channel);
            }
        }
        true
    }

    fn candidates(&self, delivery: &Delivery) -> Vec<Registration> {
        match delivery {
            Delivery::Broadcast(envelope) => self
                .listeners
                .get(&envelope.channel)
                .cloned()
                .unwrap_or_default(),
            Delivery::Direct(id, envelope) => self
                .listeners
                .get(&envelope.channel)
                .and_then(|regs| regs.iter().find(|r| r.id == *id).cloned())
                .into_iter()
                .collect(),
        }
    }
}

struct Inner {
    state: Mutex<BusState>,
    next_id: AtomicU64,
}

/// Publish/subscribe and request/response bus
///
/// Cloning yields another handle onto the same registration tables.
#[derive(Clone)]
pub struct MessageBus {
    inner: Arc<Inner>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MessageBus")
            .field("listeners", &state.index.len())
            .field("retained", &state.retained.len())
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl MessageBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BusState::default()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener
    ///
    /// A keyed listener whose (channel, key) holds a retained value receives
    /// that value right away.
    pub fn listen(&self, spec: Listen) -> ListenerId {
        let Listen {
            channel,
            matcher,
            handler,
            once,
        } = spec;
        self.register(channel, matcher, Handler::Message(handler), once)
    }

    /// Unregister a listener; returns whether it was still registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.inner.state.lock().remove(id);
        if removed {
            tracing::trace!(listener = %id, "listener removed");
        }
        removed
    }

    /// Dispatch a message to every matching listener
    pub fn send(&self, message: Value, options: SendOptions) {
        let SendOptions {
            channel,
            key,
            persistent,
        } = options;
        {
            let mut state = self.inner.state.lock();
            if persistent {
                match &key {
                    Some(key) => {
                        state
                            .retained
                            .insert((channel.clone(), key.clone()), message.clone());
                    }
                    None => tracing::warn!(%channel, "persistent send without key is not retained"),
                }
            }
            state
                .queue
                .push_back(Delivery::Broadcast(Envelope::new(channel, key, message)));
        }
        self.pump();
    }

    /// Send and retain the message as the latest value of its (channel, key)
    pub fn set(&self, message: Value, options: SendOptions) {
        self.send(message, options.persistent());
    }

    /// Latest retained value for (channel, key)
    #[must_use]
    pub fn retained(&self, channel: &Channel, key: &Key) -> Option<Value> {
        self.inner
            .state
            .lock()
            .retained
            .get(&(channel.clone(), key.clone()))
            .cloned()
    }

    /// Listen for one kind of message on the default channel
    pub fn on<H>(&self, kind: impl Into<MessageKind>, handler: H) -> ListenerId
    where
        H: Fn(&Value) + Send + Sync + 'static,
    {
        self.listen(Listen::key(Key::kind(kind), handler))
    }

    /// Send one kind of message on the default channel
    pub fn emit(&self, kind: impl Into<MessageKind>, payload: Value) {
        self.send(payload, SendOptions::keyed(Key::kind(kind)));
    }

    /// Register a persistent responder
    pub fn respond(&self, spec: Respond) -> ListenerId {
        let Respond {
            channel,
            key,
            handler,
        } = spec;
        self.register(channel, Matcher::Key(key), Handler::Responder(handler), false)
    }

    /// Send a request and wait for the first reply
    ///
    /// The request is sent before this returns; the future only waits for
    /// the reply. Unanswered requests never resolve, so bound the wait with
    /// a timer when needed.
    pub fn request(
        &self,
        message: Value,
        options: SendOptions,
    ) -> impl Future<Output = Result<Value, BusError>> + Send + 'static {
        let correlation = CorrelationId::new();
        let (sender, receiver) = oneshot::channel();
        let slot: ReplySlot = Arc::new(Mutex::new(Some(sender)));
        self.register(
            options.channel.clone(),
            Matcher::Key(Key::Reply(correlation)),
            Handler::Reply(slot),
            true,
        );

        let mut envelope = Envelope::new(options.channel, options.key, message);
        envelope.reply_to = Some(correlation);
        tracing::trace!(%correlation, channel = %envelope.channel, "request sent");
        self.enqueue(Delivery::Broadcast(envelope));

        async move { receiver.await.unwrap_or(Err(BusError::Abandoned)) }
    }

    /// View of this bus bound to one channel
    ///
    /// A fresh anonymous channel is generated when none is given.
    pub fn make_channel_bus(
        &self,
        channel: Option<Channel>,
        description: impl Into<String>,
    ) -> ChannelBus {
        ChannelBus::new(
            self.clone(),
            channel.unwrap_or_else(Channel::generate),
            description.into(),
        )
    }

    /// Defer dispatch until the returned guard is dropped
    ///
    /// Inside a dispatch the guard is inert; messages are queued anyway.
    #[must_use = "dispatch resumes when the guard is dropped"]
    pub fn batch(&self) -> BatchGuard {
        let owner = {
            let mut state = self.inner.state.lock();
            if state.dispatching {
                false
            } else {
                state.dispatching = true;
                true
            }
        };
        BatchGuard {
            bus: self.clone(),
            owner,
        }
    }

    /// Number of live registrations across every channel
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.state.lock().index.len()
    }

    fn next_listener_id(&self) -> ListenerId {
        ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn register(
        &self,
        channel: Channel,
        matcher: Matcher,
        handler: Handler,
        once: bool,
    ) -> ListenerId {
        let id = self.next_listener_id();
        let replay = {
            let mut state = self.inner.state.lock();
            let replay = match &matcher {
                Matcher::Key(key) => state
                    .retained
                    .get(&(channel.clone(), key.clone()))
                    .cloned()
                    .map(|message| Envelope::new(channel.clone(), Some(key.clone()), message)),
                Matcher::Test(_) => None,
            };
            state.insert(
                channel,
                Registration {
                    id,
                    matcher,
                    handler,
                    once,
                },
            );
            if let Some(envelope) = replay {
                state.queue.push_back(Delivery::Direct(id, envelope));
                true
            } else {
                false
            }
        };
        if replay {
            tracing::trace!(listener = %id, "replaying retained message");
            self.pump();
        }
        id
    }

    fn enqueue(&self, delivery: Delivery) {
        self.inner.state.lock().queue.push_back(delivery);
        self.pump();
    }

    fn pump(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }
        let mut guard = DispatchGuard {
            bus: self,
            finished: false,
        };

        loop {
            let (delivery, candidates) = {
                let mut state = self.inner.state.lock();
                let Some(delivery) = state.queue.pop_front() else {
                    state.dispatching = false;
                    guard.finished = true;
                    break;
                };
                let candidates = state.candidates(&delivery);
                (delivery, candidates)
            };
            let envelope = match delivery {
                Delivery::Broadcast(envelope) | Delivery::Direct(_, envelope) => envelope,
            };
            self.dispatch(&envelope, candidates);
        }
    }

    fn dispatch(&self, envelope: &Envelope, candidates: Vec<Registration>) {
        let mut delivered = 0usize;
        for registration in candidates {
            if !registration.matches(envelope) {
                continue;
            }
            // a one-shot listener fires only if this dispatch is the one
            // that retires it
            if registration.once && !self.inner.state.lock().remove(registration.id) {
                continue;
            }
            delivered += 1;
            self.invoke(&registration.handler, envelope);
        }
        tracing::trace!(
            channel = %envelope.channel,
            key = ?envelope.key,
            delivered,
            "message dispatched"
        );
    }

    fn invoke(&self, handler: &Handler, envelope: &Envelope) {
        match handler {
            Handler::Message(handle) => handle(&envelope.message),
            Handler::Responder(handle) => {
                let reply = handle(&envelope.message);
                match envelope.reply_to {
                    Some(correlation) => {
                        self.deliver_reply(envelope.channel.clone(), correlation, reply);
                    }
                    None => tracing::debug!(
                        channel = %envelope.channel,
                        "responder matched a send without reply address"
                    ),
                }
            }
            Handler::Reply(slot) => {
                if let Some(sender) = slot.lock().take() {
                    let outcome = match &envelope.failure {
                        Some(error) => Err(error.clone()),
                        None => Ok(envelope.message.clone()),
                    };
                    // the requester may have dropped its future
                    let _ = sender.send(outcome);
                }
            }
        }
    }

    fn deliver_reply(&self, channel: Channel, correlation: CorrelationId, reply: Reply) {
        match reply {
            Reply::Ready(value) => {
                self.enqueue(Delivery::Broadcast(Envelope::reply(
                    channel,
                    correlation,
                    Ok(value),
                )));
            }
            Reply::Deferred(future) => match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let bus = self.clone();
                    runtime.spawn(async move {
                        let outcome = future.await;
                        bus.enqueue(Delivery::Broadcast(Envelope::reply(
                            channel,
                            correlation,
                            outcome,
                        )));
                    });
                }
                Err(_) => {
                    tracing::warn!(%correlation, "deferred reply without a runtime");
                    self.enqueue(Delivery::Broadcast(Envelope::reply(
                        channel,
                        correlation,
                        Err(BusError::NoRuntime),
                    )));
                }
            },
        }
    }
}

/// Releases the dispatch flag if a handler unwinds
struct DispatchGuard<'a> {
    bus: &'a MessageBus,
    finished: bool,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.bus.inner.state.lock().dispatching = false;
        }
    }
}

/// Guard returned by [`MessageBus::batch`]
pub struct BatchGuard {
    bus: MessageBus,
    owner: bool,
}

impl fmt::Debug for BatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchGuard").field("owner", &self.owner).finish()
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        self.bus.inner.state.lock().dispatching = false;
        if !std::thread::panicking() {
            self.bus.pump();
        }
    }
}
