//! Listener registrations
//!
//! A registration pairs a channel scope and a matcher (predicate or key) with
//! a handler. One-shot registrations are removed the first time they match.

use crate::channel::Channel;
use crate::error::BusError;
use crate::key::{CorrelationId, Key};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Opaque handle of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Handler invoked with the message payload
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Predicate deciding whether a message is of interest
///
/// Runs during dispatch; it must not call back into the bus.
pub type MessageTest = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Handler whose return value is delivered to the requester
pub type ResponseHandler = Arc<dyn Fn(&Value) -> Reply + Send + Sync>;

/// Value produced by a responder
pub enum Reply {
    /// Reply available immediately
    Ready(Value),
    /// Reply produced by a future, resolved on the tokio runtime
    Deferred(BoxFuture<'static, Result<Value, BusError>>),
}

impl Reply {
    /// Immediate reply
    #[inline]
    pub fn ready(value: impl Into<Value>) -> Self {
        Self::Ready(value.into())
    }

    /// Reply computed asynchronously
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, BusError>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Ready(value)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(value) => f.debug_tuple("Ready").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// How a registration selects messages
#[derive(Clone)]
pub enum Matcher {
    /// Every message on the channel for which the predicate holds
    Test(MessageTest),
    /// Keyed messages accepted by this key
    Key(Key),
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Test(_) => f.write_str("Test(..)"),
            Self::Key(key) => f.debug_tuple("Key").field(key).finish(),
        }
    }
}

/// Registration request for [`MessageBus::listen`](crate::MessageBus::listen)
pub struct Listen {
    pub(crate) channel: Channel,
    pub(crate) matcher: Matcher,
    pub(crate) handler: MessageHandler,
    pub(crate) once: bool,
}

impl Listen {
    /// Listen for every message the predicate accepts
    pub fn test<T, H>(test: T, handler: H) -> Self
    where
        T: Fn(&Value) -> bool + Send + Sync + 'static,
        H: Fn(&Value) + Send + Sync + 'static,
    {
        Self {
            channel: Channel::Default,
            matcher: Matcher::Test(Arc::new(test)),
            handler: Arc::new(handler),
            once: false,
        }
    }

    /// Listen for messages sent with a matching key
    pub fn key<H>(key: impl Into<Key>, handler: H) -> Self
    where
        H: Fn(&Value) + Send + Sync + 'static,
    {
        Self {
            channel: Channel::Default,
            matcher: Matcher::Key(key.into()),
            handler: Arc::new(handler),
            once: false,
        }
    }

    /// Restrict the registration to one channel
    #[inline]
    #[must_use]
    pub fn on_channel(mut self, channel: impl Into<Channel>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Remove the registration after its first delivery
    #[inline]
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

impl fmt::Debug for Listen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listen")
            .field("channel", &self.channel)
            .field("matcher", &self.matcher)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

/// Registration request for [`MessageBus::respond`](crate::MessageBus::respond)
pub struct Respond {
    pub(crate) channel: Channel,
    pub(crate) key: Key,
    pub(crate) handler: ResponseHandler,
}

impl Respond {
    /// Answer requests sent with a matching key
    pub fn key<H>(key: impl Into<Key>, handler: H) -> Self
    where
        H: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        Self {
            channel: Channel::Default,
            key: key.into(),
            handler: Arc::new(handler),
        }
    }

    /// Restrict the responder to one channel
    #[inline]
    #[must_use]
    pub fn on_channel(mut self, channel: impl Into<Channel>) -> Self {
        self.channel = channel.into();
        self
    }
}

impl fmt::Debug for Respond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Respond")
            .field("channel", &self.channel)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Slot fulfilled by the first reply to a request
pub(crate) type ReplySlot = Arc<Mutex<Option<oneshot::Sender<Result<Value, BusError>>>>>;

#[derive(Clone)]
pub(crate) enum Handler {
    Message(MessageHandler),
    Responder(ResponseHandler),
    Reply(ReplySlot),
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) id: ListenerId,
    pub(crate) matcher: Matcher,
    pub(crate) handler: Handler,
    pub(crate) once: bool,
}

impl Registration {
    pub(crate) fn matches(&self, envelope: &Envelope) -> bool {
        match &self.matcher {
            Matcher::Test(test) => test(&envelope.message),
            Matcher::Key(wanted) => envelope
                .key
                .as_ref()
                .is_some_and(|sent| wanted.accepts(sent)),
        }
    }
}

/// A message in flight
#[derive(Debug, Clone)]
pub(crate) struct Envelope {
    pub(crate) channel: Channel,
    pub(crate) key: Option<Key>,
    pub(crate) message: Value,
    pub(crate) reply_to: Option<CorrelationId>,
    pub(crate) failure: Option<BusError>,
}

impl Envelope {
    pub(crate) fn new(channel: Channel, key: Option<Key>, message: Value) -> Self {
        Self {
            channel,
            key,
            message,
            reply_to: None,
            failure: None,
        }
    }

    pub(crate) fn reply(
        channel: Channel,
        correlation: CorrelationId,
        outcome: Result<Value, BusError>,
    ) -> Self {
        let (message, failure) = match outcome {
            Ok(value) => (value, None),
            Err(error) => (Value::Null, Some(error)),
        };
        Self {
            channel,
            key: Some(Key::Reply(correlation)),
            message,
            reply_to: None,
            failure,
        }
    }
}
