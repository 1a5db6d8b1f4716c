//! # App Cell Message Bus
//!
//! Channel-scoped publish/subscribe with request/response and retained
//! ("persistent") messages.
//!
//! ## Example
//!
//! ```
//! use appcell_bus::{Key, Listen, MessageBus, SendOptions};
//! use serde_json::json;
//!
//! let bus = MessageBus::new();
//! bus.set(json!({"name": "Winnie"}), SendOptions::keyed(Key::name("bear")).on_channel("wood"));
//!
//! // late listeners still see the retained value
//! bus.listen(Listen::key(Key::name("bear"), |m| assert_eq!(m["name"], "Winnie")).on_channel("wood"));
//! ```

pub mod bus;
pub mod channel;
pub mod channel_bus;
pub mod error;
pub mod key;
pub mod listener;

pub use bus::{BatchGuard, MessageBus, SendOptions};
pub use channel::Channel;
pub use channel_bus::ChannelBus;
pub use error::BusError;
pub use key::{CorrelationId, Key, MessageKind};
pub use listener::{Listen, ListenerId, MessageHandler, MessageTest, Reply, Respond, ResponseHandler};

/// Result type for bus requests
pub type Result<T> = std::result::Result<T, BusError>;
