//! Message classification keys
//!
//! Every keyed send carries a [`Key`]. Listeners registered with a key match
//! a send when [`Key::accepts`] holds: names compare exactly, typed keys
//! compare by kind and by every field the listener pins down, replies compare
//! by correlation identity.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of message kinds exchanged inside an app cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Mount a widget and hand it its initial data
    Run,
    /// Tear a widget down
    Stop,
    /// Reset a widget to its initial state
    Reset,
    /// Attach a widget to a mount point
    Attach,
    /// Push fresh data into a widget
    Update,
    /// A parameter input changed value
    ParameterChanged,
    /// A widget asks for the stored value of one parameter
    ParameterSync,
    /// Request/response lookup of one parameter value
    GetParameter,
    /// Ask a display widget to refresh every parameter
    SyncAllParameters,
    /// Ask the controller to refresh the parameter display widget
    SyncAllDisplayParameters,
    /// Restore every input to its default value
    ResetToDefaults,
    /// User pressed run
    RunApp,
    /// User pressed re-run
    ReRunApp,
    /// User pressed cancel
    Cancel,
    /// User asked to remove the cell
    Remove,
    /// The cell reached the success state
    OnSuccess,
    /// The cell moved to a new state
    NewState,
    /// Launch-phase event from the job backend
    RunStatus,
    /// Launch state re-broadcast to cell widgets
    LaunchStatus,
    /// Job status push on a job channel
    JobStatus,
    /// Changed job state re-broadcast to cell widgets
    JobState,
    /// Unchanged job state was re-confirmed
    JobStateUpdated,
    /// The job was deleted by the backend
    JobDeleted,
    /// Fire-and-forget request to cancel a job
    RequestJobCancellation,
    /// Fire-and-forget request to delete a job
    RequestJobDeletion,
    /// An output cell was removed from the notebook
    OutputCellRemoved,
    /// Any other event name
    Other(String),
}

impl MessageKind {
    /// Wire name of the kind
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Run => "run",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Attach => "attach",
            Self::Update => "update",
            Self::ParameterChanged => "parameter-changed",
            Self::ParameterSync => "parameter-sync",
            Self::GetParameter => "get-parameter",
            Self::SyncAllParameters => "sync-all-parameters",
            Self::SyncAllDisplayParameters => "sync-all-display-parameters",
            Self::ResetToDefaults => "reset-to-defaults",
            Self::RunApp => "run-app",
            Self::ReRunApp => "re-run-app",
            Self::Cancel => "cancel",
            Self::Remove => "remove",
            Self::OnSuccess => "on-success",
            Self::NewState => "new-state",
            Self::RunStatus => "run-status",
            Self::LaunchStatus => "launch-status",
            Self::JobStatus => "job-status",
            Self::JobState => "job-state",
            Self::JobStateUpdated => "job-state-updated",
            Self::JobDeleted => "job-deleted",
            Self::RequestJobCancellation => "request-job-cancellation",
            Self::RequestJobDeletion => "request-job-deletion",
            Self::OutputCellRemoved => "output-cell-removed",
            Self::Other(name) => name,
        }
    }
}

impl FromStr for MessageKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "run" => Self::Run,
            "stop" => Self::Stop,
            "reset" => Self::Reset,
            "attach" => Self::Attach,
            "update" => Self::Update,
            "parameter-changed" => Self::ParameterChanged,
            "parameter-sync" => Self::ParameterSync,
            "get-parameter" => Self::GetParameter,
            "sync-all-parameters" => Self::SyncAllParameters,
            "sync-all-display-parameters" => Self::SyncAllDisplayParameters,
            "reset-to-defaults" => Self::ResetToDefaults,
            "run-app" => Self::RunApp,
            "re-run-app" => Self::ReRunApp,
            "cancel" => Self::Cancel,
            "remove" => Self::Remove,
            "on-success" => Self::OnSuccess,
            "new-state" => Self::NewState,
            "run-status" => Self::RunStatus,
            "launch-status" => Self::LaunchStatus,
            "job-status" => Self::JobStatus,
            "job-state" => Self::JobState,
            "job-state-updated" => Self::JobStateUpdated,
            "job-deleted" => Self::JobDeleted,
            "request-job-cancellation" => Self::RequestJobCancellation,
            "request-job-deletion" => Self::RequestJobDeletion,
            "output-cell-removed" => Self::OutputCellRemoved,
            other => Self::Other(other.to_string()),
        })
    }
}

impl From<&str> for MessageKind {
    fn from(name: &str) -> Self {
        match name.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from(name.as_str()))
    }
}

/// Correlates a request with its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Fresh correlation identity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification key of a send or a listener
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Key {
    /// Plain string key, matched exactly
    Name(String),
    /// Structural key; a listener without `parameter` accepts any parameter
    Typed {
        /// Kind of message
        kind: MessageKind,
        /// Optional parameter the message is about
        parameter: Option<String>,
    },
    /// Reply to the request with this correlation
    Reply(CorrelationId),
}

impl Key {
    /// String key
    #[inline]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Typed key without parameter
    #[inline]
    pub fn kind(kind: impl Into<MessageKind>) -> Self {
        Self::Typed {
            kind: kind.into(),
            parameter: None,
        }
    }

    /// Typed key pinned to one parameter
    #[inline]
    pub fn typed(kind: impl Into<MessageKind>, parameter: impl Into<String>) -> Self {
        Self::Typed {
            kind: kind.into(),
            parameter: Some(parameter.into()),
        }
    }

    /// Whether a listener holding `self` accepts a message sent with `sent`
    #[must_use]
    pub fn accepts(&self, sent: &Key) -> bool {
        match (self, sent) {
            (Self::Name(wanted), Self::Name(got)) => wanted == got,
            (
                Self::Typed {
                    kind: wanted_kind,
                    parameter: wanted_parameter,
                },
                Self::Typed {
                    kind: got_kind,
                    parameter: got_parameter,
                },
            ) => {
                wanted_kind == got_kind
                    && wanted_parameter
                        .as_ref()
                        .map_or(true, |p| got_parameter.as_ref() == Some(p))
            }
            (Self::Reply(wanted), Self::Reply(got)) => wanted == got,
            _ => false,
        }
    }
}

impl From<MessageKind> for Key {
    fn from(kind: MessageKind) -> Self {
        Self::kind(kind)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Typed {
                kind,
                parameter: None,
            } => write!(f, "{kind}"),
            Self::Typed {
                kind,
                parameter: Some(parameter),
            } => write!(f, "{kind}[{parameter}]"),
            Self::Reply(correlation) => write!(f, "reply:{correlation}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for name in ["run", "parameter-changed", "job-status", "on-success"] {
            assert_eq!(MessageKind::from(name).as_str(), name);
        }
        assert_eq!(MessageKind::from("talk"), MessageKind::Other("talk".into()));
    }

    #[test]
    fn typed_key_ignores_extra_fields_on_the_sent_side() {
        let listener = Key::kind(MessageKind::Update);
        assert!(listener.accepts(&Key::typed(MessageKind::Update, "p1")));
        assert!(listener.accepts(&Key::kind(MessageKind::Update)));
        assert!(!listener.accepts(&Key::kind(MessageKind::Run)));
    }

    #[test]
    fn pinned_parameter_must_match() {
        let listener = Key::typed(MessageKind::Update, "p1");
        assert!(listener.accepts(&Key::typed(MessageKind::Update, "p1")));
        assert!(!listener.accepts(&Key::typed(MessageKind::Update, "p2")));
        assert!(!listener.accepts(&Key::kind(MessageKind::Update)));
    }

    #[test]
    fn name_and_typed_keys_never_match() {
        assert!(!Key::name("test").accepts(&Key::kind("test")));
        assert!(Key::name("mykey").accepts(&Key::name("mykey")));
    }

    #[test]
    fn kind_serializes_as_its_name() {
        let json = serde_json::to_string(&MessageKind::JobDeleted).unwrap();
        assert_eq!(json, "\"job-deleted\"");
        let back: MessageKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MessageKind::JobDeleted);
    }
}
