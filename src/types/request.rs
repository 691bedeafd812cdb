//! Inbound request types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticated caller identity.
///
/// The relay never derives this from request content; it is supplied by
/// whatever authentication layer fronts the relay. Operations that need
/// an identity fail with `AuthenticationRequired` when it is absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Create a caller identity from an opaque user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Request priority, consulted only at the emergency service level.
///
/// At `ServiceLevel::Emergency` only `Critical` requests proceed;
/// everything else is rejected until utilization drops or the period
/// rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Critical,
}

/// A single chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Message content.
    pub message: String,
    /// Optional context label (e.g. a conversation topic). Part of the
    /// cache fingerprint: the same message under a different context is
    /// a distinct cache entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl ChatRequest {
    /// Create a request with default (normal) priority and no context.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            priority: Priority::default(),
        }
    }

    /// Set the context label.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Mark the request as critical (passes the emergency gate).
    pub fn critical(mut self) -> Self {
        self.priority = Priority::Critical;
        self
    }
}

/// One unit of work within a batch call.
///
/// Items are heterogeneous; each is executed independently and its
/// outcome reported positionally (see [`BatchResult`](super::BatchResult)).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchItem {
    /// A chat request, subject to the budget gate and response cache.
    Chat(ChatRequest),
    /// Fetch recent conversation history for the caller.
    History {
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Fetch the caller's current usage snapshot.
    Usage,
}

/// A compound request: up to `MAX_BATCH_ITEMS` heterogeneous items
/// executed concurrently on behalf of one caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<BatchItem>,
}

impl BatchRequest {
    /// Create a batch from a list of items.
    pub fn new(requests: Vec<BatchItem>) -> Self {
        Self { requests }
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Whether the batch contains no items.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
