//! Hook names, payloads, and the per-dispatch execution context.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hirehub_core::error::AppError;
use hirehub_core::result::AppResult;

use crate::error::HookError;

/// Conventional hook names used by the HireHub host.
///
/// The engine never validates against this list; any non-empty,
/// dot-namespaced name can be registered and dispatched.
pub mod names {
    /// A job posting was created.
    pub const JOB_CREATED: &str = "job.created";
    /// A job posting was updated.
    pub const JOB_UPDATED: &str = "job.updated";
    /// A job posting was closed.
    pub const JOB_CLOSED: &str = "job.closed";
    /// A candidate profile was created.
    pub const CANDIDATE_CREATED: &str = "candidate.created";
    /// A candidate moved to another pipeline stage.
    pub const CANDIDATE_STAGE_CHANGED: &str = "candidate.stage_changed";
    /// Fired before an interview is scheduled.
    pub const INTERVIEW_BEFORE_SCHEDULE: &str = "interview.before_schedule";
    /// An interview was scheduled.
    pub const INTERVIEW_SCHEDULED: &str = "interview.scheduled";
    /// Interview feedback was submitted.
    pub const INTERVIEW_FEEDBACK_SUBMITTED: &str = "interview.feedback_submitted";
}

/// Opaque, dot-namespaced hook key (`domain.event`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookName(String);

impl HookName {
    /// Creates a hook name, rejecting only the empty string.
    pub fn new(name: impl Into<String>) -> Result<Self, HookError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(HookError::EmptyName);
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the segment before the first dot (`job` for `job.created`).
    pub fn domain(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HookName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HookName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for HookName {
    type Error = HookError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Payload passed to hook handlers.
///
/// The engine treats `data` as opaque. Handlers interpret it themselves and
/// should use the fallible accessors rather than assuming a shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookPayload {
    /// Event data.
    pub data: serde_json::Value,
    /// The actor (user) who triggered this event.
    pub actor_id: Option<Uuid>,
    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,
}

impl HookPayload {
    /// Creates a payload around arbitrary JSON data.
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            actor_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Creates a payload with an empty JSON object.
    pub fn empty() -> Self {
        Self::new(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Sets the actor ID.
    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Inserts a field. A non-object payload is replaced by an object.
    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        if !self.data.is_object() {
            self.data = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(key.to_string(), value);
        }
        self
    }

    /// Gets a field by key, if the payload is an object.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Gets a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.as_str())
    }

    /// Gets an i64 field.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Gets a bool field.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Gets a UUID field.
    pub fn get_uuid(&self, key: &str) -> Option<Uuid> {
        self.get_str(key).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Decodes the whole payload into a typed structure.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            AppError::validation(format!("Payload does not match expected shape: {e}"))
        })
    }
}

impl Default for HookPayload {
    fn default() -> Self {
        Self::empty()
    }
}

/// Cancellation, deadline, and trace metadata for one dispatch.
///
/// Every handler of a dispatch sees the same trace ID, deadline, and
/// metadata. Each handler receives its own child cancellation token, so a
/// caller cancelling the parent reaches all of them, while the engine can
/// signal a single timed-out handler without touching its siblings.
///
/// Cancellation is cooperative: it prevents handlers that have not yet been
/// initiated from starting, but a running handler only stops early if it
/// observes [`ExecutionContext::cancellation_token`] itself.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    trace_id: Uuid,
    deadline: Option<Instant>,
    cancellation: CancellationToken,
    metadata: Arc<HashMap<String, String>>,
}

impl ExecutionContext {
    /// Creates a context with a fresh trace ID, no deadline, and no metadata.
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::now_v7(),
            deadline: None,
            cancellation: CancellationToken::new(),
            metadata: Arc::new(HashMap::new()),
        }
    }

    /// Uses an existing trace ID (e.g. from an incoming request).
    pub fn with_trace_id(mut self, trace_id: Uuid) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Sets an absolute deadline for the dispatch.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Uses the caller's cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Adds a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.metadata).insert(key.into(), value.into());
        self
    }

    /// Returns the trace ID.
    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the time left before the deadline, if any.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Returns whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Returns the cancellation token handlers should poll.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Gets a metadata value.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Derives the context handed to one handler: same trace data, child token.
    pub(crate) fn for_handler(&self) -> Self {
        Self {
            trace_id: self.trace_id,
            deadline: self.deadline,
            cancellation: self.cancellation.child_token(),
            metadata: Arc::clone(&self.metadata),
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
