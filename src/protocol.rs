//! Experiment, agent wire and sidecar socket types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::error::DispatchError;

/// Flag naming the agent host.
pub const HOST_FLAG: &str = "host";
/// Flag naming the agent port.
pub const PORT_FLAG: &str = "port";
/// Flag selecting the target function (call site) of the fault.
pub const FUNC_FLAG: &str = "func";
/// Experiment-level timeout, consumed by the orchestration layer.
pub const TIMEOUT_FLAG: &str = "timeout";

/// One fault experiment as handed over by the orchestration layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExperimentDescription {
    /// Action name (e.g. "modify", "delay").
    pub action: String,
    /// Every user-supplied and default flag, connection flags included.
    pub flags: HashMap<String, String>,
}

impl ExperimentDescription {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            flags: HashMap::new(),
        }
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.flags.insert(name.into(), value.into());
        self
    }

    /// Value of a flag, treating an empty string as unset.
    pub fn flag(&self, name: &str) -> Option<&str> {
        self.flags
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Whether an experiment injects a fault or recovers from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Inject,
    Recover,
}

impl Intent {
    /// Map the orchestration layer's destroy marker to an intent.
    pub fn from_destroy(destroy: bool) -> Self {
        if destroy {
            Self::Recover
        } else {
            Self::Inject
        }
    }

    /// Agent endpoint path for this intent.
    pub fn path(self) -> &'static str {
        match self {
            Self::Inject => "/inject",
            Self::Recover => "/recover",
        }
    }
}

/// Execution context a dispatch runs under.
#[derive(Debug, Clone)]
pub struct ExecContext {
    /// Experiment uid, used for log correlation only.
    pub uid: String,
    pub intent: Intent,
    /// Caller deadline for the HTTP call. Falls back to the configured timeout.
    pub deadline: Option<Duration>,
}

impl ExecContext {
    pub fn new(uid: impl Into<String>, intent: Intent) -> Self {
        Self {
            uid: uid.into(),
            intent,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Body POSTed to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectionRequest {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub flags: BTreeMap<String, String>,
}

/// Result envelope returned by the agent. Passed through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub code: i32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub err: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub result: serde_json::Value,
}

/// A request read from the sidecar socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Inject or recover one experiment.
    Dispatch {
        /// Unique request ID for correlation.
        #[serde(default)]
        request_id: String,
        /// Experiment uid.
        #[serde(default)]
        uid: String,
        action: String,
        #[serde(default)]
        flags: HashMap<String, String>,
        /// Recover instead of inject.
        #[serde(default)]
        destroy: bool,
        /// Per-request deadline override in milliseconds.
        #[serde(default)]
        timeout_ms: Option<u64>,
    },
    /// Return the advertised experiment model.
    Catalog,
    Health,
}

/// A response written back to the sidecar socket.
#[derive(Debug, Serialize)]
pub struct Response {
    /// Whether the request was carried out. For dispatches this means the
    /// agent answered; the agent's own verdict lives in `data`.
    pub success: bool,
    pub message: String,
    /// Error kind, set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Response {
    pub fn success(message: String) -> Self {
        Self {
            success: true,
            message,
            kind: None,
            data: None,
        }
    }

    pub fn success_with_data(message: String, data: serde_json::Value) -> Self {
        Self {
            success: true,
            message,
            kind: None,
            data: Some(data),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message,
            kind: None,
            data: None,
        }
    }

    pub fn dispatch_error(err: &DispatchError) -> Self {
        Self {
            success: false,
            message: err.to_string(),
            kind: Some(err.kind()),
            data: None,
        }
    }
}
