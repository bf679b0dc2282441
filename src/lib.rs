//! Fault experiment executor for in-process Go fault-injection agents.
//!
//! Translates experiment descriptions into agent HTTP requests, decodes the
//! agent's answers, and advertises the supported actions for command
//! registration.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;

pub use catalog::{build_action_schemas, common_matcher_flags, FaultAction, MatcherTable};
pub use config::ExecutorConfig;
pub use dispatcher::{build_request_body, Dispatcher};
pub use error::{DispatchError, TransportFailure};
pub use protocol::{AgentResponse, ExecContext, ExperimentDescription, Intent};
