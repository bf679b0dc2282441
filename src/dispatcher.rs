//! Injection dispatcher.
//!
//! Turns one experiment into exactly one POST against the in-process agent
//! and decodes the agent's answer. No retries, no caching: retry policy
//! belongs to the caller.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::config::ExecutorConfig;
use crate::error::{DispatchError, TransportFailure};
use crate::protocol::{
    AgentResponse, ExecContext, ExperimentDescription, InjectionRequest, Intent, FUNC_FLAG,
    HOST_FLAG, PORT_FLAG, TIMEOUT_FLAG,
};

/// Dispatches experiments to the agent over HTTP.
pub struct Dispatcher {
    agent: ureq::Agent,
    default_host: String,
    default_port: String,
    default_timeout: Duration,
    max_response_bytes: u64,
}

impl Dispatcher {
    pub fn new(config: &ExecutorConfig) -> Self {
        // Non-2xx answers are classified here, not by ureq.
        let agent = ureq::Agent::new_with_config(
            ureq::config::Config::builder()
                .http_status_as_error(false)
                .timeout_global(Some(config.http_timeout()))
                .build(),
        );

        Self {
            agent,
            default_host: config.agent_host.clone(),
            default_port: config.agent_port.clone(),
            default_timeout: config.http_timeout(),
            max_response_bytes: config.http_max_response_bytes,
        }
    }

    /// Dispatch an experiment and decode the agent's standard result envelope.
    pub fn dispatch(
        &self,
        experiment: &ExperimentDescription,
        ctx: &ExecContext,
    ) -> Result<AgentResponse, DispatchError> {
        self.dispatch_as(experiment, ctx)
    }

    /// Dispatch an experiment and decode the 200 body as `R`.
    ///
    /// The decoded value is returned as-is; whatever success or failure it
    /// reports is the agent's verdict, not this dispatcher's.
    pub fn dispatch_as<R: DeserializeOwned>(
        &self,
        experiment: &ExperimentDescription,
        ctx: &ExecContext,
    ) -> Result<R, DispatchError> {
        if ctx.intent == Intent::Inject && experiment.flag(FUNC_FLAG).is_none() {
            tracing::warn!(uid = %ctx.uid, action = %experiment.action, "missing `{FUNC_FLAG}` flag");
            return Err(DispatchError::MissingParameter {
                flag: FUNC_FLAG.to_string(),
            });
        }

        let url = self.agent_url(experiment, ctx.intent);

        let body = build_request_body(experiment).map_err(|source| {
            tracing::warn!(uid = %ctx.uid, %url, "build request body failed: {source}");
            DispatchError::PayloadBuildFailed {
                url: url.clone(),
                source,
            }
        })?;

        tracing::debug!(
            uid = %ctx.uid,
            %url,
            body = %String::from_utf8_lossy(&body),
            "posting experiment to agent"
        );

        let timeout = ctx.deadline.unwrap_or(self.default_timeout);
        let (status, raw) = self.post(&url, &body, timeout).map_err(|cause| {
            tracing::warn!(uid = %ctx.uid, %url, "post request failed: {cause}");
            DispatchError::TransportFailed {
                url: url.clone(),
                cause,
            }
        })?;

        if status != 200 {
            let body = String::from_utf8_lossy(&raw).into_owned();
            tracing::warn!(uid = %ctx.uid, %url, status, body = %body, "agent rejected request");
            return Err(DispatchError::TransportFailed {
                url,
                cause: TransportFailure::Status { status, body },
            });
        }

        serde_json::from_slice(&raw).map_err(|source| {
            let body = String::from_utf8_lossy(&raw).into_owned();
            tracing::error!(uid = %ctx.uid, body = %body, "unmarshal agent result failed: {source}");
            DispatchError::ResultDecodeFailed { body, source }
        })
    }

    /// Agent URL for an experiment. The path depends on the intent only.
    pub fn agent_url(&self, experiment: &ExperimentDescription, intent: Intent) -> String {
        let host = experiment.flag(HOST_FLAG).unwrap_or(&self.default_host);
        let port = experiment.flag(PORT_FLAG).unwrap_or(&self.default_port);
        format!("http://{host}:{port}{}", intent.path())
    }

    /// POST a JSON body and return the status with the raw body bytes.
    fn post(
        &self,
        url: &str,
        body: &[u8],
        timeout: Duration,
    ) -> Result<(u16, Vec<u8>), TransportFailure> {
        let response = self
            .agent
            .post(url)
            .content_type("application/json")
            .config()
            .timeout_global(Some(timeout))
            .build()
            .send(body)
            .map_err(classify)?;

        let status = response.status().as_u16();
        let raw = response
            .into_body()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_vec()
            .map_err(classify)?;

        Ok((status, raw))
    }
}

/// Map a ureq error onto the transport failure taxonomy.
fn classify(err: ureq::Error) -> TransportFailure {
    match err {
        ureq::Error::Timeout(t) => TransportFailure::Timeout(t.to_string()),
        ureq::Error::Io(io) if matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
            TransportFailure::Timeout(io.to_string())
        }
        other => TransportFailure::Connection(other.to_string()),
    }
}

/// Project an experiment onto the agent request.
///
/// `func` becomes the target. Connection flags, the experiment timeout,
/// empty values and `"false"` values are dropped.
pub fn injection_request(experiment: &ExperimentDescription) -> InjectionRequest {
    let mut target = None;
    let mut flags = BTreeMap::new();

    for (name, value) in &experiment.flags {
        if value.is_empty() || value == "false" || name == TIMEOUT_FLAG {
            continue;
        }
        match name.as_str() {
            FUNC_FLAG => target = Some(value.clone()),
            HOST_FLAG | PORT_FLAG => {}
            _ => {
                flags.insert(name.clone(), value.clone());
            }
        }
    }

    InjectionRequest {
        action: experiment.action.clone(),
        target,
        flags,
    }
}

/// Serialize the agent request body as compact JSON.
pub fn build_request_body(experiment: &ExperimentDescription) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&injection_request(experiment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(&ExecutorConfig::default())
    }

    #[test]
    fn test_modify_example_body() {
        let exp = ExperimentDescription::new("modify")
            .with_flag("func", "main.(*Business).Execute")
            .with_flag("userId", "1.3.0.1")
            .with_flag("value", "Hanmeimei")
            .with_flag("effect-count", "5");

        let body: serde_json::Value =
            serde_json::from_slice(&build_request_body(&exp).unwrap()).unwrap();
        let expected: serde_json::Value = serde_json::from_str(
            r#"{"action":"modify","target":"main.(*Business).Execute","flags":{"userId":"1.3.0.1","value":"Hanmeimei","effect-count":"5"}}"#,
        )
        .unwrap();
        assert_eq!(body, expected);
    }

    #[test]
    fn test_noise_flags_are_filtered() {
        let exp = ExperimentDescription::new("delay")
            .with_flag("host", "10.0.0.7")
            .with_flag("port", "9000")
            .with_flag("func", "main.handler")
            .with_flag("timeout", "60")
            .with_flag("empty", "")
            .with_flag("debug", "false")
            .with_flag("time", "3000")
            .with_flag("ignore", "true");

        let req = injection_request(&exp);
        assert_eq!(req.target.as_deref(), Some("main.handler"));
        assert_eq!(req.flags.len(), 2);
        assert_eq!(req.flags["time"], "3000");
        assert_eq!(req.flags["ignore"], "true");
    }

    #[test]
    fn test_false_literal_dropped_for_string_flags() {
        let exp = ExperimentDescription::new("modify").with_flag("value", "false");
        assert!(injection_request(&exp).flags.is_empty());
    }

    #[test]
    fn test_empty_func_is_not_a_target() {
        let exp = ExperimentDescription::new("panic").with_flag("func", "");
        let json = String::from_utf8(build_request_body(&exp).unwrap()).unwrap();
        assert_eq!(json, r#"{"action":"panic","flags":{}}"#);
    }

    #[test]
    fn test_agent_url_defaults() {
        let exp = ExperimentDescription::new("panic");
        assert_eq!(
            dispatcher().agent_url(&exp, Intent::Inject),
            "http://localhost:9526/inject"
        );
    }

    #[test]
    fn test_agent_url_from_flags() {
        let exp = ExperimentDescription::new("panic")
            .with_flag("host", "192.168.1.20")
            .with_flag("port", "18080");
        assert_eq!(
            dispatcher().agent_url(&exp, Intent::Recover),
            "http://192.168.1.20:18080/recover"
        );
    }

    #[test]
    fn test_recover_path_ignores_selector() {
        let d = dispatcher();
        let with = ExperimentDescription::new("delay").with_flag("func", "main.main");
        let without = ExperimentDescription::new("delay");
        assert!(d.agent_url(&with, Intent::Recover).ends_with("/recover"));
        assert!(d.agent_url(&without, Intent::Recover).ends_with("/recover"));
    }

    #[test]
    fn test_inject_without_selector_fails_fast() {
        let exp = ExperimentDescription::new("modify").with_flag("value", "x");
        let ctx = ExecContext::new("uid-1", Intent::Inject);
        let err = dispatcher().dispatch(&exp, &ctx).unwrap_err();
        assert!(matches!(err, DispatchError::MissingParameter { ref flag } if flag == "func"));
    }
}
