//! Action catalog adapter.
//!
//! Projects the supported actions and the shared matcher table onto the flag
//! schemas advertised for command registration. Pure functions, no I/O.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExecutorConfig;
use crate::protocol::{FUNC_FLAG, HOST_FLAG, PORT_FLAG};

/// Experiment target name advertised to the orchestration layer.
pub const EXPERIMENT_NAME: &str = "go";
/// Category tag attached to every action.
pub const ACTION_CATEGORY: &str = "golang";
/// Version of the registration envelope.
pub const MODELS_VERSION: &str = "v1";
/// Kind of the registration envelope.
pub const MODELS_KIND: &str = "plugin";

/// How an action describes one of its flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FlagMeta {
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub no_args: bool,
    #[serde(default)]
    pub required: bool,
}

/// A fault action the agent supports.
pub trait FaultAction {
    fn name(&self) -> &str;

    /// Flags declared by the action, if any.
    fn flags(&self) -> Option<&BTreeMap<String, FlagMeta>>;
}

/// One advertised flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSchema {
    pub name: String,
    pub desc: String,
    pub no_args: bool,
    pub required: bool,
    pub required_when_destroyed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl FlagSchema {
    fn from_meta(name: &str, meta: &FlagMeta) -> Self {
        Self {
            name: name.to_string(),
            desc: meta.desc.clone(),
            no_args: meta.no_args,
            required: meta.required,
            required_when_destroyed: false,
            default: None,
        }
    }
}

/// Advertised schema of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionFlagSchema {
    pub name: String,
    pub aliases: Vec<String>,
    pub short_desc: String,
    pub long_desc: String,
    pub categories: Vec<String>,
    pub matchers: Vec<FlagSchema>,
    pub flags: Vec<FlagSchema>,
    pub process_hang: bool,
}

/// Matcher flags shared by every action. Built once at startup, read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatcherTable {
    #[serde(default)]
    flags: BTreeMap<String, FlagMeta>,
}

impl MatcherTable {
    pub fn new(flags: BTreeMap<String, FlagMeta>) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> &BTreeMap<String, FlagMeta> {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// The whole experiment model registered with the orchestration layer.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentModel {
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub flags: Vec<FlagSchema>,
    pub actions: Vec<ActionFlagSchema>,
}

/// Registration envelope around the experiment models.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentModels {
    pub version: String,
    pub kind: String,
    pub models: Vec<ExperimentModel>,
}

/// Project a flag map onto schemas, in name order.
fn project(flags: &BTreeMap<String, FlagMeta>) -> Vec<FlagSchema> {
    flags
        .iter()
        .map(|(name, meta)| FlagSchema::from_meta(name, meta))
        .collect()
}

/// Build the advertised schema for every action, in input order.
pub fn build_action_schemas<A: FaultAction>(
    actions: &[A],
    matchers: &MatcherTable,
) -> Vec<ActionFlagSchema> {
    let shared = common_matcher_flags(matchers);
    actions
        .iter()
        .map(|action| {
            let name = action.name().to_string();
            ActionFlagSchema {
                aliases: vec![name.clone()],
                short_desc: name.clone(),
                long_desc: name.clone(),
                categories: vec![ACTION_CATEGORY.to_string()],
                matchers: shared.clone(),
                flags: action.flags().map(project).unwrap_or_default(),
                process_hang: false,
                name,
            }
        })
        .collect()
}

/// Schemas of the matcher flags shared by every action.
pub fn common_matcher_flags(matchers: &MatcherTable) -> Vec<FlagSchema> {
    project(matchers.flags())
}

/// Connection and selector flags owned by the executor itself.
pub fn executor_flags(config: &ExecutorConfig) -> Vec<FlagSchema> {
    vec![
        FlagSchema {
            name: HOST_FLAG.to_string(),
            desc: format!(
                "Golang application host, default value is {}",
                config.agent_host
            ),
            no_args: false,
            required: false,
            required_when_destroyed: false,
            default: Some(config.agent_host.clone()),
        },
        FlagSchema {
            name: PORT_FLAG.to_string(),
            desc: format!(
                "Port of injection for Golang application, default value is {}",
                config.agent_port
            ),
            no_args: false,
            required: false,
            required_when_destroyed: false,
            default: Some(config.agent_port.clone()),
        },
        FlagSchema {
            name: FUNC_FLAG.to_string(),
            desc: "Golang application function".to_string(),
            no_args: false,
            required: true,
            required_when_destroyed: false,
            default: None,
        },
    ]
}

/// Assemble the `go` experiment model.
pub fn experiment_model<A: FaultAction>(
    actions: &[A],
    matchers: &MatcherTable,
    config: &ExecutorConfig,
) -> ExperimentModel {
    let desc = "Chaos engineering experiments for golang application".to_string();
    ExperimentModel {
        name: EXPERIMENT_NAME.to_string(),
        short_desc: desc.clone(),
        long_desc: desc,
        flags: executor_flags(config),
        actions: build_action_schemas(actions, matchers),
    }
}

/// Wrap the `go` experiment model in the registration envelope.
pub fn experiment_models<A: FaultAction>(
    actions: &[A],
    matchers: &MatcherTable,
    config: &ExecutorConfig,
) -> ExperimentModels {
    ExperimentModels {
        version: MODELS_VERSION.to_string(),
        kind: MODELS_KIND.to_string(),
        models: vec![experiment_model(actions, matchers, config)],
    }
}
