//! Catalog built from the action definitions shipped with the crate.

use std::path::PathBuf;

use go_fault_executor::catalog::{
    common_matcher_flags, experiment_model, experiment_models, MatcherTable,
};
use go_fault_executor::registry::ActionRegistry;
use go_fault_executor::ExecutorConfig;

fn root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn test_shipped_catalog() {
    let registry = ActionRegistry::load(&root().join("actions")).unwrap();
    let matchers = MatcherTable::load(&root().join("matchers.toml")).unwrap();
    let model = experiment_model(registry.actions(), &matchers, &ExecutorConfig::default());

    let names: Vec<_> = model.actions.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["delay", "modify", "panic", "return"]);

    let modify = &model.actions[1];
    let flags: Vec<_> = modify.flags.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(flags, ["index", "value"]);
    assert!(modify.flags[1].required);

    let panic = &model.actions[2];
    assert!(panic.flags.is_empty());
    assert_eq!(panic.matchers, common_matcher_flags(&matchers));
}

#[test]
fn test_model_serializes_for_registration() {
    let registry = ActionRegistry::load(&root().join("actions")).unwrap();
    let model = experiment_model(
        registry.actions(),
        &MatcherTable::default(),
        &ExecutorConfig::default(),
    );
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["name"], "go");
    assert_eq!(json["flags"][0]["default"], "localhost");
    assert_eq!(json["flags"][1]["default"], "9526");
    assert!(json["flags"][2].get("default").is_none());
    assert_eq!(json["actions"][0]["categories"][0], "golang");
}

#[test]
fn test_registration_envelope() {
    let registry = ActionRegistry::load(&root().join("actions")).unwrap();
    let matchers = MatcherTable::load(&root().join("matchers.toml")).unwrap();
    let models = experiment_models(registry.actions(), &matchers, &ExecutorConfig::default());

    let json = serde_json::to_value(&models).unwrap();
    assert_eq!(json["version"], "v1");
    assert_eq!(json["kind"], "plugin");
    assert_eq!(json["models"].as_array().unwrap().len(), 1);
    assert_eq!(json["models"][0]["actions"].as_array().unwrap().len(), 4);
}
