//! Supported action registry.
//!
//! Loads action definitions from .toml files in the action directory, and
//! the shared matcher table from its own file.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::catalog::{FaultAction, FlagMeta, MatcherTable};

/// An action definition, loaded from `<action>.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionDef {
    /// Action name (e.g. "delay").
    pub name: String,
    /// Flags declared by the action.
    #[serde(default)]
    pub flags: Option<BTreeMap<String, FlagMeta>>,
}

impl FaultAction for ActionDef {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> Option<&BTreeMap<String, FlagMeta>> {
        self.flags.as_ref()
    }
}

/// Registry of supported actions, in name order.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: Vec<ActionDef>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all .toml files from a directory. Each file defines one action;
    /// a file that fails to parse is logged and skipped.
    pub fn load(action_dir: &Path) -> anyhow::Result<Self> {
        let mut registry = Self::new();

        if !action_dir.exists() {
            tracing::warn!(
                "action directory {} does not exist, starting with empty registry",
                action_dir.display()
            );
            return Ok(registry);
        }

        let entries = std::fs::read_dir(action_dir)
            .with_context(|| format!("failed to read action dir {}", action_dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match Self::load_action_toml(&path) {
                Ok(def) => {
                    tracing::info!("loaded action '{}' from {}", def.name, path.display());
                    registry.register(def);
                }
                Err(e) => tracing::warn!("failed to load {}: {e:#}", path.display()),
            }
        }

        Ok(registry)
    }

    fn load_action_toml(path: &Path) -> anyhow::Result<ActionDef> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Register an action, replacing any previous one with the same name.
    pub fn register(&mut self, def: ActionDef) {
        match self.actions.binary_search_by(|a| a.name.cmp(&def.name)) {
            Ok(i) => self.actions[i] = def,
            Err(i) => self.actions.insert(i, def),
        }
    }

    pub fn actions(&self) -> &[ActionDef] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl MatcherTable {
    /// Load the shared matcher table. A missing file yields an empty table.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!("matcher file {} does not exist, no matcher flags", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }
}
