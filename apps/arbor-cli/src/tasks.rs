//! YAML task files: one connection block plus an ordered list of actions.

use std::fs;
use std::path::Path;

use arbor_client::DirectoryConfig;
use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// A parsed task file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFile {
    pub connection: DirectoryConfig,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// One action to run, with its keyword arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Display name for reporting; defaults to the action name.
    #[serde(default)]
    pub name: Option<String>,
    pub action: String,
    #[serde(default)]
    pub with: serde_json::Value,
}

impl Task {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.action)
    }
}

impl TaskFile {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| CliError::TaskFile(format!("cannot read {}: {err}", path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|err| CliError::TaskFile(format!("cannot parse {}: {err}", path.display())))
    }
}
