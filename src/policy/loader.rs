//! YAML loading for policy lists

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Policy, PolicyConfig};
use crate::error::{Error, Result};

/// Top-level YAML document: an ordered list of policy configs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySet {
    #[serde(default)]
    pub policies: Vec<PolicyConfig>,
}

impl PolicySet {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Validate every config, then build the policies in order
    pub fn build(self) -> Result<Vec<Policy>> {
        for config in &self.policies {
            config.validate()?;
        }
        self.policies.into_iter().map(PolicyConfig::build).collect()
    }
}

/// Parse and build policies from a YAML string
pub fn load_policies_yaml(yaml: &str) -> Result<Vec<Policy>> {
    PolicySet::from_yaml(yaml)?.build()
}

/// Parse and build policies from a YAML file
pub fn load_policies_file<P: AsRef<Path>>(path: P) -> Result<Vec<Policy>> {
    let yaml = fs::read_to_string(path.as_ref()).map_err(|e| {
        Error::ConfigParse(format!("Failed to read {}: {e}", path.as_ref().display()))
    })?;
    load_policies_yaml(&yaml)
}
