use crate::domain::model::ReconcileStrategy;
use crate::utils::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Optional TOML file carrying the same keys as the action inputs. Any value
/// given on the command line or in the environment wins over the file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub github_token: Option<String>,
    pub enterprise_slug: Option<String>,
    pub metadata_section: Option<String>,
    pub custom_cidrs: Option<CidrList>,
    pub custom_cidrs_label: Option<String>,
    pub active: Option<bool>,
    pub strategy: Option<ReconcileStrategy>,
    pub api_url: Option<String>,
    pub graphql_url: Option<String>,
}

/// `custom_cidrs` may be written either as the comma-separated input string
/// or as a TOML array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CidrList {
    Joined(String),
    List(Vec<String>),
}

impl CidrList {
    pub fn into_joined(self) -> String {
        match self {
            CidrList::Joined(value) => value,
            CidrList::List(values) => values.join(","),
        }
    }
}

impl FileConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
