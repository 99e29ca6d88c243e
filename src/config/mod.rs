pub mod file;

use crate::domain::model::{ReconcileStrategy, ReconciliationRequest};
use crate::utils::error::{Result, SyncError};
use crate::utils::logger::LogFormat;
use crate::utils::validation::{non_blank, validate_required_field, validate_url, Validate};
use clap::Parser;
use file::FileConfig;
use std::fmt;
use std::path::PathBuf;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Raw inputs. The env names match what an Actions runner exports for the
/// action's inputs, so the binary runs unchanged as a workflow step.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "ip-allowlist-sync")]
#[command(about = "Sync a GitHub Enterprise IP allow list with GitHub meta or custom CIDRs")]
pub struct CliConfig {
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(long, env = "INPUT_ENTERPRISE_SLUG")]
    pub enterprise_slug: Option<String>,

    #[arg(long, env = "INPUT_METADATA_SECTION", help = "Section of the GitHub meta API, e.g. hooks or actions")]
    pub metadata_section: Option<String>,

    #[arg(long, env = "INPUT_CUSTOM_CIDRS", help = "Comma-separated CIDR list")]
    pub custom_cidrs: Option<String>,

    #[arg(long, env = "INPUT_CUSTOM_CIDRS_LABEL")]
    pub custom_cidrs_label: Option<String>,

    #[arg(long, env = "INPUT_ACTIVE", help = "\"true\" activates added or updated entries")]
    pub active: Option<String>,

    #[arg(long, value_enum, env = "INPUT_STRATEGY")]
    pub strategy: Option<ReconcileStrategy>,

    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,

    #[arg(long, env = "GITHUB_GRAPHQL_URL")]
    pub graphql_url: Option<String>,

    #[arg(long, help = "TOML file with the same keys as the inputs")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Merges the optional config file under the CLI/env values and derives
    /// the immutable run configuration. Makes no network calls.
    pub fn resolve(&self) -> Result<SyncConfig> {
        let file = match &self.config {
            Some(path) => {
                tracing::debug!("Loading config file {}", path.display());
                FileConfig::from_file(path)?
            }
            None => FileConfig::default(),
        };

        let inputs = ConfigInputs::merge(self.clone(), file);
        SyncConfig::from_inputs(inputs)
    }
}

/// Unvalidated values after the CLI/env and file layers are merged.
#[derive(Debug, Clone, Default)]
pub struct ConfigInputs {
    pub github_token: Option<String>,
    pub enterprise_slug: Option<String>,
    pub metadata_section: Option<String>,
    pub custom_cidrs: Option<String>,
    pub custom_cidrs_label: Option<String>,
    pub active: Option<String>,
    pub strategy: Option<ReconcileStrategy>,
    pub api_url: Option<String>,
    pub graphql_url: Option<String>,
}

impl ConfigInputs {
    fn merge(cli: CliConfig, file: FileConfig) -> Self {
        Self {
            github_token: non_blank(cli.github_token).or(file.github_token),
            enterprise_slug: non_blank(cli.enterprise_slug).or(file.enterprise_slug),
            metadata_section: non_blank(cli.metadata_section).or(file.metadata_section),
            custom_cidrs: non_blank(cli.custom_cidrs)
                .or_else(|| file.custom_cidrs.map(|c| c.into_joined())),
            custom_cidrs_label: non_blank(cli.custom_cidrs_label).or(file.custom_cidrs_label),
            active: non_blank(cli.active).or_else(|| file.active.map(|a| a.to_string())),
            strategy: cli.strategy.or(file.strategy),
            api_url: non_blank(cli.api_url).or(file.api_url),
            graphql_url: non_blank(cli.graphql_url).or(file.graphql_url),
        }
    }
}

/// Splits a comma-separated CIDR input, trimming each element and dropping
/// the empty ones. Order is preserved.
pub fn parse_cidrs(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|cidr| !cidr.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct SyncConfig {
    pub github_token: String,
    pub enterprise_slug: String,
    pub metadata_section: Option<String>,
    pub custom_cidrs: Vec<String>,
    pub custom_cidrs_label: Option<String>,
    pub active: bool,
    pub strategy: ReconcileStrategy,
    pub api_url: Url,
    pub graphql_url: Url,
}

impl SyncConfig {
    pub fn from_inputs(inputs: ConfigInputs) -> Result<Self> {
        let github_token = validate_required_field("github_token", inputs.github_token)?;
        let enterprise_slug = validate_required_field("enterprise_slug", inputs.enterprise_slug)?;

        let api_url = validate_url(
            "api_url",
            non_blank(inputs.api_url).as_deref().unwrap_or(DEFAULT_API_URL),
        )?;
        // GHES serves GraphQL at /api/graphql next to /api/v3, which is what
        // joining onto the REST base yields.
        let graphql_url = match non_blank(inputs.graphql_url) {
            Some(url) => validate_url("graphql_url", &url)?,
            None => api_url
                .join("graphql")
                .map_err(|e| SyncError::InvalidConfigValueError {
                    field: "api_url".to_string(),
                    value: api_url.to_string(),
                    reason: e.to_string(),
                })?,
        };

        let config = Self {
            github_token,
            enterprise_slug,
            metadata_section: non_blank(inputs.metadata_section),
            custom_cidrs: inputs
                .custom_cidrs
                .as_deref()
                .map(parse_cidrs)
                .unwrap_or_default(),
            custom_cidrs_label: non_blank(inputs.custom_cidrs_label),
            active: inputs.active.as_deref().map(str::trim) == Some("true"),
            strategy: inputs.strategy.unwrap_or_default(),
            api_url,
            graphql_url,
        };
        config.validate()?;
        Ok(config)
    }

    /// Request for CIDRs pulled from the meta section, once they are known.
    pub fn meta_request(&self, section: &str, cidrs: Vec<String>) -> ReconciliationRequest {
        ReconciliationRequest {
            enterprise_slug: self.enterprise_slug.clone(),
            cidrs,
            label: ReconciliationRequest::meta_label(section),
            active: self.active,
        }
    }

    pub fn custom_request(&self) -> Option<ReconciliationRequest> {
        if self.custom_cidrs.is_empty() {
            return None;
        }
        Some(ReconciliationRequest {
            enterprise_slug: self.enterprise_slug.clone(),
            cidrs: self.custom_cidrs.clone(),
            label: self.custom_cidrs_label.clone().unwrap_or_default(),
            active: self.active,
        })
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        if self.metadata_section.is_none() && self.custom_cidrs.is_empty() {
            return Err(SyncError::config(
                "A set of custom CIDRS or GitHub meta CIDRs section must be specified.",
            ));
        }
        if !self.custom_cidrs.is_empty() && self.custom_cidrs_label.is_none() {
            return Err(SyncError::MissingConfigError {
                field: "custom_cidrs_label".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("github_token", &"***")
            .field("enterprise_slug", &self.enterprise_slug)
            .field("metadata_section", &self.metadata_section)
            .field("custom_cidrs", &self.custom_cidrs)
            .field("custom_cidrs_label", &self.custom_cidrs_label)
            .field("active", &self.active)
            .field("strategy", &self.strategy)
            .field("api_url", &self.api_url.as_str())
            .field("graphql_url", &self.graphql_url.as_str())
            .finish()
    }
}
