use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API responded with status {status}: {body}")]
    HttpStatusError { status: u16, body: String },

    #[error("GraphQL error: {message}")]
    GraphQlError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required input: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Enterprise '{slug}' could not be resolved")]
    EnterpriseResolutionError { slug: String },

    #[error("The metadata CIDRs for '{section}' were unable to be resolved")]
    MetadataSectionError { section: String },

    #[error("Failed to {operation} IP allow list entry for {target}: {source}")]
    RemoteOperationError {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<SyncError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Resolution,
    Remote,
    Transport,
}

impl SyncError {
    pub fn config(message: impl Into<String>) -> Self {
        SyncError::ConfigError {
            message: message.into(),
        }
    }

    pub fn remote(operation: &'static str, target: impl Into<String>, source: SyncError) -> Self {
        SyncError::RemoteOperationError {
            operation,
            target: target.into(),
            source: Box::new(source),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::ConfigError { .. }
            | SyncError::MissingConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::TomlError(_)
            | SyncError::IoError(_) => ErrorCategory::Configuration,
            SyncError::EnterpriseResolutionError { .. }
            | SyncError::MetadataSectionError { .. } => ErrorCategory::Resolution,
            SyncError::RemoteOperationError { .. } => ErrorCategory::Remote,
            SyncError::ApiError(_)
            | SyncError::HttpStatusError { .. }
            | SyncError::GraphQlError { .. }
            | SyncError::SerializationError(_) => ErrorCategory::Transport,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the github_token, enterprise_slug and CIDR source inputs"
            }
            ErrorCategory::Resolution => {
                "Verify the enterprise slug and the GitHub meta section name"
            }
            ErrorCategory::Remote => {
                "Ensure the token has the admin:enterprise scope; entries written before the failure were kept"
            }
            ErrorCategory::Transport => "Check network access to the GitHub API and the token validity",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
