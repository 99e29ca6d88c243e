pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::GitHubClient;
pub use config::{parse_cidrs, CliConfig, SyncConfig};
pub use crate::core::{reconciler::CidrReconciler, sync::SyncEngine};
pub use domain::model::{ReconcileStrategy, ReconciliationRequest, SyncReport};
pub use domain::ports::GitHubApi;
pub use utils::error::{Result, SyncError};
