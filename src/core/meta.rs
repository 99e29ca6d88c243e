use crate::domain::ports::GitHubApi;
use crate::utils::error::{Result, SyncError};

/// Fetches GitHub's meta document and pulls the CIDRs of one section
/// (`hooks`, `actions`, `pages`, ...). A section that is missing, or that is
/// not a list of CIDR strings, is an error rather than an empty list.
pub async fn fetch_meta_cidrs<A: GitHubApi + ?Sized>(api: &A, section: &str) -> Result<Vec<String>> {
    let meta = api.fetch_meta().await?;
    tracing::info!("Loaded GitHub Meta API CIDRs");

    meta.section(section)
        .ok_or_else(|| SyncError::MetadataSectionError {
            section: section.to_string(),
        })
}
