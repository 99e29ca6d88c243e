use crate::domain::model::{
    Enterprise, EntryPage, IpAllowListEntry, IpAllowListEntryUpdate, MetaDocument,
    NewIpAllowListEntry,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The slice of the GitHub API the sync needs. The reconciler only talks to
/// this trait, so tests can swap in an in-memory enterprise.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `Ok(None)` when no enterprise with that slug is visible to the token.
    async fn find_enterprise(&self, slug: &str) -> Result<Option<Enterprise>>;

    async fn fetch_meta(&self) -> Result<MetaDocument>;

    async fn list_ip_allow_list_entries(
        &self,
        enterprise: &Enterprise,
        after: Option<&str>,
    ) -> Result<EntryPage>;

    async fn create_ip_allow_list_entry(
        &self,
        entry: &NewIpAllowListEntry,
    ) -> Result<IpAllowListEntry>;

    async fn update_ip_allow_list_entry(
        &self,
        update: &IpAllowListEntryUpdate,
    ) -> Result<IpAllowListEntry>;
}
