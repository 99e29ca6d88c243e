pub mod meta;
pub mod reconciler;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::domain::model::{
    Enterprise, IpAllowListEntry, ReconcileOutcome, ReconcileStrategy, ReconciliationRequest,
    SyncReport,
};
pub use crate::domain::ports::GitHubApi;
pub use crate::utils::error::Result;
