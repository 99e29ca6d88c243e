use crate::config::SyncConfig;
use crate::core::meta::fetch_meta_cidrs;
use crate::core::reconciler::CidrReconciler;
use crate::domain::model::{Enterprise, ReconciliationRequest, SyncReport};
use crate::domain::ports::GitHubApi;
use crate::utils::error::{Result, SyncError};

/// Drives one run: resolve the enterprise, then reconcile the meta-derived
/// CIDRs and the custom CIDRs, strictly one after the other.
pub struct SyncEngine<A: GitHubApi> {
    api: A,
    config: SyncConfig,
}

impl<A: GitHubApi> SyncEngine<A> {
    pub fn new(api: A, config: SyncConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let enterprise = self.resolve_enterprise().await?;
        tracing::info!("Enterprise account: {} : {}", enterprise.name, enterprise.url);

        let reconciler = CidrReconciler::new(&self.api, self.config.strategy);
        let mut report = SyncReport::default();

        if let Some(section) = &self.config.metadata_section {
            let cidrs = fetch_meta_cidrs(&self.api, section).await?;
            tracing::info!("GitHub meta CIDRs to add: {:?}", cidrs);
            let request = self.config.meta_request(section, cidrs);
            self.apply(&reconciler, &enterprise, &request, &mut report).await?;
        }

        if let Some(request) = self.config.custom_request() {
            tracing::info!("Custom CIDRs to add: {:?}", request.cidrs);
            self.apply(&reconciler, &enterprise, &request, &mut report).await?;
        }

        tracing::info!(
            "IP allow list sync finished: {} created, {} updated, {} unchanged",
            report.created,
            report.updated,
            report.unchanged
        );
        report.enterprise = Some(enterprise);
        Ok(report)
    }

    async fn resolve_enterprise(&self) -> Result<Enterprise> {
        let slug = &self.config.enterprise_slug;
        self.api
            .find_enterprise(slug)
            .await?
            .ok_or_else(|| SyncError::EnterpriseResolutionError { slug: slug.clone() })
    }

    async fn apply(
        &self,
        reconciler: &CidrReconciler<'_, A>,
        enterprise: &Enterprise,
        request: &ReconciliationRequest,
        report: &mut SyncReport,
    ) -> Result<()> {
        tracing::debug!(
            "Reconciling {} CIDRs under '{}' ({:?})",
            request.cidrs.len(),
            request.label,
            self.config.strategy
        );
        let outcome = reconciler.reconcile(enterprise, request).await?;
        report.absorb(&outcome);
        Ok(())
    }
}
