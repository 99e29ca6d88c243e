use crate::domain::model::{
    Enterprise, IpAllowListEntry, IpAllowListEntryUpdate, NewIpAllowListEntry,
    ReconcileOutcome, ReconcileStrategy, ReconciliationRequest,
};
use crate::domain::ports::GitHubApi;
use crate::utils::error::{Result, SyncError};
use std::collections::{HashMap, HashSet};

/// Converges an enterprise's IP allow list toward one
/// [`ReconciliationRequest`]. Each call does its own list-then-write pass;
/// nothing is retried and successful writes are never rolled back.
pub struct CidrReconciler<'a, A: GitHubApi + ?Sized> {
    api: &'a A,
    strategy: ReconcileStrategy,
}

impl<'a, A: GitHubApi + ?Sized> CidrReconciler<'a, A> {
    pub fn new(api: &'a A, strategy: ReconcileStrategy) -> Self {
        Self { api, strategy }
    }

    pub async fn reconcile(
        &self,
        enterprise: &Enterprise,
        request: &ReconciliationRequest,
    ) -> Result<ReconcileOutcome> {
        let existing = self
            .fetch_all_entries(enterprise)
            .await
            .map_err(|e| SyncError::remote("list", &request.label, e))?;
        tracing::debug!(
            "Loaded {} IP allow list entries for {}",
            existing.len(),
            enterprise.slug
        );

        match self.strategy {
            ReconcileStrategy::PerCidr => self.reconcile_per_cidr(enterprise, request, existing).await,
            ReconcileStrategy::PerLabel => {
                self.reconcile_per_label(enterprise, request, existing).await
            }
        }
    }

    /// Drains every page of the listing; matching never runs on a partial view.
    pub async fn fetch_all_entries(&self, enterprise: &Enterprise) -> Result<Vec<IpAllowListEntry>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .api
                .list_ip_allow_list_entries(enterprise, cursor.as_deref())
                .await?;
            entries.extend(page.entries);

            if !page.has_next_page {
                break;
            }
            match page.end_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(SyncError::GraphQlError {
                        message: "allow list page reported more results without a cursor"
                            .to_string(),
                    })
                }
            }
        }

        Ok(entries)
    }

    async fn reconcile_per_cidr(
        &self,
        enterprise: &Enterprise,
        request: &ReconciliationRequest,
        existing: Vec<IpAllowListEntry>,
    ) -> Result<ReconcileOutcome> {
        let mut by_value: HashMap<String, IpAllowListEntry> = HashMap::new();
        for entry in existing {
            // First listed entry wins when the same value appears twice
            by_value.entry(entry.allow_list_value.clone()).or_insert(entry);
        }

        let mut outcome = ReconcileOutcome::default();
        let mut seen = HashSet::new();

        for cidr in &request.cidrs {
            if !seen.insert(cidr.as_str()) {
                continue;
            }

            match by_value.get(cidr) {
                Some(entry) if entry.is_active != request.active => {
                    let update = IpAllowListEntryUpdate {
                        is_active: request.active,
                        ..IpAllowListEntryUpdate::from_entry(entry)
                    };
                    let updated = self.update(cidr, &update).await?;
                    tracing::info!(
                        "{} existing IP allow list entry for {}",
                        if request.active { "Enabled" } else { "Disabled" },
                        cidr
                    );
                    by_value.insert(cidr.clone(), updated);
                    outcome.updated.push(cidr.clone());
                }
                Some(_) => {
                    tracing::info!("IP allow list entry for {} is already up to date", cidr);
                    outcome.unchanged.push(cidr.clone());
                }
                None => {
                    let created = self.create(enterprise, request, cidr).await?;
                    tracing::info!("Added new IP allow list entry for {}", cidr);
                    by_value.insert(cidr.clone(), created);
                    outcome.created.push(cidr.clone());
                }
            }
        }

        Ok(outcome)
    }

    async fn reconcile_per_label(
        &self,
        enterprise: &Enterprise,
        request: &ReconciliationRequest,
        existing: Vec<IpAllowListEntry>,
    ) -> Result<ReconcileOutcome> {
        let mut desired: Vec<&String> = Vec::new();
        let mut seen = HashSet::new();
        for cidr in &request.cidrs {
            if seen.insert(cidr.as_str()) {
                desired.push(cidr);
            }
        }

        let group: Vec<IpAllowListEntry> = existing
            .into_iter()
            .filter(|e| e.has_label(&request.label))
            .collect();

        if group.is_empty() {
            tracing::info!(
                "No IP allow list entries labelled '{}', creating {}",
                request.label,
                desired.len()
            );
        }

        let mut outcome = ReconcileOutcome::default();
        let mut surplus = Vec::new();
        let mut members: HashSet<&str> = HashSet::new();

        for entry in &group {
            let keep = desired.iter().any(|c| **c == entry.allow_list_value)
                && members.insert(entry.allow_list_value.as_str());
            if !keep {
                surplus.push(entry);
                continue;
            }

            let cidr = &entry.allow_list_value;
            if entry.is_active != request.active {
                let update = IpAllowListEntryUpdate {
                    is_active: request.active,
                    ..IpAllowListEntryUpdate::from_entry(entry)
                };
                self.update(cidr, &update).await?;
                tracing::info!("Updated active state of '{}' entry for {}", request.label, cidr);
                outcome.updated.push(cidr.clone());
            } else {
                tracing::info!("'{}' entry for {} is already up to date", request.label, cidr);
                outcome.unchanged.push(cidr.clone());
            }
        }

        let mut surplus = surplus.into_iter();
        for cidr in desired.into_iter().filter(|c| !members.contains(c.as_str())) {
            match surplus.next() {
                Some(entry) => {
                    let update = IpAllowListEntryUpdate {
                        id: entry.id.clone(),
                        name: Some(request.label.clone()),
                        allow_list_value: cidr.clone(),
                        is_active: request.active,
                    };
                    self.update(cidr, &update).await?;
                    tracing::info!(
                        "Replaced {} with {} in '{}' entries",
                        entry.allow_list_value,
                        cidr,
                        request.label
                    );
                    outcome.updated.push(cidr.clone());
                }
                None => {
                    self.create(enterprise, request, cidr).await?;
                    tracing::info!("Added new '{}' entry for {}", request.label, cidr);
                    outcome.created.push(cidr.clone());
                }
            }
        }

        // Leftover members no longer belong to the group; entries are never
        // deleted, so they are switched off instead.
        for entry in surplus {
            if !entry.is_active {
                continue;
            }
            let update = IpAllowListEntryUpdate {
                is_active: false,
                ..IpAllowListEntryUpdate::from_entry(entry)
            };
            self.update(&entry.allow_list_value, &update).await?;
            tracing::info!(
                "Disabled {} which is no longer part of '{}'",
                entry.allow_list_value,
                request.label
            );
            outcome.updated.push(entry.allow_list_value.clone());
        }

        Ok(outcome)
    }

    async fn create(
        &self,
        enterprise: &Enterprise,
        request: &ReconciliationRequest,
        cidr: &str,
    ) -> Result<IpAllowListEntry> {
        let new_entry = NewIpAllowListEntry {
            owner_id: enterprise.id.clone(),
            name: request.label.clone(),
            allow_list_value: cidr.to_string(),
            is_active: request.active,
        };
        self.api
            .create_ip_allow_list_entry(&new_entry)
            .await
            .map_err(|e| SyncError::remote("create", cidr, e))
    }

    async fn update(&self, cidr: &str, update: &IpAllowListEntryUpdate) -> Result<IpAllowListEntry> {
        self.api
            .update_ip_allow_list_entry(update)
            .await
            .map_err(|e| SyncError::remote("update", cidr, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{enterprise, entry, FakeGitHub};

    fn request(cidrs: &[&str], label: &str, active: bool) -> ReconciliationRequest {
        ReconciliationRequest {
            enterprise_slug: "acme".to_string(),
            cidrs: cidrs.iter().map(|c| c.to_string()).collect(),
            label: label.to_string(),
            active,
        }
    }

    #[tokio::test]
    async fn test_per_cidr_creates_missing_entry() {
        let api = FakeGitHub::new();
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let outcome = reconciler
            .reconcile(&enterprise(), &request(&["10.0.0.0/8"], "L", true))
            .await
            .unwrap();

        assert_eq!(outcome.created, vec!["10.0.0.0/8"]);
        assert!(api.updates().is_empty());
        assert_eq!(
            api.created(),
            vec![NewIpAllowListEntry {
                owner_id: "E_acme".to_string(),
                name: "L".to_string(),
                allow_list_value: "10.0.0.0/8".to_string(),
                is_active: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_per_cidr_activates_inactive_entry() {
        let api = FakeGitHub::new().with_entries(vec![entry("IALE_1", "Old", "10.0.0.0/8", false)]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let outcome = reconciler
            .reconcile(&enterprise(), &request(&["10.0.0.0/8"], "L", true))
            .await
            .unwrap();

        assert_eq!(outcome.updated, vec!["10.0.0.0/8"]);
        assert!(api.created().is_empty());
        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id, "IALE_1");
        assert!(updates[0].is_active);
        // Label and value are left alone
        assert_eq!(updates[0].name.as_deref(), Some("Old"));
        assert_eq!(updates[0].allow_list_value, "10.0.0.0/8");
    }

    #[tokio::test]
    async fn test_per_cidr_deactivates_when_requested_inactive() {
        let api = FakeGitHub::new().with_entries(vec![entry("IALE_1", "L", "10.0.0.0/8", true)]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let outcome = reconciler
            .reconcile(&enterprise(), &request(&["10.0.0.0/8"], "L", false))
            .await
            .unwrap();

        assert_eq!(outcome.updated, vec!["10.0.0.0/8"]);
        assert!(!api.updates()[0].is_active);
    }

    #[tokio::test]
    async fn test_per_cidr_matching_entry_is_noop() {
        let api = FakeGitHub::new().with_entries(vec![entry("IALE_1", "Other", "10.0.0.0/8", true)]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let outcome = reconciler
            .reconcile(&enterprise(), &request(&["10.0.0.0/8"], "L", true))
            .await
            .unwrap();

        assert_eq!(outcome.unchanged, vec!["10.0.0.0/8"]);
        assert_eq!(api.writes(), 0);
    }

    #[tokio::test]
    async fn test_per_cidr_rerun_is_idempotent() {
        let api = FakeGitHub::new();
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);
        let req = request(&["10.0.0.0/8", "192.168.0.0/16"], "L", true);

        reconciler.reconcile(&enterprise(), &req).await.unwrap();
        assert_eq!(api.writes(), 2);

        let second = reconciler.reconcile(&enterprise(), &req).await.unwrap();
        assert_eq!(second.writes(), 0);
        assert_eq!(api.writes(), 2);
    }

    #[tokio::test]
    async fn test_per_cidr_duplicate_cidr_created_once() {
        let api = FakeGitHub::new();
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let outcome = reconciler
            .reconcile(
                &enterprise(),
                &request(&["10.0.0.0/8", "10.0.0.0/8"], "L", true),
            )
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(api.created().len(), 1);
    }

    #[tokio::test]
    async fn test_drains_all_pages_before_matching() {
        let mut existing: Vec<IpAllowListEntry> = (0..5)
            .map(|i| entry(&format!("IALE_{}", i), "L", &format!("10.0.{}.0/24", i), true))
            .collect();
        existing.push(entry("IALE_last", "L", "172.16.0.0/12", true));

        let mut api = FakeGitHub::new().with_entries(existing);
        api.page_size = 2;
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let outcome = reconciler
            .reconcile(&enterprise(), &request(&["172.16.0.0/12"], "L", true))
            .await
            .unwrap();

        assert_eq!(outcome.unchanged, vec!["172.16.0.0/12"]);
        assert_eq!(api.writes(), 0);
        assert_eq!(api.calls(), vec!["list:start", "list:2", "list:4"]);
    }

    #[tokio::test]
    async fn test_write_failure_is_remote_error_and_keeps_earlier_writes() {
        let mut api = FakeGitHub::new();
        api.fail_writes_for = Some("192.168.0.0/16".to_string());
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerCidr);

        let err = reconciler
            .reconcile(
                &enterprise(),
                &request(&["10.0.0.0/8", "192.168.0.0/16", "172.16.0.0/12"], "L", true),
            )
            .await
            .unwrap_err();

        match err {
            SyncError::RemoteOperationError {
                operation, target, ..
            } => {
                assert_eq!(operation, "create");
                assert_eq!(target, "192.168.0.0/16");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // No rollback, no attempt after the failure
        let values: Vec<String> = api.entries().into_iter().map(|e| e.allow_list_value).collect();
        assert_eq!(values, vec!["10.0.0.0/8"]);
    }

    #[tokio::test]
    async fn test_per_label_creates_group_when_missing() {
        let api = FakeGitHub::new().with_entries(vec![entry("IALE_1", "Other", "10.0.0.0/8", true)]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerLabel);

        let outcome = reconciler
            .reconcile(
                &enterprise(),
                &request(&["10.0.0.0/8", "192.168.0.0/16"], "Office", true),
            )
            .await
            .unwrap();

        // Matching is by label, so an identical value under another label is ignored
        assert_eq!(outcome.created, vec!["10.0.0.0/8", "192.168.0.0/16"]);
        assert!(api.created().iter().all(|c| c.name == "Office"));
        assert!(api.updates().is_empty());
    }

    #[tokio::test]
    async fn test_per_label_replaces_group_values() {
        let api = FakeGitHub::new().with_entries(vec![
            entry("IALE_1", "Office", "10.0.0.0/8", true),
            entry("IALE_2", "Office", "1.1.1.0/24", true),
            entry("IALE_3", "Office", "2.2.2.0/24", true),
        ]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerLabel);

        let outcome = reconciler
            .reconcile(
                &enterprise(),
                &request(&["10.0.0.0/8", "192.168.0.0/16"], "Office", true),
            )
            .await
            .unwrap();

        assert_eq!(outcome.unchanged, vec!["10.0.0.0/8"]);
        assert_eq!(outcome.updated, vec!["192.168.0.0/16", "2.2.2.0/24"]);
        assert!(outcome.created.is_empty());

        let entries = api.entries();
        assert_eq!(entries[1].allow_list_value, "192.168.0.0/16");
        assert!(entries[1].is_active);
        assert_eq!(entries[2].allow_list_value, "2.2.2.0/24");
        assert!(!entries[2].is_active);
    }

    #[tokio::test]
    async fn test_per_label_grows_group_with_creates() {
        let api = FakeGitHub::new().with_entries(vec![entry("IALE_1", "Office", "10.0.0.0/8", false)]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerLabel);

        let outcome = reconciler
            .reconcile(
                &enterprise(),
                &request(&["10.0.0.0/8", "192.168.0.0/16"], "Office", true),
            )
            .await
            .unwrap();

        assert_eq!(outcome.updated, vec!["10.0.0.0/8"]);
        assert_eq!(outcome.created, vec!["192.168.0.0/16"]);
    }

    #[tokio::test]
    async fn test_per_label_matching_group_is_noop() {
        let api = FakeGitHub::new().with_entries(vec![
            entry("IALE_1", "Office", "10.0.0.0/8", true),
            entry("IALE_2", "Office", "192.168.0.0/16", true),
        ]);
        let reconciler = CidrReconciler::new(&api, ReconcileStrategy::PerLabel);

        let outcome = reconciler
            .reconcile(
                &enterprise(),
                &request(&["192.168.0.0/16", "10.0.0.0/8"], "Office", true),
            )
            .await
            .unwrap();

        assert_eq!(outcome.unchanged.len(), 2);
        assert_eq!(api.writes(), 0);
    }
}
