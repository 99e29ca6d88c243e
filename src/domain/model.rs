use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enterprise {
    /// GraphQL node id, used as the owner of allow list entries.
    pub id: String,
    pub slug: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAllowListEntry {
    pub id: String,
    pub name: Option<String>,
    pub allow_list_value: String,
    pub is_active: bool,
}

impl IpAllowListEntry {
    pub fn has_label(&self, label: &str) -> bool {
        self.name.as_deref() == Some(label)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryPage {
    pub entries: Vec<IpAllowListEntry>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIpAllowListEntry {
    pub owner_id: String,
    pub name: String,
    pub allow_list_value: String,
    pub is_active: bool,
}

/// GitHub requires the value and the active flag on every update, so an
/// update always carries the full entry state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAllowListEntryUpdate {
    #[serde(rename = "ipAllowListEntryId")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub allow_list_value: String,
    pub is_active: bool,
}

impl IpAllowListEntryUpdate {
    pub fn from_entry(entry: &IpAllowListEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            allow_list_value: entry.allow_list_value.clone(),
            is_active: entry.is_active,
        }
    }
}

/// GitHub's `/meta` document: section name to list of CIDRs, plus a few
/// non-CIDR fields (fingerprints, flags) that never resolve as a section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct MetaDocument(pub serde_json::Map<String, serde_json::Value>);

impl MetaDocument {
    pub fn section(&self, name: &str) -> Option<Vec<String>> {
        let values = self.0.get(name)?.as_array()?;
        values
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcileStrategy {
    /// One entry per CIDR, matched by value regardless of label.
    #[default]
    PerCidr,
    /// Entries sharing the label form one group whose values are replaced as a set.
    PerLabel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationRequest {
    pub enterprise_slug: String,
    pub cidrs: Vec<String>,
    pub label: String,
    pub active: bool,
}

impl ReconciliationRequest {
    pub fn meta_label(section: &str) -> String {
        format!("GitHub Meta CIDR for {}", section)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ReconcileOutcome {
    pub fn writes(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub enterprise: Option<Enterprise>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncReport {
    pub fn absorb(&mut self, outcome: &ReconcileOutcome) {
        self.created += outcome.created.len();
        self.updated += outcome.updated.len();
        self.unchanged += outcome.unchanged.len();
    }
}
