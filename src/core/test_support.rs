use crate::domain::model::{
    Enterprise, EntryPage, IpAllowListEntry, IpAllowListEntryUpdate, MetaDocument,
    NewIpAllowListEntry,
};
use crate::domain::ports::GitHubApi;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory enterprise that records every call made against it.
pub struct FakeGitHub {
    pub enterprise: Option<Enterprise>,
    pub meta: serde_json::Value,
    pub page_size: usize,
    pub fail_writes_for: Option<String>,
    pub state: Mutex<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    pub entries: Vec<IpAllowListEntry>,
    pub next_id: usize,
    pub calls: Vec<String>,
    pub created: Vec<NewIpAllowListEntry>,
    pub updates: Vec<IpAllowListEntryUpdate>,
}

pub fn enterprise() -> Enterprise {
    Enterprise {
        id: "E_acme".to_string(),
        slug: "acme".to_string(),
        name: "Acme Corp".to_string(),
        url: "https://github.com/enterprises/acme".to_string(),
    }
}

pub fn entry(id: &str, name: &str, value: &str, active: bool) -> IpAllowListEntry {
    IpAllowListEntry {
        id: id.to_string(),
        name: Some(name.to_string()),
        allow_list_value: value.to_string(),
        is_active: active,
    }
}

impl FakeGitHub {
    pub fn new() -> Self {
        Self {
            enterprise: Some(enterprise()),
            meta: serde_json::json!({}),
            page_size: 100,
            fail_writes_for: None,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_entries(self, entries: Vec<IpAllowListEntry>) -> Self {
        self.state.lock().unwrap().entries = entries;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.created.len() + state.updates.len()
    }

    pub fn created(&self) -> Vec<NewIpAllowListEntry> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn updates(&self) -> Vec<IpAllowListEntryUpdate> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn entries(&self) -> Vec<IpAllowListEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    fn check_write(&self, value: &str) -> Result<()> {
        match &self.fail_writes_for {
            Some(failing) if failing == value => Err(SyncError::GraphQlError {
                message: format!("Could not write {}", value),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn find_enterprise(&self, slug: &str) -> Result<Option<Enterprise>> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("find_enterprise:{}", slug));
        Ok(self.enterprise.clone().filter(|e| e.slug == slug))
    }

    async fn fetch_meta(&self) -> Result<MetaDocument> {
        self.state.lock().unwrap().calls.push("fetch_meta".to_string());
        Ok(serde_json::from_value(self.meta.clone())?)
    }

    async fn list_ip_allow_list_entries(
        &self,
        _enterprise: &Enterprise,
        after: Option<&str>,
    ) -> Result<EntryPage> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("list:{}", after.unwrap_or("start")));

        let start: usize = after.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(state.entries.len());
        let has_next_page = end < state.entries.len();
        Ok(EntryPage {
            entries: state.entries[start..end].to_vec(),
            has_next_page,
            end_cursor: has_next_page.then(|| end.to_string()),
        })
    }

    async fn create_ip_allow_list_entry(
        &self,
        entry: &NewIpAllowListEntry,
    ) -> Result<IpAllowListEntry> {
        self.check_write(&entry.allow_list_value)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = IpAllowListEntry {
            id: format!("IALE_new{}", state.next_id),
            name: Some(entry.name.clone()),
            allow_list_value: entry.allow_list_value.clone(),
            is_active: entry.is_active,
        };
        state.calls.push(format!("create:{}", entry.allow_list_value));
        state.created.push(entry.clone());
        state.entries.push(created.clone());
        Ok(created)
    }

    async fn update_ip_allow_list_entry(
        &self,
        update: &IpAllowListEntryUpdate,
    ) -> Result<IpAllowListEntry> {
        self.check_write(&update.allow_list_value)?;
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("update:{}", update.id));
        state.updates.push(update.clone());
        let existing = state
            .entries
            .iter_mut()
            .find(|e| e.id == update.id)
            .ok_or_else(|| SyncError::GraphQlError {
                message: format!("Could not resolve to a node with the global id of '{}'", update.id),
            })?;
        existing.name = update.name.clone();
        existing.allow_list_value = update.allow_list_value.clone();
        existing.is_active = update.is_active;
        Ok(existing.clone())
    }
}
