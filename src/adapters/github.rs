use crate::config::SyncConfig;
use crate::domain::model::{
    Enterprise, EntryPage, IpAllowListEntry, IpAllowListEntryUpdate, MetaDocument,
    NewIpAllowListEntry,
};
use crate::domain::ports::GitHubApi;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

const USER_AGENT: &str = concat!("ip-allowlist-sync/", env!("CARGO_PKG_VERSION"));
const ENTRIES_PAGE_SIZE: u32 = 100;

const ENTERPRISE_QUERY: &str = r#"
query($slug: String!) {
  enterprise(slug: $slug) {
    id
    slug
    name
    url
  }
}"#;

const ENTRIES_QUERY: &str = r#"
query($slug: String!, $first: Int!, $after: String) {
  enterprise(slug: $slug) {
    ownerInfo {
      ipAllowListEntries(first: $first, after: $after) {
        pageInfo {
          hasNextPage
          endCursor
        }
        nodes {
          id
          name
          allowListValue
          isActive
        }
      }
    }
  }
}"#;

const CREATE_MUTATION: &str = r#"
mutation($input: CreateIpAllowListEntryInput!) {
  createIpAllowListEntry(input: $input) {
    ipAllowListEntry {
      id
      name
      allowListValue
      isActive
    }
  }
}"#;

const UPDATE_MUTATION: &str = r#"
mutation($input: UpdateIpAllowListEntryInput!) {
  updateIpAllowListEntry(input: $input) {
    ipAllowListEntry {
      id
      name
      allowListValue
      isActive
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnterpriseData {
    enterprise: Option<Enterprise>,
}

#[derive(Debug, Deserialize)]
struct EntriesData {
    enterprise: Option<EnterpriseOwnerInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnterpriseOwnerInfo {
    owner_info: OwnerInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerInfo {
    ip_allow_list_entries: EntryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryConnection {
    page_info: PageInfo,
    nodes: Vec<IpAllowListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateData {
    create_ip_allow_list_entry: EntryPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateData {
    update_ip_allow_list_entry: EntryPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPayload {
    ip_allow_list_entry: IpAllowListEntry,
}

/// GitHub over HTTP: REST for `/meta`, GraphQL for everything enterprise.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    graphql_url: Url,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_url: Url, graphql_url: Url) -> Result<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            api_url,
            graphql_url,
            token: token.into(),
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(
            config.github_token.clone(),
            config.api_url.clone(),
            config.graphql_url.clone(),
        )
    }

    fn meta_url(&self) -> String {
        format!("{}/meta", self.api_url.as_str().trim_end_matches('/'))
    }

    async fn post_graphql(&self, query: &str, variables: Value) -> Result<GraphQlResponse> {
        tracing::debug!("GraphQL request to {}", self.graphql_url);
        let response = self
            .client
            .post(self.graphql_url.clone())
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T> {
        let envelope = self.post_graphql(query, variables).await?;
        if !envelope.errors.is_empty() {
            return Err(graphql_error(&envelope.errors));
        }
        let data = envelope.data.ok_or_else(|| SyncError::GraphQlError {
            message: "response carried no data".to_string(),
        })?;
        Ok(serde_json::from_value(data)?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    tracing::debug!("GitHub API response status: {}", status);
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::HttpStatusError {
        status: status.as_u16(),
        body,
    })
}

fn graphql_error(errors: &[GraphQlErrorEntry]) -> SyncError {
    SyncError::GraphQlError {
        message: errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn find_enterprise(&self, slug: &str) -> Result<Option<Enterprise>> {
        let envelope = self
            .post_graphql(ENTERPRISE_QUERY, json!({ "slug": slug }))
            .await?;

        // An unknown slug comes back as a NOT_FOUND error next to a null enterprise
        let not_found = envelope
            .errors
            .iter()
            .all(|e| e.kind.as_deref() == Some("NOT_FOUND"));
        if !envelope.errors.is_empty() && !not_found {
            return Err(graphql_error(&envelope.errors));
        }

        match envelope.data {
            Some(data) => Ok(serde_json::from_value::<EnterpriseData>(data)?.enterprise),
            None => Ok(None),
        }
    }

    async fn fetch_meta(&self) -> Result<MetaDocument> {
        let url = self.meta_url();
        tracing::debug!("Fetching GitHub meta from {}", url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn list_ip_allow_list_entries(
        &self,
        enterprise: &Enterprise,
        after: Option<&str>,
    ) -> Result<EntryPage> {
        let data: EntriesData = self
            .graphql(
                ENTRIES_QUERY,
                json!({ "slug": enterprise.slug, "first": ENTRIES_PAGE_SIZE, "after": after }),
            )
            .await?;

        let connection = data
            .enterprise
            .ok_or_else(|| SyncError::EnterpriseResolutionError {
                slug: enterprise.slug.clone(),
            })?
            .owner_info
            .ip_allow_list_entries;

        Ok(EntryPage {
            entries: connection.nodes,
            has_next_page: connection.page_info.has_next_page,
            end_cursor: connection.page_info.end_cursor,
        })
    }

    async fn create_ip_allow_list_entry(
        &self,
        entry: &NewIpAllowListEntry,
    ) -> Result<IpAllowListEntry> {
        let data: CreateData = self
            .graphql(CREATE_MUTATION, json!({ "input": entry }))
            .await?;
        Ok(data.create_ip_allow_list_entry.ip_allow_list_entry)
    }

    async fn update_ip_allow_list_entry(
        &self,
        update: &IpAllowListEntryUpdate,
    ) -> Result<IpAllowListEntry> {
        let data: UpdateData = self
            .graphql(UPDATE_MUTATION, json!({ "input": update }))
            .await?;
        Ok(data.update_ip_allow_list_entry.ip_allow_list_entry)
    }
}
