//! [`ElasticStore`]: audit containers as Elasticsearch indices.

use std::time::Duration;

use catalog_core::{
  audit::AuditRecord,
  store::{AuditStore, ContainerSettings, HistoryQuery},
};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Error, Result};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";

/// REST client for one Elasticsearch cluster.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct ElasticStore {
  client:   Client,
  base_url: String,
}

impl ElasticStore {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self::with_client(client, base_url))
  }

  pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_owned();
    Self { client, base_url }
  }

  pub fn base_url(&self) -> &str { &self.base_url }

  fn url(&self, path: &str) -> String { format!("{}/{path}", self.base_url) }
}

/// Index body for a new audit container. Snapshots are stored but not
/// indexed, so differently shaped entities never clash in one mapping.
fn index_body(settings: &ContainerSettings) -> serde_json::Value {
  json!({
    "settings": {
      "number_of_shards":   settings.shards,
      "number_of_replicas": settings.replicas,
      "max_result_window":  settings.max_result_window,
    },
    "mappings": {
      "properties": {
        "entityId":    { "type": "long" },
        "className":   { "type": "keyword" },
        "operation":   { "type": "keyword" },
        "updatedDate": { "type": "date" },
        "updatedBy":   { "type": "keyword" },
        "oldData":     { "type": "object", "enabled": false },
        "newData":     { "type": "object", "enabled": false },
        "metadata":    { "type": "object" },
      }
    }
  })
}

fn search_body(query: &HistoryQuery) -> serde_json::Value {
  let filter = match query.entity_id {
    Some(id) => json!({ "term": { "entityId": id } }),
    None => json!({ "match_all": {} }),
  };
  json!({
    "size":  query.size,
    "sort":  [{ "updatedDate": { "order": "desc" } }],
    "query": filter,
  })
}

async fn unexpected(method: &'static str, path: String, resp: Response) -> Error {
  let status = resp.status().as_u16();
  let body = resp.text().await.unwrap_or_default();
  Error::Status { method, path, status, body }
}

// ─── Response shapes ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct IndexResponse {
  #[serde(rename = "_id")]
  id: String,
}

#[derive(Deserialize)]
struct SearchResponse {
  hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
  hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
  #[serde(rename = "_source")]
  source: AuditRecord,
}

// ─── AuditStore impl ─────────────────────────────────────────────────────────

impl AuditStore for ElasticStore {
  type Error = Error;

  /// `HEAD /{container}`
  async fn container_exists(&self, container: &str) -> Result<bool> {
    let resp = self.client.head(self.url(container)).send().await?;
    match resp.status() {
      StatusCode::OK => Ok(true),
      StatusCode::NOT_FOUND => Ok(false),
      _ => Err(unexpected("HEAD", container.to_owned(), resp).await),
    }
  }

  /// `PUT /{container}`
  async fn create_container(
    &self,
    container: &str,
    settings: &ContainerSettings,
  ) -> Result<()> {
    let resp = self
      .client
      .put(self.url(container))
      .json(&index_body(settings))
      .send()
      .await?;

    let status = resp.status();
    if status.is_success() {
      return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST && body.contains(ALREADY_EXISTS) {
      debug!(container, "index created concurrently");
      return Ok(());
    }
    Err(Error::Status {
      method: "PUT",
      path: container.to_owned(),
      status: status.as_u16(),
      body,
    })
  }

  /// `POST /{container}/_doc?refresh=wait_for`
  async fn insert(&self, container: &str, record: &AuditRecord) -> Result<String> {
    let path = format!("{container}/_doc");
    let resp = self
      .client
      .post(self.url(&path))
      .query(&[("refresh", "wait_for")])
      .json(record)
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(unexpected("POST", path, resp).await);
    }
    let indexed: IndexResponse = resp.json().await?;
    Ok(indexed.id)
  }

  /// `POST /{container}/_search`
  async fn search(
    &self,
    container: &str,
    query: &HistoryQuery,
  ) -> Result<Vec<AuditRecord>> {
    let path = format!("{container}/_search");
    let resp = self
      .client
      .post(self.url(&path))
      .json(&search_body(query))
      .send()
      .await?;

    match resp.status() {
      StatusCode::NOT_FOUND => Ok(Vec::new()),
      s if s.is_success() => {
        let found: SearchResponse = resp.json().await?;
        Ok(found.hits.hits.into_iter().map(|hit| hit.source).collect())
      }
      _ => Err(unexpected("POST", path, resp).await),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn entity_filter_uses_term_query() {
    let body = search_body(&HistoryQuery { entity_id: Some(7), size: 25 });
    assert_eq!(body["size"], 25);
    assert_eq!(body["query"]["term"]["entityId"], 7);
    assert_eq!(body["sort"][0]["updatedDate"]["order"], "desc");

    let all = search_body(&HistoryQuery::default());
    assert!(all["query"]["match_all"].is_object());
  }

  #[test]
  fn index_body_carries_container_settings() {
    let body = index_body(&ContainerSettings::default());
    assert_eq!(body["settings"]["number_of_shards"], 1);
    assert_eq!(body["settings"]["number_of_replicas"], 1);
    assert_eq!(body["settings"]["max_result_window"], 10_000);
    assert_eq!(body["mappings"]["properties"]["entityId"]["type"], "long");
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let store = ElasticStore::with_client(Client::new(), "http://es:9200/");
    assert_eq!(store.url("product_updates"), "http://es:9200/product_updates");
  }
}
