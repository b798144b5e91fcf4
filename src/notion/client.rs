use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::types::{ChildrenPage, QueryResponse, WriteBlock};
use super::{DONE_PROPERTY, READY_PROPERTY};
use crate::config::NotionSettings;
use crate::error::Result;
use crate::http::read_json;

/// Largest page the children endpoint returns, and the most children one append may carry.
pub const PAGE_SIZE: usize = 100;

/// Thin wrapper over the Notion REST endpoints the batch touches.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: Client,
    base: String,
    token: String,
    version: String,
    data_source_id: String,
}

impl NotionClient {
    pub fn new(settings: &NotionSettings) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            version: settings.version.clone(),
            data_source_id: settings.data_source_id.clone(),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base, path);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.version)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        read_json(request.send().await?).await
    }

    /// IDs of pages flagged ready and not yet done, at most `limit` of them.
    pub async fn query_ready_pages(&self, limit: usize) -> Result<Vec<String>> {
        let body = json!({
            "filter": {
                "and": [
                    { "property": READY_PROPERTY, "checkbox": { "equals": true } },
                    { "property": DONE_PROPERTY, "checkbox": { "equals": false } },
                ]
            },
            "page_size": limit,
        });
        let path = format!("/data_sources/{}/query", self.data_source_id);
        let response: QueryResponse = self.send(Method::POST, &path, &[], Some(&body)).await?;
        Ok(response.results.into_iter().map(|r| r.id).collect())
    }

    pub async fn list_children(&self, block_id: &str, cursor: Option<&str>) -> Result<ChildrenPage> {
        let page_size = PAGE_SIZE.to_string();
        let mut query = vec![("page_size", page_size.as_str())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor));
        }
        let path = format!("/blocks/{block_id}/children");
        self.send(Method::GET, &path, &query, None).await
    }

    pub async fn archive_block(&self, block_id: &str) -> Result<()> {
        let path = format!("/blocks/{block_id}");
        let _: Value = self
            .send(Method::PATCH, &path, &[], Some(&json!({ "archived": true })))
            .await?;
        Ok(())
    }

    /// Append up to [`PAGE_SIZE`] children under `block_id`.
    pub async fn append_children(&self, block_id: &str, children: &[WriteBlock]) -> Result<()> {
        let path = format!("/blocks/{block_id}/children");
        let body = json!({ "children": children });
        let _: Value = self.send(Method::PATCH, &path, &[], Some(&body)).await?;
        Ok(())
    }

    pub async fn update_page_properties(&self, page_id: &str, properties: Value) -> Result<()> {
        let path = format!("/pages/{page_id}");
        let body = json!({ "properties": properties });
        let _: Value = self.send(Method::PATCH, &path, &[], Some(&body)).await?;
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::test_config;
    use crate::error::Error;
    use crate::notion::types::WriteRichText;

    fn settings(base: &str) -> NotionSettings {
        test_config(base, "http://unused").notion
    }

    #[tokio::test]
    async fn query_sends_filter_and_returns_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/data_sources/ds-123/query"))
            .and(header("authorization", "Bearer secret"))
            .and(header("notion-version", "2025-09-03"))
            .and(body_json(json!({
                "filter": {
                    "and": [
                        { "property": "FB_READY", "checkbox": { "equals": true } },
                        { "property": "FB_DONE", "checkbox": { "equals": false } },
                    ]
                },
                "page_size": 5,
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "results": [{ "id": "page-1" }, { "id": "page-2" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = NotionClient::new(&settings(&server.uri())).unwrap();
        let ids = client.query_ready_pages(5).await.unwrap();
        assert_eq!(ids, vec!["page-1", "page-2"]);
    }

    #[tokio::test]
    async fn list_children_passes_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocks/block-abc/children"))
            .and(query_param("page_size", "100"))
            .and(query_param("start_cursor", "cursor-xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "id": "b1", "type": "paragraph", "has_children": false,
                              "paragraph": { "rich_text": [{ "plain_text": "text" }] } }],
                "has_more": false,
                "next_cursor": null,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = NotionClient::new(&settings(&server.uri())).unwrap();
        let page = client.list_children("block-abc", Some("cursor-xyz")).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn append_serializes_write_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/container/children"))
            .and(body_json(json!({
                "children": [{
                    "object": "block",
                    "type": "paragraph",
                    "paragraph": { "rich_text": [{ "type": "text", "text": { "content": "hi" } }] }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = NotionClient::new(&settings(&server.uri())).unwrap();
        let blocks = [WriteBlock::Paragraph { rich_text: vec![WriteRichText::plain("hi")] }];
        client.append_children("container", &blocks).await.unwrap();
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/pages/page-1"))
            .respond_with(ResponseTemplate::new(409).set_body_string("{\"code\":\"conflict_error\"}"))
            .mount(&server)
            .await;

        let client = NotionClient::new(&settings(&server.uri())).unwrap();
        let err = client
            .update_page_properties("page-1", json!({}))
            .await
            .unwrap_err();
        match err {
            Error::Http { status, status_text, url, body } => {
                assert_eq!(status, 409);
                assert_eq!(status_text, "Conflict");
                assert!(url.ends_with("/pages/page-1"));
                assert!(body.contains("conflict_error"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn archive_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/blocks/old-1"))
            .and(body_json(json!({ "archived": true })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = NotionClient::new(&settings(&server.uri())).unwrap();
        client.archive_block("old-1").await.unwrap();
    }
}
