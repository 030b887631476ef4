#![doc = "Notion integration for the CLI: implements the core `DocumentStore` contract over the Notion REST API."]
//
//! # Notion upload client
//!
//! [`NotionClient`] upserts one page per document under a configured parent
//! page. Notion has no native upsert, so an upsert is:
//! 1. list the parent's child pages and archive those with the same title,
//! 2. create the page with the first batch of blocks,
//! 3. append the remaining blocks in batches.
//!
//! The token is read from `NOTION_TOKEN` (a `.env` file is honoured).
//! Retry and rate limiting are left to the caller.

use async_trait::async_trait;
use md_notion_core::block::Block;
use md_notion_core::contract::{DocumentStore, PushError, UpsertedPage};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use std::env;

use crate::load_config::NotionSection;
use crate::notion::{append_children_body, create_page_body, MAX_CHILDREN_PER_REQUEST};

pub const TOKEN_ENV: &str = "NOTION_TOKEN";

pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    base_url: String,
    notion_version: String,
    parent_page_id: String,
}

#[derive(Debug, Deserialize)]
struct ChildrenPage {
    results: Vec<ChildBlock>,
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChildBlock {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    child_page: Option<ChildPage>,
}

#[derive(Debug, Deserialize)]
struct ChildPage {
    title: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

impl NotionClient {
    pub fn new(token: impl Into<String>, section: &NotionSection) -> Self {
        NotionClient {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: section.api_base_url.trim_end_matches('/').to_string(),
            notion_version: section.notion_version.clone(),
            parent_page_id: section.parent_page_id.clone(),
        }
    }

    pub fn new_from_env(section: &NotionSection) -> Result<Self, PushError> {
        dotenvy::dotenv().ok();
        match env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::info!(
                    parent_page_id = %section.parent_page_id,
                    base_url = %section.api_base_url,
                    "Initialized NotionClient from environment"
                );
                Ok(NotionClient::new(token.trim(), section))
            }
            Ok(_) => {
                tracing::error!("{TOKEN_ENV} is empty");
                Err(format!("{TOKEN_ENV} is empty").into())
            }
            Err(e) => {
                tracing::error!(error = ?e, "{TOKEN_ENV} missing in environment");
                Err(format!("{TOKEN_ENV} missing in environment: {e}").into())
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, PushError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.notion_version);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = ?e, %method, url = %url, "Notion request failed");
            e
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(%status, %method, url = %url, body = %text, "Notion API returned an error");
            return Err(format!("Notion API error {status} on {method} {path}: {text}").into());
        }
        Ok(response.json::<Value>().await?)
    }

    /// Ids of the parent's child pages titled `title`.
    async fn find_child_pages(&self, title: &str) -> Result<Vec<String>, PushError> {
        let mut found = Vec::new();
        let mut cursor: Option<String> = None;
        let path = format!("blocks/{}/children", self.parent_page_id);
        loop {
            let response = match cursor.as_deref() {
                Some(cursor) => {
                    let query = [("page_size", "100"), ("start_cursor", cursor)];
                    self.send(Method::GET, &path, &query, None).await?
                }
                None => self.send(Method::GET, &path, &[("page_size", "100")], None).await?,
            };
            let page: ChildrenPage = serde_json::from_value(response)?;
            found.extend(
                page.results
                    .into_iter()
                    .filter(|block| block.kind == "child_page")
                    .filter(|block| block.child_page.as_ref().is_some_and(|p| p.title == title))
                    .map(|block| block.id),
            );
            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl DocumentStore for NotionClient {
    async fn upsert(&self, title: &str, blocks: &[Block]) -> Result<UpsertedPage, PushError> {
        tracing::info!(title, blocks = blocks.len(), "Upserting Notion page");

        for page_id in self.find_child_pages(title).await? {
            tracing::info!(title, page_id = %page_id, "Archiving previous version of page");
            self.send(
                Method::PATCH,
                &format!("pages/{page_id}"),
                &[],
                Some(&serde_json::json!({ "archived": true })),
            )
            .await?;
        }

        let mut batches = blocks.chunks(MAX_CHILDREN_PER_REQUEST);
        let first = batches.next().unwrap_or(&[]);
        let body = create_page_body(&self.parent_page_id, title, first);
        let created: CreatedPage = serde_json::from_value(self.send(Method::POST, "pages", &[], Some(&body)).await?)?;
        tracing::info!(title, page_id = %created.id, "Created Notion page");

        for batch in batches {
            tracing::debug!(page_id = %created.id, blocks = batch.len(), "Appending block batch");
            self.send(
                Method::PATCH,
                &format!("blocks/{}/children", created.id),
                &[],
                Some(&append_children_body(batch)),
            )
            .await?;
        }

        Ok(UpsertedPage {
            page_id: created.id,
        })
    }
}
