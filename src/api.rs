// ABOUTME: Blocking HTTP client for the Notion REST API
// ABOUTME: Handles rate limiting, retries, auth headers, and Notion error bodies

use crate::block::Block;
use crate::model::{
    ApiErrorBody, BlockList, CreatePage, Database, DatabaseQuery, Page, QueryResponse,
    RemoteBlock, UpdatePage,
};
use crate::throttle::{retry_delay, RateLimiter, DEFAULT_RATE};
use crate::{Error, Result};
use reqwest::blocking::Client;
use reqwest::Method;
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.notion.com";
pub const NOTION_VERSION: &str = "2022-06-28";

/// Notion accepts at most this many children per append or create call.
pub const MAX_BLOCKS_PER_REQUEST: usize = 100;

const MAX_RETRIES: u32 = 3;

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}

/// The remote operations reconciliation needs.
///
/// [`NotionClient`] is the HTTP implementation; tests substitute recorders.
pub trait NotionApi {
    fn create_page(&self, request: &CreatePage) -> Result<Page>;
    fn update_page(&self, page_id: &str, request: &UpdatePage) -> Result<Page>;
    fn retrieve_page(&self, page_id: &str) -> Result<Page>;
    fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<QueryResponse>;
    fn retrieve_database(&self, database_id: &str) -> Result<Database>;
    fn update_database(&self, database_id: &str, properties: &Map<String, Value>)
        -> Result<Database>;
    fn list_block_children(&self, block_id: &str, start_cursor: Option<&str>) -> Result<BlockList>;
    fn append_block_children(&self, block_id: &str, children: &[Block]) -> Result<BlockList>;
    fn delete_block(&self, block_id: &str) -> Result<()>;
}

/// Lists every child block, following `next_cursor` until `has_more` is false.
pub fn list_all_block_children<A: NotionApi + ?Sized>(
    api: &A,
    block_id: &str,
) -> Result<Vec<RemoteBlock>> {
    let mut blocks = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api.list_block_children(block_id, cursor.as_deref())?;
        blocks.extend(page.results);
        match (page.has_more, page.next_cursor) {
            (true, Some(next)) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(blocks)
}

pub struct NotionClient {
    client: Client,
    base_url: String,
    token: String,
    limiter: Option<RateLimiter>,
}

impl NotionClient {
    pub fn new(token: String, base_url: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(NotionClient {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_API_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            token,
            limiter: Some(RateLimiter::new(DEFAULT_RATE)),
        })
    }

    pub fn with_rate(mut self, per_second: f64) -> Self {
        self.limiter = Some(RateLimiter::new(per_second));
        self
    }

    pub fn disable_throttle(mut self) -> Self {
        self.limiter = None;
        self
    }

    fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.acquire();
        }
    }

    fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut attempt = 0;

        let response = loop {
            self.throttle();

            let mut req = self
                .client
                .request(method.clone(), &url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header("Notion-Version", NOTION_VERSION)
                .header("Accept", "application/json")
                .header("User-Agent", "mdnotion/0.1 (Rust)");
            if let Some(body) = &body {
                req = req.json(body);
            }

            let response = req.send()?;
            let status = response.status().as_u16();
            if (status == 429 || status == 503) && attempt < MAX_RETRIES {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let delay = retry_delay(attempt, retry_after.as_deref());
                log::warn!(
                    "{} {} returned {}, retrying in {:?}",
                    method,
                    endpoint,
                    status,
                    delay
                );
                std::thread::sleep(delay);
                attempt += 1;
                continue;
            }
            break response;
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(body) => (body.code, body.message),
                Err(_) => (String::new(), truncate_str(&text, 200)),
            };
            return Err(Error::Api {
                endpoint: endpoint.into(),
                status: status.as_u16(),
                code,
                message,
            });
        }

        // Get response text for better error messages
        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            log::error!("Failed to parse response from {}: {}", endpoint, e);
            log::error!("Response body (first 500 chars): {}", truncate_str(&body, 500));
            Error::Parse(e)
        })
    }
}

impl NotionApi for NotionClient {
    fn create_page(&self, request: &CreatePage) -> Result<Page> {
        self.request(Method::POST, "/v1/pages", Some(serde_json::to_value(request)?))
    }

    fn update_page(&self, page_id: &str, request: &UpdatePage) -> Result<Page> {
        self.request(
            Method::PATCH,
            &format!("/v1/pages/{}", page_id),
            Some(serde_json::to_value(request)?),
        )
    }

    fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        self.request(Method::GET, &format!("/v1/pages/{}", page_id), None)
    }

    fn query_database(&self, database_id: &str, query: &DatabaseQuery) -> Result<QueryResponse> {
        self.request(
            Method::POST,
            &format!("/v1/databases/{}/query", database_id),
            Some(serde_json::to_value(query)?),
        )
    }

    fn retrieve_database(&self, database_id: &str) -> Result<Database> {
        self.request(Method::GET, &format!("/v1/databases/{}", database_id), None)
    }

    fn update_database(
        &self,
        database_id: &str,
        properties: &Map<String, Value>,
    ) -> Result<Database> {
        self.request(
            Method::PATCH,
            &format!("/v1/databases/{}", database_id),
            Some(json!({ "properties": properties })),
        )
    }

    fn list_block_children(&self, block_id: &str, start_cursor: Option<&str>) -> Result<BlockList> {
        let mut endpoint = format!(
            "/v1/blocks/{}/children?page_size={}",
            block_id, MAX_BLOCKS_PER_REQUEST
        );
        if let Some(cursor) = start_cursor {
            endpoint.push_str("&start_cursor=");
            endpoint.push_str(cursor);
        }
        self.request(Method::GET, &endpoint, None)
    }

    fn append_block_children(&self, block_id: &str, children: &[Block]) -> Result<BlockList> {
        self.request(
            Method::PATCH,
            &format!("/v1/blocks/{}/children", block_id),
            Some(json!({ "children": children })),
        )
    }

    fn delete_block(&self, block_id: &str) -> Result<()> {
        let _: Value = self.request(Method::DELETE, &format!("/v1/blocks/{}", block_id), None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_truncate_str_short() {
        assert_eq!(truncate_str("hello", 100), "hello");
    }

    #[test]
    fn test_truncate_str_long() {
        let result = truncate_str("hello world", 7);
        assert!(result.starts_with("hello"));
        assert!(result.ends_with("..."));
    }

    #[test]
    fn test_truncate_str_utf8() {
        // Multi-byte characters must not split mid-codepoint
        let text = "ページが見つかりません";
        let result = truncate_str(text, 10);
        assert!(!result.is_empty());
        assert!(result.len() <= 13);
    }

    #[test]
    fn test_client_defaults() {
        let client = NotionClient::new("secret".into(), None).unwrap();
        assert_eq!(client.base_url, "https://api.notion.com");
        assert_eq!(client.token, "secret");
        assert!(client.limiter.is_some());
    }

    #[test]
    fn test_client_custom_base_strips_slash() {
        let client = NotionClient::new("t".into(), Some("http://localhost:9000/".into())).unwrap();
        assert_eq!(client.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_client_rate_config() {
        let client = NotionClient::new("t".into(), None).unwrap().with_rate(10.0);
        assert_eq!(client.limiter.as_ref().map(|l| l.per_second()), Some(10.0));

        let client = client.disable_throttle();
        assert!(client.limiter.is_none());
    }

    struct PagedLister {
        pages: Vec<BlockList>,
        cursors: RefCell<Vec<Option<String>>>,
    }

    impl NotionApi for PagedLister {
        fn create_page(&self, _: &CreatePage) -> Result<Page> {
            unreachable!()
        }
        fn update_page(&self, _: &str, _: &UpdatePage) -> Result<Page> {
            unreachable!()
        }
        fn retrieve_page(&self, _: &str) -> Result<Page> {
            unreachable!()
        }
        fn query_database(&self, _: &str, _: &DatabaseQuery) -> Result<QueryResponse> {
            unreachable!()
        }
        fn retrieve_database(&self, _: &str) -> Result<Database> {
            unreachable!()
        }
        fn update_database(&self, _: &str, _: &Map<String, Value>) -> Result<Database> {
            unreachable!()
        }
        fn list_block_children(&self, _: &str, cursor: Option<&str>) -> Result<BlockList> {
            let mut seen = self.cursors.borrow_mut();
            seen.push(cursor.map(str::to_string));
            Ok(self.pages[seen.len() - 1].clone())
        }
        fn append_block_children(&self, _: &str, _: &[Block]) -> Result<BlockList> {
            unreachable!()
        }
        fn delete_block(&self, _: &str) -> Result<()> {
            unreachable!()
        }
    }

    fn remote(id: &str) -> RemoteBlock {
        serde_json::from_value(json!({"id": id, "type": "paragraph", "paragraph": {"rich_text": []}}))
            .unwrap()
    }

    #[test]
    fn test_list_all_follows_cursor() {
        let lister = PagedLister {
            pages: vec![
                BlockList {
                    results: vec![remote("a"), remote("b")],
                    has_more: true,
                    next_cursor: Some("c1".into()),
                },
                BlockList {
                    results: vec![remote("c")],
                    has_more: false,
                    next_cursor: None,
                },
            ],
            cursors: RefCell::new(vec![]),
        };

        let blocks = list_all_block_children(&lister, "page").unwrap();
        let ids: Vec<_> = blocks.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(*lister.cursors.borrow(), vec![None, Some("c1".to_string())]);
    }
}
