use mdnotion::api::{list_all_block_children, NotionApi, NotionClient};
use mdnotion::block::{Block, RichText};
use mdnotion::model::{DatabaseQuery, Properties, UpdatePage};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(uri: String) -> NotionClient {
    NotionClient::new("secret_token".into(), Some(uri))
        .unwrap()
        .disable_throttle()
}

#[tokio::test]
async fn test_update_page_sends_notion_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/page-1"))
        .and(header("Authorization", "Bearer secret_token"))
        .and(header("Notion-Version", "2022-06-28"))
        .and(body_partial_json(serde_json::json!({"archived": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "page",
            "id": "page-1",
            "archived": false,
            "last_edited_time": "2025-04-01T10:00:00.000Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();

    // Run blocking client in a blocking context
    let result = tokio::task::spawn_blocking(move || {
        client(uri).update_page(
            "page-1",
            &UpdatePage {
                properties: Properties::new(),
                icon: None,
                archived: false,
            },
        )
    })
    .await
    .unwrap();

    let page = result.unwrap();
    assert_eq!(page.id, "page-1");
    assert!(page.last_edited_time.is_some());
}

#[tokio::test]
async fn test_api_error_carries_notion_code() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/pages/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": "Could not find page with ID: missing."
        })))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(uri).update_page(
            "missing",
            &UpdatePage {
                properties: Properties::new(),
                icon: None,
                archived: false,
            },
        )
    })
    .await
    .unwrap();

    match result {
        Err(e @ mdnotion::Error::Api { .. }) => {
            assert!(e.is_object_not_found());
            if let mdnotion::Error::Api { status, .. } = e {
                assert_eq!(status, 404);
            }
        }
        other => panic!("Expected API error, got {:?}", other.map(|p| p.id)),
    }
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(serde_json::json!({
                    "object": "error",
                    "status": 429,
                    "code": "rate_limited",
                    "message": "You have been rate limited."
                })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/databases/db-1/query"))
        .and(body_partial_json(serde_json::json!({
            "filter": {"property": "Slug", "rich_text": {"equals": "hello"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "results": [{"object": "page", "id": "page-9"}],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || {
        client(uri).query_database("db-1", &DatabaseQuery::text_equals("Slug", "hello"))
    })
    .await
    .unwrap();

    let response = result.unwrap();
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].id, "page-9");
}

#[tokio::test]
async fn test_block_listing_follows_cursor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/page-1/children"))
        .and(query_param("start_cursor", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [{"id": "b3", "type": "divider", "divider": {}}],
            "has_more": false,
            "next_cursor": null
        })))
        .with_priority(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/blocks/page-1/children"))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {"id": "b1", "type": "paragraph", "paragraph": {"rich_text": []}},
                {"id": "b2", "type": "heading_1", "heading_1": {"rich_text": []}}
            ],
            "has_more": true,
            "next_cursor": "cursor-2"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    let result = tokio::task::spawn_blocking(move || list_all_block_children(&client(uri), "page-1"))
        .await
        .unwrap();

    let ids: Vec<String> = result.unwrap().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec!["b1", "b2", "b3"]);
}

#[tokio::test]
async fn test_append_sends_children() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/blocks/page-1/children"))
        .and(body_partial_json(serde_json::json!({
            "children": [{"type": "heading_1", "heading_1": {"rich_text": [{"text": {"content": "A"}}]}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [], "has_more": false, "next_cursor": null
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1/blocks/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "block", "id": "b1", "archived": true
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    tokio::task::spawn_blocking(move || {
        let client = client(uri);
        client.append_block_children("page-1", &[Block::heading(1, vec![RichText::plain("A")])])?;
        client.delete_block("b1")
    })
    .await
    .unwrap()
    .unwrap();
}
