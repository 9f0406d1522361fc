// ABOUTME: Serde data models for Notion API requests and responses
// ABOUTME: Tolerant parsing with optional fields and untyped property payloads

use crate::block::{Block, RichText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

/// A page property value as sent on create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    MultiSelect { multi_select: Vec<SelectOption> },
    Checkbox { checkbox: bool },
}

pub type Properties = BTreeMap<String, PropertyValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parent {
    DatabaseId { database_id: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePage {
    pub parent: Parent,
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatePage {
    pub properties: Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub last_edited_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextFilter {
    pub equals: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyFilter {
    pub property: String,
    pub rich_text: TextFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<PropertyFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

impl DatabaseQuery {
    /// Exact match on a rich-text property.
    pub fn text_equals(property: &str, value: &str) -> Self {
        DatabaseQuery {
            filter: Some(PropertyFilter {
                property: property.to_string(),
                rich_text: TextFilter {
                    equals: value.to_string(),
                },
            }),
            page_size: None,
            start_cursor: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A child block as returned by the block listing endpoint.
///
/// The type-specific payload stays untyped: listing is used for deletion and
/// for best-effort rendering, and pages can hold block types we never emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RemoteBlock {
    /// The object stored under the block's own type key, e.g. `paragraph`.
    pub fn body(&self) -> Option<&Value> {
        self.payload.get(&self.kind)
    }

    pub fn rich_text(&self) -> Vec<RemoteRichText> {
        self.body()
            .and_then(|b| b.get("rich_text"))
            .and_then(|rt| serde_json::from_value(rt.clone()).ok())
            .unwrap_or_default()
    }
}

/// Rich text as Notion returns it, with the rendered `plain_text`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteRichText {
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: crate::block::Annotations,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockList {
    #[serde(default)]
    pub results: Vec<RemoteBlock>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Error body Notion returns alongside non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
