// ABOUTME: Links an unsynced markdown file to a fresh placeholder Notion page
// ABOUTME: Creates the page, then marks the file with notion, directory, and page id

use crate::api::NotionApi;
use crate::block::{Block, RichText};
use crate::config::PropertySchema;
use crate::document::SYNC_FLAG_KEY;
use crate::model::{CreatePage, Parent, Properties, PropertyValue};
use crate::storage::{SourceDocument, PAGE_ID_KEY};
use crate::Result;
use std::path::Path;

pub const DEFAULT_DIRECTORY: &str = "articles";
const PLACEHOLDER: &str = "This article is synchronized from the repository.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    AlreadyLinked,
    Linked { page_id: String },
}

pub fn link_file<A: NotionApi + ?Sized>(
    api: &A,
    database_id: &str,
    schema: &PropertySchema,
    path: &Path,
    directory: &str,
) -> Result<LinkOutcome> {
    let mut doc = SourceDocument::load(path)?;
    if doc.get_flag(SYNC_FLAG_KEY) {
        return Ok(LinkOutcome::AlreadyLinked);
    }

    let title = doc.get_str(&["title"]).unwrap_or("Untitled").to_string();
    let mut properties = Properties::new();
    properties.insert(
        schema.title.clone(),
        PropertyValue::Title {
            title: vec![RichText::plain(title)],
        },
    );

    let page = api.create_page(&CreatePage {
        parent: Parent::DatabaseId {
            database_id: database_id.to_string(),
        },
        properties,
        icon: None,
        children: vec![Block::paragraph(vec![RichText::plain(PLACEHOLDER)])],
    })?;

    doc.set(SYNC_FLAG_KEY, true);
    doc.set("notionDirectory", directory);
    doc.set(PAGE_ID_KEY, page.id.as_str());
    doc.save()?;

    Ok(LinkOutcome::Linked { page_id: page.id })
}
