// ABOUTME: Front matter gate and Notion property mapping for source documents
// ABOUTME: Decides whether a file syncs and builds its page properties and icon

use crate::block::RichText;
use crate::config::PropertySchema;
use crate::model::{Icon, Properties, PropertyValue, SelectOption};
use crate::storage::{is_markdown, SourceDocument, PAGE_ID_KEY};
use std::fmt;
use std::path::PathBuf;

pub const SYNC_FLAG_KEY: &str = "notion";
pub const SLUG_KEYS: &[&str] = &["notion_slug", "slug"];
pub const TAG_KEYS: &[&str] = &["topics", "tags"];
pub const DIRECTORY_KEYS: &[&str] = &["notionDirectory", "notion-directory", "notionDir"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotMarkdown,
    NotEnabled,
    MissingTitle,
    MissingSlug,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotMarkdown => write!(f, "not a markdown file"),
            SkipReason::NotEnabled => write!(f, "'notion: true' is not set in front matter"),
            SkipReason::MissingTitle => write!(f, "title is missing in front matter"),
            SkipReason::MissingSlug => write!(f, "could not determine slug"),
        }
    }
}

/// The typed view of a document that passed the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncDocument {
    pub path: PathBuf,
    pub title: String,
    pub slug: String,
    pub tags: Vec<String>,
    pub published: bool,
    pub emoji: Option<String>,
    pub page_id: Option<String>,
    pub directory: Option<String>,
    pub body: String,
}

impl SyncDocument {
    pub fn gate(source: &SourceDocument) -> Result<SyncDocument, SkipReason> {
        if !is_markdown(&source.path) {
            return Err(SkipReason::NotMarkdown);
        }
        if !source.get_flag(SYNC_FLAG_KEY) {
            return Err(SkipReason::NotEnabled);
        }

        let title = source
            .get_str(&["title"])
            .ok_or(SkipReason::MissingTitle)?
            .to_string();

        let slug = source
            .get_str(SLUG_KEYS)
            .map(str::to_string)
            .or_else(|| {
                source
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .filter(|s| !s.is_empty())
            .ok_or(SkipReason::MissingSlug)?;

        Ok(SyncDocument {
            path: source.path.clone(),
            title,
            slug,
            tags: source.get_list(TAG_KEYS),
            published: source.get_flag("published"),
            emoji: source.get_str(&["emoji"]).map(str::to_string),
            page_id: source.get_str(&[PAGE_ID_KEY]).map(str::to_string),
            directory: source.get_str(DIRECTORY_KEYS).map(str::to_string),
            body: source.body.clone(),
        })
    }

    pub fn properties(&self, schema: &PropertySchema) -> Properties {
        let mut props = Properties::new();
        props.insert(
            schema.title.clone(),
            PropertyValue::Title {
                title: vec![RichText::plain(&self.title)],
            },
        );
        props.insert(
            schema.slug.clone(),
            PropertyValue::RichText {
                rich_text: vec![RichText::plain(&self.slug)],
            },
        );
        props.insert(
            schema.tags.clone(),
            PropertyValue::MultiSelect {
                multi_select: self
                    .tags
                    .iter()
                    .map(|t| SelectOption { name: t.clone() })
                    .collect(),
            },
        );
        props.insert(
            schema.published.clone(),
            PropertyValue::Checkbox {
                checkbox: self.published,
            },
        );
        if let Some(icon_property) = &schema.icon {
            props.insert(
                icon_property.clone(),
                PropertyValue::RichText {
                    rich_text: vec![RichText::plain(
                        self.emoji.as_deref().unwrap_or("📄"),
                    )],
                },
            );
        }
        props
    }

    pub fn icon(&self) -> Option<Icon> {
        self.emoji.as_ref().map(|e| Icon::Emoji { emoji: e.clone() })
    }
}
