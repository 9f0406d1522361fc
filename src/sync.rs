// ABOUTME: Push reconciliation of markdown documents into a Notion database
// ABOUTME: Resolves the page, replaces properties and blocks, writes the id back

use crate::api::{list_all_block_children, NotionApi, MAX_BLOCKS_PER_REQUEST};
use crate::block::Block;
use crate::config::PropertySchema;
use crate::convert::Converter;
use crate::document::{SkipReason, SyncDocument};
use crate::model::{CreatePage, DatabaseQuery, Page, Parent, UpdatePage};
use crate::storage::{write_page_id, SourceDocument};
use crate::util::page_url;
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How an existing page is located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Cached `notionPageId` first, slug lookup when it is absent or unknown
    #[default]
    Auto,
    /// Slug lookup only
    Slug,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub database_id: String,
    pub schema: PropertySchema,
    pub converter: Converter,
    pub resolution: Resolution,
    /// Send the first batch of blocks with the create call.
    pub inline_children: bool,
}

impl SyncOptions {
    pub fn new(database_id: impl Into<String>) -> Self {
        SyncOptions {
            database_id: database_id.into(),
            schema: PropertySchema::default(),
            converter: Converter::default(),
            resolution: Resolution::default(),
            inline_children: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Updated { page_id: String },
    Created { page_id: String },
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

/// Appends `blocks` in batches of [`MAX_BLOCKS_PER_REQUEST`]. Stops at the first failure.
pub fn append_blocks<A: NotionApi + ?Sized>(api: &A, page_id: &str, blocks: &[Block]) -> Result<()> {
    for (i, chunk) in blocks.chunks(MAX_BLOCKS_PER_REQUEST).enumerate() {
        if let Err(e) = api.append_block_children(page_id, chunk) {
            let kinds: Vec<&str> = chunk.iter().map(Block::type_name).collect();
            log::error!(
                "[{}] Error appending blocks chunk {}: {}",
                page_id,
                i + 1,
                e
            );
            log::error!("[{}] Failed chunk block types: {:?}", page_id, kinds);
            return Err(e);
        }
    }
    Ok(())
}

/// Deletes every child block, newest first. Per-block failures are logged and skipped.
/// Returns the number of blocks actually deleted.
pub fn clear_page_blocks<A: NotionApi + ?Sized>(api: &A, page_id: &str) -> Result<usize> {
    let existing = list_all_block_children(api, page_id)?;
    log::info!("[{}] Found {} blocks to delete", page_id, existing.len());

    let mut deleted = 0;
    for block in existing.iter().rev() {
        match api.delete_block(&block.id) {
            Ok(()) => deleted += 1,
            Err(e) if e.is_archived_block() => {
                log::info!("[{}] Skipping archived block {}", page_id, block.id);
            }
            Err(e) if e.is_conflict() => {
                log::warn!(
                    "[{}] Conflict deleting block {}, it may already be gone. Skipping.",
                    page_id,
                    block.id
                );
            }
            Err(e) => {
                log::warn!(
                    "[{}] Could not delete block {} ({}): {}",
                    page_id,
                    block.id,
                    block.kind,
                    e
                );
            }
        }
    }
    Ok(deleted)
}

/// First database page whose slug property equals `slug`.
pub fn find_page_by_slug<A: NotionApi + ?Sized>(
    api: &A,
    opts: &SyncOptions,
    slug: &str,
) -> Result<Option<Page>> {
    let query = DatabaseQuery {
        page_size: Some(1),
        ..DatabaseQuery::text_equals(&opts.schema.slug, slug)
    };
    let response = api.query_database(&opts.database_id, &query)?;
    Ok(response.results.into_iter().next())
}

/// Pushes the property update onto whichever page resolves first.
///
/// `Ok(None)` means no page exists and the caller should create one.
fn resolve_and_update<A: NotionApi + ?Sized>(
    api: &A,
    opts: &SyncOptions,
    doc: &SyncDocument,
    update: &UpdatePage,
) -> Result<Option<String>> {
    if opts.resolution == Resolution::Auto {
        if let Some(cached) = &doc.page_id {
            match api.update_page(cached, update) {
                Ok(page) => return Ok(Some(page.id)),
                Err(e) if e.is_object_not_found() => {
                    log::warn!(
                        "[{}] Page {} not found or archived, looking up by slug",
                        doc.path.display(),
                        cached
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    match find_page_by_slug(api, opts, &doc.slug)? {
        Some(page) => {
            log::info!(
                "[{}] Found existing page {} for slug '{}'",
                doc.path.display(),
                page.id,
                doc.slug
            );
            let page = api.update_page(&page.id, update)?;
            Ok(Some(page.id))
        }
        None => Ok(None),
    }
}

/// Reconciles one gated document with its remote page.
pub fn sync_document<A: NotionApi + ?Sized>(
    api: &A,
    opts: &SyncOptions,
    doc: &SyncDocument,
) -> Result<Outcome> {
    let blocks = opts.converter.convert(&doc.body);
    let properties = doc.properties(&opts.schema);
    let icon = doc.icon();

    let update = UpdatePage {
        properties: properties.clone(),
        icon: icon.clone(),
        archived: false,
    };

    if let Some(page_id) = resolve_and_update(api, opts, doc, &update)? {
        log::info!("[{}] Page properties and icon updated", page_id);

        clear_page_blocks(api, &page_id)?;
        append_blocks(api, &page_id, &blocks)?;
        log::info!("[{}] Appended {} blocks", page_id, blocks.len());

        if write_page_id(&doc.path, &page_id)? {
            log::info!("[{}] Updated front matter with notionPageId", doc.path.display());
        }
        log::info!(
            "[{}] Successfully updated page: {}",
            doc.path.display(),
            page_url(&page_id)
        );
        return Ok(Outcome::Updated { page_id });
    }

    log::info!(
        "[{}] No existing page with slug '{}', creating",
        doc.path.display(),
        doc.slug
    );
    let inline = if opts.inline_children {
        blocks.len().min(MAX_BLOCKS_PER_REQUEST)
    } else {
        0
    };
    let request = CreatePage {
        parent: Parent::DatabaseId {
            database_id: opts.database_id.clone(),
        },
        properties,
        icon,
        children: blocks[..inline].to_vec(),
    };
    let page = api.create_page(&request)?;
    log::info!("[{}] New page created with ID {}", doc.path.display(), page.id);

    append_blocks(api, &page.id, &blocks[inline..])?;
    write_page_id(&doc.path, &page.id)?;
    log::info!(
        "[{}] Successfully created page: {}",
        doc.path.display(),
        page_url(&page.id)
    );

    Ok(Outcome::Created { page_id: page.id })
}

/// Reads, gates and reconciles a single file.
pub fn sync_file<A: NotionApi + ?Sized>(api: &A, opts: &SyncOptions, path: &Path) -> Result<Outcome> {
    let source = SourceDocument::load(path)?;
    match SyncDocument::gate(&source) {
        Ok(doc) => sync_document(api, opts, &doc),
        Err(reason) => Ok(Outcome::Skipped(reason)),
    }
}

/// Syncs each file in order. Failures are logged and counted; the run continues.
pub fn sync_files<A: NotionApi + ?Sized>(api: &A, opts: &SyncOptions, files: &[PathBuf]) -> SyncReport {
    let mut report = SyncReport::default();

    let pb = ProgressBar::new(files.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} files {msg}") {
        pb.set_style(style.progress_chars("##-"));
    }

    for path in files {
        pb.set_message(path.display().to_string());
        log::info!("Processing file: {}", path.display());

        match sync_file(api, opts, path) {
            Ok(Outcome::Skipped(reason)) => {
                log::info!("[{}] Skipping: {}", path.display(), reason);
                report.skipped += 1;
            }
            Ok(Outcome::Updated { .. }) => report.updated += 1,
            Ok(Outcome::Created { .. }) => report.created += 1,
            Err(e) => {
                log::error!("[{}] Error processing file: {}", path.display(), e);
                report.failed.push(path.clone());
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "{} created, {} updated, {} skipped, {} failed",
        report.created,
        report.updated,
        report.skipped,
        report.failed.len()
    ));

    report
}

#[cfg(test)]
pub(crate) mod fake {
    use crate::api::NotionApi;
    use crate::block::Block;
    use crate::model::{
        BlockList, CreatePage, Database, DatabaseQuery, Page, QueryResponse, RemoteBlock,
        UpdatePage,
    };
    use crate::{Error, Result};
    use serde_json::{json, Map, Value};
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create { children: usize },
        Update { page_id: String },
        Retrieve { page_id: String },
        Query { slug: String },
        RetrieveDatabase,
        UpdateDatabase { names: Vec<String> },
        List { block_id: String },
        Append { block_id: String, count: usize },
        Delete { block_id: String },
    }

    /// In-memory Notion: pages hold ordered child blocks, every call is recorded.
    #[derive(Default)]
    pub struct FakeNotion {
        pub calls: RefCell<Vec<Call>>,
        pub pages: RefCell<HashMap<String, Vec<(String, Value)>>>,
        pub slugs: RefCell<HashMap<String, String>>,
        pub database_properties: RefCell<Map<String, Value>>,
        pub fail_append: bool,
        pub fail_delete: Option<&'static str>,
        pub next_id: RefCell<usize>,
    }

    impl FakeNotion {
        pub fn with_page(self, page_id: &str, slug: Option<&str>, blocks: usize) -> Self {
            let children = (0..blocks)
                .map(|i| {
                    (
                        format!("{}-old-{}", page_id, i),
                        json!({"type": "paragraph", "paragraph": {"rich_text": []}}),
                    )
                })
                .collect();
            self.pages.borrow_mut().insert(page_id.into(), children);
            if let Some(slug) = slug {
                self.slugs.borrow_mut().insert(slug.into(), page_id.into());
            }
            self
        }

        pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
            self.calls.borrow().iter().filter(|c| pred(c)).count()
        }

        pub fn block_values(&self, page_id: &str) -> Vec<Value> {
            self.pages.borrow()[page_id]
                .iter()
                .map(|(_, v)| v.clone())
                .collect()
        }

        fn not_found(endpoint: &str) -> Error {
            Error::Api {
                endpoint: endpoint.into(),
                status: 404,
                code: "object_not_found".into(),
                message: "Could not find object".into(),
            }
        }

        fn store(&self, page_id: &str, blocks: &[Block]) {
            let mut pages = self.pages.borrow_mut();
            let children = pages.entry(page_id.to_string()).or_default();
            for block in blocks {
                let mut next = self.next_id.borrow_mut();
                *next += 1;

                // Notion echoes each run's content back as plain_text
                let mut value = serde_json::to_value(block).unwrap();
                if let Some(runs) = value[block.type_name()]
                    .get_mut("rich_text")
                    .and_then(Value::as_array_mut)
                {
                    for run in runs {
                        run["plain_text"] = run["text"]["content"].clone();
                    }
                }
                children.push((format!("blk-{}", next), value));
            }
        }
    }

    impl NotionApi for FakeNotion {
        fn create_page(&self, request: &CreatePage) -> Result<Page> {
            self.calls.borrow_mut().push(Call::Create {
                children: request.children.len(),
            });
            let id = format!("page-{}", self.pages.borrow().len() + 1);
            self.pages.borrow_mut().insert(id.clone(), Vec::new());
            self.store(&id, &request.children);
            Ok(serde_json::from_value(json!({"id": id})).unwrap())
        }

        fn update_page(&self, page_id: &str, _request: &UpdatePage) -> Result<Page> {
            self.calls.borrow_mut().push(Call::Update {
                page_id: page_id.into(),
            });
            if !self.pages.borrow().contains_key(page_id) {
                return Err(Self::not_found("/v1/pages"));
            }
            Ok(serde_json::from_value(json!({"id": page_id})).unwrap())
        }

        fn retrieve_page(&self, page_id: &str) -> Result<Page> {
            self.calls.borrow_mut().push(Call::Retrieve {
                page_id: page_id.into(),
            });
            if !self.pages.borrow().contains_key(page_id) {
                return Err(Self::not_found("/v1/pages"));
            }
            Ok(serde_json::from_value(json!({"id": page_id})).unwrap())
        }

        fn query_database(&self, _: &str, query: &DatabaseQuery) -> Result<QueryResponse> {
            let slug = query
                .filter
                .as_ref()
                .map(|f| f.rich_text.equals.clone())
                .unwrap_or_default();
            self.calls.borrow_mut().push(Call::Query { slug: slug.clone() });
            let results = match self.slugs.borrow().get(&slug) {
                Some(id) => vec![serde_json::from_value(json!({"id": id})).unwrap()],
                None => vec![],
            };
            Ok(QueryResponse {
                results,
                has_more: false,
                next_cursor: None,
            })
        }

        fn retrieve_database(&self, database_id: &str) -> Result<Database> {
            self.calls.borrow_mut().push(Call::RetrieveDatabase);
            Ok(Database {
                id: database_id.into(),
                properties: self.database_properties.borrow().clone(),
            })
        }

        fn update_database(&self, database_id: &str, properties: &Map<String, Value>) -> Result<Database> {
            self.calls.borrow_mut().push(Call::UpdateDatabase {
                names: properties.keys().cloned().collect(),
            });
            let mut current = self.database_properties.borrow_mut();
            for (k, v) in properties {
                current.insert(k.clone(), v.clone());
            }
            Ok(Database {
                id: database_id.into(),
                properties: current.clone(),
            })
        }

        fn list_block_children(&self, block_id: &str, cursor: Option<&str>) -> Result<BlockList> {
            self.calls.borrow_mut().push(Call::List {
                block_id: block_id.into(),
            });
            let pages = self.pages.borrow();
            let children = pages
                .get(block_id)
                .ok_or_else(|| Self::not_found("/v1/blocks"))?;

            // Two-item pages to exercise cursor handling
            let start: usize = cursor.map(|c| c.parse().unwrap()).unwrap_or(0);
            let end = (start + 2).min(children.len());
            let results = children[start..end]
                .iter()
                .map(|(id, value)| {
                    let mut value = value.clone();
                    value["id"] = json!(id);
                    serde_json::from_value::<RemoteBlock>(value).unwrap()
                })
                .collect();
            Ok(BlockList {
                results,
                has_more: end < children.len(),
                next_cursor: (end < children.len()).then(|| end.to_string()),
            })
        }

        fn append_block_children(&self, block_id: &str, children: &[Block]) -> Result<BlockList> {
            self.calls.borrow_mut().push(Call::Append {
                block_id: block_id.into(),
                count: children.len(),
            });
            if self.fail_append {
                return Err(Error::Api {
                    endpoint: "/v1/blocks".into(),
                    status: 400,
                    code: "validation_error".into(),
                    message: "body failed validation".into(),
                });
            }
            self.store(block_id, children);
            Ok(BlockList {
                results: vec![],
                has_more: false,
                next_cursor: None,
            })
        }

        fn delete_block(&self, block_id: &str) -> Result<()> {
            self.calls.borrow_mut().push(Call::Delete {
                block_id: block_id.into(),
            });
            if let Some(code) = self.fail_delete {
                return Err(Error::Api {
                    endpoint: "/v1/blocks".into(),
                    status: 409,
                    code: code.into(),
                    message: "Can't edit block that is archived.".into(),
                });
            }
            for children in self.pages.borrow_mut().values_mut() {
                children.retain(|(id, _)| id != block_id);
            }
            Ok(())
        }
    }
}
