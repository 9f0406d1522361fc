// ABOUTME: Pulls Notion page content back into markdown files
// ABOUTME: Keeps the source front matter and writes into the document's target directory

use crate::api::{list_all_block_children, NotionApi};
use crate::document::{DIRECTORY_KEYS, SYNC_FLAG_KEY};
use crate::render::render_markdown;
use crate::storage::{render_document, write_atomic, SourceDocument, PAGE_ID_KEY};
use crate::util::pull_target;
use crate::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    Written(PathBuf),
    Skipped(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PullReport {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
    pub failed: Vec<PathBuf>,
}

/// Pulls one document if it opts in, has a target directory and a page id.
pub fn pull_file<A: NotionApi + ?Sized>(api: &A, repo_root: &Path, path: &Path) -> Result<PullOutcome> {
    let source = SourceDocument::load(path)?;

    if !source.get_flag(SYNC_FLAG_KEY) {
        return Ok(PullOutcome::Skipped("'notion: true' is not set".into()));
    }
    let Some(directory) = source.get_str(DIRECTORY_KEYS) else {
        return Ok(PullOutcome::Skipped("no Notion directory specified".into()));
    };
    let Some(page_id) = source.get_str(&[PAGE_ID_KEY]) else {
        return Ok(PullOutcome::Skipped("no Notion page ID specified".into()));
    };
    let Some(target) = pull_target(repo_root, directory, path) else {
        return Ok(PullOutcome::Skipped(format!(
            "directory '{}' does not resolve inside the repository",
            directory
        )));
    };

    let page = api.retrieve_page(page_id)?;
    if page.archived {
        return Ok(PullOutcome::Skipped(format!("page {} is archived", page_id)));
    }
    if let Some(edited) = page.last_edited_time {
        log::info!("[{}] Remote last edited {}", page_id, edited.to_rfc3339());
    }

    let blocks = list_all_block_children(api, page_id)?;
    let markdown = render_markdown(&blocks);
    if markdown.is_empty() {
        return Ok(PullOutcome::Skipped(format!("no content retrieved for {}", page_id)));
    }

    let content = render_document(&source.frontmatter, &markdown)?;
    write_atomic(&target, content.as_bytes())?;

    Ok(PullOutcome::Written(target))
}

pub fn pull_all<A: NotionApi + ?Sized>(api: &A, repo_root: &Path, files: &[PathBuf]) -> PullReport {
    let mut report = PullReport::default();

    for path in files {
        match pull_file(api, repo_root, path) {
            Ok(PullOutcome::Written(target)) => {
                log::info!("Updated article at {}", target.display());
                report.written.push(target);
            }
            Ok(PullOutcome::Skipped(reason)) => {
                log::info!("Skipping article at {}: {}", path.display(), reason);
                report.skipped += 1;
            }
            Err(e) => {
                log::error!("Error pulling {}: {}", path.display(), e);
                report.failed.push(path.clone());
            }
        }
    }

    report
}
