// ABOUTME: Small helpers shared by the sync commands
// ABOUTME: Page URL formatting and target path resolution

use std::path::{Component, Path, PathBuf};

/// Browser URL for a page id (dashes removed, as Notion prints them).
pub fn page_url(page_id: &str) -> String {
    format!("https://www.notion.so/{}", page_id.replace('-', ""))
}

/// Where a pulled document lands: `<repo_root>/<directory>/<file name of source>`.
///
/// A leading `/` on `directory` is ignored; `..` components yield `None` so the
/// target always stays under `repo_root`.
pub fn pull_target(repo_root: &Path, directory: &str, source: &Path) -> Option<PathBuf> {
    let file_name = source.file_name()?;

    let mut target = repo_root.to_path_buf();
    for component in Path::new(directory).components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    Some(target.join(file_name))
}
