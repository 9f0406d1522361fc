// ABOUTME: Markdown file discovery, front matter parsing, and atomic writes
// ABOUTME: Rewrites only the metadata block and keeps the body byte-for-byte

use crate::{Error, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const PAGE_ID_KEY: &str = "notionPageId";

pub fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("md") | Some("mdx")
    )
}

/// Recursively lists markdown files under each root, sorted for stable runs.
/// Missing roots are skipped with a warning.
pub fn discover_markdown(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in roots {
        if !root.exists() {
            log::warn!("Root {} does not exist, skipping", root.display());
            continue;
        }
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() && is_markdown(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files
}

/// Splits `content` into the YAML between the `---` fences and the body after them.
///
/// Returns `None` when the file does not open with a front matter block.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// A markdown file with its metadata block and untouched body.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub frontmatter: Mapping,
    pub body: String,
}

impl SourceDocument {
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let (frontmatter, body) = match split_frontmatter(content) {
            Some((yaml, body)) => {
                let frontmatter = if yaml.trim().is_empty() {
                    Mapping::new()
                } else {
                    serde_yaml::from_str(yaml).map_err(|e| {
                        Error::Frontmatter(format!("{}: {}", path.display(), e))
                    })?
                };
                (frontmatter, body.to_string())
            }
            None => (Mapping::new(), content.to_string()),
        };

        Ok(SourceDocument {
            path,
            frontmatter,
            body,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.frontmatter.get(key)
    }

    /// Non-empty string value of the first key present.
    pub fn get_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.get(k).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
    }

    /// Strict boolean: the string `"true"` does not count.
    pub fn get_flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    pub fn get_list(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .find_map(|k| self.get(k).and_then(Value::as_sequence))
            .map(|seq| {
                seq.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.frontmatter.insert(Value::from(key), value.into());
    }

    pub fn render(&self) -> Result<String> {
        render_document(&self.frontmatter, &self.body)
    }

    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, self.render()?.as_bytes())
    }
}

pub fn render_document(frontmatter: &Mapping, body: &str) -> Result<String> {
    let yaml = if frontmatter.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(frontmatter)?
    };
    Ok(format!("---\n{}---\n{}", yaml, body))
}

/// Stores `page_id` under `notionPageId`. Returns `false` when it was already there.
pub fn write_page_id(path: &Path, page_id: &str) -> Result<bool> {
    let mut doc = SourceDocument::load(path)?;
    if doc.get_str(&[PAGE_ID_KEY]) == Some(page_id) {
        return Ok(false);
    }
    doc.set(PAGE_ID_KEY, page_id);
    doc.save()?;
    Ok(true)
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    use rand::Rng;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    // Temp file lives next to the target so the rename stays on one filesystem
    let random: u32 = rand::thread_rng().gen();
    let tmp_path = dir.join(format!(".{:x}.part", random));

    fs::write(&tmp_path, content)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    Ok(())
}
