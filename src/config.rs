// ABOUTME: Credential discovery and property-name configuration
// ABOUTME: CLI flag → environment (after optional .env) → error; schema from YAML

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

pub const API_KEY_VAR: &str = "NOTION_API_KEY";
pub const DATABASE_ID_VAR: &str = "NOTION_DATABASE_ID";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub database_id: String,
}

/// Loads `.env` (or the given file) into the process environment.
///
/// A missing default `.env` is fine; an explicitly named file must exist.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            dotenv::from_path(p).map_err(|e| {
                Error::Config(format!("Failed to load env file {}: {}", p.display(), e))
            })?;
        }
        None => {
            if let Ok(p) = dotenv::dotenv() {
                log::debug!("Loaded environment from {}", p.display());
            }
        }
    }
    Ok(())
}

fn resolve_one(cli: Option<String>, var: &str) -> Option<String> {
    cli.or_else(|| env::var(var).ok())
        .filter(|v| !v.trim().is_empty())
}

pub fn resolve_credentials(
    cli_api_key: Option<String>,
    cli_database_id: Option<String>,
) -> Result<Credentials> {
    let api_key = resolve_one(cli_api_key, API_KEY_VAR);
    let database_id = resolve_one(cli_database_id, DATABASE_ID_VAR);

    match (api_key, database_id) {
        (Some(api_key), Some(database_id)) => Ok(Credentials {
            api_key,
            database_id,
        }),
        _ => Err(Error::Config(format!(
            "{} and {} must be set (flag, environment, or .env)",
            API_KEY_VAR, DATABASE_ID_VAR
        ))),
    }
}

/// Names of the Notion database properties documents map onto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertySchema {
    pub title: String,
    pub slug: String,
    pub tags: String,
    pub published: String,
    /// Rich-text property that also receives the emoji, when set.
    pub icon: Option<String>,
}

impl Default for PropertySchema {
    fn default() -> Self {
        PropertySchema {
            title: "Name".into(),
            slug: "Slug".into(),
            tags: "Tags".into(),
            published: "Published".into(),
            icon: None,
        }
    }
}

impl PropertySchema {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid schema file {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_credentials_cli_precedence() {
        let creds = resolve_credentials(Some("key".into()), Some("db".into())).unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.database_id, "db");
    }

    #[test]
    fn test_resolve_credentials_missing() {
        let err = resolve_credentials(Some("key".into()), Some("  ".into())).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_resolve_one_reads_env() {
        env::set_var("MDNOTION_TEST_VAR", "from-env");
        assert_eq!(resolve_one(None, "MDNOTION_TEST_VAR"), Some("from-env".into()));
        assert_eq!(
            resolve_one(Some("flag".into()), "MDNOTION_TEST_VAR"),
            Some("flag".into())
        );
        env::remove_var("MDNOTION_TEST_VAR");
        assert_eq!(resolve_one(None, "MDNOTION_TEST_VAR"), None);
    }

    #[test]
    fn test_load_env_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("test.env");
        fs::write(&path, "MDNOTION_ENV_FILE_VAR=loaded\n").unwrap();

        load_env_file(Some(&path)).unwrap();
        assert_eq!(env::var("MDNOTION_ENV_FILE_VAR").unwrap(), "loaded");

        let missing = temp.path().join("missing.env");
        assert!(load_env_file(Some(&missing)).is_err());
    }

    #[test]
    fn test_schema_partial_yaml_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("schema.yml");
        fs::write(&path, "title: Title\nicon: Icon\n").unwrap();

        let schema = PropertySchema::load(&path).unwrap();
        assert_eq!(schema.title, "Title");
        assert_eq!(schema.slug, "Slug");
        assert_eq!(schema.icon.as_deref(), Some("Icon"));
    }
}
