// ABOUTME: Bootstraps the Notion database with the properties sync writes
// ABOUTME: Adds only missing properties and leaves existing ones untouched

use crate::api::NotionApi;
use crate::config::PropertySchema;
use crate::Result;
use serde_json::{json, Map, Value};

/// Property definitions sync needs, keyed by configured name. The title
/// property always exists on a database and is not included.
pub fn required_properties(schema: &PropertySchema) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(schema.tags.clone(), json!({ "multi_select": {} }));
    props.insert(schema.published.clone(), json!({ "checkbox": {} }));
    props.insert(schema.slug.clone(), json!({ "rich_text": {} }));
    if let Some(icon) = &schema.icon {
        props.insert(icon.clone(), json!({ "rich_text": {} }));
    }
    props
}

/// Adds missing properties to the database. Returns the names that were added.
pub fn ensure_schema<A: NotionApi + ?Sized>(
    api: &A,
    database_id: &str,
    schema: &PropertySchema,
) -> Result<Vec<String>> {
    log::info!("Retrieving current database schema...");
    let database = api.retrieve_database(database_id)?;

    let mut missing = Map::new();
    for (name, definition) in required_properties(schema) {
        if database.properties.contains_key(&name) {
            log::info!("Property \"{}\" already exists. Skipping.", name);
        } else {
            log::info!("Adding property: {}", name);
            missing.insert(name, definition);
        }
    }

    if missing.is_empty() {
        log::info!("No new properties to add. Schema is up to date.");
        return Ok(Vec::new());
    }

    api.update_database(database_id, &missing)?;
    log::info!("Database schema updated");
    Ok(missing.keys().cloned().collect())
}
