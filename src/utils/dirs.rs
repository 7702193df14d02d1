use anyhow::Result;
use std::fs;
use std::path::Path;

// Cache for imported taxonomy schemas
pub const DEFAULT_SCHEMA_DIR: &str = "imported_schemas";

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}
