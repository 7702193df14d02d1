use anyhow::{anyhow, Result};
use std::path::PathBuf;
use url::Url;

use crate::utils::dirs::DEFAULT_SCHEMA_DIR;

pub const DEFAULT_USER_AGENT: &str = "software@example.com";
pub const DEFAULT_SERVER: &str = "https://www.sec.gov";

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub user_agent: String,
    /// Where fetched imported schemas are cached.
    pub schema_dir: PathBuf,
    /// Base for root-relative schema locations.
    pub server: Url,
    /// Re-download schemas even when a cached copy exists.
    pub refresh_schemas: bool,
}

impl ExtractorConfig {
    pub fn from_env() -> Result<Self> {
        let user_agent = std::env::var("XBRL_USER_AGENT")
            .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string());

        let schema_dir = PathBuf::from(
            std::env::var("XBRL_SCHEMA_DIR").unwrap_or_else(|_| DEFAULT_SCHEMA_DIR.to_string()),
        );

        let server = std::env::var("XBRL_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        let server = Url::parse(&server).map_err(|e| anyhow!("Invalid XBRL_SERVER {}: {}", server, e))?;

        let refresh_schemas = std::env::var("XBRL_REFRESH_SCHEMAS")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            user_agent,
            schema_dir,
            server,
            refresh_schemas,
        })
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            server: Url::parse(DEFAULT_SERVER).expect("valid default server"),
            refresh_schemas: false,
        }
    }
}
