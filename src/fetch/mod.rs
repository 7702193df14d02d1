use anyhow::{anyhow, Result};
use reqwest::blocking::Client;
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::config::ExtractorConfig;
use crate::utils::dirs;
use crate::xbrl::{SchemaFetcher, XmlDocument};

/// Where a declared `schemaLocation` points.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaLocation {
    Remote(Url),
    Local(PathBuf),
}

/// Fetches imported schemas over HTTP, keeping a copy of each on disk.
///
/// Cached files are named after the last path segment of their URL and are
/// reused unless `refresh` is set.
pub struct CachedSchemaFetcher {
    client: Client,
    cache_dir: PathBuf,
    base_dir: PathBuf,
    server: Url,
    user_agent: String,
    refresh: bool,
}

impl CachedSchemaFetcher {
    /// `base_dir` anchors relative schema locations (the submission's directory).
    pub fn new(config: &ExtractorConfig, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            cache_dir: config.schema_dir.clone(),
            base_dir: base_dir.into(),
            server: config.server.clone(),
            user_agent: config.user_agent.clone(),
            refresh: config.refresh_schemas,
        }
    }

    pub fn locate(&self, location: &str) -> Result<SchemaLocation> {
        if let Ok(url) = Url::parse(location) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(SchemaLocation::Remote(url));
            }
        }

        let local = self.base_dir.join(location);
        if local.exists() || !location.starts_with('/') {
            return Ok(SchemaLocation::Local(local));
        }

        Ok(SchemaLocation::Remote(self.server.join(location)?))
    }

    pub fn cache_path(&self, url: &Url) -> Result<PathBuf> {
        let fname = url
            .path_segments()
            .and_then(|s| s.last())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("No file name in schema URL {}", url))?;
        Ok(self.cache_dir.join(fname))
    }

    fn download(&self, url: &Url, filepath: &Path) -> Result<()> {
        log::info!("Grabbing schema {}", url);

        let response = self
            .client
            .get(url.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip, deflate")
            .send()?;

        log::debug!("Response status: {}", response.status());

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP request failed with status: {}",
                response.status()
            ));
        }

        let content = response.text()?;
        dirs::ensure_dir(&self.cache_dir)?;
        std::fs::write(filepath, &content)?;
        log::debug!("Saved {} bytes to {:?}", content.len(), filepath);

        Ok(())
    }
}

impl SchemaFetcher for CachedSchemaFetcher {
    fn fetch(&self, location: &str) -> Result<XmlDocument> {
        match self.locate(location)? {
            SchemaLocation::Local(path) => XmlDocument::from_file(&path),
            SchemaLocation::Remote(url) => {
                let filepath = self.cache_path(&url)?;
                if self.refresh || !filepath.exists() {
                    self.download(&url, &filepath)?;
                } else {
                    log::debug!("Using cached schema {:?}", filepath);
                }
                XmlDocument::from_file(&filepath)
            }
        }
    }
}
