use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const COMMENT_DELIMITER: char = '#';
const HEADER_SEPARATOR: char = '=';

/// An output column name paired with the `prefix:name` tag that fills it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderTagRequest {
    pub header: String,
    pub tag: String,
}

impl HeaderTagRequest {
    pub fn new(header: impl Into<String>, tag: impl Into<String>) -> Self {
        HeaderTagRequest {
            header: header.into(),
            tag: tag.into(),
        }
    }

    /// Uses the tag itself as the column name.
    pub fn bare(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        HeaderTagRequest { header: tag.clone(), tag }
    }
}

/// Non-blank lines of `text` with comments stripped.
pub fn uncommented_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.split(COMMENT_DELIMITER).next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
}

/// Parses a request list, one entry per line.
///
/// An entry is either `Header Name = prefix:Name` or a bare `prefix:Name`.
/// A `prefix:` entry with no name requests the whole namespace.
pub fn parse_requests(text: &str) -> Result<Vec<HeaderTagRequest>> {
    uncommented_lines(text)
        .enumerate()
        .map(|(i, line)| match line.rsplit_once(HEADER_SEPARATOR) {
            Some((header, tag)) => {
                let (header, tag) = (header.trim(), tag.trim());
                if header.is_empty() || tag.is_empty() {
                    return Err(anyhow!("Malformed request entry {}: {:?}", i + 1, line));
                }
                Ok(HeaderTagRequest::new(header, tag))
            }
            None => Ok(HeaderTagRequest::bare(line)),
        })
        .collect()
}

pub fn read_requests(path: &Path) -> Result<Vec<HeaderTagRequest>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read request list {}: {}", path.display(), e))?;
    parse_requests(&text)
}
