use std::collections::BTreeMap;
use std::fmt;

use super::document::XmlDocument;
use super::error::ExtractError;

/// Key under which an unprefixed default namespace is re-registered.
/// `xmlns` can never be declared as a real prefix, so it cannot collide.
pub const DEFAULT_NS_ALIAS: &str = "xmlns";

/// Prefix -> namespace URI for one document. Never holds an unprefixed entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NamespaceMap {
    entries: BTreeMap<String, String>,
}

impl NamespaceMap {
    /// Builds the map from the root declarations of `doc`.
    ///
    /// The default namespace is aliased under [`DEFAULT_NS_ALIAS`], unless a
    /// prefixed declaration already points at the same URI, in which case it
    /// is dropped.
    pub fn resolve(doc: &XmlDocument) -> Self {
        let mut entries = BTreeMap::new();
        let mut default_ns = None;

        for (prefix, uri) in &doc.namespaces {
            match prefix.as_deref() {
                None | Some("") => default_ns = Some(uri.clone()),
                Some(p) => {
                    entries.insert(p.to_string(), uri.clone());
                }
            }
        }

        if let Some(uri) = default_ns {
            if entries.values().any(|u| *u == uri) {
                log::debug!("Dropping default namespace {}: already prefixed", uri);
            } else {
                entries.insert(DEFAULT_NS_ALIAS.to_string(), uri);
            }
        }

        NamespaceMap { entries }
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.entries.get(prefix).map(String::as_str)
    }

    /// First prefix (alphabetically) bound to `uri`.
    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Resolves a `prefix:localname` string against this map.
    pub fn qualify(&self, tag: &str) -> Result<QualifiedTag, ExtractError> {
        let (prefix, local_name) = tag
            .trim()
            .split_once(':')
            .ok_or_else(|| ExtractError::malformed(tag, "expected prefix:name"))?;

        if prefix.is_empty() || local_name.contains(':') {
            return Err(ExtractError::malformed(tag, "expected prefix:name"));
        }

        let namespace = self
            .get(prefix)
            .ok_or_else(|| ExtractError::malformed(tag, format!("undeclared namespace prefix {}", prefix)))?;

        Ok(QualifiedTag {
            namespace: namespace.to_string(),
            prefix: prefix.to_string(),
            local_name: local_name.to_string(),
        })
    }
}

/// A namespace URI plus local name. The prefix is kept for display only.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedTag {
    pub namespace: String,
    pub prefix: String,
    pub local_name: String,
}

impl QualifiedTag {
    /// An empty local name selects every declaration in the namespace.
    pub fn is_wildcard(&self) -> bool {
        self.local_name.is_empty()
    }

    pub fn with_local_name(&self, local_name: &str) -> Self {
        QualifiedTag {
            namespace: self.namespace.clone(),
            prefix: self.prefix.clone(),
            local_name: local_name.to_string(),
        }
    }
}

impl fmt::Display for QualifiedTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local_name)
    }
}
