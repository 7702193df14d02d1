use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::bundle::DocumentRole;
use super::document::{Element, XmlDocument, XBRLI_NS, XSD_NS};
use super::error::ExtractError;
use super::namespace::QualifiedTag;

/// Temporal semantics a schema declares for a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Instant,
    Duration,
}

impl FromStr for PeriodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "instant" => Ok(PeriodType::Instant),
            "duration" => Ok(PeriodType::Duration),
            other => Err(format!("unknown periodType {:?}", other)),
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodType::Instant => write!(f, "instant"),
            PeriodType::Duration => write!(f, "duration"),
        }
    }
}

/// A global `xs:element` declaration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaElementDef {
    pub namespace: String,
    pub name: String,
    /// `None` when the declaration carries no usable `xbrli:periodType`.
    pub period_type: Option<PeriodType>,
    /// Every declared attribute, keyed by local name.
    pub attributes: BTreeMap<String, String>,
}

impl SchemaElementDef {
    fn from_element(namespace: &str, element: &Element) -> Self {
        let period_type = element
            .attribute_ns(XBRLI_NS, "periodType")
            .and_then(|p| p.parse().ok());

        SchemaElementDef {
            namespace: namespace.to_string(),
            name: element.attribute("name").unwrap_or_default().to_string(),
            period_type,
            attributes: element
                .attributes
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect(),
        }
    }
}

/// Outcome of a two-phase (local, then imported) tag lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Found(SchemaElementDef),
    /// The namespace is foreign and the primary schema has no import for it.
    NotImported,
    /// The owning schema is available but declares no such element.
    NotFound,
    /// The owning schema declares the name more than once.
    Ambiguous(usize),
}

/// Supplies imported schema documents given their declared `schemaLocation`.
pub trait SchemaFetcher {
    fn fetch(&self, location: &str) -> anyhow::Result<XmlDocument>;
}

/// Lazily-populated cache of imported schemas, keyed by namespace URI.
///
/// One registry belongs to one submission. Entries are inserted once and
/// never replaced. A failed fetch is cached too, so each namespace reaches
/// the fetcher at most once.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    imports: HashMap<String, XmlDocument>,
    failed: HashMap<String, FailedImport>,
}

#[derive(Clone, Debug)]
struct FailedImport {
    location: String,
    reason: String,
}

impl FailedImport {
    fn to_error(&self) -> ExtractError {
        ExtractError::Fetch {
            location: self.location.clone(),
            reason: self.reason.clone(),
        }
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cached(&self, namespace: &str) -> bool {
        self.imports.contains_key(namespace)
    }

    pub fn cached_count(&self) -> usize {
        self.imports.len()
    }

    pub fn has_failed(&self, namespace: &str) -> bool {
        self.failed.contains_key(namespace)
    }

    /// Resolves `tag` to its declaration, fetching the owning schema on demand.
    ///
    /// `Err` is reserved for a missing primary schema and fetch failures; all
    /// lookup outcomes come back as a [`Resolution`].
    pub fn resolve_tag(
        &mut self,
        primary: Option<&XmlDocument>,
        tag: &QualifiedTag,
        fetcher: &dyn SchemaFetcher,
    ) -> Result<Resolution, ExtractError> {
        let primary = primary.ok_or(ExtractError::MissingRole(DocumentRole::Schema))?;

        let Some(doc) = self.load(primary, &tag.namespace, fetcher)? else {
            return Ok(Resolution::NotImported);
        };

        let matches: Vec<&Element> = global_declarations(doc)
            .filter(|e| e.attribute("name") == Some(tag.local_name.as_str()))
            .collect();

        log::debug!("{} declarations of {} found", matches.len(), tag);

        Ok(match matches.as_slice() {
            [] => Resolution::NotFound,
            [element] => Resolution::Found(SchemaElementDef::from_element(&tag.namespace, element)),
            _ => Resolution::Ambiguous(matches.len()),
        })
    }

    /// Every global declaration in `namespace`, in document order.
    /// `Ok(None)` when the namespace is neither local nor imported.
    pub fn declarations(
        &mut self,
        primary: Option<&XmlDocument>,
        namespace: &str,
        fetcher: &dyn SchemaFetcher,
    ) -> Result<Option<Vec<SchemaElementDef>>, ExtractError> {
        let primary = primary.ok_or(ExtractError::MissingRole(DocumentRole::Schema))?;

        Ok(self.load(primary, namespace, fetcher)?.map(|doc| {
            global_declarations(doc)
                .filter(|e| e.attribute("name").is_some())
                .map(|e| SchemaElementDef::from_element(namespace, e))
                .collect()
        }))
    }

    fn load<'a>(
        &'a mut self,
        primary: &'a XmlDocument,
        namespace: &str,
        fetcher: &dyn SchemaFetcher,
    ) -> Result<Option<&'a XmlDocument>, ExtractError> {
        if primary.target_namespace() == Some(namespace) {
            return Ok(Some(primary));
        }

        if let Some(failure) = self.failed.get(namespace) {
            return Err(failure.to_error());
        }

        if !self.imports.contains_key(namespace) {
            let Some(location) = import_location(primary, namespace) else {
                log::debug!("No import declaration for namespace {}", namespace);
                return Ok(None);
            };

            log::info!("Grabbing schema {} for {}", location, namespace);
            match fetcher.fetch(&location) {
                Ok(doc) => {
                    self.imports.entry(namespace.to_string()).or_insert(doc);
                }
                Err(e) => {
                    let failure = FailedImport {
                        location,
                        reason: e.to_string(),
                    };
                    let err = failure.to_error();
                    self.failed.insert(namespace.to_string(), failure);
                    return Err(err);
                }
            }
        }

        Ok(self.imports.get(namespace))
    }
}

fn global_declarations(doc: &XmlDocument) -> impl Iterator<Item = &Element> {
    doc.root.children_named(XSD_NS, "element")
}

/// `schemaLocation` of the primary schema's import for `namespace`.
fn import_location(primary: &XmlDocument, namespace: &str) -> Option<String> {
    let mut imports = primary
        .find_all(XSD_NS, "import")
        .filter(|i| i.attribute("namespace") == Some(namespace));

    let location = imports.next()?.attribute("schemaLocation")?.to_string();
    if imports.next().is_some() {
        log::debug!("Multiple imports for {}; using {}", namespace, location);
    }
    Some(location)
}
