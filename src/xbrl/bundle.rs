use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use strum::{EnumIter, IntoEnumIterator};

use super::document::XmlDocument;
use super::error::ExtractError;
use super::schema::SchemaRegistry;

/// The part a document plays in one filing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter)]
pub enum DocumentRole {
    Schema,
    Instance,
    Calculation,
    Definition,
    Label,
    Presentation,
}

impl DocumentRole {
    /// File name suffix appended to a submission's base name.
    pub fn suffix(&self) -> &'static str {
        match self {
            DocumentRole::Schema => ".xsd",
            DocumentRole::Instance => ".xml",
            DocumentRole::Calculation => "_cal.xml",
            DocumentRole::Definition => "_def.xml",
            DocumentRole::Label => "_lab.xml",
            DocumentRole::Presentation => "_pre.xml",
        }
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentRole::Schema => write!(f, "schema"),
            DocumentRole::Instance => write!(f, "instance"),
            DocumentRole::Calculation => write!(f, "calculation linkbase"),
            DocumentRole::Definition => write!(f, "definition linkbase"),
            DocumentRole::Label => write!(f, "label linkbase"),
            DocumentRole::Presentation => write!(f, "presentation linkbase"),
        }
    }
}

/// Supplies the raw text of each document of one filing.
pub trait DocumentSource {
    fn read(&self, role: DocumentRole) -> Result<String>;
}

/// Reads `<base>.xsd`, `<base>.xml`, `<base>_cal.xml` and friends from disk.
#[derive(Clone, Debug)]
pub struct FileDocumentSource {
    base: PathBuf,
}

impl FileDocumentSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FileDocumentSource { base: base.into() }
    }

    pub fn path_for(&self, role: DocumentRole) -> PathBuf {
        let mut name = self.base.clone().into_os_string();
        name.push(role.suffix());
        PathBuf::from(name)
    }

    /// Directory holding the submission files.
    pub fn directory(&self) -> &Path {
        self.base.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl DocumentSource for FileDocumentSource {
    fn read(&self, role: DocumentRole) -> Result<String> {
        let path = self.path_for(role);
        std::fs::read_to_string(&path).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))
    }
}

/// Submission timestamp encoded in a retrieved file's name (`<time>_<form>_<file>`).
pub fn submission_time_from_base(base: &Path) -> String {
    base.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('_').next().map(String::from))
        .unwrap_or_default()
}

/// Every document of one filing plus its import cache.
///
/// Built once per submission and dropped after extraction. Only the
/// registry changes after loading.
#[derive(Debug, Default)]
pub struct SubmissionBundle {
    pub schema: Option<XmlDocument>,
    pub instance: Option<XmlDocument>,
    pub calculation: Option<XmlDocument>,
    pub definition: Option<XmlDocument>,
    pub label: Option<XmlDocument>,
    pub presentation: Option<XmlDocument>,
    /// Caller-supplied, never parsed.
    pub submitted_at: String,
    pub registry: SchemaRegistry,
}

impl SubmissionBundle {
    pub fn new(submitted_at: impl Into<String>) -> Self {
        SubmissionBundle {
            submitted_at: submitted_at.into(),
            ..Default::default()
        }
    }

    /// Loads every role `source` can supply. Absent or unparsable documents
    /// are logged and left empty.
    pub fn load(source: &dyn DocumentSource, submitted_at: impl Into<String>) -> Self {
        let mut bundle = SubmissionBundle::new(submitted_at);

        for role in DocumentRole::iter() {
            let parsed = source
                .read(role)
                .and_then(|text| XmlDocument::parse(&text).map_err(anyhow::Error::from));
            match parsed {
                Ok(doc) => {
                    log::info!("Loaded {}", role);
                    *bundle.slot_mut(role) = Some(doc);
                }
                Err(e) => log::warn!("{} is missing: {}", role.to_string().to_uppercase(), e),
            }
        }

        bundle
    }

    pub fn with_document(mut self, role: DocumentRole, doc: XmlDocument) -> Self {
        *self.slot_mut(role) = Some(doc);
        self
    }

    pub fn document(&self, role: DocumentRole) -> Option<&XmlDocument> {
        match role {
            DocumentRole::Schema => self.schema.as_ref(),
            DocumentRole::Instance => self.instance.as_ref(),
            DocumentRole::Calculation => self.calculation.as_ref(),
            DocumentRole::Definition => self.definition.as_ref(),
            DocumentRole::Label => self.label.as_ref(),
            DocumentRole::Presentation => self.presentation.as_ref(),
        }
    }

    /// The document for `role`, or a missing-role error.
    pub fn require(&self, role: DocumentRole) -> Result<&XmlDocument, ExtractError> {
        self.document(role).ok_or(ExtractError::MissingRole(role))
    }

    fn slot_mut(&mut self, role: DocumentRole) -> &mut Option<XmlDocument> {
        match role {
            DocumentRole::Schema => &mut self.schema,
            DocumentRole::Instance => &mut self.instance,
            DocumentRole::Calculation => &mut self.calculation,
            DocumentRole::Definition => &mut self.definition,
            DocumentRole::Label => &mut self.label,
            DocumentRole::Presentation => &mut self.presentation,
        }
    }

    pub fn missing_roles(&self) -> Vec<DocumentRole> {
        DocumentRole::iter().filter(|r| self.document(*r).is_none()).collect()
    }
}
