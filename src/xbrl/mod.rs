pub mod bundle;
pub mod context;
pub mod document;
pub mod error;
pub mod facts;
pub mod labels;
pub mod namespace;
pub mod requests;
pub mod schema;
pub mod wide;

#[cfg(test)]
pub(crate) mod tests;

pub use bundle::{DocumentRole, DocumentSource, FileDocumentSource, SubmissionBundle};
pub use context::{ContextIndex, ReportingContext, TemporalExtent};
pub use document::XmlDocument;
pub use error::{Diagnostic, ExtractError};
pub use facts::{extract_flat, Extraction, FactRow, SubmissionInfo};
pub use namespace::{NamespaceMap, QualifiedTag};
pub use requests::{parse_requests, HeaderTagRequest};
pub use schema::{PeriodType, Resolution, SchemaElementDef, SchemaFetcher, SchemaRegistry};
pub use wide::{extract_wide, period_aligned, RowKey, WideTable};
