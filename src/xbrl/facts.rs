use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::bundle::{DocumentRole, SubmissionBundle};
use super::context::{ContextIndex, ReportingContext, TemporalExtent};
use super::document::{XmlDocument, XSD_NS};
use super::error::{Diagnostic, ExtractError};
use super::namespace::{NamespaceMap, QualifiedTag};
use super::requests::HeaderTagRequest;
use super::schema::{PeriodType, Resolution, SchemaElementDef, SchemaFetcher, SchemaRegistry};

pub const CIK_TAG: &str = "dei:EntityCentralIndexKey";
pub const PERIOD_END_DATE_TAG: &str = "dei:DocumentPeriodEndDate";
pub const FISCAL_YEAR_FOCUS_TAG: &str = "dei:DocumentFiscalYearFocus";
pub const FISCAL_PERIOD_FOCUS_TAG: &str = "dei:DocumentFiscalPeriodFocus";

/// Filing-wide facts every row is stamped with.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SubmissionInfo {
    pub cik: Option<u64>,
    pub period_end_date: Option<String>,
    /// Fiscal year focus followed by fiscal period focus, e.g. `2020Q1`.
    pub period_focus: Option<String>,
}

impl SubmissionInfo {
    /// Reads the dei facts. A conflicting or unparsable value is reported
    /// and treated as absent.
    pub fn read(instance: &XmlDocument, ns: &NamespaceMap, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let mut singleton = |tag: &str| match singleton_value(instance, ns, tag) {
            Ok(value) => value,
            Err(e) => {
                report(diagnostics, Diagnostic::for_tag(tag, &e));
                None
            }
        };

        let cik = singleton(CIK_TAG);
        let period_end_date = singleton(PERIOD_END_DATE_TAG);
        let year = singleton(FISCAL_YEAR_FOCUS_TAG);
        let period = singleton(FISCAL_PERIOD_FOCUS_TAG);

        let cik = cik.and_then(|v| match v.parse::<u64>() {
            Ok(cik) => Some(cik),
            Err(_) => {
                let e = ExtractError::context(CIK_TAG, format!("non-numeric CIK {:?}", v));
                report(diagnostics, Diagnostic::for_tag(CIK_TAG, &e));
                None
            }
        });

        SubmissionInfo {
            cik,
            period_end_date,
            period_focus: year.zip(period).map(|(y, p)| format!("{}{}", y, p)),
        }
    }
}

/// Text of a tag expected to carry one value for the whole filing.
///
/// Repeated occurrences are fine as long as they agree. An undeclared prefix
/// reads as absent.
pub fn singleton_value(instance: &XmlDocument, ns: &NamespaceMap, tag: &str) -> Result<Option<String>, ExtractError> {
    let Ok(qualified) = ns.qualify(tag) else {
        return Ok(None);
    };

    let values: Vec<String> = instance
        .find_all(&qualified.namespace, &qualified.local_name)
        .map(|e| e.text_trimmed().to_string())
        .unique()
        .collect();

    match values.len() {
        0 => Ok(None),
        1 => Ok(values.into_iter().next()),
        n => Err(ExtractError::context(tag, format!("{} distinct values for a singleton fact", n))),
    }
}

/// One tag occurrence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FactRow {
    pub entity_id: u64,
    pub period_end_date: Option<String>,
    pub submitted_at: String,
    pub header: String,
    pub tag: String,
    pub value: String,
    pub context_id: String,
    pub extent: TemporalExtent,
    pub segments: Option<String>,
}

impl FactRow {
    /// `us-gaap:AccountsPayable` -> `us-gaap_accounts_payable`.
    pub fn display_name(&self) -> String {
        snake_title(&self.tag.replace(':', ""))
    }
}

static CAPITAL_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]+").expect("valid regex"));

/// Drops spaces, puts an underscore before each capital run not at the
/// start, and lower-cases the result.
pub fn snake_title(s: &str) -> String {
    let s = s.replace(' ', "");
    CAPITAL_RUN
        .replace_all(&s, |caps: &regex::Captures| match caps.get(0) {
            Some(m) if m.start() > 0 => format!("_{}", m.as_str()),
            Some(m) => m.as_str().to_string(),
            None => String::new(),
        })
        .to_lowercase()
}

/// Output of a flat extraction run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Extraction {
    pub rows: Vec<FactRow>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A request narrowed down to a single declared tag.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTag {
    pub header: String,
    pub tag: QualifiedTag,
    pub period_type: PeriodType,
}

/// A fact element joined with its decoded context.
#[derive(Clone, Debug)]
pub struct Occurrence<'r> {
    pub resolved: &'r ResolvedTag,
    pub value: String,
    pub context: ReportingContext,
}

/// Resolves every request, expanding namespace wildcards. Failures are
/// pushed onto `diagnostics` and the offending request or tag is skipped.
pub fn resolve_requests(
    registry: &mut SchemaRegistry,
    primary: Option<&XmlDocument>,
    ns: &NamespaceMap,
    requests: &[HeaderTagRequest],
    fetcher: &dyn SchemaFetcher,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ResolvedTag> {
    let mut resolved = Vec::new();

    for request in requests {
        let tag = match ns.qualify(&request.tag) {
            Ok(tag) => tag,
            Err(e) => {
                report(diagnostics, Diagnostic::for_tag(&request.tag, &e));
                continue;
            }
        };

        if !tag.is_wildcard() {
            match resolve_one(registry, primary, &request.header, tag.clone(), fetcher) {
                Ok(r) => resolved.push(r),
                Err(e) => report(diagnostics, Diagnostic::for_tag(&tag.to_string(), &e)),
            }
            continue;
        }

        let defs = match registry.declarations(primary, &tag.namespace, fetcher) {
            Ok(Some(defs)) => defs,
            Ok(None) => {
                let e = ExtractError::UnresolvableTag {
                    tag: request.tag.clone(),
                    reason: format!("no schema imported for namespace {}", tag.namespace),
                };
                report(diagnostics, Diagnostic::for_tag(&request.tag, &e));
                continue;
            }
            Err(e) => {
                report(diagnostics, Diagnostic::for_tag(&request.tag, &e));
                continue;
            }
        };

        let counts = defs.iter().counts_by(|d| d.name.as_str());
        for def in defs.iter().unique_by(|d| d.name.clone()) {
            let tag = tag.with_local_name(&def.name);
            let outcome = match counts[def.name.as_str()] {
                1 => resolved_from_def(&request.header, tag.clone(), def),
                count => Err(ExtractError::AmbiguousSchema {
                    tag: tag.to_string(),
                    count,
                }),
            };
            match outcome {
                Ok(r) => resolved.push(r),
                Err(e) => report(diagnostics, Diagnostic::for_tag(&tag.to_string(), &e)),
            }
        }
    }

    resolved
}

fn resolve_one(
    registry: &mut SchemaRegistry,
    primary: Option<&XmlDocument>,
    header: &str,
    tag: QualifiedTag,
    fetcher: &dyn SchemaFetcher,
) -> Result<ResolvedTag, ExtractError> {
    let unresolvable = |tag: &QualifiedTag, reason: String| ExtractError::UnresolvableTag {
        tag: tag.to_string(),
        reason,
    };

    match registry.resolve_tag(primary, &tag, fetcher)? {
        Resolution::Found(def) => resolved_from_def(header, tag, &def),
        Resolution::NotImported => Err(unresolvable(&tag, format!("no import declaration for {}", tag.namespace))),
        Resolution::NotFound => Err(unresolvable(&tag, "no matching schema declaration".to_string())),
        Resolution::Ambiguous(count) => Err(ExtractError::AmbiguousSchema {
            tag: tag.to_string(),
            count,
        }),
    }
}

fn resolved_from_def(header: &str, tag: QualifiedTag, def: &SchemaElementDef) -> Result<ResolvedTag, ExtractError> {
    let period_type = def.period_type.ok_or_else(|| ExtractError::UnresolvableTag {
        tag: tag.to_string(),
        reason: "declaration has no periodType".to_string(),
    })?;

    Ok(ResolvedTag {
        header: header.to_string(),
        tag,
        period_type,
    })
}

/// Calls `visit` for every decodable occurrence of every resolved tag,
/// in request order then document order.
pub fn walk_occurrences<'r>(
    instance: &XmlDocument,
    resolved: &'r [ResolvedTag],
    diagnostics: &mut Vec<Diagnostic>,
    mut visit: impl FnMut(Occurrence<'r>, &mut Vec<Diagnostic>),
) {
    let contexts = ContextIndex::new(instance);

    for r in resolved {
        let tag_name = r.tag.to_string();
        for element in instance.find_all(&r.tag.namespace, &r.tag.local_name) {
            let Some(context_id) = element.attribute("contextRef") else {
                let e = ExtractError::context("<missing>", "fact has no contextRef");
                report(diagnostics, Diagnostic::for_tag(&tag_name, &e));
                continue;
            };

            match contexts.decode(context_id, r.period_type) {
                Ok(context) => visit(
                    Occurrence {
                        resolved: r,
                        value: element.text.clone().unwrap_or_default(),
                        context,
                    },
                    diagnostics,
                ),
                Err(e) => report(diagnostics, Diagnostic::for_occurrence(&tag_name, context_id, &e)),
            }
        }
    }
}

/// Entity id for an occurrence: the filing CIK, else the context identifier.
pub(crate) fn entity_id(info: &SubmissionInfo, context: &ReportingContext) -> Result<u64, ExtractError> {
    match info.cik {
        Some(cik) => Ok(cik),
        None => context
            .entity
            .parse()
            .map_err(|_| ExtractError::context(&context.id, format!("non-numeric entity identifier {:?}", context.entity))),
    }
}

pub(crate) fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{}", diagnostic);
    diagnostics.push(diagnostic);
}

/// Per-request diagnostics for a bundle with no instance document.
pub(crate) fn missing_instance(requests: &[HeaderTagRequest]) -> Vec<Diagnostic> {
    let e = ExtractError::MissingRole(DocumentRole::Instance);
    let mut diagnostics = Vec::new();
    for request in requests {
        report(&mut diagnostics, Diagnostic::for_tag(&request.tag, &e));
    }
    diagnostics
}

/// One wildcard request per instance prefix whose namespace the primary
/// schema declares or imports. Drives "print everything" extraction.
pub fn blanket_requests(bundle: &SubmissionBundle) -> Vec<HeaderTagRequest> {
    let (Some(instance), Some(schema)) = (bundle.instance.as_ref(), bundle.schema.as_ref()) else {
        return Vec::new();
    };

    let imported: Vec<&str> = schema
        .find_all(XSD_NS, "import")
        .filter_map(|i| i.attribute("namespace"))
        .collect();

    NamespaceMap::resolve(instance)
        .iter()
        .filter(|(_, uri)| schema.target_namespace() == Some(*uri) || imported.contains(uri))
        .map(|(prefix, _)| HeaderTagRequest::bare(format!("{}:", prefix)))
        .collect()
}

/// Extracts one row per occurrence of every requested tag.
///
/// Failures never abort the run; each one becomes a diagnostic scoped to
/// the request, tag or occurrence it concerns.
pub fn extract_flat(
    bundle: &mut SubmissionBundle,
    requests: &[HeaderTagRequest],
    fetcher: &dyn SchemaFetcher,
) -> Extraction {
    let SubmissionBundle {
        schema,
        instance,
        registry,
        submitted_at,
        ..
    } = bundle;

    let Some(instance) = instance.as_ref() else {
        return Extraction {
            rows: Vec::new(),
            diagnostics: missing_instance(requests),
        };
    };

    let mut diagnostics = Vec::new();
    let ns = NamespaceMap::resolve(instance);
    let info = SubmissionInfo::read(instance, &ns, &mut diagnostics);
    let resolved = resolve_requests(registry, schema.as_ref(), &ns, requests, fetcher, &mut diagnostics);

    let mut rows = Vec::new();
    walk_occurrences(instance, &resolved, &mut diagnostics, |occ, diagnostics| {
        let tag = occ.resolved.tag.to_string();
        match entity_id(&info, &occ.context) {
            Ok(entity_id) => rows.push(FactRow {
                entity_id,
                period_end_date: info.period_end_date.clone(),
                submitted_at: submitted_at.clone(),
                header: occ.resolved.header.clone(),
                tag,
                value: occ.value,
                context_id: occ.context.id,
                extent: occ.context.extent,
                segments: occ.context.segments,
            }),
            Err(e) => report(diagnostics, Diagnostic::for_occurrence(&tag, &occ.context.id, &e)),
        }
    });

    log::info!("Extracted {} rows, {} diagnostics", rows.len(), diagnostics.len());
    Extraction { rows, diagnostics }
}
