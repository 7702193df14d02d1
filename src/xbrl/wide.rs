use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::bundle::SubmissionBundle;
use super::context::{parse_date, TemporalExtent};
use super::document::{XmlDocument, XBRLI_NS};
use super::error::Diagnostic;
use super::facts::{entity_id, missing_instance, report, resolve_requests, walk_occurrences, SubmissionInfo};
use super::namespace::NamespaceMap;
use super::requests::HeaderTagRequest;
use super::schema::SchemaFetcher;

/// How far an instant may sit from a duration boundary and still count as
/// that boundary's balance.
pub const BOUNDARY_TOLERANCE_DAYS: i64 = 1;
/// Allowed deviation of a duration from the length its focus code implies.
pub const ALIGNMENT_TOLERANCE_DAYS: i64 = 5;
pub const QUARTER_DAYS: i64 = 90;
pub const ANNUAL_DAYS: i64 = 365;

pub const BEGINNING_OF_PERIOD: &str = "BoP";
pub const END_OF_PERIOD: &str = "EoP";

pub const ROW_KEY_HEADERS: [&str; 7] = [
    "CIK",
    "Reporting Period End Date",
    "Submission Time",
    "Segments",
    "Submission Period Focus",
    "Period Start",
    "Period End",
];

/// Identity of a wide row: every fact sharing it lands in the same row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowKey {
    pub cik: u64,
    pub period_end_date: Option<String>,
    pub submitted_at: String,
    pub segments: Option<String>,
    pub period_focus: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: NaiveDate,
}

impl RowKey {
    /// Values in [`ROW_KEY_HEADERS`] order; absent fields render empty.
    pub fn fields(&self) -> [String; 7] {
        [
            self.cik.to_string(),
            self.period_end_date.clone().unwrap_or_default(),
            self.submitted_at.clone(),
            self.segments.clone().unwrap_or_default(),
            self.period_focus.clone().unwrap_or_default(),
            self.period_start.map(|d| d.to_string()).unwrap_or_default(),
            self.period_end.to_string(),
        ]
    }

    pub fn is_period_aligned(&self) -> bool {
        period_aligned(self.period_focus.as_deref(), self.period_start, self.period_end)
    }

    pub fn ends_at_reporting_period(&self) -> bool {
        self.period_end_date.as_deref().and_then(parse_date) == Some(self.period_end)
    }
}

/// Reporting-period granularity named by a fiscal focus code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiscalFocus {
    Quarter(u8),
    Annual,
}

static QUARTER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{4})?(?:Q([1-4])|([1-4])Q)$").expect("valid regex"));
static ANNUAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\d{4})?FY$").expect("valid regex"));

impl FiscalFocus {
    /// Accepts `Q2`, `2Q`, `FY`, optionally prefixed with a four-digit year.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim().to_uppercase();
        if ANNUAL_CODE.is_match(&code) {
            return Some(FiscalFocus::Annual);
        }
        let caps = QUARTER_CODE.captures(&code)?;
        caps.get(1)
            .or_else(|| caps.get(2))
            .and_then(|q| q.as_str().parse().ok())
            .map(FiscalFocus::Quarter)
    }

    pub fn expected_days(&self) -> i64 {
        match self {
            FiscalFocus::Quarter(_) => QUARTER_DAYS,
            FiscalFocus::Annual => ANNUAL_DAYS,
        }
    }
}

/// Whether a period's length matches what its focus code implies, within
/// [`ALIGNMENT_TOLERANCE_DAYS`]. Instants and unrecognised codes fail.
pub fn period_aligned(focus: Option<&str>, start: Option<NaiveDate>, end: NaiveDate) -> bool {
    let (Some(focus), Some(start)) = (focus.and_then(FiscalFocus::parse), start) else {
        return false;
    };
    let elapsed = (end - start).num_days();
    (elapsed - focus.expected_days()).abs() <= ALIGNMENT_TOLERANCE_DAYS
}

/// Every distinct `(start, end)` duration declared in the instance, sorted.
pub fn durations_covered(instance: &XmlDocument) -> Vec<(NaiveDate, NaiveDate)> {
    instance
        .find_all(XBRLI_NS, "period")
        .filter_map(|period| {
            let start = period.child(XBRLI_NS, "startDate")?;
            let end = period.child(XBRLI_NS, "endDate")?;
            Some((parse_date(start.text_trimmed())?, parse_date(end.text_trimmed())?))
        })
        .sorted()
        .dedup()
        .collect()
}

fn within(a: NaiveDate, b: NaiveDate, days: i64) -> bool {
    (a - b).num_days().abs() <= days
}

/// Facts grouped into one row per reporting-context key.
#[derive(Clone, Debug, Default, Serialize)]
pub struct WideTable {
    rows: BTreeMap<RowKey, BTreeMap<String, String>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl WideTable {
    pub fn insert(&mut self, key: RowKey, header: impl Into<String>, value: impl Into<String>) {
        self.rows.entry(key).or_default().insert(header.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &RowKey) -> Option<&BTreeMap<String, String>> {
        self.rows.get(key)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&RowKey, &BTreeMap<String, String>)> {
        self.rows.iter()
    }

    /// Row-key columns followed by the sorted union of observed headers.
    pub fn headers(&self) -> Vec<String> {
        let data: BTreeSet<&String> = self.rows.values().flat_map(|v| v.keys()).collect();
        ROW_KEY_HEADERS
            .iter()
            .map(|h| h.to_string())
            .chain(data.into_iter().cloned())
            .collect()
    }

    /// Each row as a full record aligned with [`WideTable::headers`].
    pub fn records(&self) -> Vec<Vec<String>> {
        let headers = self.headers();
        self.rows
            .iter()
            .map(|(key, values)| {
                key.fields()
                    .into_iter()
                    .chain(
                        headers[ROW_KEY_HEADERS.len()..]
                            .iter()
                            .map(|h| values.get(h).cloned().unwrap_or_default()),
                    )
                    .collect()
            })
            .collect()
    }

    pub fn retain(mut self, mut keep: impl FnMut(&RowKey) -> bool) -> Self {
        self.rows.retain(|key, _| keep(key));
        self
    }

    /// Drops rows qualified by a dimensional member. A segment block with
    /// no members does not qualify anything, so those rows stay.
    pub fn without_segments(self) -> Self {
        self.retain(|key| key.segments.as_deref().map_or(true, str::is_empty))
    }

    pub fn aligned(self) -> Self {
        self.retain(RowKey::is_period_aligned)
    }

    pub fn ending_at_reporting_period(self) -> Self {
        self.retain(RowKey::ends_at_reporting_period)
    }

    /// Segment-free rows covering exactly the primary reporting period.
    pub fn primary_period(self) -> Self {
        self.without_segments().aligned().ending_at_reporting_period()
    }
}

/// Extracts requested tags into one wide row per reporting-context key.
///
/// Instant facts land in their own row and, for every known duration whose
/// start or end lies within [`BOUNDARY_TOLERANCE_DAYS`], in that duration's
/// row as a `BoP`/`EoP` column.
pub fn extract_wide(
    bundle: &mut SubmissionBundle,
    requests: &[HeaderTagRequest],
    fetcher: &dyn SchemaFetcher,
) -> WideTable {
    let SubmissionBundle {
        schema,
        instance,
        registry,
        submitted_at,
        ..
    } = bundle;

    let mut table = WideTable::default();
    let Some(instance) = instance.as_ref() else {
        table.diagnostics = missing_instance(requests);
        return table;
    };

    let mut diagnostics = Vec::new();
    let ns = NamespaceMap::resolve(instance);
    let info = SubmissionInfo::read(instance, &ns, &mut diagnostics);
    let durations = durations_covered(instance);
    log::debug!("{} distinct durations in submission", durations.len());

    let resolved = resolve_requests(registry, schema.as_ref(), &ns, requests, fetcher, &mut diagnostics);

    let key_for = |cik: u64, segments: &Option<String>, start: Option<NaiveDate>, end: NaiveDate| RowKey {
        cik,
        period_end_date: info.period_end_date.clone(),
        submitted_at: submitted_at.clone(),
        segments: segments.clone(),
        period_focus: info.period_focus.clone(),
        period_start: start,
        period_end: end,
    };

    walk_occurrences(instance, &resolved, &mut diagnostics, |occ, diagnostics| {
        let header = &occ.resolved.header;
        let cik = match entity_id(&info, &occ.context) {
            Ok(cik) => cik,
            Err(e) => {
                let tag = occ.resolved.tag.to_string();
                report(diagnostics, Diagnostic::for_occurrence(&tag, &occ.context.id, &e));
                return;
            }
        };
        let segments = &occ.context.segments;

        match occ.context.extent {
            TemporalExtent::Duration { start, end } => {
                table.insert(key_for(cik, segments, Some(start), end), header.as_str(), occ.value);
            }
            TemporalExtent::Instant { date } => {
                table.insert(key_for(cik, segments, None, date), header.as_str(), occ.value.as_str());

                for &(start, end) in &durations {
                    if within(start, date, BOUNDARY_TOLERANCE_DAYS) {
                        let header = format!("{} {}", BEGINNING_OF_PERIOD, header);
                        table.insert(key_for(cik, segments, Some(start), end), header, occ.value.as_str());
                    }
                    if within(end, date, BOUNDARY_TOLERANCE_DAYS) {
                        let header = format!("{} {}", END_OF_PERIOD, header);
                        table.insert(key_for(cik, segments, Some(start), end), header, occ.value.as_str());
                    }
                }
            }
        }
    });

    log::info!("Built {} wide rows, {} diagnostics", table.len(), diagnostics.len());
    table.diagnostics = diagnostics;
    table
}
