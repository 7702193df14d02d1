use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::document::{Element, XmlDocument, XBRLI_NS};
use super::error::ExtractError;
use super::schema::PeriodType;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Separator between flattened segment members.
pub const SEGMENT_DELIMITER: &str = "; ";

/// Time covered by a fact, shaped by its tag's declared [`PeriodType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TemporalExtent {
    Instant { date: NaiveDate },
    Duration { start: NaiveDate, end: NaiveDate },
}

impl TemporalExtent {
    pub fn period_type(&self) -> PeriodType {
        match self {
            TemporalExtent::Instant { .. } => PeriodType::Instant,
            TemporalExtent::Duration { .. } => PeriodType::Duration,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            TemporalExtent::Instant { .. } => None,
            TemporalExtent::Duration { start, .. } => Some(*start),
        }
    }

    /// The instant itself, or the last day of a duration.
    pub fn end(&self) -> NaiveDate {
        match self {
            TemporalExtent::Instant { date } => *date,
            TemporalExtent::Duration { end, .. } => *end,
        }
    }
}

impl fmt::Display for TemporalExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalExtent::Instant { date } => write!(f, "{}", date),
            TemporalExtent::Duration { start, end } => write!(f, "{} {}", start, end),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportingContext {
    pub id: String,
    pub entity: String,
    pub extent: TemporalExtent,
    /// `None` when the context has no segment or scenario block at all.
    pub segments: Option<String>,
}

/// Parses an XBRL date, accepting a trailing time component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).ok().map(|dt| dt.date()))
}

/// Context nodes of one instance document, indexed by id.
pub struct ContextIndex<'a> {
    contexts: HashMap<&'a str, Vec<&'a Element>>,
}

impl<'a> ContextIndex<'a> {
    pub fn new(instance: &'a XmlDocument) -> Self {
        let mut contexts: HashMap<&str, Vec<&Element>> = HashMap::new();
        for context in instance.find_all(XBRLI_NS, "context") {
            if let Some(id) = context.attribute("id") {
                contexts.entry(id).or_default().push(context);
            }
        }
        log::debug!("Indexed {} contexts", contexts.len());
        ContextIndex { contexts }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Decodes `context_id` for a tag declared with `period_type`.
    pub fn decode(&self, context_id: &str, period_type: PeriodType) -> Result<ReportingContext, ExtractError> {
        let context = match self.contexts.get(context_id).map(Vec::as_slice) {
            Some([context]) => *context,
            Some(found) => {
                return Err(ExtractError::context(
                    context_id,
                    format!("{} contexts share this id", found.len()),
                ))
            }
            None => return Err(ExtractError::context(context_id, "no such context")),
        };

        let entity = context
            .child(XBRLI_NS, "entity")
            .ok_or_else(|| ExtractError::context(context_id, "context has no entity"))?;
        let period = context
            .child(XBRLI_NS, "period")
            .ok_or_else(|| ExtractError::context(context_id, "context has no period"))?;

        Ok(ReportingContext {
            id: context_id.to_string(),
            entity: entity
                .child(XBRLI_NS, "identifier")
                .map(|i| i.text_trimmed().to_string())
                .unwrap_or_default(),
            extent: decode_period(context_id, period, period_type)?,
            segments: flatten_segments(context),
        })
    }
}

fn period_date(context_id: &str, period: &Element, name: &str) -> Result<Option<NaiveDate>, ExtractError> {
    match period.child(XBRLI_NS, name) {
        None => Ok(None),
        Some(e) => parse_date(e.text_trimmed())
            .map(Some)
            .ok_or_else(|| ExtractError::context(context_id, format!("invalid {} {:?}", name, e.text_trimmed()))),
    }
}

fn decode_period(context_id: &str, period: &Element, period_type: PeriodType) -> Result<TemporalExtent, ExtractError> {
    let instant = period_date(context_id, period, "instant")?;
    let start = period_date(context_id, period, "startDate")?;
    let end = period_date(context_id, period, "endDate")?;

    match (period_type, instant, start, end) {
        (PeriodType::Instant, Some(date), None, None) => Ok(TemporalExtent::Instant { date }),
        (PeriodType::Duration, None, Some(start), Some(end)) => Ok(TemporalExtent::Duration { start, end }),
        (expected, ..) => Err(ExtractError::context(
            context_id,
            format!("period shape does not match declared {} semantics", expected),
        )),
    }
}

/// Joins every member under the context's segment/scenario blocks.
///
/// Each member renders as `{attr=value, ...}, text`; members are joined with
/// [`SEGMENT_DELIMITER`] in document order. A block with no members yields
/// `Some("")`, no block at all yields `None`.
pub fn flatten_segments(context: &Element) -> Option<String> {
    let blocks: Vec<&Element> = context
        .descendants()
        .filter(|e| e.is(XBRLI_NS, "segment") || e.is(XBRLI_NS, "scenario"))
        .collect();

    if blocks.is_empty() {
        return None;
    }

    let members: Vec<String> = blocks
        .into_iter()
        .flat_map(|block| block.descendants().skip(1))
        .map(describe_member)
        .collect();

    Some(members.join(SEGMENT_DELIMITER))
}

fn describe_member(member: &Element) -> String {
    let attributes = member
        .attributes
        .iter()
        .map(|a| format!("{}={}", a.name, a.value))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}, {}", attributes, member.text_trimmed())
}
