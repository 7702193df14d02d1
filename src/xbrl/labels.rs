use itertools::Itertools;
use serde::Serialize;

use super::document::XmlDocument;
use super::requests::HeaderTagRequest;

/// Tags whose label resources read exactly `label`, ignoring case.
///
/// Label ids follow `lab_<prefix>_<Name>_...`; anything else is ignored.
pub fn label_candidates(label_doc: &XmlDocument, label: &str) -> Vec<String> {
    label_doc
        .root
        .descendants()
        .filter(|e| e.text.as_deref().is_some_and(|t| t.trim().eq_ignore_ascii_case(label.trim())))
        .filter_map(|e| tag_from_label_id(e.attribute("id")?))
        .unique()
        .collect()
}

fn tag_from_label_id(id: &str) -> Option<String> {
    let mut parts = id.split('_').skip(1);
    let prefix = parts.next().filter(|p| !p.is_empty())?;
    let name = parts.next().filter(|n| !n.is_empty())?;
    Some(format!("{}:{}", prefix, name))
}

/// What to do with an output field once its label has been looked up.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum TagSelection {
    /// Nothing matched; the caller may retry with another label or skip.
    Skip,
    Resolved(HeaderTagRequest),
    /// Several tags matched; someone has to pick one.
    Choose { field: String, choices: Vec<String> },
}

/// Turns label-search candidates into a selection for `field`.
pub fn select_tag(field: &str, candidates: Vec<String>) -> TagSelection {
    match candidates.len() {
        0 => TagSelection::Skip,
        1 => TagSelection::Resolved(HeaderTagRequest::new(field, candidates[0].clone())),
        _ => TagSelection::Choose {
            field: field.to_string(),
            choices: candidates,
        },
    }
}

impl TagSelection {
    /// Settles a `Choose` with the `index`-th choice.
    pub fn choose(&self, index: usize) -> Option<HeaderTagRequest> {
        match self {
            TagSelection::Resolved(request) => Some(request.clone()),
            TagSelection::Choose { field, choices } => {
                choices.get(index).map(|tag| HeaderTagRequest::new(field.clone(), tag.clone()))
            }
            TagSelection::Skip => None,
        }
    }
}
