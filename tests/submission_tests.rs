use chrono::NaiveDate;
use std::cell::Cell;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use xbrl_facts::xbrl::bundle::submission_time_from_base;
use xbrl_facts::xbrl::{
    extract_flat, extract_wide, parse_requests, FileDocumentSource, HeaderTagRequest, RowKey, SchemaFetcher,
    SubmissionBundle, TemporalExtent, XmlDocument,
};

const SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:xbrli="http://www.xbrl.org/2003/instance"
           targetNamespace="http://fasb.org/us-gaap/2020-01-31">
  <xs:element name="Revenues" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item" xbrli:periodType="duration"/>
  <xs:element name="Assets" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item" xbrli:periodType="instant"/>
</xs:schema>"#;

const INSTANCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
            xmlns:us-gaap="http://fasb.org/us-gaap/2020-01-31"
            xmlns:ifrs="http://xbrl.ifrs.org/taxonomy/2020-03-16/ifrs-full">
  <xbrli:context id="c1">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:startDate>2020-01-01</xbrli:startDate><xbrli:endDate>2020-03-31</xbrli:endDate></xbrli:period>
  </xbrli:context>
  <xbrli:context id="i1">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000320193</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>2020-03-31</xbrli:instant></xbrli:period>
  </xbrli:context>
  <us-gaap:Revenues contextRef="c1">1000</us-gaap:Revenues>
  <us-gaap:Assets contextRef="i1">2500</us-gaap:Assets>
  <ifrs:Revenue contextRef="c1">1000</ifrs:Revenue>
</xbrli:xbrl>"#;

struct NoFetch {
    calls: Cell<usize>,
}

impl SchemaFetcher for NoFetch {
    fn fetch(&self, location: &str) -> anyhow::Result<XmlDocument> {
        self.calls.set(self.calls.get() + 1);
        Err(anyhow::anyhow!("offline: {}", location))
    }
}

fn no_fetch() -> NoFetch {
    NoFetch { calls: Cell::new(0) }
}

fn write_submission(dir: &Path) -> std::path::PathBuf {
    let base = dir.join("2020-04-30T16:05:00_10-Q_acme-20200331");
    let source = FileDocumentSource::new(&base);
    fs::write(source.path_for(xbrl_facts::xbrl::DocumentRole::Schema), SCHEMA).unwrap();
    fs::write(source.path_for(xbrl_facts::xbrl::DocumentRole::Instance), INSTANCE).unwrap();
    base
}

fn load(base: &Path) -> SubmissionBundle {
    SubmissionBundle::load(&FileDocumentSource::new(base), submission_time_from_base(base))
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[test]
fn test_single_duration_fact_yields_one_row() {
    let temp = tempdir().unwrap();
    let mut bundle = load(&write_submission(temp.path()));
    assert_eq!(bundle.missing_roles().len(), 4);

    let requests = vec![HeaderTagRequest::bare("us-gaap:Revenues")];
    let extraction = extract_flat(&mut bundle, &requests, &no_fetch());

    assert!(extraction.diagnostics.is_empty());
    assert_eq!(extraction.rows.len(), 1);
    let row = &extraction.rows[0];
    assert_eq!(row.value, "1000");
    assert_eq!(row.entity_id, 320193);
    assert_eq!(row.submitted_at, "2020-04-30T16:05:00");
    assert_eq!(
        row.extent,
        TemporalExtent::Duration { start: date("2020-01-01"), end: date("2020-03-31") }
    );
    assert_eq!(row.segments, None);
}

#[test]
fn test_unimported_namespace_is_skipped_with_one_diagnostic() {
    let temp = tempdir().unwrap();
    let mut bundle = load(&write_submission(temp.path()));
    let fetcher = no_fetch();

    let requests = parse_requests("ifrs:Revenue\nus-gaap:Revenues\nus-gaap:Assets\n").unwrap();
    let extraction = extract_flat(&mut bundle, &requests, &fetcher);

    assert_eq!(extraction.diagnostics.len(), 1);
    assert_eq!(extraction.diagnostics[0].kind, "unresolvable-tag");
    assert_eq!(extraction.diagnostics[0].tag, "ifrs:Revenue");
    assert!(extraction.rows.iter().all(|r| r.tag != "ifrs:Revenue"));
    assert_eq!(extraction.rows.len(), 2);
    assert_eq!(fetcher.calls.get(), 0);
}

#[test]
fn test_instant_fact_gets_end_of_period_row() {
    let temp = tempdir().unwrap();
    let mut bundle = load(&write_submission(temp.path()));

    let requests = vec![
        HeaderTagRequest::new("Revenue", "us-gaap:Revenues"),
        HeaderTagRequest::new("Assets", "us-gaap:Assets"),
    ];
    let table = extract_wide(&mut bundle, &requests, &no_fetch());

    let duration_key = RowKey {
        cik: 320193,
        period_end_date: None,
        submitted_at: "2020-04-30T16:05:00".to_string(),
        segments: None,
        period_focus: None,
        period_start: Some(date("2020-01-01")),
        period_end: date("2020-03-31"),
    };
    let row = table.get(&duration_key).unwrap();
    assert_eq!(row.get("Revenue").map(String::as_str), Some("1000"));
    assert_eq!(row.get("EoP Assets").map(String::as_str), Some("2500"));
    assert!(row.get("BoP Assets").is_none());

    let instant_key = RowKey {
        period_start: None,
        ..duration_key
    };
    assert_eq!(
        table.get(&instant_key).and_then(|r| r.get("Assets")).map(String::as_str),
        Some("2500")
    );
    assert_eq!(table.len(), 2);
}

#[test]
fn test_missing_schema_reports_missing_role() {
    let temp = tempdir().unwrap();
    let base = write_submission(temp.path());
    fs::remove_file(FileDocumentSource::new(&base).path_for(xbrl_facts::xbrl::DocumentRole::Schema)).unwrap();
    let mut bundle = load(&base);

    let requests = vec![HeaderTagRequest::bare("us-gaap:Revenues")];
    let extraction = extract_flat(&mut bundle, &requests, &no_fetch());

    assert!(extraction.rows.is_empty());
    assert_eq!(extraction.diagnostics.len(), 1);
    assert_eq!(extraction.diagnostics[0].kind, "missing-role");
}
