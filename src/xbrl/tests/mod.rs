use std::cell::Cell;
use std::collections::HashMap;

use anyhow::anyhow;

use super::bundle::{DocumentRole, SubmissionBundle};
use super::document::XmlDocument;
use super::namespace::QualifiedTag;
use super::schema::SchemaFetcher;

pub const GAAP_NS: &str = "http://fasb.org/us-gaap/2020-01-31";
pub const GAAP_LOCATION: &str = "http://xbrl.fasb.org/us-gaap/2020/elts/us-gaap-2020-01-31.xsd";
pub const DEI_LOCATION: &str = "https://xbrl.sec.gov/dei/2019/dei-2019-01-31.xsd";
pub const SUBMITTED_AT: &str = "2020-04-30T16:05:00";

pub const COMPANY_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:xbrli="http://www.xbrl.org/2003/instance"
           xmlns:acme="http://example.com/20200331"
           targetNamespace="http://example.com/20200331"
           elementFormDefault="qualified">
  <xs:import namespace="http://fasb.org/us-gaap/2020-01-31" schemaLocation="http://xbrl.fasb.org/us-gaap/2020/elts/us-gaap-2020-01-31.xsd"/>
  <xs:import namespace="http://xbrl.sec.gov/dei/2019-01-31" schemaLocation="https://xbrl.sec.gov/dei/2019/dei-2019-01-31.xsd"/>
  <xs:element name="WidgetsSold" id="acme_WidgetsSold" type="xbrli:sharesItemType" substitutionGroup="xbrli:item" xbrli:periodType="duration" nillable="true"/>
  <xs:element name="Backlog" id="acme_Backlog" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item" xbrli:periodType="instant" nillable="true"/>
  <xs:element name="Duplicated" id="acme_Duplicated_1" type="xbrli:monetaryItemType" xbrli:periodType="duration"/>
  <xs:element name="Duplicated" id="acme_Duplicated_2" type="xbrli:monetaryItemType" xbrli:periodType="duration"/>
</xs:schema>"#;

pub const GAAP_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:xbrli="http://www.xbrl.org/2003/instance"
           targetNamespace="http://fasb.org/us-gaap/2020-01-31">
  <xs:element name="Revenues" id="us-gaap_Revenues" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item" xbrli:periodType="duration" xbrli:balance="credit"/>
  <xs:element name="Assets" id="us-gaap_Assets" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item" xbrli:periodType="instant" xbrli:balance="debit"/>
  <xs:element name="CostOfRevenue" id="us-gaap_CostOfRevenue" type="xbrli:monetaryItemType" substitutionGroup="xbrli:item" xbrli:periodType="duration" xbrli:balance="debit"/>
</xs:schema>"#;

pub const DEI_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:xbrli="http://www.xbrl.org/2003/instance"
           targetNamespace="http://xbrl.sec.gov/dei/2019-01-31">
  <xs:element name="EntityCentralIndexKey" id="dei_EntityCentralIndexKey" type="xbrli:stringItemType" xbrli:periodType="duration"/>
  <xs:element name="DocumentPeriodEndDate" id="dei_DocumentPeriodEndDate" type="xbrli:dateItemType" xbrli:periodType="duration"/>
  <xs:element name="DocumentFiscalYearFocus" id="dei_DocumentFiscalYearFocus" type="xbrli:gYearItemType" xbrli:periodType="duration"/>
  <xs:element name="DocumentFiscalPeriodFocus" id="dei_DocumentFiscalPeriodFocus" type="xbrli:stringItemType" xbrli:periodType="duration"/>
</xs:schema>"#;

/// Quarterly instance whose default namespace is xbrli itself.
pub const INSTANCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrl xmlns="http://www.xbrl.org/2003/instance"
      xmlns:xbrldi="http://xbrl.org/2006/xbrldi"
      xmlns:link="http://www.xbrl.org/2003/linkbase"
      xmlns:xlink="http://www.w3.org/1999/xlink"
      xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
      xmlns:us-gaap="http://fasb.org/us-gaap/2020-01-31"
      xmlns:dei="http://xbrl.sec.gov/dei/2019-01-31"
      xmlns:acme="http://example.com/20200331"
      xmlns:unk="http://example.com/unknown">
  <link:schemaRef xlink:type="simple" xlink:href="acme-20200331.xsd"/>
  <context id="FY2020Q1">
    <entity><identifier scheme="http://www.sec.gov/CIK">0000012345</identifier></entity>
    <period><startDate>2020-01-01</startDate><endDate>2020-03-31</endDate></period>
  </context>
  <context id="FY2019Q1">
    <entity><identifier scheme="http://www.sec.gov/CIK">0000012345</identifier></entity>
    <period><startDate>2019-01-01</startDate><endDate>2019-03-31</endDate></period>
  </context>
  <context id="FY2020Q1_Widgets">
    <entity>
      <identifier scheme="http://www.sec.gov/CIK">0000012345</identifier>
      <segment><xbrldi:explicitMember dimension="us-gaap:StatementBusinessSegmentsAxis">acme:WidgetsMember</xbrldi:explicitMember></segment>
    </entity>
    <period><startDate>2020-01-01</startDate><endDate>2020-03-31</endDate></period>
  </context>
  <context id="AsOf2020Q1">
    <entity><identifier scheme="http://www.sec.gov/CIK">0000012345</identifier></entity>
    <period><instant>2020-03-31</instant></period>
  </context>
  <context id="AsOf2019">
    <entity><identifier scheme="http://www.sec.gov/CIK">0000012345</identifier></entity>
    <period><instant>2019-12-31</instant></period>
  </context>
  <unit id="USD"><measure>iso4217:USD</measure></unit>
  <dei:EntityCentralIndexKey contextRef="FY2020Q1">0000012345</dei:EntityCentralIndexKey>
  <dei:DocumentPeriodEndDate contextRef="FY2020Q1">2020-03-31</dei:DocumentPeriodEndDate>
  <dei:DocumentFiscalYearFocus contextRef="FY2020Q1">2020</dei:DocumentFiscalYearFocus>
  <dei:DocumentFiscalPeriodFocus contextRef="FY2020Q1">Q1</dei:DocumentFiscalPeriodFocus>
  <us-gaap:Revenues contextRef="FY2020Q1" unitRef="USD" decimals="-3">1000</us-gaap:Revenues>
  <us-gaap:Revenues contextRef="FY2019Q1" unitRef="USD" decimals="-3">900</us-gaap:Revenues>
  <us-gaap:Revenues contextRef="FY2020Q1_Widgets" unitRef="USD" decimals="-3">400</us-gaap:Revenues>
  <us-gaap:CostOfRevenue contextRef="FY2020Q1" unitRef="USD" decimals="-3">600</us-gaap:CostOfRevenue>
  <us-gaap:Assets contextRef="AsOf2020Q1" unitRef="USD" decimals="-3">5000</us-gaap:Assets>
  <us-gaap:Assets contextRef="AsOf2019" unitRef="USD" decimals="-3">4800</us-gaap:Assets>
  <acme:WidgetsSold contextRef="FY2020Q1" decimals="0">42</acme:WidgetsSold>
  <acme:Duplicated contextRef="FY2020Q1" unitRef="USD">1</acme:Duplicated>
  <unk:Thing contextRef="FY2020Q1">7</unk:Thing>
</xbrl>"#;

pub const LABELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:labelLink xlink:type="extended" xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="http://xbrl.fasb.org/us-gaap/2020/elts/us-gaap-2020-01-31.xsd#us-gaap_Assets" xlink:label="loc_us-gaap_Assets"/>
    <link:label id="lab_us-gaap_Assets_totalLabel_en-US" xlink:type="resource" xlink:label="lab_us-gaap_Assets" xml:lang="en-US">Total</link:label>
    <link:label id="lab_us-gaap_Revenues_label_en-US" xlink:type="resource" xlink:label="lab_us-gaap_Revenues" xml:lang="en-US">Revenues</link:label>
    <link:label id="lab_us-gaap_Revenues_verboseLabel_en-US" xlink:type="resource" xlink:label="lab_us-gaap_Revenues" xml:lang="en-US">Revenues</link:label>
    <link:label id="lab_us-gaap_Revenues_totalLabel_en-US" xlink:type="resource" xlink:label="lab_us-gaap_Revenues" xml:lang="en-US">Total</link:label>
  </link:labelLink>
</link:linkbase>"#;

/// In-memory [`SchemaFetcher`] that counts how often it is asked.
#[derive(Default)]
pub struct CountingFetcher {
    schemas: HashMap<String, &'static str>,
    calls: Cell<usize>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, location: &str, schema: &'static str) -> Self {
        self.schemas.insert(location.to_string(), schema);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SchemaFetcher for CountingFetcher {
    fn fetch(&self, location: &str) -> anyhow::Result<XmlDocument> {
        self.calls.set(self.calls.get() + 1);
        let text = self
            .schemas
            .get(location)
            .ok_or_else(|| anyhow!("no schema at {}", location))?;
        Ok(XmlDocument::parse(text)?)
    }
}

pub fn fetcher() -> CountingFetcher {
    CountingFetcher::new()
        .with(GAAP_LOCATION, GAAP_SCHEMA)
        .with(DEI_LOCATION, DEI_SCHEMA)
}

pub fn bundle() -> SubmissionBundle {
    SubmissionBundle::new(SUBMITTED_AT)
        .with_document(DocumentRole::Schema, XmlDocument::parse(COMPANY_SCHEMA).unwrap())
        .with_document(DocumentRole::Instance, XmlDocument::parse(INSTANCE).unwrap())
        .with_document(DocumentRole::Label, XmlDocument::parse(LABELS).unwrap())
}

pub fn qualified(namespace: &str, prefix: &str, local_name: &str) -> QualifiedTag {
    QualifiedTag {
        namespace: namespace.to_string(),
        prefix: prefix.to_string(),
        local_name: local_name.to_string(),
    }
}
