use anyhow::{anyhow, Result};
use colored::*;
use std::io;
use std::path::PathBuf;
use structopt::StructOpt;
use xbrl_facts::xbrl::bundle::submission_time_from_base;
use xbrl_facts::xbrl::facts::blanket_requests;
use xbrl_facts::xbrl::labels::{label_candidates, select_tag, TagSelection};
use xbrl_facts::xbrl::requests::read_requests;
use xbrl_facts::xbrl::{
    extract_flat, extract_wide, Diagnostic, DocumentRole, FileDocumentSource, HeaderTagRequest, SubmissionBundle,
};
use xbrl_facts::{CachedSchemaFetcher, ExtractorConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "xbrl-facts", about = "Extract facts from retrieved XBRL submissions")]
struct Opt {
    /// Cache directory for imported schemas
    #[structopt(long, parse(from_os_str))]
    schema_dir: Option<PathBuf>,

    /// Re-download imported schemas even if cached
    #[structopt(long)]
    refresh: bool,

    /// Submission timestamp; defaults to the base file name prefix
    #[structopt(long)]
    time: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// One row per fact occurrence
    Flat {
        /// Submission base file name (without .xsd / .xml)
        #[structopt(parse(from_os_str))]
        base: PathBuf,
        /// Request list; every schema namespace is extracted when omitted
        #[structopt(long, parse(from_os_str))]
        requests: Option<PathBuf>,
        /// Print JSON instead of CSV
        #[structopt(long)]
        json: bool,
    },
    /// One row per reporting context, one column per requested header
    Wide {
        #[structopt(parse(from_os_str))]
        base: PathBuf,
        #[structopt(parse(from_os_str))]
        requests: PathBuf,
        /// Keep only segment-free rows covering the primary reporting period
        #[structopt(long)]
        primary: bool,
    },
    /// Look up tags by their label-linkbase text
    Labels {
        #[structopt(parse(from_os_str))]
        base: PathBuf,
        labels: Vec<String>,
    },
}

impl Command {
    fn base(&self) -> &PathBuf {
        match self {
            Command::Flat { base, .. } | Command::Wide { base, .. } | Command::Labels { base, .. } => base,
        }
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        eprintln!("{} {}", "warning:".yellow(), d);
    }
}

fn write_flat(bundle: &mut SubmissionBundle, requests: &[HeaderTagRequest], fetcher: &CachedSchemaFetcher, json: bool) -> Result<()> {
    let extraction = extract_flat(bundle, requests, fetcher);
    print_diagnostics(&extraction.diagnostics);

    if json {
        println!("{}", serde_json::to_string_pretty(&extraction)?);
        return Ok(());
    }

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "CIK",
        "Reporting Period End Date",
        "Submission Time",
        "Name",
        "Value",
        "Period Start",
        "Period End",
        "Segments",
    ])?;
    for row in &extraction.rows {
        writer.write_record([
            row.entity_id.to_string(),
            row.period_end_date.clone().unwrap_or_default(),
            row.submitted_at.clone(),
            row.display_name(),
            row.value.clone(),
            row.extent.start().map(|d| d.to_string()).unwrap_or_default(),
            row.extent.end().to_string(),
            row.segments.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_wide(bundle: &mut SubmissionBundle, requests: &[HeaderTagRequest], fetcher: &CachedSchemaFetcher, primary: bool) -> Result<()> {
    let mut table = extract_wide(bundle, requests, fetcher);
    print_diagnostics(&table.diagnostics);
    if primary {
        table = table.primary_period();
    }

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(table.headers())?;
    for record in table.records() {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_labels(bundle: &SubmissionBundle, labels: &[String]) -> Result<()> {
    let label_doc = bundle.require(DocumentRole::Label)?;

    for label in labels {
        match select_tag(label, label_candidates(label_doc, label)) {
            TagSelection::Skip => println!("{}: {}", label, "not found".red()),
            TagSelection::Resolved(request) => println!("{}: {}", label, request.tag.green()),
            TagSelection::Choose { choices, .. } => {
                println!("{}:", label);
                for (i, tag) in choices.iter().enumerate() {
                    println!("\t({}) {}", i, tag);
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    let opt = Opt::from_args();

    let mut config = ExtractorConfig::from_env()?;
    if let Some(dir) = opt.schema_dir {
        config.schema_dir = dir;
    }
    config.refresh_schemas |= opt.refresh;

    let base = opt.cmd.base().clone();
    let source = FileDocumentSource::new(&base);
    let submitted_at = opt.time.unwrap_or_else(|| submission_time_from_base(&base));

    let mut bundle = SubmissionBundle::load(&source, submitted_at);
    if bundle.instance.is_none() && bundle.schema.is_none() {
        return Err(anyhow!("No submission documents found for {}", base.display()));
    }

    let fetcher = CachedSchemaFetcher::new(&config, source.directory());

    match opt.cmd {
        Command::Flat { requests, json, .. } => {
            let requests = match requests {
                Some(path) => read_requests(&path)?,
                None => blanket_requests(&bundle),
            };
            write_flat(&mut bundle, &requests, &fetcher, json)
        }
        Command::Wide { requests, primary, .. } => {
            let requests = read_requests(&requests)?;
            write_wide(&mut bundle, &requests, &fetcher, primary)
        }
        Command::Labels { labels, .. } => print_labels(&bundle, &labels),
    }
}
