//! Command-line interface for the harvester.
//!
//! `harvest` runs a ListRecords listing to completion, following resumption
//! tokens, and writes one file per record. `get` prints a single record.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::catalog::{Catalog, HarvestCatalog, ListRequest};
use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::http::FigshareClient;
use crate::types::Record;
use crate::xml::{extract_element, extract_element_content};

/// Pause between listing pages, to go easy on the figshare API.
pub const DEFAULT_PAUSE_SECS: u64 = 10;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n";

/// figshare OAI-PMH harvester - emulate OAI-PMH requests against the figshare API.
#[derive(Parser)]
#[command(name = "figshare-oai-harvester")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Emulate a ListRecords request, writing each record to its own file.
    Harvest {
        /// Catalog configuration file (YAML)
        config: PathBuf,

        /// Existing directory to write record files into
        output_dir: PathBuf,

        /// Harvest records modified since (YYYY-MM-DD or YYYY-MM-DDThh:mm:ssZ)
        from: String,

        /// Harvest records modified before, or "-" for no upper bound
        until: String,

        /// Metadata prefix (e.g., oai_dc or json)
        metadata_prefix: String,

        #[command(flatten)]
        extract: ExtractArgs,

        /// Seconds to pause between pages
        #[arg(long, default_value_t = DEFAULT_PAUSE_SECS)]
        pause: u64,
    },

    /// Emulate a GetRecord request, printing the record.
    Get {
        /// Catalog configuration file (YAML)
        config: PathBuf,

        /// OAI identifier (e.g., oai:figshare.com:article/4689088)
        identifier: String,

        /// Metadata prefix (e.g., oai_dc or json)
        metadata_prefix: String,

        #[command(flatten)]
        extract: ExtractArgs,
    },
}

/// Optional extraction of one element from each record.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ExtractArgs {
    /// Output only this element (with namespace prefix, e.g., oai_dc:dc or json:element)
    #[arg(short, long)]
    pub element: Option<String>,

    /// With --element, output the element's content instead of the element
    #[arg(short, long, requires = "element")]
    pub content: bool,
}

impl ExtractArgs {
    /// Apply the extraction to a rendered record.
    ///
    /// # Returns
    /// * `Ok(Some(text))` - Text to output
    /// * `Ok(None)` - The requested element is not in the record
    pub fn apply(&self, record: &Record) -> Result<Option<String>> {
        let xml = record.to_xml();
        match &self.element {
            None => Ok(Some(xml)),
            Some(element) if self.content => extract_element_content(&xml, element),
            Some(element) => extract_element(&xml, element),
        }
    }

    /// Whether the output is a complete XML document.
    #[must_use]
    pub fn is_document(&self) -> bool {
        !(self.element.is_some() && self.content)
    }
}

/// Settings of one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub output_dir: PathBuf,
    pub extract: ExtractArgs,
    pub pause: Duration,
}

/// Running totals of a harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    /// Records received from the catalog.
    pub records: usize,
    /// Files written.
    pub written: usize,
    /// When the last page was requested.
    pub last_retrieve: DateTime<Utc>,
}

impl Default for HarvestOutcome {
    fn default() -> Self {
        Self {
            records: 0,
            written: 0,
            last_retrieve: Utc::now(),
        }
    }
}

/// Map an error to the process exit code.
///
/// Upstream failures exit with 1, protocol errors (bad dates, tokens, formats
/// or identifiers) with 2, anything else with 1.
#[must_use]
pub fn exit_code(error: &CatalogError) -> i32 {
    if error.is_upstream() {
        1
    } else if error.oai_code().is_some() {
        2
    } else {
        1
    }
}

/// Run the CLI.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Harvest {
            config,
            output_dir,
            from,
            until,
            metadata_prefix,
            extract,
            pause,
        } => {
            let mut request = ListRequest::new(metadata_prefix).with_from(from);
            if until != "-" {
                request = request.with_until(until);
            }
            let options = HarvestOptions {
                output_dir,
                extract,
                pause: Duration::from_secs(pause),
            };
            harvest_command(&config, &request, &options)
        }
        Commands::Get {
            config,
            identifier,
            metadata_prefix,
            extract,
        } => get_command(&config, &identifier, &metadata_prefix, &extract),
    }
}

/// Build a catalog backed by the figshare API from a configuration file.
pub fn open_catalog(config_path: &Path) -> Result<Catalog<FigshareClient>> {
    let config = CatalogConfig::load(config_path)?;
    let client = FigshareClient::new(&config.api)?;
    Catalog::new(config, client)
}

/// Check that a path is an existing directory.
fn ensure_output_dir(output_dir: &Path) -> Result<()> {
    if !output_dir.exists() {
        return Err(CatalogError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory does not exist: {}", output_dir.display()),
        )));
    }
    if !output_dir.is_dir() {
        return Err(CatalogError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Output path is not a directory: {}", output_dir.display()),
        )));
    }
    Ok(())
}

/// Execute the harvest command.
fn harvest_command(config_path: &Path, request: &ListRequest, options: &HarvestOptions) -> Result<()> {
    // Validate output directory before any request
    ensure_output_dir(&options.output_dir)?;
    let catalog = open_catalog(config_path)?;

    println!(
        "{} {} records from {} until {}",
        style("Harvesting").bold(),
        style(&request.metadata_prefix).cyan(),
        style(request.from.as_deref().unwrap_or("-")).green(),
        style(request.until.as_deref().unwrap_or("-")).green()
    );
    println!();

    let started = Instant::now();
    let mut outcome = HarvestOutcome::default();
    let result = harvest_records(&catalog, request, options, &mut outcome);
    let elapsed = started.elapsed();

    println!();
    println!(
        "{} {} records ({} files) in {:.1} seconds",
        style("Harvested").green().bold(),
        outcome.records,
        outcome.written,
        elapsed.as_secs_f64()
    );
    println!(
        "{} {}",
        style("Next from-date:").bold(),
        next_from_date(request, &outcome)
    );

    result
}

/// Run a ListRecords listing to completion, writing each record to a file.
///
/// # Arguments
/// * `catalog` - Catalog to harvest from
/// * `request` - Listing request
/// * `options` - Output directory, extraction and pause between pages
/// * `outcome` - Updated as records arrive, so totals survive a failure
pub fn harvest_records<C: HarvestCatalog>(
    catalog: &C,
    request: &ListRequest,
    options: &HarvestOptions,
    outcome: &mut HarvestOutcome,
) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Retrieving first page...");

    outcome.last_retrieve = Utc::now();
    let mut page = match catalog.list_records(request) {
        Ok(page) => page,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    loop {
        for record in &page.records {
            outcome.records += 1;
            pb.set_message(format!("Record {}: {}", outcome.records, record.header.identifier));
            match write_record(record, options) {
                Ok(true) => outcome.written += 1,
                Ok(false) => {}
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(e);
                }
            }
        }

        let Some(ticket) = page.ticket.take() else {
            break;
        };

        if !options.pause.is_zero() {
            pb.set_message(format!("Pausing for {} seconds...", options.pause.as_secs()));
            thread::sleep(options.pause);
        }
        pb.set_message("Retrieving next page...");
        tracing::debug!(token = %ticket.token, "Resuming listing");
        outcome.last_retrieve = Utc::now();
        page = match catalog.list_records_resume(&ticket.token) {
            Ok(page) => page,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        };
    }

    pb.finish_and_clear();
    Ok(())
}

/// Write one record to the output directory.
///
/// # Returns
/// `Ok(false)` when the requested element is missing and nothing was written
fn write_record(record: &Record, options: &HarvestOptions) -> Result<bool> {
    let file_name = record.header.to_file_name();
    let Some(text) = options.extract.apply(record)? else {
        tracing::warn!(
            identifier = %record.header.identifier,
            element = ?options.extract.element,
            "No XML element found, output file skipped"
        );
        return Ok(false);
    };

    let mut contents = String::with_capacity(text.len() + XML_DECLARATION.len() + 1);
    if options.extract.is_document() {
        contents.push_str(XML_DECLARATION);
    }
    contents.push_str(&text);
    contents.push('\n');

    let path = options.output_dir.join(&file_name);
    fs::write(&path, contents)?;
    tracing::debug!(path = %path.display(), "Record written");
    Ok(true)
}

/// The from-date to use for the next incremental harvest.
///
/// The requested upper bound when there was one, otherwise the time of the
/// last page request.
#[must_use]
pub fn next_from_date(request: &ListRequest, outcome: &HarvestOutcome) -> String {
    match &request.until {
        Some(until) => until.clone(),
        None => outcome.last_retrieve.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    }
}

/// Execute the get command.
fn get_command(
    config_path: &Path,
    identifier: &str,
    metadata_prefix: &str,
    extract: &ExtractArgs,
) -> Result<()> {
    let catalog = open_catalog(config_path)?;
    let record = catalog.get_record(identifier, metadata_prefix)?;
    match extract.apply(&record)? {
        Some(text) => println!("{text}"),
        None => eprintln!(
            "{} element not found in record",
            style("Warning:").yellow().bold()
        ),
    }
    Ok(())
}
