//! End-to-end integration tests for the catalog.
//!
//! Drives the catalog against an in-memory search backend, using a fixture
//! article modelled on a figshare dataset record.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use roxmltree::Document;
use serde_json::{json, Value};

use figshare_oai_harvester::cli::{harvest_records, ExtractArgs, HarvestOptions, HarvestOutcome};
use figshare_oai_harvester::filter::SearchQuery;
use figshare_oai_harvester::xml::{extract_element_content, has_qualified_name};
use figshare_oai_harvester::{
    Catalog, CatalogConfig, CatalogError, HarvestCatalog, ListRequest, NativeItem, Result,
    SearchBackend,
};

/// Load fixture file content.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn load_article() -> NativeItem {
    let path = fixture_path("article_4689088.json");
    let text = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e));
    let value: Value = serde_json::from_str(&text).expect("fixture is valid JSON");
    NativeItem::from_value(value).expect("fixture is an object")
}

/// In-memory backend paging over a fixed result list.
struct MockBackend {
    results: Vec<NativeItem>,
    articles: Vec<NativeItem>,
    searches: Mutex<Vec<(SearchQuery, u32, usize)>>,
}

impl MockBackend {
    fn new(results: Vec<NativeItem>, articles: Vec<NativeItem>) -> Self {
        Self {
            results,
            articles,
            searches: Mutex::new(Vec::new()),
        }
    }
}

impl SearchBackend for MockBackend {
    fn search(&self, query: &SearchQuery, page: u32, page_size: usize) -> Result<Vec<NativeItem>> {
        self.searches
            .lock()
            .unwrap()
            .push((query.clone(), page, page_size));
        let start = (page as usize - 1) * page_size;
        Ok(self
            .results
            .iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect())
    }

    fn article(&self, id: u64) -> Result<Option<NativeItem>> {
        Ok(self.articles.iter().find(|a| a.id() == Some(id)).cloned())
    }
}

fn summary(id: u64) -> NativeItem {
    NativeItem::from_value(json!({
        "id": id,
        "title": format!("Dataset {id}"),
        "published_date": "2021-05-04T10:00:00Z"
    }))
    .unwrap()
}

fn article(id: u64) -> NativeItem {
    NativeItem::from_value(json!({
        "id": id,
        "title": format!("Dataset {id}"),
        "description": "Measurements",
        "citation": format!("Author (2021): Dataset {id}. figshare."),
        "defined_type_name": "dataset",
        "url_public_html": format!("https://figshare.com/articles/dataset/{id}"),
        "timeline": {"revision": "2021-05-04T10:00:00"}
    }))
    .unwrap()
}

fn seventeen_item_backend() -> MockBackend {
    MockBackend::new(
        (1..=17).map(summary).collect(),
        (1..=17).map(article).collect(),
    )
}

fn config() -> CatalogConfig {
    CatalogConfig::new("figshare.example.org").with_max_list_size(10)
}

fn fixture_catalog() -> Catalog<MockBackend> {
    let config = CatalogConfig::load(&fixture_path("config.yaml")).unwrap();
    let article = load_article();
    Catalog::new(config, MockBackend::new(vec![article.clone()], vec![article])).unwrap()
}

fn elements<'a, 'input>(doc: &'a Document<'input>, name: &str) -> Vec<roxmltree::Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| has_qualified_name(*n, name))
        .collect()
}

#[test]
fn test_list_records_pages_through_seventeen_items() {
    let catalog = Catalog::new(config(), seventeen_item_backend()).unwrap();

    let first = catalog
        .list_records(&ListRequest::new("oai_dc").with_from("2021-01-01"))
        .unwrap();
    assert_eq!(first.records.len(), 10);
    let ticket = first.ticket.expect("full page carries a token");
    assert!(!ticket.token.is_empty());

    let second = catalog.list_records_resume(&ticket.token).unwrap();
    assert_eq!(second.records.len(), 7);
    assert!(second.ticket.is_none());
    assert_eq!(
        second.records[0].header.identifier,
        "oai:figshare.example.org:article/11"
    );

    // Tokens are single use
    assert!(matches!(
        catalog.list_records_resume(&ticket.token),
        Err(CatalogError::InvalidToken(_))
    ));

    let searches = catalog.backend().searches.lock().unwrap();
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[0].1, 1);
    assert_eq!(searches[1].1, 2);
    assert_eq!(searches[0].0, searches[1].0);
    assert!(searches.iter().all(|(_, _, size)| *size == 10));
}

#[test]
fn test_list_identifiers_uses_search_summaries() {
    let catalog = Catalog::new(config(), seventeen_item_backend()).unwrap();

    let list = catalog
        .list_identifiers(&ListRequest::new("json"))
        .unwrap();
    assert_eq!(list.headers.len(), 10);
    assert_eq!(list.headers[0].identifier, "oai:figshare.example.org:article/1");
    assert_eq!(list.headers[0].datestamp.as_deref(), Some("2021-05-04T10:00:00Z"));
    assert!(list.ticket.is_some());
}

#[test]
fn test_exact_multiple_ends_with_empty_page() {
    let backend = MockBackend::new(
        (1..=10).map(summary).collect(),
        (1..=10).map(article).collect(),
    );
    let catalog = Catalog::new(config(), backend).unwrap();

    let first = catalog.list_identifiers(&ListRequest::new("oai_dc")).unwrap();
    let token = first.ticket.unwrap().token;
    let second = catalog.list_identifiers_resume(&token).unwrap();

    assert!(second.headers.is_empty());
    assert!(second.ticket.is_none());
}

#[test]
fn test_vanished_and_ineligible_items_are_skipped() {
    let mut articles: Vec<NativeItem> = (1..=5).filter(|id| *id != 2).map(article).collect();
    // Article 4 lacks a citation and cannot be rendered as Dublin Core
    articles[2] = NativeItem::from_value(json!({
        "id": 4,
        "title": "No citation",
        "description": "d",
        "defined_type_name": "dataset",
        "url_public_html": "https://figshare.com/articles/dataset/4"
    }))
    .unwrap();
    let backend = MockBackend::new((1..=5).map(summary).collect(), articles);
    let catalog = Catalog::new(config(), backend).unwrap();

    let list = catalog.list_records(&ListRequest::new("oai_dc")).unwrap();
    let ids: Vec<&str> = list
        .records
        .iter()
        .map(|r| r.header.identifier.as_str())
        .collect();
    assert_eq!(
        ids,
        vec![
            "oai:figshare.example.org:article/1",
            "oai:figshare.example.org:article/3",
            "oai:figshare.example.org:article/5",
        ]
    );

    // The same item is still available as JSON
    let list = catalog.list_records(&ListRequest::new("json")).unwrap();
    assert_eq!(list.records.len(), 4);
}

#[test]
fn test_unknown_prefix_fails_before_search() {
    let catalog = Catalog::new(config(), seventeen_item_backend()).unwrap();

    let err = catalog
        .list_records(&ListRequest::new("marc21"))
        .unwrap_err();
    assert_eq!(err.oai_code(), Some("cannotDisseminateFormat"));
    assert!(catalog.backend().searches.lock().unwrap().is_empty());
}

#[test]
fn test_dublin_core_sample_record() {
    let catalog = fixture_catalog();
    let record = catalog
        .get_record("oai:figshare.example.org:article/4689088", "oai_dc")
        .unwrap();

    assert_eq!(
        record.header.datestamp.as_deref(),
        Some("2017-03-02T10:11:12Z")
    );
    let xml = record.to_xml();
    let doc = Document::parse(&xml).expect("record is well-formed");

    let titles = elements(&doc, "dc:title");
    assert_eq!(
        titles[0].text(),
        Some("Foraging behaviour of <i>Apis mellifera</i> & wild pollinators")
    );

    let identifiers: Vec<&str> = elements(&doc, "dc:identifier")
        .iter()
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(
        identifiers,
        vec!["https://doi.org/10.6084/m9.figshare.4689088.v2"]
    );

    let creators = elements(&doc, "dc:creator");
    assert_eq!(creators.len(), 2);
    assert_eq!(creators[0].text(), Some("Jane Smith (2335768)"));
    assert_eq!(
        creators[0].attribute((
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#",
            "resource"
        )),
        Some("https://orcid.org/0000-0002-1825-0097")
    );
    assert_eq!(creators[1].text(), Some("Kim Lee"));
    assert!(creators[1]
        .attribute(("http://www.w3.org/1999/02/22-rdf-syntax-ns#", "resource"))
        .is_none());

    let subjects: Vec<&str> = elements(&doc, "dc:subject")
        .iter()
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(subjects, vec!["Ecology", "pollination", "honey bees"]);

    let coverage: Vec<&str> = elements(&doc, "dc:coverage")
        .iter()
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(coverage, vec!["Wageningen"]);
    assert!(!xml.contains("not exported"));

    let types: Vec<&str> = elements(&doc, "dc:type")
        .iter()
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(types, vec!["Dataset"]);

    let references: Vec<&str> = elements(&doc, "dcterms:references")
        .iter()
        .filter_map(|n| n.text())
        .collect();
    assert_eq!(
        references,
        vec!["https://doi.org/10.1000/xyz123", "https://example.org/field-notes"]
    );

    assert!(xml.contains("<!-- visits.csv -->https://ndownloader.figshare.com/files/7611277"));
    assert!(xml.contains("xmlns:figshare=\"https://figshare.com/\""));
    assert!(!xml.contains("funding_list in figshare"));
}

#[test]
fn test_json_record_round_trips_native_item() {
    let catalog = fixture_catalog();
    let record = catalog
        .get_record("oai:figshare.example.org:article/4689088", "json")
        .unwrap();

    let json = extract_element_content(&record.to_xml(), "json:element")
        .unwrap()
        .unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(&value, &Value::Object(load_article().fields().clone()));
}

#[test]
fn test_get_record_errors() {
    let catalog = fixture_catalog();

    let missing = catalog
        .get_record("oai:figshare.example.org:article/1", "oai_dc")
        .unwrap_err();
    assert_eq!(missing.oai_code(), Some("idDoesNotExist"));

    let malformed = catalog
        .get_record("oai:figshare.example.org", "oai_dc")
        .unwrap_err();
    assert_eq!(malformed.oai_code(), Some("idDoesNotExist"));

    let format = catalog
        .get_record("oai:figshare.example.org:article/4689088", "qdc")
        .unwrap_err();
    assert_eq!(format.oai_code(), Some("cannotDisseminateFormat"));
}

#[test]
fn test_list_metadata_formats() {
    let catalog = fixture_catalog();

    let all = catalog.list_metadata_formats(None).unwrap();
    let prefixes: Vec<&str> = all.iter().map(|f| f.prefix.as_str()).collect();
    assert_eq!(prefixes, vec!["oai_dc", "json"]);
    assert_eq!(all[0].namespace, "http://www.openarchives.org/OAI/2.0/oai_dc/");

    let for_item = catalog
        .list_metadata_formats(Some("oai:figshare.example.org:article/4689088"))
        .unwrap();
    assert_eq!(for_item, all);

    assert!(catalog
        .list_metadata_formats(Some("oai:figshare.example.org:article/1"))
        .is_err());
    assert!(matches!(
        catalog.list_sets(),
        Err(CatalogError::NoSetHierarchy)
    ));
}

#[test]
fn test_concurrent_resume_succeeds_once() {
    let catalog = Arc::new(Catalog::new(config(), seventeen_item_backend()).unwrap());
    let token = catalog
        .list_identifiers(&ListRequest::new("oai_dc"))
        .unwrap()
        .ticket
        .unwrap()
        .token;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let catalog = Arc::clone(&catalog);
            let token = token.clone();
            thread::spawn(move || catalog.list_identifiers_resume(&token).is_ok())
        })
        .collect();
    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
}

#[test]
fn test_harvest_writes_one_file_per_record() {
    let catalog = Catalog::new(config(), seventeen_item_backend()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let options = HarvestOptions {
        output_dir: dir.path().to_path_buf(),
        extract: ExtractArgs::default(),
        pause: Duration::ZERO,
    };
    let mut outcome = HarvestOutcome::default();

    harvest_records(&catalog, &ListRequest::new("oai_dc"), &options, &mut outcome).unwrap();

    assert_eq!(outcome.records, 17);
    assert_eq!(outcome.written, 17);
    let written = fs::read_to_string(
        dir.path()
            .join("oai_figshare_example_org_article_17.xml"),
    )
    .unwrap();
    assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n<record>"));
    assert!(written.ends_with("</record>\n"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 17);
}

#[test]
fn test_harvest_content_extraction() {
    let catalog = fixture_catalog();
    let dir = tempfile::tempdir().unwrap();
    let options = HarvestOptions {
        output_dir: dir.path().to_path_buf(),
        extract: ExtractArgs {
            element: Some("json:element".to_string()),
            content: true,
        },
        pause: Duration::ZERO,
    };
    let mut outcome = HarvestOutcome::default();

    harvest_records(&catalog, &ListRequest::new("json"), &options, &mut outcome).unwrap();

    let written = fs::read_to_string(
        dir.path()
            .join("oai_figshare_example_org_article_4689088.xml"),
    )
    .unwrap();
    assert!(written.starts_with("{\""));
    let value: Value = serde_json::from_str(written.trim_end()).unwrap();
    assert_eq!(value["id"], json!(4689088));
}

#[test]
fn test_harvest_skips_records_without_element() {
    let catalog = fixture_catalog();
    let dir = tempfile::tempdir().unwrap();
    let options = HarvestOptions {
        output_dir: dir.path().to_path_buf(),
        extract: ExtractArgs {
            element: Some("oai_dc:dc".to_string()),
            content: false,
        },
        pause: Duration::ZERO,
    };
    let mut outcome = HarvestOutcome::default();

    harvest_records(&catalog, &ListRequest::new("json"), &options, &mut outcome).unwrap();

    assert_eq!(outcome.records, 1);
    assert_eq!(outcome.written, 0);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_example_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");
    let config = CatalogConfig::load(&path).unwrap();

    assert_eq!(config.repository_identifier, "figshare.com");
    assert_eq!(config.search_filter.as_deref(), Some(":group: Zoology"));
    assert_eq!(config.dublin_core.custom_fields.len(), 2);
    assert!(Catalog::new(config, MockBackend::new(vec![], vec![])).is_ok());
}
