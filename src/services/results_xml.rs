//! Normalizer for the CTest results document (Test.xml).
//!
//! The document follows a generic tree-to-object convention where every
//! child appears as a sequence even when singular. Normalization is built
//! as unwrap-if-singular lookups over the element tree rather than
//! positional indexing, so an absent optional node degrades to a default
//! instead of faulting.

use roxmltree::{Document, Node};
use tracing::warn;

use crate::error::{IngestError, IngestResult};
use crate::models::{SiteInfo, TestCase, TestMeasurement, TestStatus, TestSuiteResult};

use super::measurement::decode_measurement;

/// Parse a results document into a normalized [`TestSuiteResult`].
///
/// Errors: unparseable XML fails with [`IngestError::Parse`]; a Test
/// element missing its `Status` attribute fails the whole document with
/// [`IngestError::Schema`]. Every other optional absence degrades
/// gracefully (missing output becomes an empty string).
pub fn parse_results_document(xml: &str) -> IngestResult<TestSuiteResult> {
    let doc = Document::parse(xml).map_err(|e| IngestError::Parse(e.to_string()))?;

    let site = doc.root_element();
    if site.tag_name().name() != "Site" {
        return Err(IngestError::Schema(format!(
            "expected Site root element, found '{}'",
            site.tag_name().name()
        )));
    }

    let testing = first_child(site, "Testing")
        .ok_or_else(|| IngestError::Schema("Testing section missing".to_string()))?;

    let test_list = first_child(testing, "TestList")
        .map(|list| {
            children(list, "Test")
                .filter_map(|t| t.text())
                .map(|t| t.trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let tests = children(testing, "Test")
        .map(normalize_test)
        .collect::<IngestResult<Vec<TestCase>>>()?;

    Ok(TestSuiteResult {
        site: site_info(site),
        test_list,
        tests,
    })
}

fn site_info(site: Node<'_, '_>) -> SiteInfo {
    SiteInfo {
        build_name: site.attribute("BuildName").map(str::to_string),
        build_stamp: site.attribute("BuildStamp").map(str::to_string),
        site_name: site.attribute("Name").map(str::to_string),
        generator: site.attribute("Generator").map(str::to_string),
    }
}

fn normalize_test(test: Node<'_, '_>) -> IngestResult<TestCase> {
    let name = child_text(test, "Name");
    let status = test.attribute("Status").ok_or_else(|| {
        IngestError::Schema(format!("Test '{}' missing Status attribute", name))
    })?;

    let results = first_child(test, "Results");

    Ok(TestCase {
        name,
        full_name: child_text(test, "FullName"),
        full_command_line: child_text(test, "FullCommandLine"),
        path: child_text(test, "Path"),
        status: TestStatus::parse(status),
        output: results.map(|r| decode_output(r)).unwrap_or_default(),
        measurements: results.map(named_measurements).unwrap_or_default(),
    })
}

/// Decode the captured-output Measurement under a Results node.
///
/// A missing Measurement/Value node yields an empty string; a decode
/// failure on the single measurement is logged and likewise substitutes
/// empty text rather than aborting the document.
fn decode_output(results: Node<'_, '_>) -> String {
    let Some(value) = first_child(results, "Measurement").and_then(|m| first_child(m, "Value"))
    else {
        return String::new();
    };

    let payload = value.text().unwrap_or_default();
    match decode_measurement(
        payload,
        value.attribute("encoding"),
        value.attribute("compression"),
    ) {
        Ok(text) => text,
        Err(e) => {
            warn!("Skipping undecodable output measurement: {}", e);
            String::new()
        }
    }
}

fn named_measurements(results: Node<'_, '_>) -> Vec<TestMeasurement> {
    children(results, "NamedMeasurement")
        .filter_map(|m| {
            let name = m.attribute("name");
            let value = first_child(m, "Value").and_then(|v| v.text());
            match (name, value) {
                (Some(name), Some(value)) => Some(TestMeasurement {
                    measurement_type: m.attribute("type").unwrap_or_default().to_string(),
                    name: name.to_string(),
                    value: value.to_string(),
                }),
                _ => {
                    warn!("Skipping NamedMeasurement without name or value");
                    None
                }
            }
        })
        .collect()
}

fn first_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn child_text(node: Node<'_, '_>, name: &str) -> String {
    first_child(node, name)
        .and_then(|c| c.text())
        .unwrap_or_default()
        .to_string()
}
