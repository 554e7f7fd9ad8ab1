//! Document conversion through the dispatcher, on synthetic `.docx` files.

mod common;

use clipboard_bridge::document::{convert_docx, ElementKind, Value};
use clipboard_bridge::{dispatch, DOCX_TO_JSON};
use pretty_assertions::assert_eq;
use serde_json::Value as Json;

fn dispatch_sample() -> Json {
    let response = dispatch(DOCX_TO_JSON, &common::sample_docx_base64());
    serde_json::from_str(&response).expect("response should be valid JSON")
}

#[test]
fn test_elements_follow_body_order() {
    let json = dispatch_sample();
    let elements = json["document"]["elements"].as_array().unwrap();

    let kinds: Vec<&str> = elements.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["paragraph", "paragraph", "table", "paragraph"]);

    assert_eq!(elements[0]["content"], "Test Document Title");
    assert_eq!(elements[1]["content"], "This is a plain paragraph.");
    assert_eq!(elements[3]["content"], "End of document.");
}

#[test]
fn test_first_run_formatting() {
    let json = dispatch_sample();
    let elements = json["document"]["elements"].as_array().unwrap();

    assert_eq!(elements[0]["formatting"]["bold"], true);
    assert_eq!(elements[0]["formatting"]["fontSize"], 16);
    assert_eq!(elements[1]["formatting"]["bold"], false);
    assert_eq!(elements[3]["formatting"]["italic"], true);
}

#[test]
fn test_table_cells_are_literal() {
    let json = dispatch_sample();
    let rows = json["document"]["elements"][2]["content"].as_array().unwrap();
    assert_eq!(rows.len(), 3);

    let text: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| {
            row["cells"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| c["text"].as_str().unwrap())
                .collect()
        })
        .collect();
    assert_eq!(
        text,
        vec![
            vec!["Name", "Age", "City"],
            vec!["John Doe", "30", "New York"],
            vec!["Jane Smith", "25", "Los Angeles"],
        ]
    );
}

#[test]
fn test_metadata_keys_present() {
    let json = dispatch_sample();
    let metadata = json["document"]["metadata"].as_object().unwrap();
    for key in ["title", "creator", "description", "created", "modified"] {
        assert!(metadata.contains_key(key), "missing metadata key {}", key);
    }
    assert!(json["document"]["styles"].is_object());
}

#[test]
fn test_element_tree_from_bytes() {
    let result = convert_docx(&common::sample_docx()).unwrap();
    assert_eq!(result.elements.len(), 4);
    assert_eq!(result.elements[2].kind(), ElementKind::Table);
    assert_eq!(
        result.elements[0].formatting.get("fontSize"),
        Some(&Value::Int(16))
    );
}

#[test]
fn test_lowercase_type_is_accepted() {
    let response = dispatch("docx_to_json", &common::sample_docx_base64());
    let json: Json = serde_json::from_str(&response).unwrap();
    assert!(json.get("document").is_some());
}

#[test]
fn test_truncated_document_is_an_error_envelope() {
    let encoded = common::sample_docx_base64();
    let truncated = &encoded[..encoded.len() / 2];
    // Keep the length a multiple of four so the failure comes from the package
    let truncated = &truncated[..truncated.len() / 4 * 4];

    let json: Json = serde_json::from_str(&dispatch(DOCX_TO_JSON, truncated)).unwrap();
    assert_eq!(json["error"], true);
    assert!(json["message"].as_str().unwrap().starts_with("DOCX conversion failed:")
        || json["message"].as_str().unwrap().starts_with("Processing error:"));
}
