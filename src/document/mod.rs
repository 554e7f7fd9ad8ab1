//! Document conversion: `.docx` payloads to structured JSON.
//!
//! - [`parser`] reads the Word package into body blocks
//! - [`model`] is the element tree built from those blocks
//! - [`json`] emits the element tree as JSON
//!
//! Paragraph formatting is taken from the first run only; later runs in a
//! mixed-format paragraph do not contribute.

pub mod json;
pub mod model;
pub mod parser;

use base64::Engine as _;
use tracing::{debug, info};

use crate::types::{BridgeError, Result};

pub use model::{
    DocumentElement, DocumentResult, ElementContent, ElementKind, Fields, TableCell, TableRow,
    Value,
};
pub use parser::{Block, CellBlock, CoreProperties, ParagraphBlock, ParsedDocument, RunFormat};

/// Convert a base64-encoded `.docx` into JSON
pub fn convert_base64_docx_to_json(encoded: &str) -> Result<String> {
    let bytes = decode_base64(encoded)?;
    convert_docx_to_json(&bytes)
}

/// Convert raw `.docx` bytes into JSON
pub fn convert_docx_to_json(bytes: &[u8]) -> Result<String> {
    let result = convert_docx(bytes)?;
    let json = json::to_json(&result);
    info!(
        "Converted document: {} elements, {} chars of JSON",
        result.elements.len(),
        json.len()
    );
    Ok(json)
}

/// Convert raw `.docx` bytes into the element tree
pub fn convert_docx(bytes: &[u8]) -> Result<DocumentResult> {
    let parsed = parser::parse_docx(bytes)?;
    Ok(build_result(parsed))
}

/// Decode transport base64. Whitespace anywhere in the payload is ignored so
/// line-wrapped encodings are accepted.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(BridgeError::Document("Empty document payload".to_string()));
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(compact.as_bytes())?;
    debug!("Decoded {} bytes of document payload", bytes.len());
    Ok(bytes)
}

/// Build the element tree from parsed blocks
pub fn build_result(parsed: ParsedDocument) -> DocumentResult {
    let mut result = DocumentResult::new();

    if let Some(props) = parsed.properties {
        result.metadata = metadata_fields(props);
    }

    for block in parsed.blocks {
        let element = match block {
            Block::Paragraph(para) => paragraph_element(para),
            Block::Table(table) => table_element(table),
        };
        if let Some(Value::Text(style)) = element.properties.get("style") {
            count_style(&mut result.styles, style);
        }
        result.add_element(element);
    }

    result
}

fn metadata_fields(props: CoreProperties) -> Fields {
    let mut metadata = Fields::new();
    metadata.insert("title", props.title);
    metadata.insert("creator", props.creator);
    metadata.insert("description", props.description);
    metadata.insert("created", props.created);
    metadata.insert("modified", props.modified);
    metadata
}

fn count_style(styles: &mut Fields, style: &str) {
    let count = match styles.get(style) {
        Some(Value::Int(n)) => n + 1,
        _ => 1,
    };
    styles.insert(style, count);
}

fn paragraph_element(para: ParagraphBlock) -> DocumentElement {
    let mut element = DocumentElement::paragraph(para.text);

    if let Some(alignment) = para.alignment {
        element.formatting.insert("alignment", alignment);
    }

    if let Some(run) = para.first_run {
        element.formatting.insert("bold", run.bold);
        element.formatting.insert("italic", run.italic);
        element.formatting.insert("underline", run.underline);
        if let Some(family) = run.font_family {
            element.formatting.insert("fontFamily", family);
        }
        if let Some(half_points) = run.half_points {
            element.formatting.insert("fontSize", font_size(half_points));
        }
        if let Some(color) = run.color {
            element.formatting.insert("color", color);
        }
    }

    if let Some(style) = para.style_id {
        element.properties.insert("style", style);
    }

    element
}

/// Half-points to points, kept integral when possible
fn font_size(half_points: u64) -> Value {
    if half_points % 2 == 0 {
        Value::Int((half_points / 2) as i64)
    } else {
        Value::Float(half_points as f64 / 2.0)
    }
}

fn table_element(table: parser::TableBlock) -> DocumentElement {
    let rows = table
        .rows
        .into_iter()
        .map(|cells| TableRow {
            cells: cells.into_iter().map(table_cell).collect(),
        })
        .collect();

    DocumentElement::table(rows)
}

fn table_cell(cell: CellBlock) -> TableCell {
    let mut formatting = Fields::new();
    if let Some(color) = cell.background_color {
        formatting.insert("backgroundColor", color);
    }

    TableCell {
        text: cell.paragraphs.join("\n"),
        formatting,
    }
}
