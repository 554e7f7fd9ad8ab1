//! Word document parsing (using docx-rs).
//!
//! Turns `.docx` bytes into a flat list of body blocks carrying text, style
//! id and first-run formatting. Package metadata comes straight from
//! `docProps/core.xml` inside the ZIP container.
//!
//! Several docx-rs property types keep their values private and only expose
//! them through `Serialize`, so formatting is read from their JSON form.

use std::io::{Cursor, Read};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::types::{BridgeError, Result};

const CORE_PROPERTIES_PART: &str = "docProps/core.xml";

/// Run-level formatting of a paragraph's first run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_family: Option<String>,
    /// Font size in half-points, as stored in the document
    pub half_points: Option<u64>,
    pub color: Option<String>,
}

/// A body paragraph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphBlock {
    pub text: String,
    pub style_id: Option<String>,
    pub alignment: Option<String>,
    /// `None` when the paragraph has no runs
    pub first_run: Option<RunFormat>,
}

/// A table cell: the text of each of its paragraphs plus its fill colour
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellBlock {
    pub paragraphs: Vec<String>,
    pub background_color: Option<String>,
}

/// A body table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableBlock {
    pub rows: Vec<Vec<CellBlock>>,
}

/// Block-level body element. Other docx body children are skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(ParagraphBlock),
    Table(TableBlock),
}

/// Core package properties
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub description: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// A parsed document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    /// `None` if the package has no core properties part
    pub properties: Option<CoreProperties>,
    pub blocks: Vec<Block>,
}

/// Parse `.docx` bytes
pub fn parse_docx(bytes: &[u8]) -> Result<ParsedDocument> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| BridgeError::Document(format!("Failed to parse docx: {:?}", e)))?;

    let mut blocks = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                blocks.push(Block::Paragraph(paragraph_block(para)));
            }
            docx_rs::DocumentChild::Table(table) => {
                blocks.push(Block::Table(table_block(table)));
            }
            _ => trace!("Skipping non-block body element"),
        }
    }

    let properties = read_core_properties(bytes)?;
    debug!(
        "Parsed docx: {} blocks, core properties: {}",
        blocks.len(),
        properties.is_some()
    );

    Ok(ParsedDocument { properties, blocks })
}

fn paragraph_block(para: &docx_rs::Paragraph) -> ParagraphBlock {
    let property = to_json(&para.property);

    let first_run = para.children.iter().find_map(|child| match child {
        docx_rs::ParagraphChild::Run(run) => Some(run_format(run)),
        _ => None,
    });

    ParagraphBlock {
        text: paragraph_text(para),
        style_id: string_val(property.get("style")),
        alignment: string_val(property.get("alignment")),
        first_run,
    }
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut text = String::new();

    for child in &para.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let docx_rs::RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }

    text
}

fn run_format(run: &docx_rs::Run) -> RunFormat {
    let props = to_json(&run.run_property);

    let underline = string_val(props.get("underline"))
        .map(|u| u != "none")
        .unwrap_or(false);

    let font_family = props.get("fonts").and_then(|fonts| {
        ["ascii", "hiAnsi", "eastAsia", "cs"]
            .iter()
            .find_map(|key| string_val(fonts.get(*key)))
    });

    RunFormat {
        bold: flag_val(props.get("bold")),
        italic: flag_val(props.get("italic")),
        underline,
        font_family,
        half_points: number_val(props.get("sz")),
        color: string_val(props.get("color")),
    }
}

fn table_block(table: &docx_rs::Table) -> TableBlock {
    let mut rows = Vec::new();

    for row in &table.rows {
        let docx_rs::TableChild::TableRow(tr) = row;
        let mut cells = Vec::new();
        for cell in &tr.cells {
            let docx_rs::TableRowChild::TableCell(tc) = cell;
            cells.push(cell_block(tc));
        }
        rows.push(cells);
    }

    TableBlock { rows }
}

fn cell_block(tc: &docx_rs::TableCell) -> CellBlock {
    let mut paragraphs = Vec::new();
    for child in &tc.children {
        if let docx_rs::TableCellContent::Paragraph(para) = child {
            paragraphs.push(paragraph_text(para));
        }
    }

    let serialized = to_json(tc);
    let background_color = serialized
        .get("property")
        .and_then(|p| p.get("shading"))
        .and_then(|s| string_val(s.get("fill")))
        .filter(|fill| !fill.eq_ignore_ascii_case("auto"));

    CellBlock {
        paragraphs,
        background_color,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Json {
    serde_json::to_value(value).unwrap_or(Json::Null)
}

/// Read a string that may be serialized bare or wrapped as `{"val": ...}`
fn string_val(value: Option<&Json>) -> Option<String> {
    match value? {
        Json::String(s) if !s.is_empty() => Some(s.clone()),
        Json::Object(map) => string_val(map.get("val")),
        _ => None,
    }
}

/// Read an on/off property. Present without a value means on.
fn flag_val(value: Option<&Json>) -> bool {
    match value {
        Some(Json::Bool(b)) => *b,
        Some(Json::String(s)) => !matches!(s.as_str(), "false" | "0" | "off"),
        Some(Json::Object(map)) => map.get("val").map_or(true, |v| flag_val(Some(v))),
        Some(Json::Null) | None => false,
        Some(_) => true,
    }
}

fn number_val(value: Option<&Json>) -> Option<u64> {
    match value? {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => s.parse().ok(),
        Json::Object(map) => number_val(map.get("val")),
        _ => None,
    }
}

lazy_static! {
    static ref CORE_TITLE: Regex = core_tag("dc:title");
    static ref CORE_CREATOR: Regex = core_tag("dc:creator");
    static ref CORE_DESCRIPTION: Regex = core_tag("dc:description");
    static ref CORE_CREATED: Regex = core_tag("dcterms:created");
    static ref CORE_MODIFIED: Regex = core_tag("dcterms:modified");
}

fn core_tag(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(r"(?s)<{tag}(?:\s[^>]*)?>(.*?)</{tag}>"))
        .expect("core property pattern is valid")
}

/// Read `docProps/core.xml` from the package, if present
fn read_core_properties(bytes: &[u8]) -> Result<Option<CoreProperties>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| BridgeError::Document(format!("Failed to open package: {}", e)))?;

    let mut xml = String::new();
    match archive.by_name(CORE_PROPERTIES_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(BridgeError::Document(format!(
                "Failed to read {}: {}",
                CORE_PROPERTIES_PART, e
            )))
        }
    }

    Ok(Some(parse_core_properties(&xml)))
}

fn parse_core_properties(xml: &str) -> CoreProperties {
    let capture = |re: &Regex| {
        re.captures(xml)
            .and_then(|c| c.get(1))
            .map(|m| unescape_xml(m.as_str().trim()))
            .filter(|s| !s.is_empty())
    };

    CoreProperties {
        title: capture(&CORE_TITLE),
        creator: capture(&CORE_CREATOR),
        description: capture(&CORE_DESCRIPTION),
        created: capture(&CORE_CREATED),
        modified: capture(&CORE_MODIFIED),
    }
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_core_properties() {
        let xml = r#"<?xml version="1.0"?>
<cp:coreProperties xmlns:cp="x" xmlns:dc="y" xmlns:dcterms="z">
  <dc:title>Q3 &amp; Q4 Report</dc:title>
  <dc:creator>Alex</dc:creator>
  <dcterms:created xsi:type="dcterms:W3CDTF">2024-01-02T03:04:05Z</dcterms:created>
  <dcterms:modified xsi:type="dcterms:W3CDTF">2024-02-03T04:05:06Z</dcterms:modified>
</cp:coreProperties>"#;

        let props = parse_core_properties(xml);
        assert_eq!(props.title.as_deref(), Some("Q3 & Q4 Report"));
        assert_eq!(props.creator.as_deref(), Some("Alex"));
        assert_eq!(props.description, None);
        assert_eq!(props.created.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert_eq!(props.modified.as_deref(), Some("2024-02-03T04:05:06Z"));
    }

    #[test]
    fn test_flag_val_shapes() {
        assert!(flag_val(Some(&json!(true))));
        assert!(!flag_val(Some(&json!(false))));
        assert!(flag_val(Some(&json!({}))));
        assert!(!flag_val(Some(&json!({"val": false}))));
        assert!(!flag_val(None));
    }

    #[test]
    fn test_string_and_number_val_shapes() {
        assert_eq!(string_val(Some(&json!("center"))).as_deref(), Some("center"));
        assert_eq!(string_val(Some(&json!({"val": "Heading1"}))).as_deref(), Some("Heading1"));
        assert_eq!(string_val(Some(&json!(""))), None);
        assert_eq!(number_val(Some(&json!(32))), Some(32));
        assert_eq!(number_val(Some(&json!({"val": 24}))), Some(24));
    }

    #[test]
    fn test_rejects_non_docx_bytes() {
        assert!(parse_docx(b"definitely not a zip").is_err());
    }
}
