//! Hand-rolled JSON emitter for conversion results.
//!
//! Output shape:
//!
//! ```text
//! {
//!   "document": {
//!     "elements": [ { "type", "content", "formatting", "properties" }, ... ],
//!     "metadata": { ... },
//!     "styles": { ... }
//!   }
//! }
//! ```
//!
//! Maps are written in insertion order.

use super::model::{DocumentElement, DocumentResult, ElementContent, Fields, TableRow, Value};

const INDENT: &str = "  ";

/// Serialize a conversion result
pub fn to_json(result: &DocumentResult) -> String {
    let mut document = Fields::new();
    document.insert(
        "elements",
        Value::List(result.elements.iter().map(element_value).collect()),
    );
    document.insert("metadata", result.metadata.clone());
    document.insert("styles", result.styles.clone());

    let mut root = Fields::new();
    root.insert("document", document);

    let mut out = String::new();
    write_value(&mut out, &Value::Map(root), 0);
    out
}

/// Serialize a single value, without surrounding whitespace
pub fn value_to_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn element_value(element: &DocumentElement) -> Value {
    let content = match &element.content {
        ElementContent::Paragraph(text) => Value::Text(text.clone()),
        ElementContent::Table(rows) => Value::List(rows.iter().map(row_value).collect()),
    };

    let mut fields = Fields::new();
    fields.insert("type", element.kind().as_str());
    fields.insert("content", content);
    fields.insert("formatting", element.formatting.clone());
    fields.insert("properties", element.properties.clone());
    Value::Map(fields)
}

fn row_value(row: &TableRow) -> Value {
    let cells = row
        .cells
        .iter()
        .map(|cell| {
            let mut fields = Fields::new();
            fields.insert("text", cell.text.as_str());
            fields.insert("formatting", cell.formatting.clone());
            Value::Map(fields)
        })
        .collect();

    let mut fields = Fields::new();
    fields.insert("cells", Value::List(cells));
    Value::Map(fields)
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => out.push_str(&n.to_string()),
        Value::Float(f) if f.is_finite() => out.push_str(&f.to_string()),
        Value::Float(_) => out.push_str("null"),
        Value::Text(s) => write_string(out, s),
        Value::List(items) => write_list(out, items, depth),
        Value::Map(fields) => write_map(out, fields, depth),
    }
}

fn write_list(out: &mut String, items: &[Value], depth: usize) {
    if items.is_empty() {
        out.push_str("[]");
        return;
    }

    out.push_str("[\n");
    for (i, item) in items.iter().enumerate() {
        push_indent(out, depth + 1);
        write_value(out, item, depth + 1);
        if i + 1 < items.len() {
            out.push(',');
        }
        out.push('\n');
    }
    push_indent(out, depth);
    out.push(']');
}

fn write_map(out: &mut String, fields: &Fields, depth: usize) {
    if fields.is_empty() {
        out.push_str("{}");
        return;
    }

    out.push_str("{\n");
    let last = fields.len() - 1;
    for (i, (key, value)) in fields.iter().enumerate() {
        push_indent(out, depth + 1);
        write_string(out, key);
        out.push_str(": ");
        write_value(out, value, depth + 1);
        if i < last {
            out.push(',');
        }
        out.push('\n');
    }
    push_indent(out, depth);
    out.push('}');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// Quote and escape a string literal
pub fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}
