//! Structured document model produced by the converter.
//!
//! Field maps keep insertion order so emitted JSON is reproducible.

/// A loosely typed value stored in formatting, property and metadata maps
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(Fields),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<Fields> for Value {
    fn from(v: Fields) -> Self {
        Value::Map(v)
    }
}

/// String-keyed map that iterates in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<(String, Value)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Re-inserting a key replaces the value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The two kinds of body block the converter emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Paragraph,
    Table,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Table => "table",
        }
    }
}

/// One table cell: its text and cell-level formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub formatting: Fields,
}

/// One table row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// Content of an element, tagged by element kind
#[derive(Debug, Clone, PartialEq)]
pub enum ElementContent {
    Paragraph(String),
    Table(Vec<TableRow>),
}

/// A paragraph or table, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentElement {
    pub content: ElementContent,
    pub formatting: Fields,
    pub properties: Fields,
}

impl DocumentElement {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            content: ElementContent::Paragraph(text.into()),
            formatting: Fields::new(),
            properties: Fields::new(),
        }
    }

    pub fn table(rows: Vec<TableRow>) -> Self {
        Self {
            content: ElementContent::Table(rows),
            formatting: Fields::new(),
            properties: Fields::new(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self.content {
            ElementContent::Paragraph(_) => ElementKind::Paragraph,
            ElementContent::Table(_) => ElementKind::Table,
        }
    }

    /// Paragraph text, or `None` for tables
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            ElementContent::Paragraph(text) => Some(text),
            ElementContent::Table(_) => None,
        }
    }

    /// Table rows, or `None` for paragraphs
    pub fn rows(&self) -> Option<&[TableRow]> {
        match &self.content {
            ElementContent::Paragraph(_) => None,
            ElementContent::Table(rows) => Some(rows),
        }
    }
}

/// Root of a conversion: one per input document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentResult {
    pub elements: Vec<DocumentElement>,
    pub metadata: Fields,
    pub styles: Fields,
}

impl DocumentResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, element: DocumentElement) {
        self.elements.push(element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_keep_insertion_order() {
        let mut fields = Fields::new();
        fields.insert("zeta", 1i64);
        fields.insert("alpha", true);
        fields.insert("mid", "x");

        let keys: Vec<_> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_fields_replace_in_place() {
        let mut fields = Fields::new();
        fields.insert("a", 1i64);
        fields.insert("b", 2i64);
        fields.insert("a", 3i64);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("a"), Some(&Value::Int(3)));
        assert_eq!(fields.iter().next().map(|(k, _)| k), Some("a"));
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("t")), Value::Text("t".to_string()));
    }

    #[test]
    fn test_element_kind() {
        assert_eq!(DocumentElement::paragraph("x").kind(), ElementKind::Paragraph);
        assert_eq!(DocumentElement::table(vec![]).kind(), ElementKind::Table);
        assert_eq!(DocumentElement::table(vec![]).text(), None);
    }
}
