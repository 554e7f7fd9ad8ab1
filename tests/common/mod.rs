//! Shared fixtures for integration tests.

use std::io::Cursor;

use base64::Engine as _;
use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};

fn text_cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
}

fn text_row(cells: &[&str]) -> TableRow {
    TableRow::new(cells.iter().map(|t| text_cell(t)).collect())
}

/// Title, body paragraph, 3x3 table, closing italic paragraph
pub fn sample_docx() -> Vec<u8> {
    let docx = Docx::new()
        .add_paragraph(
            Paragraph::new().add_run(Run::new().add_text("Test Document Title").bold().size(32)),
        )
        .add_paragraph(
            Paragraph::new().add_run(Run::new().add_text("This is a plain paragraph.")),
        )
        .add_table(Table::new(vec![
            text_row(&["Name", "Age", "City"]),
            text_row(&["John Doe", "30", "New York"]),
            text_row(&["Jane Smith", "25", "Los Angeles"]),
        ]))
        .add_paragraph(
            Paragraph::new().add_run(Run::new().add_text("End of document.").italic()),
        );

    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).unwrap();
    buf.into_inner()
}

pub fn sample_docx_base64() -> String {
    base64::engine::general_purpose::STANDARD.encode(sample_docx())
}
