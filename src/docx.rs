use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use zip::ZipArchive;

use crate::parser::document::{RawDocument, Table};

const DOCUMENT_PART: &str = "word/document.xml";
/// Widest `gridSpan` honoured; Word tables top out well below this.
const MAX_GRID_SPAN: usize = 64;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("not a .docx file")]
    WrongExtension,
    #[error("not a zip container (legacy .doc?): {0}")]
    NotZip(#[from] zip::result::ZipError),
    #[error("zip container has no word/document.xml")]
    MissingDocumentPart,
    #[error("corrupt word/document.xml: {0}")]
    Corrupt(std::io::Error),
    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Format problems skip the document; failing to open or read the
    /// file itself aborts the run.
    pub fn is_format(&self) -> bool {
        !matches!(self, DocumentError::Io(_))
    }
}

/// Open a `.docx` file and read its top-level tables.
pub fn load(path: &Path) -> Result<RawDocument, DocumentError> {
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if !is_docx {
        return Err(DocumentError::WrongExtension);
    }
    let file = File::open(path)?;
    load_from_reader(BufReader::new(file))
}

pub fn load_from_reader<R: Read + Seek>(reader: R) -> Result<RawDocument, DocumentError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut xml = String::new();
    match archive.by_name(DOCUMENT_PART) {
        Ok(mut part) => {
            part.read_to_string(&mut xml)
                .map_err(DocumentError::Corrupt)?;
        }
        Err(zip::result::ZipError::FileNotFound) => return Err(DocumentError::MissingDocumentPart),
        Err(e) => return Err(DocumentError::NotZip(e)),
    }
    Ok(RawDocument {
        tables: parse_tables(&xml)?,
    })
}

/// True when the file starts with a zip local-header signature.
pub fn is_zip_container(path: &Path) -> std::io::Result<bool> {
    let mut magic = [0u8; 4];
    let mut file = File::open(path)?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == b"PK\x03\x04"),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// A cell while its row is being read.
struct PendingCell {
    text: String,
    span: usize,
    continues_above: bool,
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Lay a row's cells onto the grid: spanned cells repeat across their
/// columns and vertical-merge continuations repeat the cell above.
fn place_row(cells: Vec<PendingCell>, above: Option<&Vec<String>>) -> Vec<String> {
    let mut row = Vec::new();
    for cell in cells {
        for _ in 0..cell.span.max(1) {
            let text = if cell.continues_above {
                above
                    .and_then(|r| r.get(row.len()))
                    .cloned()
                    .unwrap_or_default()
            } else {
                cell.text.clone()
            };
            row.push(text);
        }
    }
    row
}

/// Read WordprocessingML and return its top-level tables. Nested tables
/// are not part of the grid and are ignored.
pub fn parse_tables(xml: &str) -> Result<Vec<Table>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut tables = Vec::new();
    let mut depth = 0usize;
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut cells: Vec<PendingCell> = Vec::new();
    let mut cell: Option<PendingCell> = None;
    let mut in_text = false;

    loop {
        let top = depth == 1;
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"tbl" => {
                    depth += 1;
                    if depth == 1 {
                        rows.clear();
                    }
                }
                b"tr" if top => cells.clear(),
                b"tc" if top => {
                    cell = Some(PendingCell {
                        text: String::new(),
                        span: 1,
                        continues_above: false,
                    })
                }
                b"p" if top => {
                    if let Some(c) = cell.as_mut() {
                        if !c.text.is_empty() {
                            c.text.push('\n');
                        }
                    }
                }
                b"t" if top => in_text = true,
                b"vMerge" if top => mark_merge(&mut cell, e),
                _ => {}
            },
            Event::Empty(ref e) => {
                if top {
                    match e.local_name().as_ref() {
                        b"gridSpan" => {
                            if let (Some(c), Some(v)) = (cell.as_mut(), attr(e, b"val")) {
                                c.span = v.parse::<usize>().unwrap_or(1).clamp(1, MAX_GRID_SPAN);
                            }
                        }
                        b"vMerge" => mark_merge(&mut cell, e),
                        b"br" | b"cr" => push_text(&mut cell, "\n"),
                        b"tab" => push_text(&mut cell, " "),
                        _ => {}
                    }
                }
            }
            Event::Text(ref e) if top && in_text => {
                let text = e.unescape()?;
                push_text(&mut cell, &text);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"tbl" => {
                    if depth == 1 {
                        tables.push(Table {
                            rows: std::mem::take(&mut rows),
                        });
                    }
                    depth = depth.saturating_sub(1);
                }
                b"t" if top => in_text = false,
                b"tc" if top => {
                    if let Some(c) = cell.take() {
                        cells.push(c);
                    }
                }
                b"tr" if top => {
                    let row = place_row(std::mem::take(&mut cells), rows.last());
                    rows.push(row);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(tables)
}

fn mark_merge(cell: &mut Option<PendingCell>, e: &BytesStart) {
    // <w:vMerge/> without a value continues the cell above.
    if let Some(c) = cell.as_mut() {
        c.continues_above = attr(e, b"val").map_or(true, |v| v == "continue");
    }
}

fn push_text(cell: &mut Option<PendingCell>, text: &str) {
    if let Some(c) = cell.as_mut() {
        c.text.push_str(text);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    /// Minimal WordprocessingML body with one table per entry.
    pub(crate) fn document_xml(tables: &[Vec<Vec<&str>>]) -> String {
        let mut body = String::new();
        for table in tables {
            body.push_str("<w:p><w:r><w:t>Orarul</w:t></w:r></w:p><w:tbl>");
            for row in table {
                body.push_str("<w:tr>");
                for cell in row {
                    body.push_str("<w:tc>");
                    for line in cell.split('\n') {
                        body.push_str(&format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", line));
                    }
                    body.push_str("</w:tc>");
                }
                body.push_str("</w:tr>");
            }
            body.push_str("</w:tbl>");
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        )
    }

    pub(crate) fn docx_bytes(xml: &str) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn reads_table_cells_with_paragraph_breaks() {
        let xml = document_xml(&[vec![
            vec!["Data", "Ora", "JFR"],
            vec!["24.09", "8:00-9:30", "Etica\ndr. M. Rusu"],
        ]]);
        let doc = load_from_reader(Cursor::new(docx_bytes(&xml))).unwrap();
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].cell(0, 2), "JFR");
        assert_eq!(doc.tables[0].cell(1, 2), "Etica\ndr. M. Rusu");
    }

    #[test]
    fn grid_span_and_vertical_merge() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:tbl>
            <w:tr>
              <w:tc><w:tcPr><w:vMerge w:val="restart"/></w:tcPr><w:p><w:r><w:t>joi 24.09</w:t></w:r></w:p></w:tc>
              <w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>Curs comun</w:t></w:r></w:p></w:tc>
            </w:tr>
            <w:tr>
              <w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc>
              <w:tc><w:p><w:r><w:t>A</w:t><w:br/><w:t>B</w:t></w:r></w:p></w:tc>
              <w:tc><w:p/></w:tc>
            </w:tr>
        </w:tbl></w:body></w:document>"#;
        let tables = parse_tables(xml).unwrap();
        let t = &tables[0];
        assert_eq!(t.rows[0], vec!["joi 24.09", "Curs comun", "Curs comun"]);
        assert_eq!(t.rows[1], vec!["joi 24.09", "A\nB", ""]);
    }

    #[test]
    fn nested_tables_ignored() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:tbl><w:tr><w:tc>
            <w:p><w:r><w:t>outer</w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
        </w:tc></w:tr></w:tbl></w:body></w:document>"#;
        let tables = parse_tables(xml).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows, vec![vec!["outer".to_string()]]);
    }

    #[test]
    fn rejects_non_docx() {
        assert!(matches!(
            load(Path::new("orar.pdf")),
            Err(DocumentError::WrongExtension)
        ));
        let mut legacy = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        legacy.resize(512, 0);
        let err = load_from_reader(Cursor::new(legacy)).unwrap_err();
        assert!(matches!(err, DocumentError::NotZip(_)));
        assert!(err.is_format());
    }

    #[test]
    fn zip_without_document_part() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("readme.txt", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hi").unwrap();
        let bytes = zip.finish().unwrap().into_inner();
        assert!(matches!(
            load_from_reader(Cursor::new(bytes)),
            Err(DocumentError::MissingDocumentPart)
        ));
    }

    fn zip_with_document_part(bytes: &[u8]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        zip.write_all(bytes).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn undecodable_document_part_is_format_error() {
        let bytes = zip_with_document_part(&[0xFF, 0xFE, 0x00]);
        let err = load_from_reader(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, DocumentError::Corrupt(_)));
        assert!(err.is_format());
    }

    #[test]
    fn grid_span_is_clamped() {
        let xml = r#"<w:document xmlns:w="w"><w:body><w:tbl><w:tr>
            <w:tc><w:tcPr><w:gridSpan w:val="1000000000"/></w:tcPr><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc>
            <w:tc><w:tcPr><w:gridSpan w:val="0"/></w:tcPr><w:p><w:r><w:t>y</w:t></w:r></w:p></w:tc>
        </w:tr></w:tbl></w:body></w:document>"#;
        let tables = parse_tables(xml).unwrap();
        let row = &tables[0].rows[0];
        assert_eq!(row.len(), MAX_GRID_SPAN + 1);
        assert_eq!(row[MAX_GRID_SPAN], "y");
    }

    #[test]
    fn zip_signature_check() {
        let dir = tempfile::tempdir().unwrap();
        let docx = dir.path().join("orar.docx");
        std::fs::write(&docx, docx_bytes(&document_xml(&[]))).unwrap();
        let doc = dir.path().join("orar.doc");
        std::fs::write(&doc, [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1]).unwrap();
        let tiny = dir.path().join("gol.docx");
        std::fs::write(&tiny, b"PK").unwrap();

        assert!(is_zip_container(&docx).unwrap());
        assert!(!is_zip_container(&doc).unwrap());
        assert!(!is_zip_container(&tiny).unwrap());
        assert!(is_zip_container(Path::new("/nonexistent/orar.docx")).is_err());
    }

    #[test]
    fn missing_file_is_io() {
        let err = load(Path::new("/nonexistent/orar.docx")).unwrap_err();
        assert!(!err.is_format());
    }
}
