//! Minimal single-sheet Office Open XML workbook writer and reader.
//!
//! The writer emits only the parts a spreadsheet application needs to open
//! the file: content types, package relationships, the workbook, and one
//! worksheet using inline strings. The reader understands exactly what the
//! writer produces (plus shared-string-free numeric and inline cells), which
//! is enough to check a written report.

use super::table::{HEADERS, MetricRecord, ResultTable};
use crate::error::BenchError;
use std::fmt::Write as _;
use std::io::{Read, Write};
use std::path::Path;

pub const SHEET_NAME: &str = "Sheet1";
const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// A worksheet cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

fn workbook_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    )
}

/// `0 -> "A"`, `25 -> "Z"`, `26 -> "AA"`.
fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

fn column_index(letters: &str) -> Option<usize> {
    let mut index = 0usize;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        index = index * 26 + (ch as usize - 'A' as usize + 1);
    }
    index.checked_sub(1)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Render rows of cells as worksheet XML. Empty cells are omitted.
pub fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        let row_num = r + 1;
        let _ = write!(xml, r#"<row r="{row_num}">"#);
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{row_num}", column_letters(c));
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape(text)
                    );
                }
                Cell::Number(v) if v.is_finite() => {
                    let _ = write!(xml, r#"<c r="{reference}"><v>{v}</v></c>"#);
                }
                Cell::Number(_) => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn table_rows(table: &ResultTable) -> Vec<Vec<Cell>> {
    let header = HEADERS.iter().map(|h| Cell::Text((*h).to_string())).collect();
    std::iter::once(header)
        .chain(table.records().iter().map(|record| {
            std::iter::once(Cell::Text(record.classifier.clone()))
                .chain(record.values().into_iter().map(|v| {
                    if v.is_nan() { Cell::Empty } else { Cell::Number(v) }
                }))
                .collect()
        }))
        .collect()
}

/// Write `table` as a workbook at `path`, replacing any existing file.
pub fn write_table(table: &ResultTable, path: &Path) -> Result<(), BenchError> {
    let file = std::fs::File::create(path).map_err(|e| {
        BenchError::report(format!("cannot create {}: {e}", path.display()))
    })?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let sheet = sheet_xml(&table_rows(table));
    let workbook = workbook_xml();
    let parts: [(&str, &str); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", PACKAGE_RELS),
        ("xl/workbook.xml", &workbook),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        (SHEET_PART, &sheet),
    ];
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    zip.finish()?;
    tracing::info!(path = %path.display(), rows = table.len(), "Wrote workbook");
    Ok(())
}

/// Text between `open` (an element's start, attributes allowed) and `close` in `xml`.
fn element_body<'a>(xml: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = xml.find(open)?;
    let after_tag = start + xml[start..].find('>')? + 1;
    let end = after_tag + xml[after_tag..].find(close)?;
    Some(&xml[after_tag..end])
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let key = format!(" {name}=\"");
    let start = tag.find(&key)? + key.len();
    let end = start + tag[start..].find('"')?;
    Some(&tag[start..end])
}

/// Parse worksheet XML into rows of cells, placing each cell by its reference.
pub fn parse_sheet(xml: &str) -> Result<Vec<Vec<Cell>>, BenchError> {
    let data = element_body(xml, "<sheetData", "</sheetData>")
        .ok_or_else(|| BenchError::report("worksheet has no sheetData"))?;
    let mut rows = Vec::new();
    let mut rest = data;
    while let Some(row_start) = rest.find("<row") {
        let row_end = rest[row_start..]
            .find("</row>")
            .map(|e| row_start + e)
            .ok_or_else(|| BenchError::report("unterminated <row>"))?;
        let row_xml = &rest[row_start..row_end];
        rows.push(parse_row(row_xml)?);
        rest = &rest[row_end + "</row>".len()..];
    }
    Ok(rows)
}

fn parse_row(row_xml: &str) -> Result<Vec<Cell>, BenchError> {
    let mut cells: Vec<Cell> = Vec::new();
    let mut rest = row_xml;
    while let Some(start) = rest.find("<c ") {
        let tag_end = start
            + rest[start..]
                .find('>')
                .ok_or_else(|| BenchError::report("unterminated cell tag"))?;
        let tag = &rest[start..tag_end];
        let (body, next) = if tag.ends_with('/') {
            ("", tag_end + 1)
        } else {
            let close = tag_end
                + rest[tag_end..]
                    .find("</c>")
                    .ok_or_else(|| BenchError::report("unterminated cell"))?;
            (&rest[tag_end + 1..close], close + "</c>".len())
        };

        let reference = attribute(tag, "r").unwrap_or_default();
        let letters: String = reference.chars().take_while(|c| c.is_ascii_uppercase()).collect();
        let col = column_index(&letters).unwrap_or(cells.len());
        let value = match attribute(tag, "t") {
            Some("inlineStr") => Cell::Text(unescape(element_body(body, "<t", "</t>").unwrap_or_default())),
            Some("str") => Cell::Text(unescape(element_body(body, "<v", "</v>").unwrap_or_default())),
            Some(other) if other != "n" => {
                return Err(BenchError::report(format!(
                    "unsupported cell type '{other}' at {reference}"
                )));
            }
            _ => match element_body(body, "<v", "</v>") {
                Some(text) => Cell::Number(text.trim().parse::<f64>().map_err(|_| {
                    BenchError::report(format!("cell {reference} is not a number: '{text}'"))
                })?),
                None => Cell::Empty,
            },
        };
        if cells.len() <= col {
            cells.resize(col + 1, Cell::Empty);
        }
        cells[col] = value;
        rest = &rest[next..];
    }
    Ok(cells)
}

/// Read the first worksheet of the workbook at `path`.
pub fn read_sheet(path: &Path) -> Result<Vec<Vec<Cell>>, BenchError> {
    let file = std::fs::File::open(path)
        .map_err(|e| BenchError::report(format!("cannot open {}: {e}", path.display())))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive.by_name(SHEET_PART)?.read_to_string(&mut xml)?;
    parse_sheet(&xml)
}

/// Read a comparison table written by [`write_table`].
pub fn read_table(path: &Path) -> Result<ResultTable, BenchError> {
    let rows = read_sheet(path)?;
    let (header, body) = rows
        .split_first()
        .ok_or_else(|| BenchError::report("worksheet is empty"))?;
    let names: Vec<&str> = header
        .iter()
        .map(|c| match c {
            Cell::Text(t) => t.as_str(),
            _ => "",
        })
        .collect();
    if names != HEADERS {
        return Err(BenchError::report(format!(
            "unexpected header row {names:?}"
        )));
    }

    let records = body
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let classifier = match row.first() {
                Some(Cell::Text(name)) => name.clone(),
                _ => {
                    return Err(BenchError::report(format!(
                        "row {} has no classifier name",
                        i + 2
                    )));
                }
            };
            let metric = |col: usize| match row.get(col) {
                Some(Cell::Number(v)) => *v,
                _ => f64::NAN,
            };
            Ok(MetricRecord {
                classifier,
                accuracy: metric(1),
                precision: metric(2),
                recall: metric(3),
                f1_score: metric(4),
                error: None,
            })
        })
        .collect::<Result<Vec<_>, BenchError>>()?;
    Ok(ResultTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(4), "E");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
        assert_eq!(column_index("AB"), Some(27));
        assert_eq!(column_index("E"), Some(4));
    }

    #[test]
    fn test_sheet_xml_skips_nan_and_escapes() {
        let xml = sheet_xml(&[vec![
            Cell::Text("R&D <x>".into()),
            Cell::Number(f64::NAN),
            Cell::Number(0.5),
        ]]);
        assert!(xml.contains("<t>R&amp;D &lt;x&gt;</t>"));
        assert!(!xml.contains("B1"));
        assert!(xml.contains(r#"<c r="C1"><v>0.5</v></c>"#));
    }

    #[test]
    fn test_parse_sheet_places_cells_by_reference() {
        let xml = sheet_xml(&[
            vec![Cell::Text("a".into()), Cell::Text("b".into())],
            vec![Cell::Empty, Cell::Number(2.5)],
        ]);
        let rows = parse_sheet(&xml).unwrap();
        assert_eq!(rows[0], vec![Cell::Text("a".into()), Cell::Text("b".into())]);
        assert_eq!(rows[1], vec![Cell::Empty, Cell::Number(2.5)]);
    }

    #[test]
    fn test_parse_rejects_shared_strings() {
        let xml = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#;
        assert!(parse_sheet(xml).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.xlsx");
        let table = ResultTable::new(vec![
            MetricRecord {
                classifier: "KNN".into(),
                accuracy: 0.875,
                precision: 0.9,
                recall: 1.0 / 3.0,
                f1_score: 0.0,
                error: None,
            },
            MetricRecord::failed("SVM", "boom"),
        ]);
        write_table(&table, &path).unwrap();
        assert_eq!(read_table(&path).unwrap(), table);
    }
}
