use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use zip::ZipArchive;

use spacexp_common::api::{DocumentInfo, SpreadsheetInfo};
use spacexp_common::config::ExtractorConfig;

/// Accept Office document formats.
pub fn accepts(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase()
            .as_str(),
        "docx" | "pptx" | "xlsx" | "xlsm" | "xls" | "ods"
    )
}

// ── DOCX / PPTX ──────────────────────────────────────────────────────────────

/// Author, title and page count of a DOCX.
///
/// The page count is the one Word stored in `docProps/app.xml` on last save;
/// documents produced by other tools may not carry it.
pub fn extract_docx(path: &Path, cfg: &ExtractorConfig) -> Result<DocumentInfo> {
    extract_package(path, cfg, "Pages")
}

/// Author, title and slide count of a PPTX.
pub fn extract_pptx(path: &Path, cfg: &ExtractorConfig) -> Result<DocumentInfo> {
    extract_package(path, cfg, "Slides")
}

fn extract_package(path: &Path, cfg: &ExtractorConfig, count_element: &str) -> Result<DocumentInfo> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = ZipArchive::new(file).context("not an Office Open XML package")?;

    let core = read_entry(&mut archive, "docProps/core.xml")?
        .map(|xml| parse_core_properties(&xml))
        .unwrap_or_default();
    let page_count = read_entry(&mut archive, "docProps/app.xml")?
        .and_then(|xml| parse_app_statistic(&xml, count_element));

    Ok(DocumentInfo {
        author: core.creator.unwrap_or_else(|| cfg.default_author.clone()),
        title: core.title.unwrap_or_else(|| "N/A".to_string()),
        page_count,
    })
}

/// Non-empty paragraphs of a DOCX body, for content search.
pub fn docx_paragraphs(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut archive = ZipArchive::new(file).context("not an Office Open XML package")?;
    let xml = read_entry(&mut archive, "word/document.xml")?
        .context("package has no word/document.xml")?;
    parse_docx_paragraphs(&xml)
}

/// `Ok(None)` when the entry is absent; read errors on a present entry propagate.
fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {name}")),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml).with_context(|| format!("reading {name}"))?;
    Ok(Some(xml))
}

#[derive(Debug, Default, PartialEq)]
struct CoreProperties {
    title: Option<String>,
    creator: Option<String>,
}

/// Extract dc:title and dc:creator from docProps/core.xml.
fn parse_core_properties(xml: &str) -> CoreProperties {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut props = CoreProperties::default();
    let mut current_field: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current_field = match e.name().as_ref() {
                    b"dc:title" => Some("title"),
                    b"dc:creator" => Some("creator"),
                    _ => None,
                };
            }
            Ok(Event::Text(e)) => {
                if let (Some(field), Ok(text)) = (current_field, e.unescape()) {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        match field {
                            "title" => props.title = Some(text),
                            _ => props.creator = Some(text),
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                current_field = None;
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    props
}

/// Numeric value of an element in docProps/app.xml (`Pages`, `Slides`, ...).
fn parse_app_statistic(xml: &str, element: &str) -> Option<u32> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut inside = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => inside = e.local_name().as_ref() == element.as_bytes(),
            Ok(Event::Text(e)) if inside => {
                return e.unescape().ok().and_then(|t| t.trim().parse().ok());
            }
            Ok(Event::End(_)) => inside = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Paragraph texts of `word/document.xml`, runs joined, blank ones dropped.
///
/// `<w:tab/>` and `<w:br/>` become whitespace so that words on either side
/// of them do not run together for content search.
fn parse_docx_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut para = String::new();
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("malformed document.xml at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(t) if in_text => para.push_str(&t.unescape()?),
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => para.push('\t'),
                b"w:br" | b"w:cr" => para.push('\n'),
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                let text = para.trim();
                if !text.is_empty() {
                    paragraphs.push(text.to_string());
                }
                para.clear();
            }
            Event::Eof => return Ok(paragraphs),
            _ => {}
        }
    }
}

// ── XLSX / XLSM / XLS / ODS ──────────────────────────────────────────────────

/// Sheet names in workbook order.  Cells are not read.
pub fn extract_spreadsheet(path: &Path) -> Result<SpreadsheetInfo> {
    use calamine::{open_workbook_auto, Reader};

    let wb = open_workbook_auto(path).with_context(|| format!("opening workbook {}", path.display()))?;
    let sheet_names = wb.sheet_names().to_vec();
    Ok(SpreadsheetInfo { num_sheets: sheet_names.len() as u32, sheet_names })
}
