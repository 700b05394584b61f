use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use lopdf::{Dictionary, Document, Object};

use spacexp_common::api::PdfInfo;
use spacexp_common::config::ExtractorConfig;

/// Used when the info dictionary has no date, as if the producer had written
/// the earliest possible one.
const MISSING_DATE: &str = "D:00010101000000Z";

/// Check if a file is a PDF based on extension.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Page count and document information dictionary of a PDF.
pub fn extract(path: &Path, cfg: &ExtractorConfig) -> Result<PdfInfo> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    extract_from_bytes(&bytes, cfg)
}

pub fn extract_from_bytes(bytes: &[u8], cfg: &ExtractorConfig) -> Result<PdfInfo> {
    // lopdf can panic on malformed cross-reference tables; treat that as a
    // parse failure for this file rather than aborting the whole run.
    let doc = match catch_unwind(AssertUnwindSafe(|| Document::load_mem(bytes))) {
        Ok(Ok(doc)) => doc,
        Ok(Err(e)) => bail!("invalid PDF: {e}"),
        Err(_) => bail!("PDF parser panicked"),
    };

    let num_pages = doc.get_pages().len() as u32;
    let info = info_dictionary(&doc);

    let field = |key: &[u8]| info.and_then(|d| d.get(key).ok()).and_then(text_of);

    Ok(PdfInfo {
        num_pages,
        author: field(b"Author").unwrap_or_else(|| cfg.default_author.clone()),
        title: field(b"Title").unwrap_or_else(|| "N/A".to_string()),
        creation_date: parse_pdf_date(&field(b"CreationDate").unwrap_or_else(|| MISSING_DATE.into())),
        modification_date: parse_pdf_date(&field(b"ModDate").unwrap_or_else(|| MISSING_DATE.into())),
    })
}

/// Full text of a PDF, for content search.
pub fn extract_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(&bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(anyhow!("PDF text extraction failed: {e}")),
        Err(_) => Err(anyhow!("PDF text extraction panicked")),
    }
}

/// The trailer's `/Info` entry, whether stored inline or by reference.
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(d) => Some(d),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it starts with a byte-order mark,
/// otherwise treated as Latin-1 (close enough to PDFDocEncoding for metadata).
fn text_of(obj: &Object) -> Option<String> {
    let bytes = match obj {
        Object::String(bytes, _) => bytes.as_slice(),
        Object::Name(name) => name.as_slice(),
        _ => return None,
    };
    let text = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };
    let text = text.trim_matches(char::from(0)).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

/// Render `D:YYYYMMDDHHmmSS[Z|±HH'mm']` as `YYYY-MM-DD HH:MM:SS`.
///
/// Truncated dates are padded (missing month and day become 01, missing time
/// fields 00); the timezone suffix is dropped.  Values that are not PDF dates
/// are returned unchanged.
pub fn parse_pdf_date(raw: &str) -> String {
    let Some(body) = raw.trim().strip_prefix("D:") else {
        return raw.to_string();
    };
    let digits: String = body.chars().take_while(|c| c.is_ascii_digit()).take(14).collect();
    if digits.len() < 4 {
        return raw.to_string();
    }
    const TEMPLATE: &str = "00010101000000";
    let padded = format!("{}{}", digits, &TEMPLATE[digits.len()..]);
    match NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn build_pdf(pages: usize, info: Option<Dictionary>) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), b"BT ET".to_vec()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if let Some(info) = info {
            let info_id = doc.add_object(info);
            doc.trailer.set("Info", info_id);
        }
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_accepts() {
        assert!(accepts(Path::new("a.pdf")));
        assert!(accepts(Path::new("A.PDF")));
        assert!(!accepts(Path::new("a.pdf.txt")));
        assert!(!accepts(Path::new("pdf")));
    }

    #[test]
    fn test_page_count_and_info() {
        let bytes = build_pdf(3, Some(dictionary! {
            "Author" => Object::string_literal("Jane Smith"),
            "Title" => Object::string_literal("Quarterly Report"),
            "CreationDate" => Object::string_literal("D:20230115103000+02'00'"),
        }));
        let info = extract_from_bytes(&bytes, &ExtractorConfig::default()).unwrap();
        assert_eq!(info.num_pages, 3);
        assert_eq!(info.author, "Jane Smith");
        assert_eq!(info.title, "Quarterly Report");
        assert_eq!(info.creation_date, "2023-01-15 10:30:00");
        assert_eq!(info.modification_date, "0001-01-01 00:00:00");
    }

    #[test]
    fn test_missing_info_uses_defaults() {
        let bytes = build_pdf(1, None);
        let cfg = ExtractorConfig { default_author: "Nobody".into(), ..Default::default() };
        let info = extract_from_bytes(&bytes, &cfg).unwrap();
        assert_eq!(info.num_pages, 1);
        assert_eq!(info.author, "Nobody");
        assert_eq!(info.title, "N/A");
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(extract_from_bytes(b"not a pdf at all", &ExtractorConfig::default()).is_err());
    }

    #[test]
    fn test_utf16_title() {
        let mut raw = vec![0xFE, 0xFF];
        for u in "Отчёт".encode_utf16() {
            raw.extend_from_slice(&u.to_be_bytes());
        }
        let obj = Object::String(raw, lopdf::StringFormat::Hexadecimal);
        assert_eq!(text_of(&obj).as_deref(), Some("Отчёт"));
        assert_eq!(text_of(&Object::string_literal("   ")), None);
    }

    #[test]
    fn test_parse_pdf_date() {
        assert_eq!(parse_pdf_date("D:20240102030405Z"), "2024-01-02 03:04:05");
        assert_eq!(parse_pdf_date("D:20240102030405+05'30'"), "2024-01-02 03:04:05");
        assert_eq!(parse_pdf_date("D:2024"), "2024-01-01 00:00:00");
        assert_eq!(parse_pdf_date("D:202406"), "2024-06-01 00:00:00");
        assert_eq!(parse_pdf_date(MISSING_DATE), "0001-01-01 00:00:00");
        assert_eq!(parse_pdf_date("yesterday"), "yesterday");
        assert_eq!(parse_pdf_date("D:20241399000000"), "D:20241399000000");
    }
}
