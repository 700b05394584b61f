//! Reading a catalog back from CSV.
//!
//! Any CSV with at least `file_name` and `file_size` columns loads, so files
//! written by older releases or edited by hand still work.  Columns that are
//! not part of [`CatalogRow`] are kept in its `metadata` object.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Value};

use spacexp_common::api::FileKind;
use spacexp_common::catalog::{extension_of, CatalogRow};

/// Columns that map onto [`CatalogRow`] fields.
const ROW_COLUMNS: &[&str] = &[
    "file_path",
    "file_name",
    "file_size",
    "creation_time",
    "modification_time",
    "extension",
    "type",
    "error",
    "page_count",
    "num_pages",
    "image_width",
    "image_height",
    "width",
    "height",
    "video_width",
    "video_height",
    "sheet_names",
];

pub fn read_csv(path: &Path) -> Result<Vec<CatalogRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    read_csv_from(file).with_context(|| format!("reading {}", path.display()))
}

pub fn read_csv_from<R: Read>(input: R) -> Result<Vec<CatalogRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if header.iter().all(|h| h.is_empty()) {
        bail!("no data to analyse");
    }
    let col = |name: &str| header.iter().position(|h| h == name);
    let name_col = col("file_name").ok_or_else(|| anyhow!("missing column 'file_name'"))?;
    let size_col = col("file_size").ok_or_else(|| anyhow!("missing column 'file_size'"))?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let cell = |c: Option<usize>| {
            c.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let first = |names: &[&str]| names.iter().find_map(|n| cell(col(*n)));

        let file_name = cell(Some(name_col)).unwrap_or_default().to_string();
        let file_size = match cell(Some(size_col)) {
            Some(s) => parse_count(s)
                .ok_or_else(|| anyhow!("line {line}: invalid file_size '{s}'"))?,
            None => 0,
        };
        let extension = match cell(col("extension")) {
            Some(e) => e.trim_start_matches('.').to_lowercase(),
            None => extension_of(Path::new(&file_name)),
        };
        let kind = match cell(col("type")) {
            Some(t) => FileKind::parse(t),
            None => kind_from_ext(&extension),
        };
        let (width, height) = [
            ("image_width", "image_height"),
            ("width", "height"),
            ("video_width", "video_height"),
        ]
        .iter()
        .find_map(|(w, h)| {
            Some((parse_count(cell(col(*w))?)? as u32, parse_count(cell(col(*h))?)? as u32))
        })
        .map_or((None, None), |(w, h)| (Some(w), Some(h)));

        let mut extra = Map::new();
        for (c, name) in header.iter().enumerate() {
            if name.is_empty() || ROW_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            if let Some(v) = cell(Some(c)) {
                extra.insert(name.clone(), Value::String(v.to_string()));
            }
        }

        rows.push(CatalogRow {
            file_path: cell(col("file_path")).unwrap_or(file_name.as_str()).to_string(),
            file_size,
            creation_time: cell(col("creation_time")).unwrap_or_default().to_string(),
            modification_time: cell(col("modification_time")).unwrap_or_default().to_string(),
            extension,
            kind,
            page_count: first(&["page_count", "num_pages"]).and_then(parse_count).map(|n| n as u32),
            width,
            height,
            sheet_names: cell(col("sheet_names")).map(parse_sheet_names).unwrap_or_default(),
            error: cell(col("error")).map(str::to_string),
            metadata: (!extra.is_empty()).then_some(Value::Object(extra)),
            file_name,
        });
    }

    if rows.is_empty() {
        bail!("no data to analyse");
    }
    Ok(rows)
}

/// Whole numbers, also accepting the `12.0` form spreadsheet tools write.
fn parse_count(s: &str) -> Option<u64> {
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
}

/// A JSON array, else a comma-separated list.
fn parse_sheet_names(s: &str) -> Vec<String> {
    if let Ok(names) = serde_json::from_str::<Vec<String>>(s) {
        return names;
    }
    s.split(',')
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Best guess for rows written without a `type` column.
pub fn kind_from_ext(ext: &str) -> FileKind {
    match ext {
        "pdf" | "docx" | "doc" | "pptx" => FileKind::Document,
        "xlsx" | "xlsm" | "xls" | "ods" => FileKind::Spreadsheet,
        e if spacexp_extract_media::is_image_ext(e) => FileKind::Image,
        e if spacexp_extract_media::is_audio_ext(e) => FileKind::Audio,
        e if spacexp_extract_media::is_video_ext(e) => FileKind::Video,
        _ => FileKind::Unknown,
    }
}
