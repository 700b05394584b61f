use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use spacexp_common::api::{Details, FileRecord};

/// Columns every row carries, in this order.
pub const GENERIC_COLUMNS: [&str; 9] = [
    "file_path",
    "file_name",
    "file_size",
    "creation_time",
    "modification_time",
    "extension",
    "type",
    "mime",
    "error",
];

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// One record as `(column, cell)` pairs.  Format-specific columns follow the
/// generic ones; EXIF fields and audio tags become `exif_<tag>` / `tags_<key>`.
pub fn flatten(r: &FileRecord) -> Vec<(String, String)> {
    let mut cells: Vec<(String, String)> = vec![
        ("file_path".into(), r.file_path.clone()),
        ("file_name".into(), r.file_name.clone()),
        ("file_size".into(), r.file_size.to_string()),
        ("creation_time".into(), r.creation_time.clone()),
        ("modification_time".into(), r.modification_time.clone()),
        ("extension".into(), r.extension.clone()),
        ("type".into(), r.kind.as_str().to_string()),
        ("mime".into(), r.mime.clone().unwrap_or_default()),
        ("error".into(), r.error.clone().unwrap_or_default()),
    ];
    let mut push = |k: &str, v: String| cells.push((k.to_string(), v));

    match &r.details {
        Details::None => {}
        Details::Pdf(p) => {
            push("num_pages", p.num_pages.to_string());
            push("pdf_author", p.author.clone());
            push("pdf_title", p.title.clone());
            push("pdf_creation_date", p.creation_date.clone());
            push("pdf_modification_date", p.modification_date.clone());
        }
        Details::Image(i) => {
            push("image_width", i.width.to_string());
            push("image_height", i.height.to_string());
            push("dpi_x", opt(i.dpi_x));
            push("dpi_y", opt(i.dpi_y));
            for (tag, value) in &i.exif {
                push(&format!("exif_{tag}"), value.clone());
            }
        }
        Details::Audio(a) => {
            push("audio_duration", opt(a.duration_secs));
            push("audio_bitrate", opt(a.bitrate));
            push("audio_sample_rate", opt(a.sample_rate));
            push("audio_channels", opt(a.channels));
            for (key, value) in &a.tags {
                push(&format!("tags_{key}"), value.clone());
            }
        }
        Details::Video(v) => {
            push("video_frame_count", opt(v.frame_count));
            push("video_fps", opt(v.fps));
            push("video_duration", opt(v.duration_secs));
            push("video_width", opt(v.width));
            push("video_height", opt(v.height));
        }
        Details::Document(d) => {
            push("author", d.author.clone());
            push("title", d.title.clone());
            push("page_count", opt(d.page_count));
        }
        Details::Spreadsheet(s) => {
            push("num_sheets", s.num_sheets.to_string());
            push(
                "sheet_names",
                serde_json::to_string(&s.sheet_names).unwrap_or_default(),
            );
        }
    }
    cells
}

/// Write records as CSV.  The header is the union of every record's columns
/// in first-seen order; cells a record does not have are left empty.
pub fn write_csv_to<W: Write>(out: W, records: &[FileRecord]) -> Result<()> {
    let rows: Vec<Vec<(String, String)>> = records.iter().map(flatten).collect();

    let mut header: Vec<String> = GENERIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut position: HashMap<String, usize> =
        header.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect();
    for row in &rows {
        for (col, _) in row {
            if !position.contains_key(col) {
                position.insert(col.clone(), header.len());
                header.push(col.clone());
            }
        }
    }

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(&header)?;
    let mut line = vec![String::new(); header.len()];
    for row in rows {
        line.iter_mut().for_each(String::clear);
        for (col, value) in row {
            // Repeated EXIF/tag keys: the first value wins.
            let cell = &mut line[position[&col]];
            if cell.is_empty() {
                *cell = value;
            }
        }
        writer.write_record(&line)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv(path: &Path, records: &[FileRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    write_csv_to(std::io::BufWriter::new(file), records)
        .with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacexp_common::api::{FileKind, ImageInfo, PdfInfo, SpreadsheetInfo};

    fn record(name: &str, kind: FileKind, details: Details) -> FileRecord {
        FileRecord {
            file_path: format!("/data/{name}"),
            file_name: name.into(),
            file_size: 42,
            creation_time: "2024-12-01 10:00:00".into(),
            modification_time: "2024-12-02 10:00:00".into(),
            extension: name.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default(),
            mime: None,
            kind,
            details,
            error: None,
            extract_ms: None,
        }
    }

    fn to_string(records: &[FileRecord]) -> String {
        let mut buf = Vec::new();
        write_csv_to(&mut buf, records).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_is_union_in_first_seen_order() {
        let pdf = record("a.pdf", FileKind::Document, Details::Pdf(PdfInfo {
            num_pages: 3,
            author: "Ann".into(),
            title: "N/A".into(),
            creation_date: "2024-01-01 00:00:00".into(),
            modification_date: "0001-01-01 00:00:00".into(),
        }));
        let img = record("b.png", FileKind::Image, Details::Image(ImageInfo {
            width: 10,
            height: 20,
            dpi_x: Some(72.0),
            dpi_y: None,
            exif: vec![("Make".into(), "Acme".into())],
        }));
        let csv = to_string(&[pdf, img]);
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "file_path,file_name,file_size,creation_time,modification_time,extension,type,mime,error,\
             num_pages,pdf_author,pdf_title,pdf_creation_date,pdf_modification_date,\
             image_width,image_height,dpi_x,dpi_y,exif_Make"
        );
        assert_eq!(
            lines.next().unwrap(),
            "/data/a.pdf,a.pdf,42,2024-12-01 10:00:00,2024-12-02 10:00:00,pdf,document,,,\
             3,Ann,N/A,2024-01-01 00:00:00,0001-01-01 00:00:00,,,,,"
        );
        assert_eq!(
            lines.next().unwrap(),
            "/data/b.png,b.png,42,2024-12-01 10:00:00,2024-12-02 10:00:00,png,image,,,\
             ,,,,,10,20,72,,Acme"
        );
    }

    #[test]
    fn test_sheet_names_are_a_json_array() {
        let xlsx = record("s.xlsx", FileKind::Spreadsheet, Details::Spreadsheet(SpreadsheetInfo {
            num_sheets: 2,
            sheet_names: vec!["Budget".into(), "Notes, misc".into()],
        }));
        let cells = flatten(&xlsx);
        let names = cells.iter().find(|(k, _)| k == "sheet_names").unwrap();
        assert_eq!(names.1, r#"["Budget","Notes, misc"]"#);
    }

    #[test]
    fn test_error_and_mime_are_kept() {
        let mut r = record("broken.pdf", FileKind::Document, Details::None);
        r.mime = Some("application/pdf".into());
        r.error = Some("invalid file header".into());
        let csv = to_string(&[r]);
        assert!(csv.lines().nth(1).unwrap().ends_with("document,application/pdf,invalid file header"));
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/nested/catalog.csv");
        write_csv(&path, &[record("a.txt", FileKind::Unknown, Details::None)]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
