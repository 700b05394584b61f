use std::path::Path;

use spacexp_client::{read_csv, write_csv, CatalogSource};
use spacexp_common::api::FileKind;
use spacexp_common::catalog::{CatalogQuery, CatalogRow};
use spacexp_common::config::IndexConfig;
use spacexp_extract_dispatch::Indexer;

/// Uncompressed 24-bit BMP, `width` × `height` pixels.
fn bmp(width: u32, height: u32) -> Vec<u8> {
    let row = (width * 3).div_ceil(4) * 4;
    let data_len = row * height;
    let mut out = Vec::new();
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&(54 + data_len).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&54u32.to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&(width as i32).to_le_bytes());
    out.extend_from_slice(&(height as i32).to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data_len.to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&2835u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.resize(54 + data_len as usize, 0x7f);
    out
}

fn populate(root: &Path) {
    std::fs::write(root.join("notes.txt"), "quarterly numbers").unwrap();
    std::fs::write(root.join("wide.bmp"), bmp(8, 2)).unwrap();
    std::fs::create_dir(root.join("photos")).unwrap();
    std::fs::write(root.join("photos/tall.bmp"), bmp(3, 5)).unwrap();
    std::fs::write(root.join("broken.pdf"), b"%PDF-1.4 cut short").unwrap();
}

fn by_name<'a>(rows: &'a [CatalogRow], name: &str) -> &'a CatalogRow {
    rows.iter().find(|r| r.file_name == name).unwrap()
}

#[test]
fn index_to_csv_then_report_and_search() {
    let data = tempfile::tempdir().unwrap();
    populate(data.path());

    let report = Indexer::new(&IndexConfig::default()).run(data.path(), |_, _| {}).unwrap();
    assert_eq!(report.records.len(), 4);
    assert_eq!(report.failed, 1);
    assert_eq!(report.unsupported, 1);

    let out = tempfile::tempdir().unwrap();
    let csv_path = out.path().join("output_analysis.csv");
    write_csv(&csv_path, &report.records).unwrap();

    let rows = read_csv(&csv_path).unwrap();
    assert_eq!(rows.len(), 4);

    let wide = by_name(&rows, "wide.bmp");
    assert_eq!(wide.kind, FileKind::Image);
    assert_eq!((wide.width, wide.height), (Some(8), Some(2)));
    assert_eq!(wide.extension, "bmp");

    let broken = by_name(&rows, "broken.pdf");
    assert_eq!(broken.kind, FileKind::Document);
    assert!(broken.error.is_some());
    assert_eq!(broken.file_size, 18);

    let notes = by_name(&rows, "notes.txt");
    assert_eq!(notes.kind, FileKind::Unknown);
    assert_eq!(notes.extension, "txt");

    let source = CatalogSource::Csv(csv_path.clone());
    let stats = source.report(10).unwrap();
    assert_eq!(stats.summary.total_files, 4);
    assert_eq!(stats.file_statistics[0].extension, "bmp");
    assert_eq!(stats.file_statistics[0].count, 2);
    let images: Vec<&str> = stats.largest_images.iter().map(|i| i.file_name.as_str()).collect();
    assert_eq!(images, vec!["wide.bmp", "tall.bmp"]);
    assert!(stats.largest_documents.is_empty());

    let hits = source
        .search(&CatalogQuery { name: Some("BMP".into()), ..Default::default() })
        .unwrap();
    assert_eq!(hits.len(), 2);

    let hits = source
        .search(&CatalogQuery { min_size: Some(100), ..Default::default() })
        .unwrap();
    assert!(hits.iter().all(|r| r.file_size >= 100));
    assert!(hits.iter().any(|r| r.file_name == "wide.bmp"));

    assert!(source.last_index().unwrap().is_some());
}

#[test]
fn csv_and_database_give_the_same_report() {
    let data = tempfile::tempdir().unwrap();
    populate(data.path());
    let report = Indexer::new(&IndexConfig::default()).run(data.path(), |_, _| {}).unwrap();

    let out = tempfile::tempdir().unwrap();
    let csv_path = out.path().join("catalog.csv");
    write_csv(&csv_path, &report.records).unwrap();

    let db_path = out.path().join("catalog.db");
    let conn = spacexp_store::open(&db_path).unwrap();
    let rows: Vec<CatalogRow> = report.records.iter().map(CatalogRow::from).collect();
    spacexp_store::replace_all(&conn, &rows).unwrap();
    drop(conn);

    let from_csv = CatalogSource::Csv(csv_path).report(10).unwrap();
    let from_db = CatalogSource::Db(db_path).report(10).unwrap();
    assert_eq!(from_csv, from_db);
}

#[test]
fn importing_duplicate_names_keeps_every_row() {
    let out = tempfile::tempdir().unwrap();
    let csv_path = out.path().join("catalog.csv");
    std::fs::write(&csv_path, "file_name,file_size\na.txt,1\na.txt,2\nb.txt,4\n").unwrap();

    let rows = read_csv(&csv_path).unwrap();
    let db_path = out.path().join("catalog.db");
    spacexp_store::replace_all(&spacexp_store::open(&db_path).unwrap(), &rows).unwrap();

    let from_csv = CatalogSource::Csv(csv_path).report(10).unwrap();
    let from_db = CatalogSource::Db(db_path).report(10).unwrap();
    assert_eq!(from_db.summary.total_files, 3);
    assert_eq!(from_db.summary.total_size, 7);
    assert_eq!(from_csv, from_db);
}
