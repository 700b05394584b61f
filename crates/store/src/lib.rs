//! SQLite catalog: one row per indexed file, plus a small key/value table
//! for run metadata.  Statistics mirror `spacexp_common::stats` but are
//! computed in SQL.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, Row};

use spacexp_common::api::FileKind;
use spacexp_common::catalog::{CatalogQuery, CatalogRow};
use spacexp_common::stats::{
    summarize_sorted_sizes, ExtensionCount, LargestDocument, LargestFile, LargestImage,
    SizeSummary, StatisticsReport,
};

const ROW_COLUMNS: &str = "file_path, file_name, file_size, creation_time, modification_time,
     extension, kind, page_count, width, height, sheet_names, error, metadata";

// ── Schema ────────────────────────────────────────────────────────────────────

pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    init(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    init(Connection::open_in_memory()?)
}

fn init(conn: Connection) -> Result<Connection> {
    conn.execute_batch(include_str!("schema.sql"))
        .context("initialising schema")?;
    // Unicode-aware substring match; SQLite's LIKE only folds ASCII.
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: String = ctx.get(0)?;
            let needle: String = ctx.get(1)?;
            Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
        },
    )?;
    Ok(conn)
}

// ── Writes ────────────────────────────────────────────────────────────────────

/// Replace the whole catalog with `rows` in one transaction.
pub fn replace_all(conn: &Connection, rows: &[CatalogRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM files", [])?;
    insert_into(&tx, rows)?;
    tx.commit()?;
    Ok(())
}

/// Append rows to the existing catalog.
pub fn insert_rows(conn: &Connection, rows: &[CatalogRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    insert_into(&tx, rows)?;
    tx.commit()?;
    Ok(())
}

fn insert_into(conn: &Connection, rows: &[CatalogRow]) -> Result<()> {
    let mut stmt = conn.prepare_cached(&format!(
        "INSERT INTO files ({ROW_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
    ))?;
    for r in rows {
        stmt.execute(params![
            r.file_path,
            r.file_name,
            r.file_size as i64,
            r.creation_time,
            r.modification_time,
            r.extension,
            r.kind.as_str(),
            r.page_count.map(i64::from),
            r.width.map(i64::from),
            r.height.map(i64::from),
            serde_json::to_string(&r.sheet_names)?,
            r.error,
            r.metadata.as_ref().map(|m| m.to_string()),
        ])
        .with_context(|| format!("inserting {}", r.file_path))?;
    }
    Ok(())
}

// ── Index timestamp ───────────────────────────────────────────────────────────

pub fn set_last_index(conn: &Connection, timestamp: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO meta (key, value) VALUES ('last_index', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![timestamp.to_string()],
    )?;
    Ok(())
}

pub fn last_index(conn: &Connection) -> Result<Option<i64>> {
    let result = conn.query_row(
        "SELECT value FROM meta WHERE key = 'last_index'",
        [],
        |row| row.get::<_, String>(0),
    );
    match result {
        Ok(s) => Ok(s.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Statistics ────────────────────────────────────────────────────────────────

pub fn extension_stats(conn: &Connection) -> Result<Vec<ExtensionCount>> {
    let mut stmt = conn.prepare(
        "SELECT extension, COUNT(*) AS n FROM files
         GROUP BY extension
         ORDER BY n DESC, extension ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ExtensionCount {
                extension: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn largest_files(conn: &Connection, n: usize) -> Result<Vec<LargestFile>> {
    let mut stmt = conn.prepare(
        "SELECT file_name, file_size FROM files
         ORDER BY file_size DESC, file_name ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![n as i64], |row| {
            Ok(LargestFile {
                file_name: row.get(0)?,
                file_size: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn largest_images(conn: &Connection, n: usize) -> Result<Vec<LargestImage>> {
    let mut stmt = conn.prepare(
        "SELECT file_name, width, height, width * height AS area FROM files
         WHERE kind = 'image' AND width IS NOT NULL AND height IS NOT NULL
         ORDER BY area DESC, file_name ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![n as i64], |row| {
            Ok(LargestImage {
                file_name: row.get(0)?,
                width: row.get::<_, i64>(1)? as u32,
                height: row.get::<_, i64>(2)? as u32,
                calculated_area: row.get::<_, i64>(3)? as u64,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn largest_documents(conn: &Connection, n: usize) -> Result<Vec<LargestDocument>> {
    let mut stmt = conn.prepare(
        "SELECT file_name, page_count FROM files
         WHERE kind = 'document' AND page_count IS NOT NULL
         ORDER BY page_count DESC, file_name ASC
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![n as i64], |row| {
            Ok(LargestDocument {
                file_name: row.get(0)?,
                page_count: row.get::<_, i64>(1)? as u32,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn size_summary(conn: &Connection) -> Result<SizeSummary> {
    let mut stmt = conn.prepare("SELECT file_size FROM files ORDER BY file_size")?;
    let sizes = stmt
        .query_map([], |row| Ok(row.get::<_, i64>(0)? as u64))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(summarize_sorted_sizes(&sizes))
}

pub fn report(conn: &Connection, n: usize) -> Result<StatisticsReport> {
    Ok(StatisticsReport {
        file_statistics: extension_stats(conn)?,
        largest_files: largest_files(conn, n)?,
        largest_images: largest_images(conn, n)?,
        largest_documents: largest_documents(conn, n)?,
        summary: size_summary(conn)?,
    })
}

// ── Catalog reads ─────────────────────────────────────────────────────────────

pub fn all_rows(conn: &Connection) -> Result<Vec<CatalogRow>> {
    let mut stmt = conn.prepare(&format!("SELECT {ROW_COLUMNS} FROM files ORDER BY id"))?;
    let rows = stmt
        .query_map([], catalog_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Rows matching every set filter, ordered by path.
pub fn search(conn: &Connection, query: &CatalogQuery) -> Result<Vec<CatalogRow>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(name) = &query.name {
        clauses.push("contains_ci(file_name, ?)");
        values.push(name.clone().into());
    }
    if let Some(min) = query.min_size {
        clauses.push("file_size >= ?");
        values.push((min as i64).into());
    }
    if let Some(max) = query.max_size {
        clauses.push("file_size <= ?");
        values.push((max as i64).into());
    }
    // Stored times are `YYYY-MM-DD HH:MM:SS`, so a date compares as a prefix.
    if let Some(since) = &query.created_since {
        clauses.push("creation_time >= ?");
        values.push(since.clone().into());
    }
    if let Some(since) = &query.modified_since {
        clauses.push("modification_time >= ?");
        values.push(since.clone().into());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {ROW_COLUMNS} FROM files {where_sql} ORDER BY file_path"
    ))?;
    let rows = stmt
        .query_map(params_from_iter(values), catalog_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn catalog_row(row: &Row<'_>) -> rusqlite::Result<CatalogRow> {
    let kind: String = row.get(6)?;
    let sheet_names: String = row.get(10)?;
    let metadata: Option<String> = row.get(12)?;
    Ok(CatalogRow {
        file_path: row.get(0)?,
        file_name: row.get(1)?,
        file_size: row.get::<_, i64>(2)? as u64,
        creation_time: row.get(3)?,
        modification_time: row.get(4)?,
        extension: row.get(5)?,
        kind: FileKind::parse(&kind),
        page_count: row.get::<_, Option<i64>>(7)?.map(|v| v as u32),
        width: row.get::<_, Option<i64>>(8)?.map(|v| v as u32),
        height: row.get::<_, Option<i64>>(9)?.map(|v| v as u32),
        sheet_names: serde_json::from_str(&sheet_names).unwrap_or_default(),
        error: row.get(11)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacexp_common::stats;

    fn row(name: &str, size: u64, kind: FileKind) -> CatalogRow {
        CatalogRow {
            file_path: format!("/data/{name}"),
            file_name: name.to_string(),
            file_size: size,
            creation_time: "2024-12-01 10:00:00".into(),
            modification_time: "2024-12-05 10:00:00".into(),
            extension: name.rsplit_once('.').map(|(_, e)| e.to_string()).unwrap_or_default(),
            kind,
            page_count: None,
            width: None,
            height: None,
            sheet_names: Vec::new(),
            error: None,
            metadata: None,
        }
    }

    fn sample() -> Vec<CatalogRow> {
        let mut photo = row("photo.jpg", 5_000, FileKind::Image);
        (photo.width, photo.height) = (Some(4000), Some(3000));
        let mut icon = row("icon.png", 300, FileKind::Image);
        (icon.width, icon.height) = (Some(64), Some(64));
        let mut report = row("Report.pdf", 9_000, FileKind::Document);
        report.page_count = Some(42);
        report.metadata = Some(serde_json::json!({"format": "pdf", "num_pages": 42}));
        let mut memo = row("memo.docx", 700, FileKind::Document);
        memo.page_count = Some(3);
        memo.creation_time = "2023-06-01 09:00:00".into();
        let mut book = row("budget.xlsx", 1_200, FileKind::Spreadsheet);
        book.sheet_names = vec!["Q1".into(), "Q2".into()];
        let mut broken = row("broken.pdf", 10, FileKind::Document);
        broken.error = Some("invalid PDF".into());
        vec![photo, icon, report, memo, book, broken, row("notes.txt", 50, FileKind::Unknown)]
    }

    #[test]
    fn test_round_trip_preserves_rows() {
        let conn = open_in_memory().unwrap();
        let rows = sample();
        replace_all(&conn, &rows).unwrap();
        assert_eq!(all_rows(&conn).unwrap(), rows);
    }

    #[test]
    fn test_sql_statistics_match_in_memory() {
        let conn = open_in_memory().unwrap();
        let rows = sample();
        replace_all(&conn, &rows).unwrap();
        assert_eq!(report(&conn, 3).unwrap(), stats::report(&rows, 3));
        assert_eq!(report(&conn, 10).unwrap(), stats::report(&rows, 10));
    }

    #[test]
    fn test_statistics_on_empty_store() {
        let conn = open_in_memory().unwrap();
        let r = report(&conn, 10).unwrap();
        assert!(r.file_statistics.is_empty());
        assert!(r.largest_files.is_empty());
        assert_eq!(r.summary.total_files, 0);
        assert_eq!(r.summary.average_size, None);
    }

    #[test]
    fn test_replace_all_discards_previous_rows() {
        let conn = open_in_memory().unwrap();
        replace_all(&conn, &sample()).unwrap();
        replace_all(&conn, &[row("only.txt", 1, FileKind::Unknown)]).unwrap();
        let rows = all_rows(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_name, "only.txt");
    }

    #[test]
    fn test_rows_sharing_a_path_are_all_kept() {
        // Catalogs imported without a file_path column key rows by name only.
        let conn = open_in_memory().unwrap();
        let mut first = row("a.txt", 1, FileKind::Unknown);
        let mut second = row("a.txt", 2, FileKind::Unknown);
        first.file_path = "a.txt".into();
        second.file_path = "a.txt".into();
        replace_all(&conn, &[first, second]).unwrap();

        let rows = all_rows(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        let r = report(&conn, 10).unwrap();
        assert_eq!(r.summary.total_files, 2);
        assert_eq!(r.summary.total_size, 3);
        assert_eq!(r.file_statistics[0].count, 2);
    }

    #[test]
    fn test_insert_rows_appends() {
        let conn = open_in_memory().unwrap();
        insert_rows(&conn, &[row("a.txt", 1, FileKind::Unknown)]).unwrap();
        insert_rows(&conn, &[row("a.txt", 2, FileKind::Unknown), row("b.txt", 3, FileKind::Unknown)]).unwrap();
        assert_eq!(all_rows(&conn).unwrap().len(), 3);
        assert_eq!(size_summary(&conn).unwrap().total_size, 6);
    }

    #[test]
    fn test_search_matches_in_memory_filter() {
        let conn = open_in_memory().unwrap();
        let rows = sample();
        replace_all(&conn, &rows).unwrap();

        let queries = [
            CatalogQuery { name: Some("REPORT".into()), ..Default::default() },
            CatalogQuery { min_size: Some(700), max_size: Some(5_000), ..Default::default() },
            CatalogQuery { created_since: Some("2024-01-01".into()), ..Default::default() },
            CatalogQuery { modified_since: Some("2024-12-06".into()), ..Default::default() },
            CatalogQuery::default(),
        ];
        for q in queries {
            let mut expected: Vec<CatalogRow> = q.filter(&rows).into_iter().cloned().collect();
            expected.sort_by(|a, b| a.file_path.cmp(&b.file_path));
            assert_eq!(search(&conn, &q).unwrap(), expected, "{q:?}");
        }
    }

    #[test]
    fn test_search_name_is_unicode_case_insensitive() {
        let conn = open_in_memory().unwrap();
        replace_all(&conn, &[row("Отчёт.pdf", 1, FileKind::Document)]).unwrap();
        let q = CatalogQuery { name: Some("отчёт".into()), ..Default::default() };
        assert_eq!(search(&conn, &q).unwrap().len(), 1);
    }

    #[test]
    fn test_last_index() {
        let conn = open_in_memory().unwrap();
        assert_eq!(last_index(&conn).unwrap(), None);
        set_last_index(&conn, 1_700_000_000).unwrap();
        set_last_index(&conn, 1_700_000_600).unwrap();
        assert_eq!(last_index(&conn).unwrap(), Some(1_700_000_600));
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");
        {
            let conn = open(&path).unwrap();
            replace_all(&conn, &sample()).unwrap();
        }
        let conn = open(&path).unwrap();
        assert_eq!(all_rows(&conn).unwrap().len(), sample().len());
    }
}
