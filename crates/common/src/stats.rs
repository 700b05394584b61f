//! Statistics over a catalog.
//!
//! The types here are produced both by the in-memory functions below (used
//! when the catalog is a CSV file) and by the SQL queries in `spacexp-store`;
//! the two must agree on ordering and tie-breaks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::FileKind;
use crate::catalog::CatalogRow;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCount {
    pub extension: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestFile {
    pub file_name: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestImage {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub calculated_area: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LargestDocument {
    pub file_name: String,
    pub page_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SizeSummary {
    pub total_files: u64,
    pub total_size: u64,
    /// Absent for an empty catalog.
    pub average_size: Option<f64>,
    pub median_size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatisticsReport {
    pub file_statistics: Vec<ExtensionCount>,
    pub largest_files: Vec<LargestFile>,
    pub largest_images: Vec<LargestImage>,
    pub largest_documents: Vec<LargestDocument>,
    pub summary: SizeSummary,
}

/// File count per extension, most common first, ties by extension.
pub fn extension_stats(rows: &[CatalogRow]) -> Vec<ExtensionCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for r in rows {
        *counts.entry(r.extension.as_str()).or_default() += 1;
    }
    let mut out: Vec<ExtensionCount> = counts
        .into_iter()
        .map(|(ext, count)| ExtensionCount { extension: ext.to_string(), count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.extension.cmp(&b.extension)));
    out
}

pub fn largest_files(rows: &[CatalogRow], n: usize) -> Vec<LargestFile> {
    let mut sorted: Vec<&CatalogRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        b.file_size.cmp(&a.file_size).then_with(|| a.file_name.cmp(&b.file_name))
    });
    sorted
        .into_iter()
        .take(n)
        .map(|r| LargestFile { file_name: r.file_name.clone(), file_size: r.file_size })
        .collect()
}

/// Images ranked by pixel area.  Rows missing either dimension are skipped.
pub fn largest_images(rows: &[CatalogRow], n: usize) -> Vec<LargestImage> {
    let mut images: Vec<LargestImage> = rows
        .iter()
        .filter(|r| r.kind == FileKind::Image)
        .filter_map(|r| {
            Some(LargestImage {
                file_name: r.file_name.clone(),
                width: r.width?,
                height: r.height?,
                calculated_area: r.area()?,
            })
        })
        .collect();
    images.sort_by(|a, b| {
        b.calculated_area
            .cmp(&a.calculated_area)
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
    images.truncate(n);
    images
}

pub fn largest_documents(rows: &[CatalogRow], n: usize) -> Vec<LargestDocument> {
    let mut docs: Vec<LargestDocument> = rows
        .iter()
        .filter(|r| r.kind == FileKind::Document)
        .filter_map(|r| {
            Some(LargestDocument { file_name: r.file_name.clone(), page_count: r.page_count? })
        })
        .collect();
    docs.sort_by(|a, b| {
        b.page_count.cmp(&a.page_count).then_with(|| a.file_name.cmp(&b.file_name))
    });
    docs.truncate(n);
    docs
}

pub fn size_summary(rows: &[CatalogRow]) -> SizeSummary {
    let mut sizes: Vec<u64> = rows.iter().map(|r| r.file_size).collect();
    sizes.sort_unstable();
    summarize_sorted_sizes(&sizes)
}

/// Build a summary from sizes already sorted ascending.
pub fn summarize_sorted_sizes(sizes: &[u64]) -> SizeSummary {
    let total_files = sizes.len() as u64;
    let total_size: u64 = sizes.iter().sum();
    if sizes.is_empty() {
        return SizeSummary { total_files, total_size, average_size: None, median_size: None };
    }
    let mid = sizes.len() / 2;
    let median = if sizes.len() % 2 == 0 {
        (sizes[mid - 1] as f64 + sizes[mid] as f64) / 2.0
    } else {
        sizes[mid] as f64
    };
    SizeSummary {
        total_files,
        total_size,
        average_size: Some(total_size as f64 / total_files as f64),
        median_size: Some(median),
    }
}

pub fn report(rows: &[CatalogRow], n: usize) -> StatisticsReport {
    StatisticsReport {
        file_statistics: extension_stats(rows),
        largest_files: largest_files(rows, n),
        largest_images: largest_images(rows, n),
        largest_documents: largest_documents(rows, n),
        summary: size_summary(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::row;

    fn image(name: &str, w: u32, h: u32) -> CatalogRow {
        let mut r = row(name, 1000, FileKind::Image);
        r.width = Some(w);
        r.height = Some(h);
        r
    }

    fn document(name: &str, pages: Option<u32>) -> CatalogRow {
        let mut r = row(name, 1000, FileKind::Document);
        r.page_count = pages;
        r
    }

    #[test]
    fn test_extension_stats_orders_by_count_then_name() {
        let rows = vec![
            row("a.txt", 1, FileKind::Unknown),
            row("b.jpg", 1, FileKind::Image),
            row("c.txt", 1, FileKind::Unknown),
            row("d.doc", 1, FileKind::Document),
        ];
        let stats = extension_stats(&rows);
        assert_eq!(stats[0], ExtensionCount { extension: "txt".into(), count: 2 });
        assert_eq!(stats[1].extension, "doc");
        assert_eq!(stats[2].extension, "jpg");
    }

    #[test]
    fn test_largest_files_limits_and_sorts() {
        let rows: Vec<CatalogRow> = (0..15)
            .map(|i| row(&format!("f{i:02}"), i * 100, FileKind::Unknown))
            .collect();
        let top = largest_files(&rows, DEFAULT_TOP_N);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0].file_name, "f14");
        assert_eq!(top[9].file_name, "f05");
    }

    #[test]
    fn test_largest_images_by_area() {
        let mut rows = vec![image("small.jpg", 100, 200), image("large.jpg", 500, 400)];
        // Non-image rows with dimensions (videos) are ignored.
        let mut video = row("clip.mp4", 1, FileKind::Video);
        video.width = Some(4000);
        video.height = Some(4000);
        rows.push(video);
        rows.push(row("nodims.png", 1, FileKind::Image));

        let top = largest_images(&rows, 10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].file_name, "large.jpg");
        assert_eq!(top[0].calculated_area, 200_000);
        assert_eq!(top[1].calculated_area, 20_000);
    }

    #[test]
    fn test_largest_documents_skip_missing_page_counts() {
        let rows = vec![
            document("short.pdf", Some(2)),
            document("long.docx", Some(40)),
            document("legacy.doc", None),
        ];
        let top = largest_documents(&rows, 10);
        assert_eq!(top, vec![
            LargestDocument { file_name: "long.docx".into(), page_count: 40 },
            LargestDocument { file_name: "short.pdf".into(), page_count: 2 },
        ]);
    }

    #[test]
    fn test_size_summary_median_even_and_odd() {
        let rows = vec![
            row("a", 10, FileKind::Unknown),
            row("b", 30, FileKind::Unknown),
            row("c", 20, FileKind::Unknown),
        ];
        let s = size_summary(&rows);
        assert_eq!(s.total_files, 3);
        assert_eq!(s.total_size, 60);
        assert_eq!(s.average_size, Some(20.0));
        assert_eq!(s.median_size, Some(20.0));

        let s = summarize_sorted_sizes(&[1, 2, 3, 10]);
        assert_eq!(s.median_size, Some(2.5));
    }

    #[test]
    fn test_empty_catalog_report() {
        let r = report(&[], DEFAULT_TOP_N);
        assert!(r.file_statistics.is_empty());
        assert_eq!(r.summary.total_files, 0);
        assert_eq!(r.summary.average_size, None);
    }
}
