use std::path::Path;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{FileKind, FileRecord};

/// The flattened row shared by the CSV catalog and the SQLite store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub creation_time: String,
    pub modification_time: String,
    pub extension: String,
    pub kind: FileKind,
    pub page_count: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default)]
    pub sheet_names: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Format-specific details as JSON, when known.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Lowercased extension as catalogued; dotfiles such as `.bashrc` have none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

impl CatalogRow {
    /// Width × height, when both are known.
    pub fn area(&self) -> Option<u64> {
        Some(self.width? as u64 * self.height? as u64)
    }
}

impl From<&FileRecord> for CatalogRow {
    fn from(r: &FileRecord) -> Self {
        let (width, height) = match r.dimensions() {
            Some((w, h)) => (Some(w), Some(h)),
            None => (None, None),
        };
        CatalogRow {
            file_path: r.file_path.clone(),
            file_name: r.file_name.clone(),
            file_size: r.file_size,
            creation_time: r.creation_time.clone(),
            modification_time: r.modification_time.clone(),
            extension: r.extension.clone(),
            kind: r.kind,
            page_count: r.page_count(),
            width,
            height,
            sheet_names: r.sheet_names().to_vec(),
            error: r.error.clone(),
            metadata: serde_json::to_value(&r.details).ok(),
        }
    }
}

/// Attribute filters for a catalog search.  Every set field must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogQuery {
    /// Case-insensitive substring of the file name.
    pub name: Option<String>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    /// `YYYY-MM-DD`; rows created on or after this day match.
    pub created_since: Option<String>,
    pub modified_since: Option<String>,
}

impl CatalogQuery {
    /// Validate a `YYYY-MM-DD` date and return it normalised.
    pub fn parse_date(s: &str) -> Result<String> {
        let trimmed = s.trim();
        match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(d) => Ok(d.format("%Y-%m-%d").to_string()),
            Err(_) => bail!("invalid date '{trimmed}': expected YYYY-MM-DD"),
        }
    }

    /// Check the date filters and drop empty strings, so that form input can
    /// be passed through unchanged.
    pub fn normalized(mut self) -> Result<Self> {
        self.name = self.name.filter(|n| !n.trim().is_empty());
        self.created_since = normalize_date(self.created_since)?;
        self.modified_since = normalize_date(self.modified_since)?;
        Ok(self)
    }

    pub fn matches(&self, row: &CatalogRow) -> bool {
        if let Some(name) = &self.name {
            if !row.file_name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if self.min_size.is_some_and(|min| row.file_size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| row.file_size > max) {
            return false;
        }
        if let Some(since) = &self.created_since {
            if row.creation_time.as_str() < since.as_str() {
                return false;
            }
        }
        if let Some(since) = &self.modified_since {
            if row.modification_time.as_str() < since.as_str() {
                return false;
            }
        }
        true
    }

    pub fn filter<'a>(&self, rows: &'a [CatalogRow]) -> Vec<&'a CatalogRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

fn normalize_date(value: Option<String>) -> Result<Option<String>> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(Some(CatalogQuery::parse_date(&s)?)),
        _ => Ok(None),
    }
}
